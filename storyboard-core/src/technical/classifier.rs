//! Text-only inference of technical shot attributes.

use super::details::TechnicalDetails;
use super::vocabulary::TechnicalVocabulary;
use std::sync::Arc;

/// Classifies a shot description into [`TechnicalDetails`].
///
/// Each dimension is resolved against its own phrase table and nothing else:
/// no dimension is inferred from another, and a dimension with no phrase in
/// the text stays unset. The classifier has no state beyond its vocabulary.
#[derive(Debug, Clone)]
pub struct TechnicalClassifier {
    vocabulary: Arc<TechnicalVocabulary>,
}

impl Default for TechnicalClassifier {
    fn default() -> Self {
        Self::new(TechnicalVocabulary::builtin())
    }
}

impl TechnicalClassifier {
    pub fn new(vocabulary: Arc<TechnicalVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &TechnicalVocabulary {
        &self.vocabulary
    }

    /// Infer the technical attributes of `description`.
    pub fn classify(&self, description: &str) -> TechnicalDetails {
        let vocab = &self.vocabulary;
        TechnicalDetails {
            shot_type: vocab.shot_type.resolve(description),
            camera_angle: vocab.camera_angle.resolve(description),
            camera_movement: vocab.camera_movement.resolve(description),
            depth_of_field: vocab.depth_of_field.resolve(description),
            lighting_condition: vocab.lighting.resolve(description),
            composition: vocab.composition.resolve(description),
            color_tone: vocab.color_tone.resolve(description),
        }
    }
}
