//! Diagnostic quality score for enhancement results.

use crate::compose::ConsistencyInfo;
use crate::technical::TechnicalDetails;

/// Weight of the technical-coverage component.
pub const TECHNICAL_WEIGHT: f32 = 0.6;

/// Weight of the consistency-coverage component.
pub const CONSISTENCY_WEIGHT: f32 = 0.4;

/// Running counts behind a quality score.
///
/// The score combines the fraction of shots that received at least one
/// technical attribute with the fraction of detected knowledge-store
/// entities that yielded a fragment. With no such entities the technical
/// fraction is the whole score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct QualityTally {
    shots: usize,
    technical_shots: usize,
    known_entities: usize,
    composed: usize,
}

impl QualityTally {
    pub fn single(technical: &TechnicalDetails, consistency: &ConsistencyInfo) -> Self {
        let mut tally = Self::default();
        tally.record(technical, consistency);
        tally
    }

    pub fn record(&mut self, technical: &TechnicalDetails, consistency: &ConsistencyInfo) {
        self.shots += 1;
        if !technical.is_empty() {
            self.technical_shots += 1;
        }
        self.known_entities += consistency.known_entity_count();
        self.composed += consistency.fragment_count();
    }

    pub fn score(&self) -> f32 {
        if self.shots == 0 {
            return 0.0;
        }

        let technical = self.technical_shots as f32 / self.shots as f32;
        if self.known_entities == 0 {
            return technical;
        }

        let consistency = self.composed.min(self.known_entities) as f32 / self.known_entities as f32;
        (TECHNICAL_WEIGHT * technical + CONSISTENCY_WEIGHT * consistency).clamp(0.0, 1.0)
    }
}
