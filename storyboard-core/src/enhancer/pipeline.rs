//! SceneEnhancer - the single-shot enhancement pipeline.
//!
//! One call classifies the description, detects known entities, composes
//! their fragments and merges everything into the text according to the
//! live [`EnhancementConfig`]. Any failure inside the pipeline is contained
//! here: it is logged and the original description comes back unchanged.
//!
//! Text that an earlier enhancement inserted (fragments of known records and
//! summary clauses) is blanked out before classification and detection, so
//! enhancing an enhanced description changes nothing.

use super::config::{ConfigUpdate, EnhancementConfig, EnhancementLevel};
use super::quality::QualityTally;
use crate::compose::{knowledge_insertions, ConsistencyComposer, ConsistencyInfo, FragmentSelection};
use crate::detect::{EntityDetector, SceneTaxonomy};
use crate::error::EnhanceError;
use crate::knowledge::{KnowledgeSnapshot, KnowledgeStore, ProjectDataCache};
use crate::technical::{TechnicalClassifier, TechnicalDetails, TechnicalVocabulary};
use crate::text::{blank_out, retains_in_order};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Outcome of enhancing one description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub original: String,
    pub enhanced: String,
    pub technical: TechnicalDetails,
    pub consistency: ConsistencyInfo,
    /// Diagnostic score in `[0, 1]`; never affects the output.
    pub quality_score: f32,
}

impl EnhancementResult {
    /// A result that leaves `description` exactly as it was.
    pub fn unchanged(description: &str) -> Self {
        Self {
            original: description.to_string(),
            enhanced: description.to_string(),
            technical: TechnicalDetails::default(),
            consistency: ConsistencyInfo::default(),
            quality_score: 0.0,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.original != self.enhanced
    }
}

/// Enhances shot descriptions with technical attributes and consistency
/// descriptors from the project knowledge store.
///
/// The enhancer owns its knowledge cache. Records are read through it on
/// first use and stay fixed until [`invalidate_cache`](Self::invalidate_cache)
/// or [`reload_cache`](Self::reload_cache).
///
/// Every method takes `&self`, so one enhancer can be shared behind an `Arc`.
/// Each call reads the configuration once; an update made during a call
/// takes effect on the next one.
#[derive(Debug)]
pub struct SceneEnhancer {
    cache: ProjectDataCache,
    config: RwLock<EnhancementConfig>,
    classifier: TechnicalClassifier,
    detector: EntityDetector,
    composer: ConsistencyComposer,
}

impl SceneEnhancer {
    /// Create an enhancer over `store` with the default configuration and
    /// the built-in vocabularies.
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            cache: ProjectDataCache::new(store),
            config: RwLock::new(EnhancementConfig::default()),
            classifier: TechnicalClassifier::default(),
            detector: EntityDetector::default(),
            composer: ConsistencyComposer::default(),
        }
    }

    /// Set the initial configuration.
    pub fn with_config(mut self, config: EnhancementConfig) -> Self {
        *self.config.get_mut().unwrap_or_else(PoisonError::into_inner) = config;
        self
    }

    /// Use a different technical vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: Arc<TechnicalVocabulary>) -> Self {
        self.classifier = TechnicalClassifier::new(vocabulary);
        self
    }

    /// Use a different generic scene taxonomy.
    pub fn with_taxonomy(mut self, taxonomy: Arc<SceneTaxonomy>) -> Self {
        self.detector = EntityDetector::new(taxonomy);
        self
    }

    /// Use a different set of placeholder words for unnamed characters.
    pub fn with_placeholders(mut self, placeholders: Vec<String>) -> Self {
        self.composer = ConsistencyComposer::new().with_placeholders(placeholders);
        self
    }

    /// The live configuration.
    pub fn config(&self) -> EnhancementConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the live configuration; the next call uses it.
    ///
    /// An invalid level or strategy is rejected and leaves the configuration
    /// untouched.
    pub fn update_config(&self, update: ConfigUpdate) -> Result<(), EnhanceError> {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.apply(update)?;
        info!(
            technical = config.enable_technical_details,
            consistency = config.enable_consistency_injection,
            level = %config.enhancement_level,
            strategy = %config.fusion_strategy,
            "enhancement config updated"
        );
        Ok(())
    }

    pub fn cache(&self) -> &ProjectDataCache {
        &self.cache
    }

    /// Forget cached records; the next call reads the store again.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Re-read the store now, reporting whether it was reachable.
    pub fn reload_cache(&self) -> Result<(), EnhanceError> {
        self.cache.reload()?;
        Ok(())
    }

    /// Enhance one description and return only the text.
    ///
    /// `character_hints` name characters known to be in the shot; those not
    /// mentioned in the text still get their fragment appended.
    pub fn enhance_description(&self, description: &str, character_hints: &[&str]) -> String {
        self.enhance_with_details(description, character_hints).enhanced
    }

    /// Enhance one description and return the full result.
    pub fn enhance_with_details(&self, description: &str, character_hints: &[&str]) -> EnhancementResult {
        let config = self.config();
        self.contained(
            || EnhancementResult::unchanged(description),
            || {
                let knowledge = self.knowledge(&config);
                self.run(&config, description, character_hints, None, &knowledge)
            },
        )
    }

    /// The snapshot a call works against, or nothing when injection is off.
    pub(super) fn knowledge(&self, config: &EnhancementConfig) -> KnowledgeSnapshot {
        if config.injects_consistency() {
            self.cache.snapshot()
        } else {
            KnowledgeSnapshot::empty()
        }
    }

    /// Run `pipeline`, turning any error or panic into `fallback()`.
    pub(super) fn contained<T>(
        &self,
        fallback: impl FnOnce() -> T,
        pipeline: impl FnOnce() -> Result<T, EnhanceError>,
    ) -> T {
        let err = match catch_unwind(AssertUnwindSafe(pipeline)) {
            Ok(Ok(value)) => return value,
            Ok(Err(err)) => err,
            Err(payload) => EnhanceError::Panicked(panic_message(payload.as_ref())),
        };
        error!(error = %err, "enhancement failed, keeping original text");
        fallback()
    }

    /// The pipeline proper. Inserts only; never rewrites existing text.
    pub(super) fn run(
        &self,
        config: &EnhancementConfig,
        description: &str,
        character_hints: &[&str],
        style: Option<&str>,
        knowledge: &KnowledgeSnapshot,
    ) -> Result<EnhancementResult, EnhanceError> {
        if description.trim().is_empty() {
            return Ok(EnhancementResult::unchanged(description));
        }
        let own_text = blank_out(description, &knowledge_insertions(description, knowledge));

        let technical = if config.enable_technical_details {
            self.classifier.classify(&own_text)
        } else {
            TechnicalDetails::default()
        };

        let consistency = if config.injects_consistency() {
            self.compose(&own_text, character_hints, knowledge)
        } else {
            ConsistencyInfo::default()
        };

        let selection = match config.enhancement_level {
            EnhancementLevel::High => FragmentSelection::All,
            EnhancementLevel::Medium | EnhancementLevel::Low => FragmentSelection::FirstPerType,
        };
        let mut enhanced = self.composer.merge(description, &consistency, selection);

        let strategy = config
            .fusion_strategy
            .resolve(&own_text, &technical, &consistency, style);
        if config.enable_technical_details {
            strategy.fuse_technical(&mut enhanced, &technical, style);
        }
        if config.enhancement_level == EnhancementLevel::High {
            strategy.fuse_summary(&mut enhanced, &consistency);
        }

        if !retains_in_order(description, &enhanced) {
            return Err(EnhanceError::ContentLoss);
        }

        debug!(
            attributes = technical.attribute_count(),
            fragments = consistency.fragment_count(),
            %strategy,
            changed = enhanced != description,
            "description enhanced"
        );

        let quality_score = QualityTally::single(&technical, &consistency).score();
        Ok(EnhancementResult {
            original: description.to_string(),
            enhanced,
            technical,
            consistency,
            quality_score,
        })
    }

    fn compose(
        &self,
        description: &str,
        character_hints: &[&str],
        knowledge: &KnowledgeSnapshot,
    ) -> ConsistencyInfo {
        let mut characters = self.detector.detect_characters(description, knowledge);
        for hinted in self.detector.resolve_hints(character_hints, knowledge) {
            if !characters.contains(&hinted) {
                characters.push(hinted);
            }
        }
        let scenes = self.detector.detect_scenes(description, knowledge);

        self.composer.compose(&characters, &scenes, knowledge)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
