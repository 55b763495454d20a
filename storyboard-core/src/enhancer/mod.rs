//! The enhancement orchestrator: configuration, the single-shot pipeline and
//! multi-shot storyboard processing.

mod config;
mod fusion;
mod pipeline;
mod quality;
mod storyboard;

pub use config::{ConfigUpdate, EnhancementConfig, EnhancementLevel};
pub use fusion::FusionStrategy;
pub use pipeline::{EnhancementResult, SceneEnhancer};
pub use quality::{CONSISTENCY_WEIGHT, TECHNICAL_WEIGHT};
pub use storyboard::StoryboardEnhancement;
