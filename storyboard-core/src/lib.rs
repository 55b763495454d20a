//! Shot description enhancement with character and scene consistency.
//!
//! This crate provides:
//! - Technical attribute inference (shot type, angle, movement, lighting, ...)
//!   from the description text alone
//! - Detection of known characters and scenes from a project knowledge store
//! - Merging of consistency descriptors into descriptions without duplication
//! - Multi-shot storyboard processing that rewrites only description fields
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyboard_core::{CharacterRecord, MemoryKnowledgeStore, SceneEnhancer};
//!
//! let store = MemoryKnowledgeStore::new().with_character(
//!     CharacterRecord::new("ye_wenjie", "叶文洁").with_appearance("中年女性，短发"),
//! );
//! let enhancer = SceneEnhancer::new(Arc::new(store));
//!
//! let enhanced = enhancer.enhance_description("特写叶文洁在办公室里思考", &[]);
//! // 特写叶文洁（中年女性，短发）在办公室里思考【镜头类型：特写】
//! println!("{enhanced}");
//!
//! let storyboard = enhancer.enhance_storyboard(&script, "写实电影风格");
//! println!("{}", storyboard.enhanced_script);
//! ```

pub mod compose;
pub mod detect;
pub mod enhancer;
pub mod error;
pub mod knowledge;
pub mod technical;
pub mod testing;

mod text;

// Primary public API
pub use enhancer::{
    ConfigUpdate, EnhancementConfig, EnhancementLevel, EnhancementResult, FusionStrategy,
    SceneEnhancer, StoryboardEnhancement,
};
pub use error::{ConfigError, EnhanceError, KnowledgeStoreError, ScriptBlockError};
pub use knowledge::{
    CharacterId, CharacterRecord, KnowledgeStore, MemoryKnowledgeStore, ProjectDataCache, SceneId,
    SceneRecord,
};
pub use technical::TechnicalDetails;
pub use testing::MockKnowledgeStore;
