//! Project knowledge: character and scene records, the store seam, and the
//! memoizing cache the engine reads them through.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────────────┐
//! │ KnowledgeStore       │ ───► │ ProjectDataCache             │
//! │ (external, may fail) │      │ RwLock<Option<Arc<map>>>     │
//! └──────────────────────┘      └──────────────┬───────────────┘
//!                                              │ snapshot()
//!                                              ▼
//!                               ┌──────────────────────────────┐
//!                               │ KnowledgeSnapshot (per call) │
//!                               └──────────────────────────────┘
//! ```

mod cache;
mod record;
mod store;

pub use cache::{KnowledgeSnapshot, ProjectDataCache};
pub use record::{CharacterId, CharacterRecord, Provenance, SceneId, SceneRecord};
pub use store::{CharacterMap, KnowledgeStore, MemoryKnowledgeStore, SceneMap};
