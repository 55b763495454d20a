//! The knowledge store seam and an in-memory implementation.

use super::record::{CharacterId, CharacterRecord, SceneId, SceneRecord};
use crate::error::KnowledgeStoreError;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// All characters of a project, ordered by id.
pub type CharacterMap = BTreeMap<CharacterId, CharacterRecord>;

/// All scenes of a project, ordered by id.
pub type SceneMap = BTreeMap<SceneId, SceneRecord>;

/// Source of character and scene records for the active project.
///
/// Implementations may be slow (disk, database, network); the engine only
/// calls them through [`ProjectDataCache`](super::ProjectDataCache).
pub trait KnowledgeStore: Send + Sync {
    /// Fetch every character record.
    fn get_all_characters(&self) -> Result<CharacterMap, KnowledgeStoreError>;

    /// Fetch every scene record.
    fn get_all_scenes(&self) -> Result<SceneMap, KnowledgeStoreError>;
}

/// A knowledge store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryKnowledgeStore {
    characters: CharacterMap,
    scenes: SceneMap,
}

#[derive(Deserialize)]
struct CharacterDocument {
    #[serde(default)]
    characters: BTreeMap<String, CharacterRecord>,
}

#[derive(Deserialize)]
struct SceneDocument {
    #[serde(default)]
    scenes: BTreeMap<String, SceneRecord>,
}

impl MemoryKnowledgeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from knowledge-base documents.
    ///
    /// The documents have the shape `{"characters": {"<id>": {...}}}` and
    /// `{"scenes": {"<id>": {...}}}`. A record without an `id` takes its map
    /// key; records without a name are skipped.
    pub fn from_json(characters: &str, scenes: &str) -> Result<Self, KnowledgeStoreError> {
        let character_doc: CharacterDocument = serde_json::from_str(characters)
            .map_err(|e| KnowledgeStoreError::Malformed(format!("characters: {e}")))?;
        let scene_doc: SceneDocument = serde_json::from_str(scenes)
            .map_err(|e| KnowledgeStoreError::Malformed(format!("scenes: {e}")))?;

        let mut store = Self::new();
        for (key, mut record) in character_doc.characters {
            if record.id.is_empty() {
                record.id = CharacterId::new(key);
            }
            store.add_character(record);
        }
        for (key, mut record) in scene_doc.scenes {
            if record.id.is_empty() {
                record.id = SceneId::new(key);
            }
            store.add_scene(record);
        }
        Ok(store)
    }

    /// Add a character, returning the store (builder style).
    pub fn with_character(mut self, record: CharacterRecord) -> Self {
        self.add_character(record);
        self
    }

    /// Add a scene, returning the store (builder style).
    pub fn with_scene(mut self, record: SceneRecord) -> Self {
        self.add_scene(record);
        self
    }

    /// Insert or replace a character. Nameless records are ignored.
    pub fn add_character(&mut self, record: CharacterRecord) {
        if record.name.is_empty() {
            debug!(id = %record.id, "skipping character without a name");
            return;
        }
        self.characters.insert(record.id.clone(), record);
    }

    /// Insert or replace a scene. Nameless records are ignored.
    pub fn add_scene(&mut self, record: SceneRecord) {
        if record.name.is_empty() {
            debug!(id = %record.id, "skipping scene without a name");
            return;
        }
        self.scenes.insert(record.id.clone(), record);
    }

    /// Remove a character by id.
    pub fn remove_character(&mut self, id: &CharacterId) -> Option<CharacterRecord> {
        self.characters.remove(id)
    }

    /// Remove a scene by id.
    pub fn remove_scene(&mut self, id: &SceneId) -> Option<SceneRecord> {
        self.scenes.remove(id)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn get_all_characters(&self) -> Result<CharacterMap, KnowledgeStoreError> {
        Ok(self.characters.clone())
    }

    fn get_all_scenes(&self) -> Result<SceneMap, KnowledgeStoreError> {
        Ok(self.scenes.clone())
    }
}
