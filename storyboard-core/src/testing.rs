//! Testing utilities for the enhancement engine.
//!
//! This module provides tools for integration testing:
//! - `MockKnowledgeStore` for a store that can change, go offline and count
//!   its queries
//! - Sample records and a sample storyboard script

use crate::error::KnowledgeStoreError;
use crate::knowledge::{
    CharacterId, CharacterMap, CharacterRecord, KnowledgeStore, MemoryKnowledgeStore, Provenance,
    SceneId, SceneMap, SceneRecord,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

/// A knowledge store for tests.
///
/// Records can be changed behind the back of any cache, the store can be
/// switched offline, and every `get_all_*` call is counted.
#[derive(Debug)]
pub struct MockKnowledgeStore {
    records: RwLock<MemoryKnowledgeStore>,
    reachable: AtomicBool,
    queries: AtomicUsize,
}

impl Default for MockKnowledgeStore {
    fn default() -> Self {
        Self::new(MemoryKnowledgeStore::new())
    }
}

impl MockKnowledgeStore {
    /// Create a reachable mock serving `records`.
    pub fn new(records: MemoryKnowledgeStore) -> Self {
        Self {
            records: RwLock::new(records),
            reachable: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }

    /// A mock serving [`sample_store`].
    pub fn sample() -> Self {
        Self::new(sample_store())
    }

    /// Insert or replace a character.
    pub fn upsert_character(&self, record: CharacterRecord) {
        self.write().add_character(record);
    }

    pub fn remove_character(&self, id: &CharacterId) {
        self.write().remove_character(id);
    }

    /// Insert or replace a scene.
    pub fn upsert_scene(&self, record: SceneRecord) {
        self.write().add_scene(record);
    }

    pub fn remove_scene(&self, id: &SceneId) {
        self.write().remove_scene(id);
    }

    /// Simulate the store going offline or coming back.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of `get_all_*` calls so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryKnowledgeStore> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn query(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryKnowledgeStore>, KnowledgeStoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(KnowledgeStoreError::Unreachable(
                "mock knowledge store is offline".to_string(),
            ));
        }
        Ok(self.records.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl KnowledgeStore for MockKnowledgeStore {
    fn get_all_characters(&self) -> Result<CharacterMap, KnowledgeStoreError> {
        self.query()?.get_all_characters()
    }

    fn get_all_scenes(&self) -> Result<SceneMap, KnowledgeStoreError> {
        self.query()?.get_all_scenes()
    }
}

/// Sample project knowledge: three characters and one scene.
pub fn sample_store() -> MemoryKnowledgeStore {
    MemoryKnowledgeStore::new()
        .with_character(
            CharacterRecord::new("ye_wenjie", "叶文洁")
                .with_appearance("中年女性，短发")
                .with_consistency_prompt("神情冷静克制")
                .with_provenance(Provenance::Manual),
        )
        .with_character(
            CharacterRecord::new("wang_miao", "汪淼")
                .with_alias("汪教授")
                .with_appearance("戴眼镜的中年男性")
                .with_clothing("深色夹克")
                .with_provenance(Provenance::Extracted),
        )
        .with_character(
            CharacterRecord::new("shi_qiang", "史强")
                .with_alias("大史")
                .with_appearance("魁梧，寸头")
                .with_clothing("旧皮夹克")
                .with_provenance(Provenance::Extracted),
        )
        .with_scene(
            SceneRecord::new("red_coast", "红岸基地")
                .with_category("outdoor")
                .with_keyword("发射塔")
                .with_environment("山顶巨型抛物面天线")
                .with_atmosphere("肃穆压抑")
                .with_provenance(Provenance::Manual),
        )
}

/// A three-shot storyboard script. Shot 2 uses half-width colons.
pub fn sample_script() -> &'static str {
    "# 分镜脚本\n\
     \n\
     ### 镜头1\n\
     - **镜头类型**：特写\n\
     - **镜头角色**：叶文洁\n\
     - **画面描述**：特写叶文洁在办公室里思考\n\
     - **台词**：无\n\
     \n\
     ### 镜头2\n\
     - **镜头角色**: 汪淼\n\
     - **画面描述**: 汪淼站在发射塔下，仰视夜空\n\
     \n\
     ### 镜头3\n\
     - **画面描述**：大史拍了拍主角的肩膀，暖色调\n"
}
