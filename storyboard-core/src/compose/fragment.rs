//! Consistency fragments and the per-call bundle of them.

use crate::detect::EntityRef;
use crate::knowledge::{CharacterRecord, SceneRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor of one known entity, rendered as `name（body）`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyFragment {
    pub entity: EntityRef,
    pub name: String,
    /// Non-empty descriptor fields joined with "，".
    pub body: String,
    /// Alternative words that may stand for the entity in text.
    #[serde(skip)]
    pub(crate) anchors: Vec<String>,
}

impl ConsistencyFragment {
    /// Build a character fragment, or `None` if every descriptor is empty.
    pub fn for_character(record: &CharacterRecord) -> Option<Self> {
        let body = join_fields(&record.descriptor_fields())?;
        Some(Self {
            entity: EntityRef::Character(record.id.clone()),
            name: record.name.clone(),
            body,
            anchors: record.aliases.clone(),
        })
    }

    /// Build a scene fragment, or `None` if every descriptor is empty.
    pub fn for_scene(record: &SceneRecord) -> Option<Self> {
        let body = join_fields(&record.descriptor_fields())?;
        Some(Self {
            entity: EntityRef::Scene(record.id.clone()),
            name: record.name.clone(),
            body,
            anchors: record.keywords.clone(),
        })
    }

    /// The form used when the fragment follows a word other than the name.
    pub(crate) fn attributed(&self) -> String {
        format!("（{}，{}）", self.name, self.body)
    }
}

impl fmt::Display for ConsistencyFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}（{}）", self.name, self.body)
    }
}

fn join_fields(fields: &[&str]) -> Option<String> {
    let parts: Vec<&str> = fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("，"))
    }
}

/// Everything the composer produced for one description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyInfo {
    pub character_fragments: Vec<ConsistencyFragment>,
    pub scene_fragments: Vec<ConsistencyFragment>,
    /// Every detected or hinted entity, characters first, including generic
    /// scene categories and entities whose records had nothing to add.
    pub matched_ids: Vec<EntityRef>,
}

impl ConsistencyInfo {
    /// Check if no fragment was composed.
    pub fn is_empty(&self) -> bool {
        self.character_fragments.is_empty() && self.scene_fragments.is_empty()
    }

    pub fn fragment_count(&self) -> usize {
        self.character_fragments.len() + self.scene_fragments.len()
    }

    /// Matched entities that have a knowledge-store record.
    pub fn known_entity_count(&self) -> usize {
        self.matched_ids.iter().filter(|id| id.is_known()).count()
    }

    /// A closing clause naming every entity that has a fragment, e.g.
    /// `【一致性要求：角色：叶文洁、汪淼；场景：红岸基地】`.
    pub fn summary(&self) -> Option<String> {
        self.summary_body().map(|body| format!("【{SUMMARY_MARKER}{body}】"))
    }

    /// The entity list of the summary clause without its wrapper, e.g.
    /// `角色：叶文洁、汪淼；场景：红岸基地`.
    pub fn summary_body(&self) -> Option<String> {
        let names = |fragments: &[ConsistencyFragment]| {
            fragments
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join("、")
        };

        let mut parts = Vec::new();
        if !self.character_fragments.is_empty() {
            parts.push(format!("角色：{}", names(self.character_fragments.as_slice())));
        }
        if !self.scene_fragments.is_empty() {
            parts.push(format!("场景：{}", names(self.scene_fragments.as_slice())));
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("；"))
        }
    }
}

/// Opens every summary clause, whatever wraps it.
pub const SUMMARY_MARKER: &str = "一致性要求：";

/// Check if `text` already carries a summary clause in any rendering.
pub(crate) fn has_summary(text: &str) -> bool {
    text.contains(SUMMARY_MARKER)
}
