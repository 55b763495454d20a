//! Entity detection: which known characters and scenes a description mentions.
//!
//! Names are indexed longest-first. Each occurrence claims its span of the
//! text, and a shorter name is only accepted outside claimed spans, so
//! "叶文" never matches inside "叶文洁" when both are known.

mod taxonomy;

pub use taxonomy::{GenericScene, SceneTaxonomy};

use crate::knowledge::{CharacterId, KnowledgeSnapshot, SceneId};
use crate::text::{find_phrase, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Reference to an entity detected in a description.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Character(CharacterId),
    Scene(SceneId),
    /// A generic location category; never backed by the knowledge store.
    Generic(GenericScene),
}

impl EntityRef {
    /// Check if the entity has a record in the knowledge store.
    pub fn is_known(&self) -> bool {
        !matches!(self, EntityRef::Generic(_))
    }
}

/// A scene detected in a description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SceneMatch {
    /// A scene defined by the project.
    Project(SceneId),
    /// A generic category from the taxonomy.
    Generic(GenericScene),
}

impl SceneMatch {
    pub fn project_id(&self) -> Option<&SceneId> {
        match self {
            SceneMatch::Project(id) => Some(id),
            SceneMatch::Generic(_) => None,
        }
    }
}

impl From<SceneMatch> for EntityRef {
    fn from(scene: SceneMatch) -> Self {
        match scene {
            SceneMatch::Project(id) => EntityRef::Scene(id),
            SceneMatch::Generic(category) => EntityRef::Generic(category),
        }
    }
}

/// Finds known characters and scenes in free text.
#[derive(Debug, Clone)]
pub struct EntityDetector {
    taxonomy: Arc<SceneTaxonomy>,
}

impl Default for EntityDetector {
    fn default() -> Self {
        Self::new(SceneTaxonomy::builtin())
    }
}

impl EntityDetector {
    pub fn new(taxonomy: Arc<SceneTaxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &SceneTaxonomy {
        &self.taxonomy
    }

    /// Characters whose name or alias occurs in `description`.
    ///
    /// Ordered by first occurrence, then by id.
    pub fn detect_characters(
        &self,
        description: &str,
        knowledge: &KnowledgeSnapshot,
    ) -> Vec<CharacterId> {
        let candidates = knowledge
            .characters
            .values()
            .flat_map(|record| record.match_names().map(move |name| (name, &record.id)));

        longest_first(description, candidates)
    }

    /// Project scenes whose name or keyword occurs in `description`, followed
    /// by the generic categories whose keywords occur.
    ///
    /// Each group is ordered by first occurrence, then by id.
    pub fn detect_scenes(&self, description: &str, knowledge: &KnowledgeSnapshot) -> Vec<SceneMatch> {
        let candidates = knowledge
            .scenes
            .values()
            .flat_map(|record| record.match_names().map(move |name| (name, &record.id)));

        let mut scenes: Vec<SceneMatch> = longest_first(description, candidates)
            .into_iter()
            .map(SceneMatch::Project)
            .collect();

        let mut generic = self.taxonomy.find(description);
        generic.sort_by_key(|(category, start)| (*start, *category));
        scenes.extend(generic.into_iter().map(|(category, _)| SceneMatch::Generic(category)));
        scenes
    }

    /// Resolve caller-supplied character hints to known characters.
    ///
    /// A hint must equal a character's name or one of its aliases (ASCII case
    /// is ignored). Unknown hints are dropped.
    pub fn resolve_hints(&self, hints: &[&str], knowledge: &KnowledgeSnapshot) -> Vec<CharacterId> {
        let mut resolved: Vec<CharacterId> = Vec::new();
        for hint in hints.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
            let found = knowledge
                .characters
                .values()
                .find(|record| record.match_names().any(|name| name.eq_ignore_ascii_case(hint)));

            match found {
                Some(record) if !resolved.contains(&record.id) => resolved.push(record.id.clone()),
                Some(_) => {}
                None => debug!(hint, "ignoring character hint with no matching record"),
            }
        }
        resolved
    }
}

/// Match `(phrase, id)` candidates longest-first, claiming spans as they are
/// accepted, and return ids by first accepted position.
fn longest_first<'a, Id>(text: &str, candidates: impl Iterator<Item = (&'a str, &'a Id)>) -> Vec<Id>
where
    Id: Ord + Clone + 'a,
{
    let mut candidates: Vec<(&str, &Id)> = candidates
        .map(|(phrase, id)| (phrase.trim(), id))
        .filter(|(phrase, _)| !phrase.is_empty())
        .collect();
    candidates.sort_by(|a, b| {
        b.0.chars()
            .count()
            .cmp(&a.0.chars().count())
            .then_with(|| a.1.cmp(b.1))
            .then_with(|| a.0.cmp(b.0))
    });

    let mut claimed: Vec<Span> = Vec::new();
    let mut first_seen: BTreeMap<&Id, usize> = BTreeMap::new();
    for (phrase, id) in candidates {
        for span in find_phrase(text, phrase) {
            if claimed.iter().any(|c| c.overlaps(&span)) {
                continue;
            }
            claimed.push(span);
            let position = first_seen.entry(id).or_insert(span.start);
            *position = (*position).min(span.start);
        }
    }

    let mut found: Vec<(usize, &Id)> = first_seen.into_iter().map(|(id, pos)| (pos, id)).collect();
    found.sort();
    found.into_iter().map(|(_, id)| id.clone()).collect()
}
