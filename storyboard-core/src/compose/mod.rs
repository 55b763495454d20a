//! Consistency composition: turn detected entities into descriptor fragments
//! and merge them into a description without duplicating anything.

mod fragment;

pub use fragment::{ConsistencyFragment, ConsistencyInfo, SUMMARY_MARKER};
pub(crate) use fragment::has_summary;

use crate::detect::{EntityRef, SceneMatch};
use crate::knowledge::{CharacterId, KnowledgeSnapshot};
use crate::text::{find_free, Span};
use tracing::debug;

/// Words that commonly stand in for an unnamed lead character.
const DEFAULT_PLACEHOLDERS: &[&str] = &[
    "主人公",
    "主角",
    "男主",
    "女主",
    "protagonist",
    "heroine",
    "hero",
];

/// Which fragments [`ConsistencyComposer::merge`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentSelection {
    /// Every composed fragment.
    All,
    /// The first character fragment and the first scene fragment.
    FirstPerType,
}

/// Builds fragments from knowledge records and merges them into text.
#[derive(Debug, Clone)]
pub struct ConsistencyComposer {
    placeholders: Vec<String>,
}

impl Default for ConsistencyComposer {
    fn default() -> Self {
        Self {
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ConsistencyComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the placeholder vocabulary.
    pub fn with_placeholders(mut self, placeholders: Vec<String>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Compose fragments for the given characters and scenes.
    ///
    /// Ids without a record in `knowledge` and records with no descriptor
    /// text produce no fragment. Generic scene categories are listed in
    /// `matched_ids` only.
    pub fn compose(
        &self,
        characters: &[CharacterId],
        scenes: &[SceneMatch],
        knowledge: &KnowledgeSnapshot,
    ) -> ConsistencyInfo {
        let mut info = ConsistencyInfo::default();

        for id in characters {
            let Some(record) = knowledge.character(id) else {
                debug!(%id, "character not in knowledge store, no fragment");
                continue;
            };
            info.matched_ids.push(EntityRef::Character(id.clone()));
            if let Some(fragment) = ConsistencyFragment::for_character(record) {
                info.character_fragments.push(fragment);
            }
        }

        for scene in scenes {
            match scene {
                SceneMatch::Project(id) => {
                    let Some(record) = knowledge.scene(id) else {
                        debug!(%id, "scene not in knowledge store, no fragment");
                        continue;
                    };
                    info.matched_ids.push(EntityRef::Scene(id.clone()));
                    if let Some(fragment) = ConsistencyFragment::for_scene(record) {
                        info.scene_fragments.push(fragment);
                    }
                }
                SceneMatch::Generic(category) => {
                    info.matched_ids.push(EntityRef::Generic(*category));
                }
            }
        }

        info
    }

    /// Merge fragments into `description`. Characters go first, then scenes.
    ///
    /// Only insertions are made, so every character of the description
    /// survives in order. For each fragment:
    /// - if its body is already in the text, it is skipped;
    /// - else if the entity's name occurs, `（body）` follows that occurrence;
    /// - else if an alias or keyword occurs, `（name，body）` follows it;
    /// - else, for characters, the first free placeholder word gets
    ///   `（name，body）`;
    /// - else the whole fragment is appended.
    ///
    /// Text inserted by earlier fragments, in this call or an earlier
    /// enhancement of the same text, is never used as an anchor.
    pub fn merge(&self, description: &str, info: &ConsistencyInfo, selection: FragmentSelection) -> String {
        let take = match selection {
            FragmentSelection::All => usize::MAX,
            FragmentSelection::FirstPerType => 1,
        };
        let fragments = info
            .character_fragments
            .iter()
            .take(take)
            .chain(info.scene_fragments.iter().take(take));

        let earlier = inserted_spans(
            description,
            info.character_fragments.iter().chain(&info.scene_fragments),
        );
        let mut merger = Merger::new(description, earlier);
        for fragment in fragments {
            if merger.text.contains(&fragment.body) {
                debug!(name = %fragment.name, "fragment already present, skipping");
                continue;
            }

            if let Some(anchor) = merger.free(&fragment.name) {
                merger.insert_after(anchor, &format!("（{}）", fragment.body));
            } else if let Some(anchor) = fragment.anchors.iter().find_map(|a| merger.free(a)) {
                merger.insert_after(anchor, &fragment.attributed());
            } else if let Some(anchor) = self.placeholder_for(fragment, &merger) {
                merger.insert_after(anchor, &fragment.attributed());
            } else {
                merger.append(&fragment.to_string());
            }
        }
        merger.text
    }

    fn placeholder_for(&self, fragment: &ConsistencyFragment, merger: &Merger) -> Option<Span> {
        if !matches!(fragment.entity, EntityRef::Character(_)) {
            return None;
        }
        self.placeholders.iter().find_map(|p| merger.free(p))
    }
}

/// Spans of `text` that an earlier enhancement inserted: the `（body）` and
/// `（name，body）` groups of `fragments`, and every summary clause.
pub(crate) fn inserted_spans<'a>(
    text: &str,
    fragments: impl IntoIterator<Item = &'a ConsistencyFragment>,
) -> Vec<Span> {
    let mut spans = Vec::new();
    for fragment in fragments {
        for group in [format!("（{}）", fragment.body), fragment.attributed()] {
            spans.extend(
                text.match_indices(group.as_str())
                    .map(|(at, m)| Span::new(at, at + m.len())),
            );
        }
    }
    spans.extend(summary_spans(text));
    spans
}

/// Spans of `text` inserted for any record in `knowledge`.
pub(crate) fn knowledge_insertions(text: &str, knowledge: &KnowledgeSnapshot) -> Vec<Span> {
    let fragments: Vec<ConsistencyFragment> = knowledge
        .characters
        .values()
        .filter_map(ConsistencyFragment::for_character)
        .chain(knowledge.scenes.values().filter_map(ConsistencyFragment::for_scene))
        .collect();
    inserted_spans(text, &fragments)
}

/// From each summary marker to the closing bracket or end of line.
fn summary_spans(text: &str) -> Vec<Span> {
    text.match_indices(SUMMARY_MARKER)
        .map(|(at, _)| {
            let end = text[at..]
                .char_indices()
                .find(|(_, c)| matches!(c, '】' | '）' | ']' | '\n'))
                .map_or(text.len(), |(i, c)| at + i + c.len_utf8());
            Span::new(at, end)
        })
        .collect()
}

/// Text under construction plus the spans that must not serve as anchors.
struct Merger {
    text: String,
    protected: Vec<Span>,
}

impl Merger {
    fn new(description: &str, protected: Vec<Span>) -> Self {
        Self {
            text: description.to_string(),
            protected,
        }
    }

    fn free(&self, phrase: &str) -> Option<Span> {
        find_free(&self.text, phrase, &self.protected)
    }

    fn insert_after(&mut self, anchor: Span, insertion: &str) {
        let at = anchor.end;
        self.text.insert_str(at, insertion);
        self.shift_from(at, insertion.len());
        self.protected.push(Span::new(anchor.start, at + insertion.len()));
    }

    fn append(&mut self, fragment: &str) {
        let start = self.text.len();
        let needs_separator = !self.text.trim_end().is_empty()
            && !self
                .text
                .trim_end()
                .ends_with(['。', '！', '？', '!', '?', '，', ',', '；', ';']);
        if needs_separator {
            self.text.push('，');
        }
        self.text.push_str(fragment);
        self.protected.push(Span::new(start, self.text.len()));
    }

    fn shift_from(&mut self, at: usize, by: usize) {
        for span in self.protected.iter_mut().filter(|s| s.start >= at) {
            span.start += by;
            span.end += by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{CharacterRecord, SceneRecord};
    use std::collections::BTreeMap;

    fn knowledge() -> KnowledgeSnapshot {
        let characters = [
            CharacterRecord::new("ye", "叶文洁").with_appearance("中年女性，短发"),
            CharacterRecord::new("wang", "汪淼")
                .with_alias("汪教授")
                .with_appearance("戴眼镜"),
            CharacterRecord::new("blank", "路人"),
        ];
        let scenes = [SceneRecord::new("hq", "红岸基地")
            .with_keyword("发射塔")
            .with_environment("山顶巨型天线")];

        KnowledgeSnapshot::new(
            characters.into_iter().map(|c| (c.id.clone(), c)).collect::<BTreeMap<_, _>>(),
            scenes.into_iter().map(|s| (s.id.clone(), s)).collect::<BTreeMap<_, _>>(),
        )
    }

    fn ids(names: &[&str]) -> Vec<CharacterId> {
        names.iter().map(|n| CharacterId::new(*n)).collect()
    }

    #[test]
    fn test_compose_skips_unknown_and_empty() {
        let info = ConsistencyComposer::new().compose(&ids(&["ye", "ghost", "blank"]), &[], &knowledge());

        assert_eq!(info.character_fragments.len(), 1);
        assert_eq!(
            info.matched_ids,
            vec![
                EntityRef::Character("ye".into()),
                EntityRef::Character("blank".into())
            ]
        );
        assert_eq!(info.known_entity_count(), 2);
    }

    #[test]
    fn test_name_anchor_gets_body() {
        let composer = ConsistencyComposer::new();
        let knowledge = knowledge();
        let info = composer.compose(&ids(&["ye"]), &[], &knowledge);

        let merged = composer.merge("叶文洁在办公室里思考", &info, FragmentSelection::All);
        assert_eq!(merged, "叶文洁（中年女性，短发）在办公室里思考");
    }

    #[test]
    fn test_only_first_occurrence_is_augmented() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(&ids(&["ye"]), &[], &knowledge());

        let merged = composer.merge("叶文洁望向窗外，叶文洁沉默", &info, FragmentSelection::All);
        assert_eq!(merged, "叶文洁（中年女性，短发）望向窗外，叶文洁沉默");
    }

    #[test]
    fn test_alias_anchor_keeps_alias() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(&ids(&["wang"]), &[], &knowledge());

        let merged = composer.merge("汪教授盯着屏幕", &info, FragmentSelection::All);
        assert_eq!(merged, "汪教授（汪淼，戴眼镜）盯着屏幕");
    }

    #[test]
    fn test_placeholder_substitution() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(&ids(&["ye"]), &[], &knowledge());

        let merged = composer.merge("特写主角坚定的眼神", &info, FragmentSelection::All);
        assert_eq!(merged, "特写主角（叶文洁，中年女性，短发）坚定的眼神");
    }

    #[test]
    fn test_unanchored_fragment_is_appended() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(&ids(&["ye"]), &[], &knowledge());

        assert_eq!(
            composer.merge("夜色笼罩山谷", &info, FragmentSelection::All),
            "夜色笼罩山谷，叶文洁（中年女性，短发）"
        );
        assert_eq!(
            composer.merge("夜色笼罩山谷。", &info, FragmentSelection::All),
            "夜色笼罩山谷。叶文洁（中年女性，短发）"
        );
    }

    #[test]
    fn test_scene_keyword_anchor() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(&[], &[SceneMatch::Project("hq".into())], &knowledge());

        let merged = composer.merge("发射塔下寒风呼啸", &info, FragmentSelection::All);
        assert_eq!(merged, "发射塔（红岸基地，山顶巨型天线）下寒风呼啸");
    }

    #[test]
    fn test_first_per_type_selection() {
        let composer = ConsistencyComposer::new();
        let info = composer.compose(
            &ids(&["ye", "wang"]),
            &[SceneMatch::Project("hq".into())],
            &knowledge(),
        );

        let text = "叶文洁和汪淼走进红岸基地";
        let first = composer.merge(text, &info, FragmentSelection::FirstPerType);
        assert_eq!(first, "叶文洁（中年女性，短发）和汪淼走进红岸基地（山顶巨型天线）");

        let all = composer.merge(text, &info, FragmentSelection::All);
        assert_eq!(all, "叶文洁（中年女性，短发）和汪淼（戴眼镜）走进红岸基地（山顶巨型天线）");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let composer = ConsistencyComposer::new();
        let knowledge = knowledge();
        let info = composer.compose(&ids(&["ye", "wang"]), &[], &knowledge);

        let once = composer.merge("叶文洁看着主角", &info, FragmentSelection::All);
        let twice = composer.merge(&once, &info, FragmentSelection::All);
        assert_eq!(once, twice);
        assert_eq!(once.matches("中年女性，短发").count(), 1);
    }

    #[test]
    fn test_inserted_text_is_not_an_anchor() {
        let composer = ConsistencyComposer::new();
        let knowledge = KnowledgeSnapshot::new(
            [
                CharacterRecord::new("a", "甲").with_description("乙的师父"),
                CharacterRecord::new("b", "乙").with_appearance("少年"),
            ]
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect(),
            BTreeMap::new(),
        );
        let info = composer.compose(&ids(&["a", "b"]), &[], &knowledge);

        let merged = composer.merge("甲出门，乙跟上", &info, FragmentSelection::All);
        assert_eq!(merged, "甲（乙的师父）出门，乙（少年）跟上");
    }

    #[test]
    fn test_earlier_fragment_is_not_an_anchor() {
        let composer = ConsistencyComposer::new();
        let knowledge = KnowledgeSnapshot::new(
            [
                CharacterRecord::new("a", "甲").with_description("乙的师父"),
                CharacterRecord::new("b", "乙").with_appearance("少年"),
            ]
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect(),
            BTreeMap::new(),
        );
        let info = composer.compose(&ids(&["a", "b"]), &[], &knowledge);

        let merged = composer.merge("甲（乙的师父）出门", &info, FragmentSelection::All);
        assert_eq!(merged, "甲（乙的师父）出门，乙（少年）");
    }

    #[test]
    fn test_knowledge_insertions() {
        let text = "汪教授（汪淼，戴眼镜）走进发射塔（红岸基地，山顶巨型天线）【一致性要求：角色：汪淼】后";
        let spans = knowledge_insertions(text, &knowledge());
        let blanked = crate::text::blank_out(text, &spans);

        assert_eq!(blanked.split_whitespace().collect::<Vec<_>>(), vec!["汪教授", "走进发射塔", "【", "后"]);
    }

    #[test]
    fn test_empty_info_leaves_text_alone() {
        let merged = ConsistencyComposer::new().merge("一片寂静", &ConsistencyInfo::default(), FragmentSelection::All);
        assert_eq!(merged, "一片寂静");
    }
}
