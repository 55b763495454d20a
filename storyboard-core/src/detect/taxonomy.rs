//! Generic scene categories recognised without any project data.

use crate::text::find_phrase;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A common location type that needs no knowledge-store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericScene {
    Office,
    Street,
    Home,
    School,
    Laboratory,
    Hospital,
    Restaurant,
    Market,
    Park,
    Forest,
    Mountain,
    Waterside,
    Desert,
    Countryside,
}

impl GenericScene {
    /// Stable identifier, e.g. `generic:office`.
    pub fn id(&self) -> &'static str {
        match self {
            GenericScene::Office => "generic:office",
            GenericScene::Street => "generic:street",
            GenericScene::Home => "generic:home",
            GenericScene::School => "generic:school",
            GenericScene::Laboratory => "generic:laboratory",
            GenericScene::Hospital => "generic:hospital",
            GenericScene::Restaurant => "generic:restaurant",
            GenericScene::Market => "generic:market",
            GenericScene::Park => "generic:park",
            GenericScene::Forest => "generic:forest",
            GenericScene::Mountain => "generic:mountain",
            GenericScene::Waterside => "generic:waterside",
            GenericScene::Desert => "generic:desert",
            GenericScene::Countryside => "generic:countryside",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenericScene::Office => "办公室",
            GenericScene::Street => "街道",
            GenericScene::Home => "家中",
            GenericScene::School => "学校",
            GenericScene::Laboratory => "实验室",
            GenericScene::Hospital => "医院",
            GenericScene::Restaurant => "餐厅",
            GenericScene::Market => "市场",
            GenericScene::Park => "公园",
            GenericScene::Forest => "森林",
            GenericScene::Mountain => "山区",
            GenericScene::Waterside => "水边",
            GenericScene::Desert => "沙漠",
            GenericScene::Countryside => "乡村",
        }
    }
}

impl fmt::Display for GenericScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Fixed keyword sets for the generic scene categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneTaxonomy {
    categories: Vec<(GenericScene, Vec<String>)>,
}

impl Default for SceneTaxonomy {
    fn default() -> Self {
        (**BUILTIN).clone()
    }
}

static BUILTIN: Lazy<Arc<SceneTaxonomy>> = Lazy::new(|| Arc::new(SceneTaxonomy::chinese_english()));

impl SceneTaxonomy {
    /// The shared built-in Chinese and English taxonomy.
    pub fn builtin() -> Arc<SceneTaxonomy> {
        Arc::clone(&BUILTIN)
    }

    /// A taxonomy with no categories.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Add keywords for a category, creating it if needed.
    pub fn with_category(mut self, category: GenericScene, keywords: &[&str]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        match self.categories.iter_mut().find(|(c, _)| *c == category) {
            Some((_, existing)) => existing.extend(keywords),
            None => self.categories.push((category, keywords.collect())),
        }
        self
    }

    pub fn keywords(&self, category: GenericScene) -> &[String] {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    /// Categories whose keywords occur in `text`, with the byte offset of
    /// the earliest keyword occurrence.
    pub(crate) fn find(&self, text: &str) -> Vec<(GenericScene, usize)> {
        self.categories
            .iter()
            .filter_map(|(category, keywords)| {
                keywords
                    .iter()
                    .flat_map(|k| find_phrase(text, k))
                    .map(|span| span.start)
                    .min()
                    .map(|start| (*category, start))
            })
            .collect()
    }

    fn chinese_english() -> Self {
        use GenericScene::*;

        Self::empty()
            .with_category(Office, &["办公室", "写字楼", "办公楼", "会议室", "office", "boardroom"])
            .with_category(Street, &["街道", "街头", "街上", "马路", "小巷", "street", "alley"])
            .with_category(Home, &["家中", "家里", "客厅", "卧室", "厨房", "living room", "bedroom", "kitchen"])
            .with_category(School, &["学校", "教室", "校园", "操场", "school", "classroom", "campus"])
            .with_category(Laboratory, &["实验室", "研究所", "laboratory", "lab"])
            .with_category(Hospital, &["医院", "病房", "手术室", "hospital"])
            .with_category(Restaurant, &["餐厅", "饭店", "酒吧", "咖啡馆", "restaurant", "cafe", "tavern"])
            .with_category(Market, &["市场", "集市", "商场", "超市", "market", "mall", "supermarket"])
            .with_category(Park, &["公园", "花园", "park", "garden"])
            .with_category(Forest, &["森林", "树林", "丛林", "forest", "woods", "jungle"])
            .with_category(Mountain, &["山顶", "山谷", "山脉", "山区", "mountain", "valley"])
            .with_category(Waterside, &["海边", "河边", "湖边", "海滩", "beach", "river", "lake", "shore"])
            .with_category(Desert, &["沙漠", "戈壁", "desert"])
            .with_category(Countryside, &["乡村", "农村", "田野", "村庄", "village", "countryside", "farm"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_finds_office() {
        let found = SceneTaxonomy::builtin().find("叶文洁在办公室里思考");
        assert_eq!(found, vec![(GenericScene::Office, "叶文洁在".len())]);
    }

    #[test]
    fn test_english_keywords_respect_word_boundaries() {
        let taxonomy = SceneTaxonomy::builtin();
        assert!(taxonomy.find("she labels the jar").is_empty());
        assert_eq!(
            taxonomy.find("back in the lab").first().map(|(c, _)| *c),
            Some(GenericScene::Laboratory)
        );
    }

    #[test]
    fn test_builtin_categories_have_keywords() {
        let taxonomy = SceneTaxonomy::builtin();
        for (category, keywords) in &taxonomy.categories {
            assert!(!keywords.is_empty(), "{category} has no keywords");
        }
        assert!(taxonomy.keywords(GenericScene::Office).contains(&"办公室".to_string()));
    }

    #[test]
    fn test_with_category_extends() {
        let taxonomy = SceneTaxonomy::empty()
            .with_category(GenericScene::Park, &["公园"])
            .with_category(GenericScene::Park, &["绿地", " "]);
        assert_eq!(taxonomy.keywords(GenericScene::Park).len(), 2);
        assert!(taxonomy.keywords(GenericScene::Desert).is_empty());
    }

    #[test]
    fn test_id_and_display() {
        assert_eq!(GenericScene::Street.id(), "generic:street");
        assert_eq!(GenericScene::Street.to_string(), "generic:street");
    }
}
