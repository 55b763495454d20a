//! QA tests for single-description enhancement.
//!
//! These tests verify:
//! - Technical attribute annotation from text alone
//! - Consistency injection for known characters and scenes
//! - Enhancement level semantics and live config updates
//! - Idempotence, determinism and failure containment
//!
//! Run with: `RUST_LOG=debug cargo test -p storyboard-core --test qa_enhancement -- --nocapture`

use std::sync::Arc;
use storyboard_core::detect::{EntityDetector, EntityRef, GenericScene};
use storyboard_core::knowledge::{CharacterMap, KnowledgeSnapshot, SceneMap};
use storyboard_core::technical::ShotType;
use storyboard_core::testing::sample_store;
use storyboard_core::{
    CharacterId, CharacterRecord, ConfigError, ConfigUpdate, EnhanceError, EnhancementConfig,
    EnhancementLevel, FusionStrategy, KnowledgeStore, KnowledgeStoreError, MemoryKnowledgeStore,
    SceneEnhancer, SceneRecord,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sample_enhancer() -> SceneEnhancer {
    init_tracing();
    SceneEnhancer::new(Arc::new(sample_store()))
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn test_close_up_without_known_entities() {
    let enhancer = SceneEnhancer::new(Arc::new(MemoryKnowledgeStore::new()));
    let result = enhancer.enhance_with_details("特写主角坚定的眼神", &[]);

    assert_eq!(result.technical.shot_type, Some(ShotType::CloseUp));
    assert!(result.consistency.is_empty());
    assert_eq!(result.enhanced, "特写主角坚定的眼神【镜头类型：特写】");
}

#[test]
fn test_known_character_in_generic_office() {
    let enhancer = sample_enhancer();
    let result = enhancer.enhance_with_details("叶文洁在办公室里思考", &[]);

    assert!(result.enhanced.starts_with("叶文洁（中年女性，短发"));
    assert!(result.enhanced.contains("在办公室里思考"));
    assert!(result
        .consistency
        .matched_ids
        .contains(&EntityRef::Generic(GenericScene::Office)));
    assert!(result
        .consistency
        .matched_ids
        .contains(&EntityRef::Character(CharacterId::new("ye_wenjie"))));
}

#[test]
fn test_empty_store_only_adds_technical_annotation() {
    let enhancer = SceneEnhancer::new(Arc::new(MemoryKnowledgeStore::new()))
        .with_config(EnhancementConfig::default().with_level(EnhancementLevel::High));

    for description in ["叶文洁在办公室里思考", "俯拍街道，逆光", "主角走进森林"] {
        let enhanced = enhancer.enhance_description(description, &["叶文洁"]);
        let added = enhanced
            .strip_prefix(description)
            .expect("original text must come first");
        assert!(added.is_empty() || (added.starts_with('【') && added.ends_with('】')));
    }
}

// =============================================================================
// PROPERTIES
// =============================================================================

#[test]
fn test_plain_description_is_returned_unchanged() {
    let enhancer = sample_enhancer();
    for description in ["他们沉默了很久", "The company grew quickly", "一片寂静。"] {
        assert_eq!(enhancer.enhance_description(description, &[]), description);
    }
}

#[test]
fn test_reapplying_never_duplicates_fragments() {
    for level in [EnhancementLevel::Low, EnhancementLevel::Medium, EnhancementLevel::High] {
        let enhancer = sample_enhancer().with_config(EnhancementConfig::default().with_level(level));
        let description = "仰拍大史和汪教授站在红岸基地门口，主角望向他们";

        let once = enhancer.enhance_description(description, &["叶文洁"]);
        let twice = enhancer.enhance_description(&once, &["叶文洁"]);

        assert_eq!(once, twice, "level {level}");
        for body in ["魁梧，寸头", "戴眼镜的中年男性", "山顶巨型抛物面天线", "中年女性，短发"] {
            assert!(twice.matches(body).count() <= 1, "level {level}: {body} duplicated");
        }
        assert!(twice.matches("【机位角度").count() <= 1);
    }
}

#[test]
fn test_reapplying_ignores_names_inside_fragments() {
    let store = MemoryKnowledgeStore::new()
        .with_character(CharacterRecord::new("ye", "叶文洁").with_description("杨卫宁的妻子"))
        .with_character(CharacterRecord::new("yang", "杨卫宁").with_appearance("戴眼镜的工程师"));
    let enhancer = SceneEnhancer::new(Arc::new(store))
        .with_config(EnhancementConfig::default().with_level(EnhancementLevel::High));

    let once = enhancer.enhance_description("叶文洁独自坐着", &[]);
    assert_eq!(once, "叶文洁（杨卫宁的妻子）独自坐着【一致性要求：角色：叶文洁】");

    let twice = enhancer.enhance_with_details(&once, &[]);
    assert_eq!(twice.enhanced, once);
    assert!(!twice
        .consistency
        .matched_ids
        .contains(&EntityRef::Character(CharacterId::new("yang"))));
}

#[test]
fn test_reapplying_ignores_attributes_inside_fragments() {
    let store = MemoryKnowledgeStore::new()
        .with_character(CharacterRecord::new("wang", "汪淼").with_appearance("戴眼镜"))
        .with_scene(SceneRecord::new("red_coast", "红岸基地").with_lighting("冷白灯光"));
    let enhancer = SceneEnhancer::new(Arc::new(store));

    let once = enhancer.enhance_with_details("汪淼走进红岸基地", &[]);
    assert_eq!(once.enhanced, "汪淼（戴眼镜）走进红岸基地（冷白灯光）");
    assert!(once.technical.is_empty());

    let twice = enhancer.enhance_with_details(&once.enhanced, &[]);
    assert_eq!(twice.enhanced, once.enhanced);
    assert!(twice.technical.is_empty());
}

#[test]
fn test_output_is_deterministic() {
    let description = "大史和汪淼在发射塔下交谈，侧光，浅景深";
    let first = sample_enhancer().enhance_with_details(description, &["叶文洁"]);
    for _ in 0..5 {
        let again = sample_enhancer().enhance_with_details(description, &["叶文洁"]);
        assert_eq!(again, first);
    }
}

#[test]
fn test_every_known_name_is_detected() {
    let store = sample_store();
    let knowledge = KnowledgeSnapshot::new(
        store.get_all_characters().unwrap(),
        store.get_all_scenes().unwrap(),
    );
    let detector = EntityDetector::default();

    for (id, record) in knowledge.characters.iter() {
        let text = format!("远处，{}缓缓转身", record.name);
        assert!(detector.detect_characters(&text, &knowledge).contains(id));
    }
}

#[test]
fn test_original_text_is_always_retained() {
    let enhancer = sample_enhancer()
        .with_config(EnhancementConfig::default().with_level(EnhancementLevel::High));
    let description = "史强抽着烟，主角在一旁沉默，镜头缓缓拉远";
    let enhanced = enhancer.enhance_description(description, &["汪淼", "叶文洁"]);

    let mut remaining = enhanced.chars();
    assert!(description.chars().all(|c| remaining.any(|e| e == c)));
}

// =============================================================================
// LEVELS AND CONFIG
// =============================================================================

#[test]
fn test_level_semantics() {
    let description = "叶文洁和汪淼走进红岸基地，特写";
    let enhancer = sample_enhancer();

    enhancer
        .update_config(ConfigUpdate::new().level("low"))
        .unwrap();
    let low = enhancer.enhance_description(description, &[]);
    assert_eq!(low, "叶文洁和汪淼走进红岸基地，特写【镜头类型：特写】");

    enhancer
        .update_config(ConfigUpdate::new().level("medium"))
        .unwrap();
    let medium = enhancer.enhance_description(description, &[]);
    assert!(medium.contains("中年女性，短发"));
    assert!(!medium.contains("戴眼镜的中年男性"));
    assert!(medium.contains("山顶巨型抛物面天线"));
    assert!(!medium.contains("一致性要求"));

    enhancer
        .update_config(ConfigUpdate::new().level("high"))
        .unwrap();
    let high = enhancer.enhance_description(description, &[]);
    assert!(high.contains("中年女性，短发"));
    assert!(high.contains("戴眼镜的中年男性"));
    assert!(high.ends_with("【一致性要求：角色：叶文洁、汪淼；场景：红岸基地】"));
}

#[test]
fn test_disabling_injection_keeps_technical() {
    let enhancer = sample_enhancer();
    enhancer
        .update_config(ConfigUpdate::new().consistency_injection(false))
        .unwrap();

    let enhanced = enhancer.enhance_description("叶文洁抬头，仰视", &[]);
    assert_eq!(enhanced, "叶文洁抬头，仰视【机位角度：仰视】");
}

#[test]
fn test_invalid_level_fails_fast() {
    let enhancer = sample_enhancer();
    let err = enhancer
        .update_config(ConfigUpdate::from_json(r#"{"enhancement_level": "ultra", "enable_technical_details": false}"#).unwrap())
        .unwrap_err();

    assert!(matches!(err, EnhanceError::Config(ConfigError::InvalidLevel(_))));
    assert_eq!(enhancer.config(), EnhancementConfig::default());
}

#[test]
fn test_fusion_strategies_render_technical_and_summary() {
    let description = "特写叶文洁在办公室里思考。";
    let expected = [
        (
            "annotated",
            "特写叶文洁（中年女性，短发，神情冷静克制）在办公室里思考。【镜头类型：特写】【一致性要求：角色：叶文洁】",
        ),
        (
            "natural",
            "特写叶文洁（中年女性，短发，神情冷静克制）在办公室里思考，特写镜头。（一致性要求：角色：叶文洁）",
        ),
        (
            "structured",
            "特写叶文洁（中年女性，短发，神情冷静克制）在办公室里思考。\n技术规格：特写\n一致性要求：角色：叶文洁",
        ),
        (
            "minimal",
            "特写叶文洁（中年女性，短发，神情冷静克制）在办公室里思考。 [特写] [一致性要求：角色：叶文洁]",
        ),
    ];

    let enhancer = sample_enhancer();
    for (strategy, enhanced) in expected {
        enhancer
            .update_config(ConfigUpdate::new().level("high").fusion_strategy(strategy))
            .unwrap();
        assert_eq!(enhancer.enhance_description(description, &[]), enhanced, "{strategy}");
    }
}

#[test]
fn test_every_fusion_strategy_is_idempotent() {
    let description = "仰拍大史和汪教授站在红岸基地门口，主角望向他们。";
    for strategy in [
        FusionStrategy::Annotated,
        FusionStrategy::Natural,
        FusionStrategy::Structured,
        FusionStrategy::Minimal,
        FusionStrategy::Intelligent,
    ] {
        let enhancer = sample_enhancer().with_config(
            EnhancementConfig::default()
                .with_level(EnhancementLevel::High)
                .with_fusion_strategy(strategy),
        );

        let once = enhancer.enhance_description(description, &["叶文洁"]);
        let twice = enhancer.enhance_description(&once, &["叶文洁"]);
        assert_ne!(once, description, "{strategy}");
        assert_eq!(twice, once, "{strategy}");
    }
}

#[test]
fn test_invalid_strategy_fails_fast() {
    let enhancer = sample_enhancer();
    let err = enhancer
        .update_config(ConfigUpdate::new().fusion_strategy("llm"))
        .unwrap_err();

    assert!(matches!(err, EnhanceError::Config(ConfigError::InvalidStrategy(_))));
    assert_eq!(enhancer.config().fusion_strategy, FusionStrategy::Annotated);
}

// =============================================================================
// FAILURE CONTAINMENT
// =============================================================================

struct PanickingStore;

impl KnowledgeStore for PanickingStore {
    fn get_all_characters(&self) -> Result<CharacterMap, KnowledgeStoreError> {
        panic!("store exploded");
    }

    fn get_all_scenes(&self) -> Result<SceneMap, KnowledgeStoreError> {
        panic!("store exploded");
    }
}

#[test]
fn test_panic_in_pipeline_returns_original() {
    init_tracing();
    let enhancer = SceneEnhancer::new(Arc::new(PanickingStore));
    let description = "特写叶文洁在办公室里思考";

    let result = enhancer.enhance_with_details(description, &[]);
    assert_eq!(result.enhanced, description);
    assert!(!result.is_changed());

    let storyboard = enhancer.enhance_storyboard(storyboard_core::testing::sample_script(), "");
    assert_eq!(storyboard.enhanced_script, storyboard_core::testing::sample_script());
}

#[test]
fn test_unreachable_store_degrades_to_technical_only() {
    let store = Arc::new(storyboard_core::MockKnowledgeStore::sample());
    store.set_reachable(false);
    let enhancer = SceneEnhancer::new(store);

    let enhanced = enhancer.enhance_description("特写叶文洁在办公室里思考", &["叶文洁"]);
    assert_eq!(enhanced, "特写叶文洁在办公室里思考【镜头类型：特写】");
}
