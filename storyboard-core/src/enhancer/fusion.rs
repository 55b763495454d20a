//! How technical attributes and the summary clause are written into the text.
//!
//! Character and scene fragments are always merged inline by the composer.
//! A [`FusionStrategy`] only decides how the technical attributes, the style
//! and the `high`-level summary are rendered around them:
//!
//! | Strategy     | Technical                  | Summary                       |
//! |--------------|----------------------------|-------------------------------|
//! | `annotated`  | `【镜头类型：特写；风格：x】` | `【一致性要求：角色：A】`        |
//! | `natural`    | `，特写镜头，仰视`           | `（一致性要求：角色：A）`        |
//! | `structured` | `\n技术规格：特写，仰视`      | `\n一致性要求：角色：A`          |
//! | `minimal`    | ` [特写]`                   | ` [一致性要求：角色：A]`         |
//!
//! `intelligent` picks one of the last three from the description's length
//! and the amount of material to add.

use crate::compose::{has_summary, ConsistencyInfo, SUMMARY_MARKER};
use crate::error::ConfigError;
use crate::technical::{has_annotation, Dimension, TechnicalDetails};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker of a structured technical section.
const TECHNICAL_MARKER: &str = "技术规格：";

/// Descriptions shorter than this, in characters, count as short.
const SHORT_DESCRIPTION: usize = 20;

/// Descriptions longer than this, in characters, count as long.
const LONG_DESCRIPTION: usize = 100;

/// A short description with more additions than this is structured.
const STRUCTURED_ADDITIONS: usize = 3;

/// Natural fusion mentions at most this many attributes.
const NATURAL_ATTRIBUTES: usize = 2;

/// Rendering of technical attributes and the summary clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FusionStrategy {
    /// Bracketed labelled annotation and summary.
    #[default]
    Annotated,
    /// At most two attributes woven in as a trailing clause.
    Natural,
    /// Separate `技术规格` and `一致性要求` lines.
    Structured,
    /// The first attribute only, in square brackets.
    Minimal,
    /// Structured for short descriptions with much to add, minimal for long
    /// descriptions, natural otherwise.
    Intelligent,
}

impl FusionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionStrategy::Annotated => "annotated",
            FusionStrategy::Natural => "natural",
            FusionStrategy::Structured => "structured",
            FusionStrategy::Minimal => "minimal",
            FusionStrategy::Intelligent => "intelligent",
        }
    }

    /// The concrete strategy for one description. Only `Intelligent`
    /// depends on the inputs.
    ///
    /// A rendering already present in `text` decides first, so enhancing an
    /// enhanced description keeps its strategy. Otherwise the length of
    /// `text` without whitespace and the number of additions decide.
    pub fn resolve(
        self,
        text: &str,
        technical: &TechnicalDetails,
        consistency: &ConsistencyInfo,
        style: Option<&str>,
    ) -> FusionStrategy {
        if self != FusionStrategy::Intelligent {
            return self;
        }

        let present = |rendering: Option<String>| rendering.is_some_and(|r| text.contains(&r));
        if text.contains(TECHNICAL_MARKER) {
            return FusionStrategy::Structured;
        }
        if present(minimal_bracket(technical, style)) {
            return FusionStrategy::Minimal;
        }
        if present(natural_clause(technical, style)) {
            return FusionStrategy::Natural;
        }

        let length = text.chars().filter(|c| !c.is_whitespace()).count();
        let additions = technical.attribute_count() + consistency.fragment_count();
        if length < SHORT_DESCRIPTION && additions > STRUCTURED_ADDITIONS {
            FusionStrategy::Structured
        } else if length > LONG_DESCRIPTION {
            FusionStrategy::Minimal
        } else {
            FusionStrategy::Natural
        }
    }

    /// Write the technical attributes and `style` into `text`.
    ///
    /// Nothing is written when there is nothing to say or when `text`
    /// already carries the rendering. `Intelligent` is expected to be
    /// resolved first and otherwise renders as `Annotated`.
    pub(crate) fn fuse_technical(&self, text: &mut String, technical: &TechnicalDetails, style: Option<&str>) {
        if has_annotation(text) || text.contains(TECHNICAL_MARKER) {
            return;
        }

        match self {
            FusionStrategy::Annotated | FusionStrategy::Intelligent => {
                if let Some(annotation) = technical.annotation(style) {
                    text.push_str(&annotation);
                }
            }
            FusionStrategy::Natural => {
                if let Some(clause) = natural_clause(technical, style) {
                    if !text.contains(&clause) {
                        insert_clause(text, &clause);
                    }
                }
            }
            FusionStrategy::Structured => {
                if let Some(section) = structured_section(technical, style) {
                    text.push('\n');
                    text.push_str(&section);
                }
            }
            FusionStrategy::Minimal => {
                if let Some(bracket) = minimal_bracket(technical, style) {
                    if !text.contains(&bracket) {
                        text.push(' ');
                        text.push_str(&bracket);
                    }
                }
            }
        }
    }

    /// Append the summary clause unless `text` already has one.
    pub(crate) fn fuse_summary(&self, text: &mut String, consistency: &ConsistencyInfo) {
        if has_summary(text) {
            return;
        }
        let Some(body) = consistency.summary_body() else {
            return;
        };
        let clause = match self {
            FusionStrategy::Annotated | FusionStrategy::Intelligent => format!("【{SUMMARY_MARKER}{body}】"),
            FusionStrategy::Natural => format!("（{SUMMARY_MARKER}{body}）"),
            FusionStrategy::Structured => format!("\n{SUMMARY_MARKER}{body}"),
            FusionStrategy::Minimal => format!(" [{SUMMARY_MARKER}{body}]"),
        };
        text.push_str(&clause);
    }
}

fn non_empty_style(style: Option<&str>) -> Option<&str> {
    style.map(str::trim).filter(|s| !s.is_empty())
}

/// `特写镜头，仰视，水墨风格`: at most two attributes plus the style.
fn natural_clause(technical: &TechnicalDetails, style: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = technical
        .entries()
        .into_iter()
        .take(NATURAL_ATTRIBUTES)
        .map(|(dimension, label)| match dimension {
            Dimension::ShotType => format!("{label}镜头"),
            _ => label.to_string(),
        })
        .collect();
    parts.extend(non_empty_style(style).map(|s| format!("{s}风格")));
    (!parts.is_empty()).then(|| parts.join("，"))
}

/// `技术规格：特写，仰视，风格：水墨`.
fn structured_section(technical: &TechnicalDetails, style: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = technical
        .entries()
        .into_iter()
        .map(|(_, label)| label.to_string())
        .collect();
    parts.extend(non_empty_style(style).map(|s| format!("风格：{s}")));
    (!parts.is_empty()).then(|| format!("{TECHNICAL_MARKER}{}", parts.join("，")))
}

/// `[特写,水墨]`: the first attribute plus the style.
fn minimal_bracket(technical: &TechnicalDetails, style: Option<&str>) -> Option<String> {
    let mut parts: Vec<&str> = technical
        .entries()
        .into_iter()
        .take(1)
        .map(|(_, label)| label)
        .collect();
    parts.extend(non_empty_style(style));
    (!parts.is_empty()).then(|| format!("[{}]", parts.join(",")))
}

/// Put `clause` after the last sentence of `text`, before its closing
/// punctuation if it has one.
fn insert_clause(text: &mut String, clause: &str) {
    let body_end = text.trim_end().len();
    let at = match text[..body_end].chars().next_back() {
        Some(c) if matches!(c, '。' | '！' | '？' | '.' | '!' | '?') => body_end - c.len_utf8(),
        _ => body_end,
    };

    let head = &text[..at];
    let insertion = if head.trim_end().is_empty() || head.ends_with(['，', ',', '；', ';']) {
        clause.to_string()
    } else {
        format!("，{clause}")
    };
    text.insert_str(at, &insertion);
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FusionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annotated" => Ok(FusionStrategy::Annotated),
            "natural" => Ok(FusionStrategy::Natural),
            "structured" => Ok(FusionStrategy::Structured),
            "minimal" => Ok(FusionStrategy::Minimal),
            "intelligent" => Ok(FusionStrategy::Intelligent),
            _ => Err(ConfigError::InvalidStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for FusionStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technical::{CameraAngle, Lighting, ShotType};

    fn details() -> TechnicalDetails {
        TechnicalDetails {
            shot_type: Some(ShotType::CloseUp),
            camera_angle: Some(CameraAngle::LowAngle),
            lighting_condition: Some(Lighting::Backlight),
            ..TechnicalDetails::default()
        }
    }

    fn fused(strategy: FusionStrategy, text: &str, style: Option<&str>) -> String {
        let mut text = text.to_string();
        strategy.fuse_technical(&mut text, &details(), style);
        text
    }

    #[test]
    fn test_annotated() {
        assert_eq!(
            fused(FusionStrategy::Annotated, "雨夜", Some("水墨")),
            "雨夜【镜头类型：特写；机位角度：仰视；光线：逆光；风格：水墨】"
        );
    }

    #[test]
    fn test_natural_goes_before_closing_punctuation() {
        assert_eq!(fused(FusionStrategy::Natural, "雨夜。", None), "雨夜，特写镜头，仰视。");
        assert_eq!(fused(FusionStrategy::Natural, "雨夜", None), "雨夜，特写镜头，仰视");
        assert_eq!(fused(FusionStrategy::Natural, "雨夜，", Some("水墨")), "雨夜，特写镜头，仰视，水墨风格");
    }

    #[test]
    fn test_structured_and_minimal() {
        assert_eq!(
            fused(FusionStrategy::Structured, "雨夜", Some("水墨")),
            "雨夜\n技术规格：特写，仰视，逆光，风格：水墨"
        );
        assert_eq!(fused(FusionStrategy::Minimal, "雨夜", None), "雨夜 [特写]");
        assert_eq!(fused(FusionStrategy::Minimal, "雨夜", Some("水墨")), "雨夜 [特写,水墨]");
    }

    #[test]
    fn test_fuse_technical_is_idempotent() {
        for strategy in [
            FusionStrategy::Annotated,
            FusionStrategy::Natural,
            FusionStrategy::Structured,
            FusionStrategy::Minimal,
        ] {
            let once = fused(strategy, "雨夜。", Some("水墨"));
            assert_eq!(fused(strategy, &once, Some("水墨")), once, "{strategy}");
        }
    }

    #[test]
    fn test_empty_details_write_nothing() {
        let mut text = "雨夜".to_string();
        FusionStrategy::Natural.fuse_technical(&mut text, &TechnicalDetails::default(), None);
        FusionStrategy::Minimal.fuse_technical(&mut text, &TechnicalDetails::default(), None);
        FusionStrategy::Structured.fuse_technical(&mut text, &TechnicalDetails::default(), None);
        assert_eq!(text, "雨夜");
    }

    #[test]
    fn test_intelligent_resolution() {
        let none = ConsistencyInfo::default();
        let many = TechnicalDetails {
            color_tone: Some(crate::technical::ColorTone::Warm),
            ..details()
        };

        let resolve = |text: &str, technical: &TechnicalDetails| {
            FusionStrategy::Intelligent.resolve(text, technical, &none, None)
        };

        assert_eq!(resolve("雨夜", &many), FusionStrategy::Structured);
        assert_eq!(resolve("雨夜", &details()), FusionStrategy::Natural);
        assert_eq!(resolve("雨 夜  ", &details()), FusionStrategy::Natural);
        assert_eq!(resolve(&"雨".repeat(101), &many), FusionStrategy::Minimal);
        assert_eq!(
            FusionStrategy::Minimal.resolve("雨夜", &many, &none, None),
            FusionStrategy::Minimal
        );
    }

    #[test]
    fn test_intelligent_keeps_an_existing_rendering() {
        let none = ConsistencyInfo::default();
        let mut text = "雨".repeat(95);
        let first = FusionStrategy::Intelligent.resolve(&text, &details(), &none, None);
        assert_eq!(first, FusionStrategy::Natural);

        first.fuse_technical(&mut text, &details(), None);
        assert!(text.chars().count() > LONG_DESCRIPTION);
        let again = FusionStrategy::Intelligent.resolve(&text, &details(), &none, None);
        assert_eq!(again, FusionStrategy::Natural);
    }

    #[test]
    fn test_summary_wrappers() {
        let mut info = ConsistencyInfo::default();
        info.character_fragments.push(
            crate::compose::ConsistencyFragment::for_character(
                &crate::knowledge::CharacterRecord::new("w", "汪淼").with_appearance("戴眼镜"),
            )
            .unwrap(),
        );

        let summary = |strategy: FusionStrategy| {
            let mut text = "雨夜".to_string();
            strategy.fuse_summary(&mut text, &info);
            strategy.fuse_summary(&mut text, &info);
            text
        };
        assert_eq!(summary(FusionStrategy::Annotated), "雨夜【一致性要求：角色：汪淼】");
        assert_eq!(summary(FusionStrategy::Natural), "雨夜（一致性要求：角色：汪淼）");
        assert_eq!(summary(FusionStrategy::Structured), "雨夜\n一致性要求：角色：汪淼");
        assert_eq!(summary(FusionStrategy::Minimal), "雨夜 [一致性要求：角色：汪淼]");
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Natural".parse::<FusionStrategy>().unwrap(), FusionStrategy::Natural);
        assert!(matches!(
            "llm".parse::<FusionStrategy>(),
            Err(ConfigError::InvalidStrategy(s)) if s == "llm"
        ));
    }
}
