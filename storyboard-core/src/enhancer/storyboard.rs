//! Multi-shot storyboard scripts.
//!
//! A script is markdown-ish text with one block per shot:
//!
//! ```text
//! ### 镜头1
//! - **镜头类型**：特写
//! - **镜头角色**：叶文洁
//! - **画面描述**：叶文洁在办公室里思考
//! ```
//!
//! Only the value of the picture-description field is rewritten; every other
//! byte of the script is copied through unchanged. Any other markdown heading
//! ends the current shot block.

use super::config::EnhancementConfig;
use super::pipeline::{EnhancementResult, SceneEnhancer};
use super::quality::QualityTally;
use crate::error::ScriptBlockError;
use crate::knowledge::KnowledgeSnapshot;
use crate::text::Span;
use serde::Serialize;
use std::ops::Range;
use tracing::{info, warn};

const DESCRIPTION_LABELS: &[&str] = &["画面描述", "picture description", "scene description"];
const CHARACTER_LABELS: &[&str] = &["镜头角色", "出场角色", "characters"];

/// Outcome of enhancing a whole storyboard script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryboardEnhancement {
    pub enhanced_script: String,
    /// One result per enhanced shot, in script order.
    pub per_shot: Vec<EnhancementResult>,
    /// Diagnostic score over all enhanced shots.
    pub quality_score: f32,
    /// Shot blocks left untouched, with the reason.
    pub skipped: Vec<ScriptBlockError>,
}

impl StoryboardEnhancement {
    fn unchanged(script: &str) -> Self {
        Self {
            enhanced_script: script.to_string(),
            per_shot: Vec::new(),
            quality_score: 0.0,
            skipped: Vec::new(),
        }
    }
}

/// Characters accepted as a shot number after `镜头` or `Shot`.
const CJK_NUMERALS: &str = "零〇一二三四五六七八九十百两";

/// A heading line.
#[derive(Debug, PartialEq, Eq)]
enum Heading {
    /// Opens a numbered shot block.
    Shot(String),
    /// Names a shot but carries no shot number.
    Unnumbered(String),
    /// Any other heading; ends the current block.
    Other,
}

/// A parsed shot block.
#[derive(Debug)]
struct ShotBlock {
    label: String,
    numbered: bool,
    /// Byte range of the description value in the script.
    description: Option<Range<usize>>,
    characters: Vec<String>,
}

impl SceneEnhancer {
    /// Enhance every shot of a storyboard script.
    ///
    /// `style` is recorded in each shot's technical annotation; pass `""` for
    /// none. Shots are processed in script order against one knowledge
    /// snapshot. A block without a usable description is logged, listed in
    /// [`StoryboardEnhancement::skipped`] and left as it was.
    pub fn enhance_storyboard(&self, script: &str, style: &str) -> StoryboardEnhancement {
        let config = self.config();
        self.contained(
            || StoryboardEnhancement::unchanged(script),
            || {
                let knowledge = self.knowledge(&config);
                Ok(self.enhance_blocks(&config, script, style, &knowledge))
            },
        )
    }

    fn enhance_blocks(
        &self,
        config: &EnhancementConfig,
        script: &str,
        style: &str,
        knowledge: &KnowledgeSnapshot,
    ) -> StoryboardEnhancement {
        let style = Some(style.trim()).filter(|s| !s.is_empty());
        let mut enhanced_script = String::with_capacity(script.len());
        let mut per_shot = Vec::new();
        let mut skipped = Vec::new();
        let mut tally = QualityTally::default();
        let mut copied = 0;

        for block in parse_blocks(script) {
            let range = match validate(&block, script) {
                Ok(range) => range,
                Err(err) => {
                    warn!(shot = %block.label, error = %err, "skipping shot block");
                    skipped.push(err);
                    continue;
                }
            };

            let hints: Vec<&str> = block.characters.iter().map(String::as_str).collect();
            let description = &script[range.clone()];
            let result = self.contained(
                || EnhancementResult::unchanged(description),
                || self.run(config, description, &hints, style, knowledge),
            );

            enhanced_script.push_str(&script[copied..range.start]);
            enhanced_script.push_str(&result.enhanced);
            copied = range.end;

            tally.record(&result.technical, &result.consistency);
            per_shot.push(result);
        }
        enhanced_script.push_str(&script[copied..]);

        info!(
            shots = per_shot.len(),
            skipped = skipped.len(),
            "storyboard enhanced"
        );

        StoryboardEnhancement {
            enhanced_script,
            per_shot,
            quality_score: tally.score(),
            skipped,
        }
    }
}

fn validate(block: &ShotBlock, script: &str) -> Result<Range<usize>, ScriptBlockError> {
    if !block.numbered {
        return Err(ScriptBlockError::UnnumberedShot {
            shot: block.label.clone(),
        });
    }
    match &block.description {
        None => Err(ScriptBlockError::MissingDescription {
            shot: block.label.clone(),
        }),
        Some(range) if script[range.clone()].trim().is_empty() => {
            Err(ScriptBlockError::EmptyDescription {
                shot: block.label.clone(),
            })
        }
        Some(range) => Ok(range.clone()),
    }
}

/// Split a script into shot blocks. Text before the first shot heading or
/// after a heading that is not a shot belongs to no block.
fn parse_blocks(script: &str) -> Vec<ShotBlock> {
    let mut blocks: Vec<ShotBlock> = Vec::new();
    let mut open = false;
    let mut offset = 0;

    for raw_line in script.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();
        let line = raw_line.trim_end_matches(['\n', '\r']);

        match heading(line) {
            Some(Heading::Shot(label)) => {
                blocks.push(ShotBlock::new(label, true));
                open = true;
                continue;
            }
            Some(Heading::Unnumbered(label)) => {
                blocks.push(ShotBlock::new(label, false));
                open = true;
                continue;
            }
            Some(Heading::Other) => {
                open = false;
                continue;
            }
            None => {}
        }

        let Some(block) = blocks.last_mut().filter(|_| open) else {
            continue;
        };
        if block.description.is_none() {
            if let Some(value) = field_value(line, DESCRIPTION_LABELS) {
                block.description = Some(line_start + value.start..line_start + value.end);
                continue;
            }
        }
        if block.characters.is_empty() {
            if let Some(value) = field_value(line, CHARACTER_LABELS) {
                block.characters = split_names(&line[value.start..value.end]);
            }
        }
    }
    blocks
}

impl ShotBlock {
    fn new(label: String, numbered: bool) -> Self {
        Self {
            label,
            numbered,
            description: None,
            characters: Vec::new(),
        }
    }
}

/// Classify a heading line.
///
/// `#` headings (`### 镜头1`, `##镜头二`, `镜头3###`, `### Shot 4`) always
/// produce a [`Heading`]. A line wrapped in `**` (`**镜头5**`) only counts
/// when it names a numbered shot, since bold field lines look the same.
fn heading(line: &str) -> Option<Heading> {
    let trimmed = line.trim();
    let hashed = trimmed.starts_with('#') || trimmed.ends_with('#');
    let bold = trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**");
    if !hashed && !bold {
        return None;
    }

    let label = trimmed.trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    let rest = if let Some(rest) = label.strip_prefix("镜头") {
        rest
    } else if label.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("shot")) {
        &label[4..]
    } else {
        return hashed.then_some(Heading::Other);
    };

    let numbered = rest
        .trim_start()
        .starts_with(|c: char| c.is_ascii_digit() || CJK_NUMERALS.contains(c));
    match (numbered, hashed) {
        (true, _) => Some(Heading::Shot(label.to_string())),
        (false, true) => Some(Heading::Unnumbered(label.to_string())),
        (false, false) => None,
    }
}

/// Locate the value of a `label：value` field within `line`.
///
/// Accepts an optional list bullet, bold markup around the label or around
/// label and colon, and either a full-width or half-width colon. The value
/// excludes surrounding whitespace.
fn field_value(line: &str, labels: &[&str]) -> Option<Span> {
    let mut cursor = Cursor::new(line);
    cursor.skip_whitespace();
    cursor.skip_bullet();
    let opened = cursor.eat("**");

    if !labels.iter().any(|label| cursor.eat_ignore_ascii_case(label)) {
        return None;
    }

    let mut closed = cursor.eat("**");
    cursor.skip_whitespace();
    if !(cursor.eat("：") || cursor.eat(":")) {
        return None;
    }
    closed |= cursor.eat("**");

    let rest = cursor.rest();
    let mut value = rest.trim();
    if opened && !closed {
        value = value.strip_suffix("**").map_or(value, str::trim_end);
    }
    let start = cursor.pos + (rest.len() - rest.trim_start().len());
    Some(Span::new(start, start + value.len()))
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split(['、', '，', ',', '/'])
        .map(|name| name.trim().trim_matches('*').trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Byte cursor over one line.
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_ignore_ascii_case(&mut self, token: &str) -> bool {
        let matched = self
            .rest()
            .get(..token.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(token));
        if matched {
            self.pos += token.len();
        }
        matched
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Skip `-`, `*`, `•` or `+` when followed by whitespace.
    fn skip_bullet(&mut self) {
        let rest = self.rest();
        let Some(bullet) = rest.chars().next().filter(|c| matches!(c, '-' | '*' | '•' | '+')) else {
            return;
        };
        let after = &rest[bullet.len_utf8()..];
        if after.starts_with(char::is_whitespace) {
            self.pos += bullet.len_utf8();
            self.skip_whitespace();
        }
    }
}
