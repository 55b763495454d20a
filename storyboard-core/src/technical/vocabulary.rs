//! Trigger-phrase dictionaries for the technical classifier.

use super::details::{
    CameraAngle, CameraMovement, ColorTone, Composition, DepthOfField, Lighting, ShotType,
};
use crate::text::{find_phrase, Span};
use once_cell::sync::Lazy;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PhraseEntry<T> {
    value: T,
    phrases: Vec<String>,
}

/// Ordered table of trigger phrases for one attribute dimension.
///
/// Entry order is the conflict priority: when phrases of two different
/// values both occur in a text, the value listed first wins. Before that, an
/// occurrence lying inside a longer occurrence of the same table is
/// discarded, so "大特写" is never also read as "特写".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseTable<T> {
    entries: Vec<PhraseEntry<T>>,
}

impl<T> Default for PhraseTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Copy + PartialEq> PhraseTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value with its trigger phrases, at the lowest priority so far.
    ///
    /// Adding phrases for a value already in the table extends that entry and
    /// keeps its priority.
    pub fn entry(mut self, value: T, phrases: &[&str]) -> Self {
        let phrases = phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        match self.entries.iter_mut().find(|e| e.value == value) {
            Some(existing) => existing.phrases.extend(phrases),
            None => self.entries.push(PhraseEntry {
                value,
                phrases: phrases.collect(),
            }),
        }
        self
    }

    /// Values with their phrases, in priority order.
    pub fn entries(&self) -> impl Iterator<Item = (T, &[String])> {
        self.entries.iter().map(|e| (e.value, e.phrases.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the value this table assigns to `text`, if any phrase occurs.
    pub fn resolve(&self, text: &str) -> Option<T> {
        let mut hits: Vec<(usize, Span)> = Vec::new();
        for (rank, entry) in self.entries.iter().enumerate() {
            for phrase in &entry.phrases {
                hits.extend(find_phrase(text, phrase).into_iter().map(|span| (rank, span)));
            }
        }

        hits.iter()
            .filter(|(_, span)| {
                !hits
                    .iter()
                    .any(|(_, other)| other.len() > span.len() && other.covers(span))
            })
            .map(|(rank, _)| *rank)
            .min()
            .map(|rank| self.entries[rank].value)
    }
}

/// One phrase table per technical dimension.
///
/// The vocabulary holds generic cinematography terms only. Swap in another
/// vocabulary to support a different language or genre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnicalVocabulary {
    pub shot_type: PhraseTable<ShotType>,
    pub camera_angle: PhraseTable<CameraAngle>,
    pub camera_movement: PhraseTable<CameraMovement>,
    pub depth_of_field: PhraseTable<DepthOfField>,
    pub lighting: PhraseTable<Lighting>,
    pub composition: PhraseTable<Composition>,
    pub color_tone: PhraseTable<ColorTone>,
}

impl Default for TechnicalVocabulary {
    /// The built-in Chinese and English vocabulary.
    fn default() -> Self {
        (**BUILTIN).clone()
    }
}

static BUILTIN: Lazy<Arc<TechnicalVocabulary>> =
    Lazy::new(|| Arc::new(TechnicalVocabulary::chinese_english()));

impl TechnicalVocabulary {
    /// The shared built-in Chinese and English vocabulary.
    pub fn builtin() -> Arc<TechnicalVocabulary> {
        Arc::clone(&BUILTIN)
    }

    /// A vocabulary with no phrases; classifies nothing.
    pub fn empty() -> Self {
        Self {
            shot_type: PhraseTable::new(),
            camera_angle: PhraseTable::new(),
            camera_movement: PhraseTable::new(),
            depth_of_field: PhraseTable::new(),
            lighting: PhraseTable::new(),
            composition: PhraseTable::new(),
            color_tone: PhraseTable::new(),
        }
    }

    /// Each value's first phrase is its annotation label, so a rendered
    /// annotation re-classifies to the same value.
    fn chinese_english() -> Self {
        use CameraAngle as A;
        use CameraMovement as M;
        use ColorTone as C;
        use Composition as K;
        use DepthOfField as D;
        use Lighting as L;
        use ShotType as S;

        Self {
            // Tighter framing first.
            shot_type: PhraseTable::new()
                .entry(S::ExtremeCloseUp, &["大特写", "极特写", "extreme close-up", "extreme close up", "extreme closeup"])
                .entry(S::CloseUp, &["特写", "close-up", "close up", "closeup"])
                .entry(S::CloseShot, &["近景", "近镜头", "medium close-up", "medium close up"])
                .entry(S::MediumShot, &["中景", "半身", "medium shot", "mid shot"])
                .entry(S::FullShot, &["全景", "全身镜头", "full shot", "wide shot"])
                .entry(S::LongShot, &["远景", "远镜头", "long shot"])
                .entry(S::ExtremeLongShot, &["大远景", "大全景", "超远景", "extreme long shot", "extreme wide shot"]),

            camera_angle: PhraseTable::new()
                .entry(A::BirdsEye, &["鸟瞰", "俯瞰", "航拍", "bird's-eye", "birds-eye", "aerial"])
                .entry(A::HighAngle, &["俯视", "俯拍", "俯角", "high angle", "high-angle"])
                .entry(A::LowAngle, &["仰视", "仰拍", "仰角", "low angle", "low-angle"])
                .entry(A::EyeLevel, &["平视", "平拍", "eye level", "eye-level"])
                .entry(A::Profile, &["侧面", "侧脸", "profile shot", "in profile"])
                .entry(A::Dutch, &["倾斜构图", "倾斜镜头", "荷兰角", "dutch angle", "canted angle"])
                .entry(A::OverTheShoulder, &["过肩", "over-the-shoulder", "over the shoulder"]),

            camera_movement: PhraseTable::new()
                .entry(M::PushIn, &["推镜", "镜头推进", "推近", "push in", "push-in", "dolly in", "zoom in"])
                .entry(M::PullOut, &["拉镜", "镜头拉远", "拉远", "pull out", "pull back", "dolly out", "zoom out"])
                .entry(M::Pan, &["摇镜", "横摇", "摇摄", "pan", "panning"])
                .entry(M::Tilt, &["纵摇", "上下摇", "tilt up", "tilt down"])
                .entry(M::Tracking, &["跟拍", "跟镜", "跟随镜头", "tracking shot", "follow shot"])
                .entry(M::Orbit, &["环绕拍摄", "环绕镜头", "orbit shot", "arc shot"])
                .entry(M::Handheld, &["手持拍摄", "手持镜头", "handheld", "hand-held"])
                .entry(M::Static, &["固定镜头", "静止镜头", "定镜", "static shot", "locked-off"]),

            depth_of_field: PhraseTable::new()
                .entry(D::Shallow, &["浅景深", "背景虚化", "虚化背景", "shallow depth of field", "shallow focus", "bokeh"])
                .entry(D::Deep, &["深景深", "deep focus", "deep depth of field"])
                .entry(D::RackFocus, &["焦点转移", "转焦", "rack focus", "focus pull"]),

            lighting: PhraseTable::new()
                .entry(L::Backlight, &["逆光", "背光", "backlight", "backlit", "rim light"])
                .entry(L::SideLight, &["侧光", "侧逆光", "side light", "side-lit"])
                .entry(L::TopLight, &["顶光", "顶部光源", "top light", "overhead light"])
                .entry(L::LowKey, &["低调光", "低调照明", "low-key", "low key lighting"])
                .entry(L::HighKey, &["高调光", "高调照明", "high-key", "high key lighting"])
                .entry(L::HardLight, &["硬光", "强光", "hard light", "harsh light"])
                .entry(L::SoftLight, &["柔光", "柔和的光", "漫射光", "soft light", "diffused light"])
                .entry(L::WarmLight, &["暖光", "暖黄灯光", "烛光", "warm light", "candlelight"])
                .entry(L::CoolLight, &["冷光", "冷白光", "月光", "cool light", "moonlight"])
                .entry(L::Natural, &["自然光", "阳光", "日光", "natural light", "sunlight", "daylight"])
                .entry(L::Artificial, &["人工光源", "灯光", "霓虹", "artificial light", "neon"]),

            composition: PhraseTable::new()
                .entry(K::RuleOfThirds, &["三分法", "三分构图", "rule of thirds"])
                .entry(K::Symmetrical, &["对称构图", "对称", "symmetrical", "symmetry"])
                .entry(K::Diagonal, &["对角线构图", "对角线", "diagonal composition"])
                .entry(K::Centered, &["中心构图", "居中", "画面中央", "centered composition", "centred"])
                .entry(K::Framed, &["框架构图", "框中框", "frame within a frame"])
                .entry(K::LeadingLines, &["引导线", "透视线", "leading lines"]),

            color_tone: PhraseTable::new()
                .entry(C::Monochrome, &["黑白", "单色", "monochrome", "black and white", "black-and-white"])
                .entry(C::HighContrast, &["高对比", "强烈对比", "high contrast", "high-contrast"])
                .entry(C::LowContrast, &["低对比", "low contrast", "low-contrast"])
                .entry(C::Warm, &["暖色调", "暖色", "暖调", "warm tones", "warm tone", "warm colors"])
                .entry(C::Cool, &["冷色调", "冷色", "冷调", "cool tones", "cold tones", "cool colors"])
                .entry(C::Saturated, &["高饱和", "色彩浓郁", "鲜艳", "saturated", "vibrant"])
                .entry(C::Desaturated, &["低饱和", "去饱和", "褪色", "desaturated", "muted colors"]),
        }
    }
}
