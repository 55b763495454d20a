//! Technical attribute values and the per-shot details record.

use serde::{Deserialize, Serialize};

/// The attribute dimensions the classifier fills in, in annotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    ShotType,
    CameraAngle,
    CameraMovement,
    DepthOfField,
    Lighting,
    Composition,
    ColorTone,
}

impl Dimension {
    /// Label used in the rendered annotation.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::ShotType => "镜头类型",
            Dimension::CameraAngle => "机位角度",
            Dimension::CameraMovement => "镜头运动",
            Dimension::DepthOfField => "景深",
            Dimension::Lighting => "光线",
            Dimension::Composition => "构图",
            Dimension::ColorTone => "色调",
        }
    }
}

/// Label that introduces the visual style inside an annotation.
pub(crate) const STYLE_LABEL: &str = "风格";

/// Define an attribute enum with its dimension and annotation labels.
macro_rules! define_attribute {
    ($(#[$meta:meta])* $name:ident => $dimension:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The dimension this attribute belongs to.
            pub const DIMENSION: Dimension = Dimension::$dimension;

            /// Label used in the rendered annotation.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }
    };
}

define_attribute!(
    /// Framing size, from tightest to widest.
    ShotType => ShotType {
        ExtremeCloseUp => "大特写",
        CloseUp => "特写",
        CloseShot => "近景",
        MediumShot => "中景",
        FullShot => "全景",
        LongShot => "远景",
        ExtremeLongShot => "大远景",
    }
);

define_attribute!(
    /// Camera position relative to the subject.
    CameraAngle => CameraAngle {
        BirdsEye => "鸟瞰",
        HighAngle => "俯视",
        LowAngle => "仰视",
        EyeLevel => "平视",
        Profile => "侧面",
        Dutch => "倾斜构图",
        OverTheShoulder => "过肩",
    }
);

define_attribute!(
    /// How the camera moves during the shot.
    CameraMovement => CameraMovement {
        PushIn => "推镜",
        PullOut => "拉镜",
        Pan => "摇镜",
        Tilt => "纵摇",
        Tracking => "跟拍",
        Orbit => "环绕拍摄",
        Handheld => "手持拍摄",
        Static => "固定镜头",
    }
);

define_attribute!(
    DepthOfField => DepthOfField {
        Shallow => "浅景深",
        Deep => "深景深",
        RackFocus => "焦点转移",
    }
);

define_attribute!(
    /// Light direction, quality or source.
    Lighting => Lighting {
        Backlight => "逆光",
        SideLight => "侧光",
        TopLight => "顶光",
        LowKey => "低调光",
        HighKey => "高调光",
        HardLight => "硬光",
        SoftLight => "柔光",
        WarmLight => "暖光",
        CoolLight => "冷光",
        Natural => "自然光",
        Artificial => "人工光源",
    }
);

define_attribute!(
    Composition => Composition {
        RuleOfThirds => "三分法",
        Symmetrical => "对称构图",
        Diagonal => "对角线构图",
        Centered => "中心构图",
        Framed => "框架构图",
        LeadingLines => "引导线",
    }
);

define_attribute!(
    ColorTone => ColorTone {
        Monochrome => "黑白",
        HighContrast => "高对比",
        LowContrast => "低对比",
        Warm => "暖色调",
        Cool => "冷色调",
        Saturated => "高饱和",
        Desaturated => "低饱和",
    }
);

/// Technical attributes inferred for one description.
///
/// Every field is optional; a dimension with no trigger phrase in the text
/// stays `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot_type: Option<ShotType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_angle: Option<CameraAngle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_movement: Option<CameraMovement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_of_field: Option<DepthOfField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighting_condition: Option<Lighting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_tone: Option<ColorTone>,
}

impl TechnicalDetails {
    /// Set attributes as (dimension, label) pairs in annotation order.
    pub fn entries(&self) -> Vec<(Dimension, &'static str)> {
        [
            self.shot_type.map(|v| (ShotType::DIMENSION, v.label())),
            self.camera_angle.map(|v| (CameraAngle::DIMENSION, v.label())),
            self.camera_movement.map(|v| (CameraMovement::DIMENSION, v.label())),
            self.depth_of_field.map(|v| (DepthOfField::DIMENSION, v.label())),
            self.lighting_condition.map(|v| (Lighting::DIMENSION, v.label())),
            self.composition.map(|v| (Composition::DIMENSION, v.label())),
            self.color_tone.map(|v| (ColorTone::DIMENSION, v.label())),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Number of dimensions that were set.
    pub fn attribute_count(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_count() == 0
    }

    /// Render the attributes (and an optional visual style) as an annotation,
    /// e.g. `【镜头类型：特写；光线：逆光】`.
    pub fn annotation(&self, style: Option<&str>) -> Option<String> {
        let mut parts: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(dimension, label)| format!("{}：{}", dimension.label(), label))
            .collect();
        if let Some(style) = style.map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(format!("{STYLE_LABEL}：{style}"));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("【{}】", parts.join("；")))
        }
    }
}

/// Check if `text` already carries an annotation rendered by
/// [`TechnicalDetails::annotation`].
pub(crate) fn has_annotation(text: &str) -> bool {
    const DIMENSIONS: [Dimension; 7] = [
        Dimension::ShotType,
        Dimension::CameraAngle,
        Dimension::CameraMovement,
        Dimension::DepthOfField,
        Dimension::Lighting,
        Dimension::Composition,
        Dimension::ColorTone,
    ];

    DIMENSIONS
        .iter()
        .map(Dimension::label)
        .chain(std::iter::once(STYLE_LABEL))
        .any(|label| text.contains(&format!("【{label}：")))
}
