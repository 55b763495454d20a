//! Character and scene records held by the project knowledge store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Macro to define a newtype ID wrapper around a store-assigned string.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier assigned by the knowledge store.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Check if no identifier was assigned.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a character in the knowledge store.
    CharacterId
);

define_id!(
    /// Identifier of a project scene in the knowledge store.
    SceneId
);

/// Where a record's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Written or corrected by a person.
    Manual,
    /// Extracted from the source text by an upstream stage.
    Extracted,
    /// Imported from another project or tool.
    Imported,
    /// No provenance recorded.
    #[default]
    Unknown,
}

impl Provenance {
    /// Resolve provenance from the legacy boolean flags.
    fn from_flags(manual_edited: bool, extracted_from_text: bool) -> Self {
        if manual_edited {
            Provenance::Manual
        } else if extracted_from_text {
            Provenance::Extracted
        } else {
            Provenance::Unknown
        }
    }
}

/// A character known to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCharacter")]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    /// Nicknames and alternative names that also identify the character.
    pub aliases: Vec<String>,
    pub description: String,
    pub appearance: String,
    pub clothing: String,
    pub consistency_prompt: String,
    pub provenance: Provenance,
}

impl CharacterRecord {
    /// Create a character with only an id and a name.
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            appearance: String::new(),
            clothing: String::new(),
            consistency_prompt: String::new(),
            provenance: Provenance::Unknown,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_appearance(mut self, appearance: impl Into<String>) -> Self {
        self.appearance = appearance.into();
        self
    }

    pub fn with_clothing(mut self, clothing: impl Into<String>) -> Self {
        self.clothing = clothing.into();
        self
    }

    pub fn with_consistency_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.consistency_prompt = prompt.into();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// The name followed by every alias.
    pub fn match_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Descriptor fields in fragment order.
    pub fn descriptor_fields(&self) -> [&str; 4] {
        [
            &self.appearance,
            &self.clothing,
            &self.description,
            &self.consistency_prompt,
        ]
    }
}

/// A location defined by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScene")]
pub struct SceneRecord {
    pub id: SceneId,
    pub name: String,
    /// Free-form category such as "indoor", "outdoor" or "special".
    pub category: String,
    /// Extra words that identify the scene in a description.
    pub keywords: Vec<String>,
    pub description: String,
    pub environment: String,
    pub lighting: String,
    pub atmosphere: String,
    pub consistency_prompt: String,
    pub provenance: Provenance,
}

impl SceneRecord {
    /// Create a scene with only an id and a name.
    pub fn new(id: impl Into<SceneId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            keywords: Vec::new(),
            description: String::new(),
            environment: String::new(),
            lighting: String::new(),
            atmosphere: String::new(),
            consistency_prompt: String::new(),
            provenance: Provenance::Unknown,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_lighting(mut self, lighting: impl Into<String>) -> Self {
        self.lighting = lighting.into();
        self
    }

    pub fn with_atmosphere(mut self, atmosphere: impl Into<String>) -> Self {
        self.atmosphere = atmosphere.into();
        self
    }

    pub fn with_consistency_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.consistency_prompt = prompt.into();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// The name followed by every keyword.
    pub fn match_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.keywords.iter().map(String::as_str))
    }

    /// Descriptor fields in fragment order.
    pub fn descriptor_fields(&self) -> [&str; 5] {
        [
            &self.environment,
            &self.lighting,
            &self.atmosphere,
            &self.description,
            &self.consistency_prompt,
        ]
    }
}

// =========================================================================
// Deserialization from knowledge-base documents
// =========================================================================

/// On-disk character shape, tolerant of structured fields and legacy flags.
#[derive(Deserialize)]
struct RawCharacter {
    #[serde(default)]
    id: CharacterId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default, deserialize_with = "descriptor")]
    description: String,
    #[serde(default, deserialize_with = "descriptor")]
    appearance: String,
    #[serde(default, deserialize_with = "descriptor")]
    clothing: String,
    #[serde(default, deserialize_with = "descriptor")]
    consistency_prompt: String,
    #[serde(default)]
    provenance: Option<Provenance>,
    #[serde(default)]
    manual_edited: bool,
    #[serde(default)]
    extracted_from_text: bool,
}

impl From<RawCharacter> for CharacterRecord {
    fn from(raw: RawCharacter) -> Self {
        Self {
            id: raw.id,
            name: raw.name.trim().to_string(),
            aliases: clean_list(raw.aliases),
            description: raw.description,
            appearance: raw.appearance,
            clothing: raw.clothing,
            consistency_prompt: raw.consistency_prompt,
            provenance: raw
                .provenance
                .unwrap_or_else(|| Provenance::from_flags(raw.manual_edited, raw.extracted_from_text)),
        }
    }
}

/// On-disk scene shape, tolerant of structured fields and legacy flags.
#[derive(Deserialize)]
struct RawScene {
    #[serde(default)]
    id: SceneId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default, deserialize_with = "descriptor")]
    description: String,
    #[serde(default, deserialize_with = "descriptor")]
    environment: String,
    #[serde(default, deserialize_with = "descriptor")]
    lighting: String,
    #[serde(default, deserialize_with = "descriptor")]
    atmosphere: String,
    #[serde(default, deserialize_with = "descriptor")]
    consistency_prompt: String,
    #[serde(default)]
    provenance: Option<Provenance>,
    #[serde(default)]
    manual_edited: bool,
    #[serde(default)]
    extracted_from_text: bool,
}

impl From<RawScene> for SceneRecord {
    fn from(raw: RawScene) -> Self {
        Self {
            id: raw.id,
            name: raw.name.trim().to_string(),
            category: raw.category,
            keywords: clean_list(raw.keywords),
            description: raw.description,
            environment: raw.environment,
            lighting: raw.lighting,
            atmosphere: raw.atmosphere,
            consistency_prompt: raw.consistency_prompt,
            provenance: raw
                .provenance
                .unwrap_or_else(|| Provenance::from_flags(raw.manual_edited, raw.extracted_from_text)),
        }
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Accept a descriptor as plain text or as a structured object.
fn descriptor<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_descriptor(&value))
}

/// Flatten a structured descriptor into one line of text.
///
/// Object fields are joined with "，" in document order, list items with "、".
/// Empty leaves are dropped.
fn flatten_descriptor(value: &Value) -> String {
    fn join(parts: impl Iterator<Item = String>, separator: &str) -> String {
        parts
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }

    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Array(items) => join(items.iter().map(flatten_descriptor), "、"),
        Value::Object(fields) => join(fields.values().map(flatten_descriptor), "，"),
        other => other.to_string(),
    }
}
