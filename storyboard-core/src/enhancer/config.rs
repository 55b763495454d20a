//! Enhancement configuration and live updates.

use super::fusion::FusionStrategy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much the enhancer adds to a description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EnhancementLevel {
    /// Technical attributes only. Consistency injection is suppressed.
    Low,
    /// Technical attributes plus the first fragment per entity type.
    #[default]
    Medium,
    /// Technical attributes, every fragment, and a summary clause.
    High,
}

impl EnhancementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementLevel::Low => "low",
            EnhancementLevel::Medium => "medium",
            EnhancementLevel::High => "high",
        }
    }
}

impl fmt::Display for EnhancementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(EnhancementLevel::Low),
            "medium" => Ok(EnhancementLevel::Medium),
            "high" => Ok(EnhancementLevel::High),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for EnhancementLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Configuration for a [`SceneEnhancer`](super::SceneEnhancer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Append inferred technical attributes.
    pub enable_technical_details: bool,

    /// Merge character and scene descriptors from the knowledge store.
    pub enable_consistency_injection: bool,

    pub enhancement_level: EnhancementLevel,

    /// How technical attributes and the summary clause are rendered.
    pub fusion_strategy: FusionStrategy,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enable_technical_details: true,
            enable_consistency_injection: true,
            enhancement_level: EnhancementLevel::Medium,
            fusion_strategy: FusionStrategy::Annotated,
        }
    }
}

impl EnhancementConfig {
    /// Load a configuration document. Missing keys keep their defaults,
    /// unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let update: ConfigUpdate = serde_json::from_str(json)?;
        let mut config = Self::default();
        config.apply(update)?;
        Ok(config)
    }

    /// Set the enhancement level.
    pub fn with_level(mut self, level: EnhancementLevel) -> Self {
        self.enhancement_level = level;
        self
    }

    /// Set the fusion strategy.
    pub fn with_fusion_strategy(mut self, strategy: FusionStrategy) -> Self {
        self.fusion_strategy = strategy;
        self
    }

    /// Enable or disable technical attribute annotation.
    pub fn with_technical_details(mut self, enabled: bool) -> Self {
        self.enable_technical_details = enabled;
        self
    }

    /// Enable or disable consistency injection.
    pub fn with_consistency_injection(mut self, enabled: bool) -> Self {
        self.enable_consistency_injection = enabled;
        self
    }

    /// Check if consistency fragments are merged under this configuration.
    pub fn injects_consistency(&self) -> bool {
        self.enable_consistency_injection && self.enhancement_level != EnhancementLevel::Low
    }

    /// Apply a partial update. Nothing changes if the update is invalid.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let level = update
            .enhancement_level
            .as_deref()
            .map(str::parse::<EnhancementLevel>)
            .transpose()?;
        let strategy = update
            .fusion_strategy
            .as_deref()
            .map(str::parse::<FusionStrategy>)
            .transpose()?;

        if let Some(enabled) = update.enable_technical_details {
            self.enable_technical_details = enabled;
        }
        if let Some(enabled) = update.enable_consistency_injection {
            self.enable_consistency_injection = enabled;
        }
        if let Some(level) = level {
            self.enhancement_level = level;
        }
        if let Some(strategy) = strategy {
            self.fusion_strategy = strategy;
        }
        Ok(())
    }
}

/// A partial configuration change for
/// [`SceneEnhancer::update_config`](super::SceneEnhancer::update_config).
///
/// The level and strategy are kept as text so an invalid value is reported
/// as a [`ConfigError`] when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_technical_details: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_consistency_injection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_strategy: Option<String>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn technical_details(mut self, enabled: bool) -> Self {
        self.enable_technical_details = Some(enabled);
        self
    }

    pub fn consistency_injection(mut self, enabled: bool) -> Self {
        self.enable_consistency_injection = Some(enabled);
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.enhancement_level = Some(level.into());
        self
    }

    pub fn fusion_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.fusion_strategy = Some(strategy.into());
        self
    }

    /// Parse an update from JSON, e.g. `{"enhancement_level": "high"}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
