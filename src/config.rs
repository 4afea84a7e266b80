//! Engine configuration
//!
//! A JSON document deserialized with serde. Every key is optional; missing
//! keys take the defaults below. `load` and `from_json_str` both validate
//! before returning.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::FieldModel;
use crate::observability::{Logger, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config: {0}")]
    Unreadable(String),

    /// The document is not valid JSON for this schema
    #[error("Invalid config JSON: {0}")]
    InvalidJson(String),

    /// A value is out of range
    #[error("Invalid config value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl ConfigError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        "SQ_CONFIG_INVALID"
    }

    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// What marker decoding does with a malformed range literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRangePolicy {
    /// The whole marker fails to decode
    #[default]
    Fail,
    /// The literal is dropped and the rest of the marker kept
    Drop,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// OR size above which a fielded list becomes an overflow marker
    #[serde(default = "default_max_or_expansion_threshold")]
    pub max_or_expansion_threshold: usize,

    /// OR size above which values are externalized
    #[serde(default = "default_max_or_expansion_fst_threshold")]
    pub max_or_expansion_fst_threshold: usize,

    /// Bounded ranges on one field above which they merge into one marker
    #[serde(default = "default_max_or_range_threshold")]
    pub max_or_range_threshold: usize,

    /// Delay threshold; zero or negative disables delay marking
    #[serde(default = "default_min_selectivity")]
    pub min_selectivity: f64,

    /// Indexed field names
    #[serde(default)]
    pub indexed_fields: BTreeSet<String>,

    /// Query model (field aliasing)
    #[serde(default)]
    pub model: FieldModel,

    /// Chained back-pressure bound
    #[serde(default = "default_max_results_to_buffer")]
    pub max_results_to_buffer: usize,

    /// Consecutive document-specific plans combined into one descriptor
    #[serde(default = "default_docs_to_combine")]
    pub docs_to_combine: usize,

    /// Cap on ranges seen by one scheduler
    #[serde(default)]
    pub max_ranges_per_query: Option<u64>,

    #[serde(default)]
    pub malformed_range_policy: MalformedRangePolicy,

    /// Priority of the primary scan setting
    #[serde(default = "default_query_iterator_priority")]
    pub query_iterator_priority: u32,

    /// Minimum logger severity ("trace", "info", "warn", "error", "fatal")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_or_expansion_threshold() -> usize {
    500
}
fn default_max_or_expansion_fst_threshold() -> usize {
    750
}
fn default_max_or_range_threshold() -> usize {
    10
}
fn default_min_selectivity() -> f64 {
    -1.0
}
fn default_max_results_to_buffer() -> usize {
    5
}
fn default_docs_to_combine() -> usize {
    1
}
fn default_query_iterator_priority() -> u32 {
    40
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_or_expansion_threshold: default_max_or_expansion_threshold(),
            max_or_expansion_fst_threshold: default_max_or_expansion_fst_threshold(),
            max_or_range_threshold: default_max_or_range_threshold(),
            min_selectivity: default_min_selectivity(),
            indexed_fields: BTreeSet::new(),
            model: FieldModel::default(),
            max_results_to_buffer: default_max_results_to_buffer(),
            docs_to_combine: default_docs_to_combine(),
            max_ranges_per_query: None,
            malformed_range_policy: MalformedRangePolicy::default(),
            query_iterator_priority: default_query_iterator_priority(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Unreadable(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let mut config: EngineConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

        config.indexed_fields = config
            .indexed_fields
            .iter()
            .map(|f| f.to_ascii_uppercase())
            .collect();
        config.model = config.model.normalized();

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_or_expansion_threshold == 0 {
            return Err(ConfigError::invalid(
                "max_or_expansion_threshold",
                "must be > 0",
            ));
        }

        if self.max_or_expansion_fst_threshold < self.max_or_expansion_threshold {
            return Err(ConfigError::invalid(
                "max_or_expansion_fst_threshold",
                format!(
                    "{} is below max_or_expansion_threshold {}",
                    self.max_or_expansion_fst_threshold, self.max_or_expansion_threshold
                ),
            ));
        }

        if self.max_or_range_threshold == 0 {
            return Err(ConfigError::invalid("max_or_range_threshold", "must be > 0"));
        }

        if !self.min_selectivity.is_finite() || self.min_selectivity > 1.0 {
            return Err(ConfigError::invalid(
                "min_selectivity",
                format!("{} is not a fraction", self.min_selectivity),
            ));
        }

        if self.max_results_to_buffer == 0 {
            return Err(ConfigError::invalid("max_results_to_buffer", "must be > 0"));
        }

        if self.docs_to_combine == 0 {
            return Err(ConfigError::invalid("docs_to_combine", "must be > 0"));
        }

        self.log_level
            .parse::<Severity>()
            .map_err(|reason| ConfigError::invalid("log_level", reason))?;

        Ok(())
    }

    /// Returns true if the field is indexed (case-insensitive)
    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexed_fields
            .iter()
            .any(|f| f.eq_ignore_ascii_case(field))
    }

    /// Returns true if delay marking is enabled
    pub fn delay_enabled(&self) -> bool {
        self.min_selectivity > 0.0
    }

    /// Console logger at the configured level
    pub fn logger(&self) -> Logger {
        Logger::console(self.log_level.parse().unwrap_or(Severity::Info))
    }
}
