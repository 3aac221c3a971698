/// Configuration for the extraction, formatting and translation engine
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub const MIN_FALLBACK_WINDOW: usize = 20;
pub const MAX_FALLBACK_WINDOW: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerOptions {
    pub language_index: usize,
    pub fallback_window: usize,
    pub enable_fallback: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            language_index: 0,
            fallback_window: 24,
            enable_fallback: true,
        }
    }
}

impl ScannerOptions {
    pub fn for_language(language_index: usize) -> Self {
        Self {
            language_index,
            ..Self::default()
        }
    }

    /// Lookahead window used by the fallback extractor, kept within 20..=30.
    pub fn effective_window(&self) -> usize {
        self.fallback_window
            .clamp(MIN_FALLBACK_WINDOW, MAX_FALLBACK_WINDOW)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RtlOptions {
    pub strip_zero_width_non_joiner: bool,
    pub presentation_forms: bool,
    pub override_mark: bool,
    pub persian_digits: bool,
}

impl Default for RtlOptions {
    fn default() -> Self {
        Self {
            strip_zero_width_non_joiner: true,
            presentation_forms: true,
            override_mark: true,
            persian_digits: false,
        }
    }
}

impl RtlOptions {
    /// Bare per-run reversal: no glyph mapping, no override mark.
    pub fn plain() -> Self {
        Self {
            strip_zero_width_non_joiner: false,
            presentation_forms: false,
            override_mark: false,
            persian_digits: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorOptions {
    /// Indentation an item marker is expected to start with.
    pub item_indent: String,
    /// Number of lines (including the marker) inspected per item.
    pub lookahead: usize,
    pub fix_indent: FixIndent,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            item_indent: "   ".into(),
            lookahead: 20,
            fix_indent: FixIndent::default(),
        }
    }
}

/// Canonical indentation widths written by the auto-fixer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixIndent {
    pub item: usize,
    pub term_data: usize,
    pub term: usize,
    pub nested_array: usize,
    pub data: usize,
}

impl Default for FixIndent {
    fn default() -> Self {
        Self {
            item: 3,
            term_data: 5,
            term: 6,
            nested_array: 8,
            data: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOptions {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub timeout_secs: u64,
    pub preserve_placeholders: bool,
    /// Retries per batch on rate limits, timeouts and server errors.
    pub max_retries: u32,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:54321/functions/v1/translate-to-persian".into(),
            api_key: None,
            batch_size: 10,
            batch_delay_ms: 500,
            timeout_secs: 60,
            preserve_placeholders: true,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerOptions {
    pub request_timeout_ms: u64,
    pub queue_depth: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            queue_depth: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scanner: ScannerOptions,
    pub rtl: RtlOptions,
    pub validator: ValidatorOptions,
    pub service: ServiceOptions,
    pub worker: WorkerOptions,
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
