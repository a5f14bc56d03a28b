//! Configuration for visflow
//!
//! This module handles engine configuration:
//! - Engine defaults (queue capacity, processor strategy, error handling)
//! - Logging filter, format and optional file output
//! - Per-operation overrides keyed by operation name
//!
//! # Formats
//!
//! Files ending in `.json` are read and written with `serde_json`; anything
//! else is treated as TOML.
//!
//! # Config Location
//!
//! The default config file lives in the platform config directory:
//! - **Linux**: `~/.config/visflow/visflow.toml`
//! - **macOS**: `~/Library/Application Support/visflow/visflow.toml`
//! - **Windows**: `%APPDATA%\visflow\visflow.toml`
//!
//! # Example
//!
//! ```ignore
//! use visflow::config::EngineConfig;
//!
//! let config = EngineConfig::load_or_default("visflow.toml");
//! let engine = Engine::new(config);
//! ```

use crate::error::{Result, VisflowError};
use crate::pipeline::{OperationSettings, ProcessorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "visflow";

/// Default config filename
pub const CONFIG_FILE: &str = "visflow.toml";

/// Default input queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Default timeout for `Engine::wait` in milliseconds
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5000;

/// Default back-pressure wait slice in milliseconds
pub const DEFAULT_EMIT_RETRY_MS: u64 = 10;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,visflow=debug";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== Engine Settings ====================

/// How the engine reacts to an operation reporting an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Interrupt every operation on the first error
    #[default]
    StopAll,
    /// Let the failing operation stop on its own and keep the rest running
    Isolate,
}

/// Engine-wide defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Capacity of every input queue
    pub queue_capacity: usize,

    /// Processor used when an operation has no override
    pub default_processor: ProcessorKind,

    /// Reaction to reported errors
    pub error_handling: ErrorHandling,

    /// Timeout used by `Engine::wait` and the demo binary
    pub wait_timeout_ms: u64,

    /// Upper bound of one back-pressure wait
    pub emit_retry_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            default_processor: ProcessorKind::default(),
            error_handling: ErrorHandling::default(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            emit_retry_ms: DEFAULT_EMIT_RETRY_MS,
        }
    }
}

impl EngineSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn emit_retry(&self) -> Duration {
        Duration::from_millis(self.emit_retry_ms.max(1))
    }
}

// ==================== Logging ====================

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: String,

    pub format: LogFormat,

    /// Directory for daily-rolling log files
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

// ==================== Operation Overrides ====================

/// Per-operation settings that replace the engine defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOverride {
    pub processor: Option<ProcessorKind>,
    pub queue_capacity: Option<usize>,
}

// ==================== Engine Config ====================

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub logging: LoggingConfig,
    pub operations: HashMap<String, OperationOverride>,
}

impl EngineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisflowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                VisflowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                VisflowError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })
        }
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, choosing the format from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VisflowError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| VisflowError::Serialization(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| VisflowError::Serialization(format!("Failed to serialize config: {}", e)))?
        };

        std::fs::write(path, content).map_err(|e| {
            VisflowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Processor for the named operation
    pub fn processor_for(&self, name: &str) -> ProcessorKind {
        self.operations
            .get(name)
            .and_then(|o| o.processor)
            .unwrap_or(self.engine.default_processor)
    }

    /// Runtime settings for the named operation
    pub fn settings_for(&self, name: &str) -> OperationSettings {
        let queue_capacity = self
            .operations
            .get(name)
            .and_then(|o| o.queue_capacity)
            .unwrap_or(self.engine.queue_capacity);
        OperationSettings {
            queue_capacity: queue_capacity.max(1),
            emit_retry: self.engine.emit_retry(),
        }
    }

    pub fn with_default_processor(mut self, kind: ProcessorKind) -> Self {
        self.engine.default_processor = kind;
        self
    }

    pub fn with_error_handling(mut self, handling: ErrorHandling) -> Self {
        self.engine.error_handling = handling;
        self
    }

    pub fn with_override(mut self, name: impl Into<String>, over: OperationOverride) -> Self {
        self.operations.insert(name.into(), over);
        self
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.engine.queue_capacity, 4);
        assert_eq!(config.engine.default_processor, ProcessorKind::Threaded);
        assert_eq!(config.engine.error_handling, ErrorHandling::StopAll);
        assert_eq!(config.engine.wait_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.filter, "info,visflow=debug");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::default().with_override(
            "sink",
            OperationOverride {
                processor: Some(ProcessorKind::Simple),
                queue_capacity: Some(16),
            },
        );
        assert_eq!(config.processor_for("sink"), ProcessorKind::Simple);
        assert_eq!(config.processor_for("other"), ProcessorKind::Threaded);
        assert_eq!(config.settings_for("sink").queue_capacity, 16);
        assert_eq!(config.settings_for("other").queue_capacity, 4);
        assert_eq!(config.settings_for("other").emit_retry, Duration::from_millis(10));
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            [engine]
            default_processor = "simple"
            error_handling = "isolate"

            [operations.scale]
            queue_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.default_processor, ProcessorKind::Simple);
        assert_eq!(config.engine.error_handling, ErrorHandling::Isolate);
        assert_eq!(config.engine.queue_capacity, 4);
        assert_eq!(config.settings_for("scale").queue_capacity, 8);
        assert_eq!(config.processor_for("scale"), ProcessorKind::Simple);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("visflow.toml");
        let config = EngineConfig::default().with_error_handling(ErrorHandling::Isolate);
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visflow.json");
        let mut config = EngineConfig::default();
        config.logging.format = LogFormat::Compact;
        config.save(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.trim_start().starts_with('{'));
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "engine = [").unwrap();
        assert!(EngineConfig::load(&path).is_err());
        assert_eq!(EngineConfig::load_or_default(&path), EngineConfig::default());
        assert_eq!(
            EngineConfig::load_or_default(dir.path().join("missing.toml")),
            EngineConfig::default()
        );
    }
}
