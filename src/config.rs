/*!
 * Sandbox Configuration
 * Per-tenant engine settings, loaded from the environment or deserialized
 */

use std::path::PathBuf;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::limits::{MAX_SYMLINK_EXPANSIONS, MAX_SYMLINK_EXPANSIONS_LIMIT};

/// Configuration errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Missing setting: {0}")]
    #[diagnostic(
        code(config::missing),
        help("Set SANDBOX_ROOT to the tenant data directory.")
    )]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: String, value: String },

    #[error("Symlink expansion limit out of range: {0}")]
    #[diagnostic(
        code(config::symlink_limit),
        help("SANDBOX_MAX_SYMLINKS must be between 1 and 255.")
    )]
    SymlinkLimit(u32),
}

/// Settings for one sandboxed filesystem instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SandboxConfig {
    /// Confinement directory; canonicalized when the engine is built
    pub root: PathBuf,
    /// Use relative-open resolution where the host supports it
    #[serde(default = "default_strict")]
    pub strict_resolution: bool,
    #[serde(default = "default_max_symlinks")]
    pub max_symlink_expansions: u32,
}

fn default_strict() -> bool {
    true
}

fn default_max_symlinks() -> u32 {
    MAX_SYMLINK_EXPANSIONS
}

impl SandboxConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strict_resolution: default_strict(),
            max_symlink_expansions: default_max_symlinks(),
        }
    }

    /// Load from environment variables
    ///
    /// - SANDBOX_ROOT: tenant data directory (required)
    /// - SANDBOX_STRICT_RESOLUTION: `true`/`false` (default: true)
    /// - SANDBOX_MAX_SYMLINKS: symlink expansion limit (default: 40)
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = std::env::var_os("SANDBOX_ROOT")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing("SANDBOX_ROOT".into()))?;

        let mut config = Self::new(root);

        if let Ok(value) = std::env::var("SANDBOX_STRICT_RESOLUTION") {
            config.strict_resolution = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: "SANDBOX_STRICT_RESOLUTION".into(),
                value,
            })?;
        }

        if let Ok(value) = std::env::var("SANDBOX_MAX_SYMLINKS") {
            config.max_symlink_expansions =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SANDBOX_MAX_SYMLINKS".into(),
                    value: value.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check limits before the engine is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Missing("root".into()));
        }
        if self.max_symlink_expansions == 0
            || self.max_symlink_expansions > MAX_SYMLINK_EXPANSIONS_LIMIT
        {
            return Err(ConfigError::SymlinkLimit(self.max_symlink_expansions));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
