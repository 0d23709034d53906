//! Compiler configuration (§6.2, §10.3 of `SPEC_FULL.md`).
//!
//! Loaded via `figment` exactly as the teacher's own `Config::load`: merge
//! `chrc.toml` (if present), then `chrc.local.toml`, then `CHRC_`-prefixed
//! environment variables split on `__`. Every `{enable,disable}-*` knob
//! named in §6.2 is a boolean field here, defaulting to "on" unless the
//! specification says otherwise.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// The named knobs of §6.2, plus the ambient logging config (§10.1/§10.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// §4.1.2 — advisory, never rejects a rule.
    #[serde(default = "default_true")]
    pub warning_unused_rule: bool,

    /// §4.1.3.
    #[serde(default = "default_true")]
    pub never_stored: bool,

    /// §4.3.1.
    #[serde(default = "default_true")]
    pub head_reorder: bool,

    /// §4.3.2.
    #[serde(default = "default_true")]
    pub guard_reorder: bool,

    /// §4.3.3.
    #[serde(default = "default_true")]
    pub occurrences_reorder: bool,

    /// §4.3.4.
    #[serde(default = "default_true")]
    pub constraint_store_index: bool,

    /// Emit source-position directives in generated output.
    #[serde(default = "default_true")]
    pub line_error: bool,

    /// Emit `tracing` trace-level spans/events and runtime trace statements
    /// in the generated program (§6.2 `trace`).
    #[serde(default)]
    pub trace: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mirrors the teacher's `LoggingConfig`: a level string and a format
/// (`"text"` or `"json"`) consumed when the CLI installs its
/// `tracing_subscriber` (§10.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            warning_unused_rule: true,
            never_stored: true,
            head_reorder: true,
            guard_reorder: true,
            occurrences_reorder: true,
            constraint_store_index: true,
            line_error: true,
            trace: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations, lowest to highest
    /// precedence: `chrc.toml`, `chrc.local.toml`, then `CHRC_`-prefixed
    /// environment variables (§10.3). Missing files are silently skipped
    /// by `figment`'s `Toml::file`, the way the teacher's loader does.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("chrc.toml"))
            .merge(Toml::file("chrc.local.toml"))
            .merge(Env::prefixed("CHRC_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHRC_").split("__"))
            .extract()
    }
}
