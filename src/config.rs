//! Configuration loading for tg-forward
//!
//! Supports TOML configuration with embedded defaults and environment overrides.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::engine::forward::ForwardTarget;
use crate::error::ConfigError;
use crate::rules::Normalizer;

/// Public usernames: 5-32 characters, leading letter, optional '@'
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@?[A-Za-z][A-Za-z0-9_]{4,31}$").unwrap());

/// General configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default tracing level when RUST_LOG is unset
    pub log_level: String,

    /// Enable audit logging
    pub audit_log: bool,

    /// Path to audit log file
    pub audit_path: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            audit_log: true,
            audit_path: Some("~/.config/tg-forward/audit.jsonl".to_string()),
        }
    }
}

/// Rule storage and matching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the JSON rules file
    pub path: String,

    /// Compare text without accents ("café" matches "cafe")
    pub strip_diacritics: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: "~/.config/tg-forward/rules.json".to_string(),
            strip_diacritics: true,
        }
    }
}

/// Forwarding target
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ForwardConfig {
    pub target_chat_id: Option<i64>,

    pub target_username: Option<String>,

    /// Messages from this sender are never forwarded (the relay bot itself)
    pub ignore_sender_id: Option<i64>,
}

/// Listener session
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Portable session string, if the account is already authenticated
    pub string: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub rules: RulesConfig,
    pub forward: ForwardConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from the standard locations or use defaults
    pub fn load() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tg-forward/config.toml")),
            Some(PathBuf::from("/etc/tg-forward/config.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        Config::default()
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides on top of the file configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(chat_id) = lookup("TG_BOT_TARGET_CHAT_ID") {
            let chat_id = chat_id.parse().map_err(|_| {
                ConfigError::Invalid("TG_BOT_TARGET_CHAT_ID must be a number".to_string())
            })?;
            self.forward.target_chat_id = Some(chat_id);
        }
        if let Some(username) = lookup("TG_BOT_TARGET_USERNAME") {
            self.forward.target_username = Some(username);
        }
        if let Some(session) = lookup("TG_USER_SESSION") {
            self.session.string = Some(session);
        }
        if let Some(path) = lookup("TG_FORWARD_RULES_PATH") {
            self.rules.path = path;
        }
        Ok(())
    }

    /// Check that the configuration can drive the forward loop
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.forward_target()?;
        if self.rules.path.trim().is_empty() {
            return Err(ConfigError::Invalid("rules.path is required".to_string()));
        }
        Ok(())
    }

    /// Target for forwarded messages; a chat id wins over a username
    pub fn forward_target(&self) -> Result<ForwardTarget, ConfigError> {
        match (self.forward.target_chat_id, &self.forward.target_username) {
            (Some(id), _) if id != 0 => Ok(ForwardTarget::ChatId(id)),
            (_, Some(name)) if !name.is_empty() => {
                if !USERNAME_RE.is_match(name) {
                    return Err(ConfigError::Invalid(format!(
                        "forward.target_username is not a valid username: {}",
                        name
                    )));
                }
                Ok(ForwardTarget::Username(name.trim_start_matches('@').to_string()))
            }
            _ => Err(ConfigError::Invalid(
                "either forward.target_chat_id or forward.target_username is required"
                    .to_string(),
            )),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.rules.strip_diacritics)
    }

    /// Expand ~ in path strings
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get the rules file path (expanded)
    pub fn rules_path(&self) -> PathBuf {
        Self::expand_path(&self.rules.path)
    }

    /// Get the audit log path (expanded), if audit logging is on
    pub fn audit_path(&self) -> Option<PathBuf> {
        if !self.general.audit_log {
            return None;
        }
        self.general.audit_path.as_ref().map(|p| Self::expand_path(p))
    }
}

/// Embedded default configuration
pub const DEFAULT_CONFIG_TOML: &str = r#"
[general]
log_level = "info"
audit_log = true
audit_path = "~/.config/tg-forward/audit.jsonl"

[rules]
path = "~/.config/tg-forward/rules.json"
strip_diacritics = true

[forward]
# target_chat_id = -1001234567890
# target_username = "my_alerts_channel"
# ignore_sender_id = 123456789

[session]
# string = "1..."
"#;
