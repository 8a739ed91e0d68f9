//! Error types for tg-forward
//!
//! Every failure is returned to the caller; nothing here is fatal to the process.

use std::io;

use thiserror::Error;

/// Errors from rule validation, the rule repository and the rule service
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule or rule set failed validation. Nothing was persisted.
    #[error("{0}")]
    Validation(String),

    /// The targeted rule id does not exist
    #[error("rule not found: {0}")]
    NotFound(String),

    /// The repository could not read or write its backing store
    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The repository accepted a change but the stored rules no longer build a matcher.
    /// The previous matcher stays current until the next successful mutation.
    #[error("rules persisted but matcher was not rebuilt: {0}")]
    Inconsistent(String),
}

impl RuleError {
    pub fn validation(message: impl Into<String>) -> Self {
        RuleError::Validation(message.into())
    }

    pub fn persistence(context: impl Into<String>, source: impl Into<io::Error>) -> Self {
        RuleError::Persistence {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            RuleError::Validation(_) => "INVALID_RULES",
            RuleError::NotFound(_) => "RULE_NOT_FOUND",
            RuleError::Persistence { .. } => "PERSISTENCE_ERROR",
            RuleError::Inconsistent(_) => "RULES_OUT_OF_SYNC",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RuleError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RuleError::NotFound(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, RuleError::Persistence { .. })
    }
}

/// Errors from encoding or decoding a portable session string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("session address is empty - session may not be fully initialized yet")]
    EmptyAddress,

    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    #[error("auth key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("session string is empty")]
    EmptyInput,

    #[error("unsupported session version: {0:?}")]
    UnsupportedVersion(char),

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("session payload too short: {0} bytes")]
    Truncated(usize),

    #[error("unexpected session payload length: {0} bytes")]
    UnexpectedLength(usize),
}

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from delivering a forwarded message
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to send message: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("delivery rejected: {0}")]
    Rejected(String),
}
