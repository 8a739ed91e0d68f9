//! Response envelopes for the rule administration API
//!
//! The HTTP layer wraps every rule-service result in an `ApiResponse`:
//! `{"data": ...}` on success, `{"code", "message", "meta"?}` on error.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CodecError, RuleError};
use crate::rules::Rule;

/// Error body returned to API clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    /// HTTP status the transport should use
    #[serde(skip)]
    pub status: u16,

    /// Stable machine-readable code
    pub code: String,

    pub message: String,

    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl From<&RuleError> for ApiError {
    fn from(err: &RuleError) -> Self {
        let status = match err {
            RuleError::Validation(_) => 400,
            RuleError::NotFound(_) => 404,
            RuleError::Persistence { .. } | RuleError::Inconsistent(_) => 500,
        };
        let api_err = ApiError::new(status, err.code(), err.to_string());

        match err {
            RuleError::NotFound(id) => api_err.with_meta(serde_json::json!({ "id": id })),
            _ => api_err,
        }
    }
}

impl From<&CodecError> for ApiError {
    fn from(err: &CodecError) -> Self {
        ApiError::new(400, "INVALID_SESSION", err.to_string())
    }
}

/// Tagged result envelope: a success payload or an error
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { data: T },
    Error(ApiError),
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data }
    }

    /// HTTP status the transport should use
    pub fn status(&self) -> u16 {
        match self {
            ApiResponse::Success { .. } => 200,
            ApiResponse::Error(err) => err.status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }
}

impl<T, E> From<Result<T, E>> for ApiResponse<T>
where
    for<'e> ApiError: From<&'e E>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ApiResponse::Success { data },
            Err(err) => ApiResponse::Error(ApiError::from(&err)),
        }
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Data<'a, T> {
            data: &'a T,
        }

        match self {
            ApiResponse::Success { data } => Data { data }.serialize(serializer),
            ApiResponse::Error(err) => err.serialize(serializer),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Payload for endpoints returning the rule list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulesPayload {
    pub rules: Vec<Rule>,
}

/// Payload for endpoints returning one rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePayload {
    pub rule: Rule,
}

/// Payload for endpoints with only a confirmation message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    pub message: String,
}
