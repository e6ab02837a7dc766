use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Validation,
    QuotaExceeded,
    Internal,
}

/// Error body returned by both mail endpoints: `{ "error": "..." }`.
///
/// `code` is advisory; clients only rely on `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: Some(code),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
        }
    }
}
