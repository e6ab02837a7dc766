use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EmailId;

pub const EMAIL_LIMIT_ROUTE: &str = "/api/email-limit";
pub const SEND_EMAIL_ROUTE: &str = "/api/emails/:email_id/send";
pub const OUTBOX_ROUTE: &str = "/api/outbox";

/// Body of `POST /api/emails/{emailId}/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailResponse {
    pub success: bool,
}

/// Body of `GET /api/email-limit`.
///
/// A present `error` marks the response as failed whatever the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailLimitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmailLimitResponse {
    pub fn display(limit_display: impl Into<String>) -> Self {
        Self {
            limit_display: Some(limit_display.into()),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub email_id: EmailId,
    pub to: String,
    pub subject: String,
    pub content: String,
    pub accepted_at: DateTime<Utc>,
}
