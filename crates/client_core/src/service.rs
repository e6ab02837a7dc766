use async_trait::async_trait;
use shared::{domain::EmailId, protocol::SendEmailRequest};

use crate::error::ServiceError;

/// Reads the current sender's allowance. Identity comes from ambient credentials.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Returns the server-formatted remaining allowance.
    async fn fetch_quota(&self) -> Result<String, ServiceError>;
}

/// Sends one message on behalf of the mailbox identified by `email_id`.
#[async_trait]
pub trait SendService: Send + Sync {
    async fn send_email(
        &self,
        email_id: &EmailId,
        request: &SendEmailRequest,
    ) -> Result<(), ServiceError>;
}
