//! HTTP implementation of the quota and send services.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE},
    Client,
};
use serde::Deserialize;
use shared::{
    domain::EmailId,
    protocol::{EmailLimitResponse, SendEmailRequest},
};
use tracing::debug;
use url::Url;

use crate::{
    error::ServiceError,
    service::{QuotaService, SendService},
    settings::ClientSettings,
};

/// Failed-send body. Only `error` is read so that extra fields of any shape
/// never hide the server's message.
#[derive(Deserialize)]
struct SendErrorBody {
    error: String,
}

pub struct HttpMailApi {
    http: Client,
    base_url: Url,
}

impl HttpMailApi {
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Builds a client whose requests carry the configured cookie and bearer
    /// token on every call.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.server_url)
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("server url '{}' cannot be used as a base", settings.server_url);
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = &settings.session_cookie {
            let mut value = HeaderValue::from_str(cookie).context("invalid session cookie")?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        if let Some(token) = &settings.bearer_token {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {token}")).context("invalid bearer token")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build http client")?;

        Ok(Self::new(http, base_url))
    }

    fn endpoint<I>(&self, segments: I) -> Result<Url, ServiceError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ServiceError::Transport(format!("server url {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl QuotaService for HttpMailApi {
    async fn fetch_quota(&self) -> Result<String, ServiceError> {
        let url = self.endpoint(["api", "email-limit"])?;
        debug!(%url, "fetching email quota");

        // The body decides success; the status code is not consulted.
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: EmailLimitResponse = serde_json::from_slice(&bytes).map_err(|err| {
            ServiceError::Malformed(format!("quota response ({status}) is not valid json: {err}"))
        })?;

        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            return Err(ServiceError::Server(error));
        }
        body.limit_display.ok_or_else(|| {
            ServiceError::Malformed(format!("quota response ({status}) has no limitDisplay"))
        })
    }
}

#[async_trait]
impl SendService for HttpMailApi {
    async fn send_email(
        &self,
        email_id: &EmailId,
        request: &SendEmailRequest,
    ) -> Result<(), ServiceError> {
        let url = self.endpoint(["api", "emails", email_id.as_str(), "send"])?;
        debug!(%url, %email_id, "dispatching send request");

        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let bytes = response.bytes().await?;
        let body: SendErrorBody = serde_json::from_slice(&bytes).map_err(|err| {
            ServiceError::Malformed(format!("send failed with {status} and unreadable body: {err}"))
        })?;
        Err(ServiceError::Server(body.error))
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
