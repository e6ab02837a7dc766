use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use shared::{
    domain::EmailId,
    error::{ApiError, ErrorCode},
    protocol::{
        EmailLimitResponse, OutboxEntry, SendEmailRequest, SendEmailResponse, EMAIL_LIMIT_ROUTE,
        OUTBOX_ROUTE, SEND_EMAIL_ROUTE,
    },
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod quota;

use config::load_settings;
use quota::QuotaLedger;

const SESSION_COOKIE: &str = "session";

struct AppState {
    ledger: Mutex<QuotaLedger>,
    outboxes: Mutex<HashMap<String, Vec<OutboxEntry>>>,
}

impl AppState {
    fn new(daily_limit: Option<u32>) -> Self {
        Self {
            ledger: Mutex::new(QuotaLedger::new(daily_limit)),
            outboxes: Mutex::new(HashMap::new()),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let state = Arc::new(AppState::new(settings.daily_limit));
    let app = build_router(state);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, daily_limit = ?settings.daily_limit, "dev mail backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(EMAIL_LIMIT_ROUTE, get(email_limit))
        .route(SEND_EMAIL_ROUTE, post(send_email))
        .route(OUTBOX_ROUTE, get(outbox))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Resolves the caller from a bearer token or a `session` cookie.
fn identity_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn require_identity(headers: &HeaderMap) -> Result<String, (StatusCode, Json<ApiError>)> {
    identity_from_headers(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(ErrorCode::Unauthorized, "unauthorized")),
        )
    })
}

async fn email_limit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<EmailLimitResponse> {
    let identity = require_identity(&headers)?;
    let display = state
        .ledger
        .lock()
        .await
        .display(&identity, Utc::now().date_naive());
    Ok(Json(EmailLimitResponse::display(display)))
}

async fn send_email(
    State(state): State<Arc<AppState>>,
    Path(email_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> ApiResult<SendEmailResponse> {
    let identity = require_identity(&headers)?;
    let Json(req) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
        )
    })?;

    if req.to.trim().is_empty() || req.subject.trim().is_empty() || req.content.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                "recipient, subject and content are required",
            )),
        ));
    }

    let now = Utc::now();
    if state
        .ledger
        .lock()
        .await
        .try_consume(&identity, now.date_naive())
        .is_err()
    {
        warn!(%identity, %email_id, "send rejected: daily quota exhausted");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiError::new(ErrorCode::QuotaExceeded, "quota exceeded")),
        ));
    }

    info!(%identity, %email_id, to = %req.to, "accepted email into outbox");
    state
        .outboxes
        .lock()
        .await
        .entry(identity)
        .or_default()
        .push(OutboxEntry {
            email_id: EmailId(email_id),
            to: req.to,
            subject: req.subject,
            content: req.content,
            accepted_at: now,
        });

    Ok(Json(SendEmailResponse { success: true }))
}

async fn outbox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<OutboxEntry>> {
    let identity = require_identity(&headers)?;
    let entries = state
        .outboxes
        .lock()
        .await
        .get(&identity)
        .cloned()
        .unwrap_or_default();
    Ok(Json(entries))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
