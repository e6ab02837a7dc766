use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap as AxumHeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::error::{ApiError, ErrorCode};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct RecordedSend {
    email_id: String,
    cookie: Option<String>,
    authorization: Option<String>,
    request: SendEmailRequest,
}

#[derive(Clone)]
struct ServerState {
    quota_status: StatusCode,
    quota_body: String,
    send_status: StatusCode,
    send_body: String,
    sends: Arc<Mutex<Vec<RecordedSend>>>,
}

impl ServerState {
    fn new(quota_status: StatusCode, quota_body: &str) -> Self {
        Self {
            quota_status,
            quota_body: quota_body.to_string(),
            send_status: StatusCode::OK,
            send_body: r#"{"success":true}"#.to_string(),
            sends: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_send(mut self, status: StatusCode, body: &str) -> Self {
        self.send_status = status;
        self.send_body = body.to_string();
        self
    }
}

async fn handle_email_limit(State(state): State<ServerState>) -> (StatusCode, String) {
    (state.quota_status, state.quota_body.clone())
}

async fn handle_send(
    State(state): State<ServerState>,
    Path(email_id): Path<String>,
    headers: AxumHeaderMap,
    Json(request): Json<SendEmailRequest>,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.sends.lock().await.push(RecordedSend {
        email_id,
        cookie: header("cookie"),
        authorization: header("authorization"),
        request,
    });
    (state.send_status, state.send_body.clone())
}

async fn spawn_mail_server(state: ServerState) -> anyhow::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/email-limit", get(handle_email_limit))
        .route("/api/emails/:email_id/send", post(handle_send))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn api_for(server_url: &str) -> HttpMailApi {
    HttpMailApi::from_settings(&ClientSettings {
        server_url: server_url.to_string(),
        session_cookie: Some("session=alice".to_string()),
        bearer_token: Some("tok-1".to_string()),
        ..ClientSettings::default()
    })
    .expect("api")
}

fn sample_request() -> SendEmailRequest {
    SendEmailRequest {
        to: "a@b.com".to_string(),
        subject: "Hi".to_string(),
        content: "Hello".to_string(),
    }
}

#[tokio::test]
async fn fetch_quota_returns_limit_display() {
    let server_url = spawn_mail_server(ServerState::new(
        StatusCode::OK,
        r#"{"limitDisplay":"7/10"}"#,
    ))
    .await
    .expect("spawn server");

    let quota = api_for(&server_url).fetch_quota().await.expect("quota");
    assert_eq!(quota, "7/10");
}

#[tokio::test]
async fn fetch_quota_treats_error_payload_as_failure_even_with_ok_status() {
    let server_url = spawn_mail_server(ServerState::new(
        StatusCode::OK,
        r#"{"error":"exceeded","limitDisplay":"0/10"}"#,
    ))
    .await
    .expect("spawn server");

    let err = api_for(&server_url)
        .fetch_quota()
        .await
        .expect_err("must fail");
    assert_eq!(err, ServiceError::Server("exceeded".to_string()));
}

#[tokio::test]
async fn fetch_quota_reads_error_payload_from_failed_status() {
    let body = serde_json::to_string(&ApiError::new(ErrorCode::Unauthorized, "not signed in"))
        .expect("json");
    let server_url = spawn_mail_server(ServerState::new(StatusCode::UNAUTHORIZED, &body))
        .await
        .expect("spawn server");

    let err = api_for(&server_url)
        .fetch_quota()
        .await
        .expect_err("must fail");
    assert_eq!(err, ServiceError::Server("not signed in".to_string()));
}

#[tokio::test]
async fn fetch_quota_flags_non_json_body_as_malformed() {
    let server_url = spawn_mail_server(ServerState::new(
        StatusCode::BAD_GATEWAY,
        "<html>bad gateway</html>",
    ))
    .await
    .expect("spawn server");

    let err = api_for(&server_url)
        .fetch_quota()
        .await
        .expect_err("must fail");
    assert!(matches!(err, ServiceError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn fetch_quota_reports_unreachable_server_as_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = api_for(&format!("http://{addr}"))
        .fetch_quota()
        .await
        .expect_err("must fail");
    assert!(matches!(err, ServiceError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn send_email_posts_content_with_ambient_credentials() {
    let state = ServerState::new(StatusCode::OK, "{}");
    let sends = state.sends.clone();
    let server_url = spawn_mail_server(state).await.expect("spawn server");

    api_for(&server_url)
        .send_email(&EmailId::from("thread 7/a"), &sample_request())
        .await
        .expect("send");

    let sends = sends.lock().await;
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].email_id, "thread 7/a");
    assert_eq!(sends[0].cookie.as_deref(), Some("session=alice"));
    assert_eq!(sends[0].authorization.as_deref(), Some("Bearer tok-1"));
    assert_eq!(sends[0].request, sample_request());
}

#[tokio::test]
async fn send_email_surfaces_server_error_message() {
    let server_url = spawn_mail_server(
        ServerState::new(StatusCode::OK, "{}")
            .with_send(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"quota exceeded"}"#),
    )
    .await
    .expect("spawn server");

    let err = api_for(&server_url)
        .send_email(&EmailId::from("mbx-1"), &sample_request())
        .await
        .expect_err("must fail");
    assert_eq!(err, ServiceError::Server("quota exceeded".to_string()));
}

#[tokio::test]
async fn send_email_with_unreadable_error_body_is_malformed() {
    let server_url = spawn_mail_server(
        ServerState::new(StatusCode::OK, "{}")
            .with_send(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    )
    .await
    .expect("spawn server");

    let err = api_for(&server_url)
        .send_email(&EmailId::from("mbx-1"), &sample_request())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ServiceError::Malformed(_)), "got {err:?}");
}

#[tokio::test]
async fn send_email_reads_error_message_despite_unknown_code_field() {
    let server_url = spawn_mail_server(
        ServerState::new(StatusCode::OK, "{}")
            .with_send(StatusCode::FORBIDDEN, r#"{"error":"sender blocked","code":403}"#),
    )
    .await
    .expect("spawn server");

    let err = api_for(&server_url)
        .send_email(&EmailId::from("mbx-1"), &sample_request())
        .await
        .expect_err("must fail");
    assert_eq!(err, ServiceError::Server("sender blocked".to_string()));
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let api = HttpMailApi::new(
        Client::new(),
        Url::parse("http://mail.internal/console/").expect("url"),
    );
    let url = api
        .endpoint(["api", "emails", "a b", "send"])
        .expect("endpoint");
    assert_eq!(
        url.as_str(),
        "http://mail.internal/console/api/emails/a%20b/send"
    );
}

#[test]
fn rejects_server_url_that_cannot_be_a_base() {
    let result = HttpMailApi::from_settings(&ClientSettings {
        server_url: "mailto:someone@example.com".to_string(),
        ..ClientSettings::default()
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn workflow_sends_through_http_backend_and_refreshes_quota() {
    use crate::workflow::{SendWorkflow, SubmitOutcome};
    use shared::domain::MailboxAddress;

    let state = ServerState::new(StatusCode::OK, r#"{"limitDisplay":"7/10"}"#);
    let sends = state.sends.clone();
    let server_url = spawn_mail_server(state).await.expect("spawn server");
    let workflow = SendWorkflow::new(
        EmailId::from("mbx-9"),
        MailboxAddress::from("me@example.com"),
        Arc::new(api_for(&server_url)),
    );

    assert_eq!(workflow.activate().await.display_text(), "7/10");
    workflow.set_to("a@b.com").await;
    workflow.set_subject("Hi").await;
    workflow.set_body("Hello").await;

    assert_eq!(workflow.submit().await, SubmitOutcome::Sent);
    assert_eq!(workflow.email_id(), &EmailId::from("mbx-9"));
    assert!(workflow.form().await.is_empty());

    let sends = sends.lock().await;
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].email_id, "mbx-9");
}
