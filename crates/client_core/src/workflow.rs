//! Compose-and-send controller with a quota indicator.
//!
//! One [`SendWorkflow`] backs one compose dialog for a single sending mailbox.
//! It owns the form fields, the Idle/Sending state and the latest
//! [`QuotaView`], and publishes every change as a [`WorkflowEvent`].

use std::sync::Arc;

use shared::{
    domain::{EmailId, MailboxAddress},
    protocol::SendEmailRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{ComposeField, ServiceError, ValidationError},
    messages::{Locale, MessageCatalog},
    service::{QuotaService, SendService},
};

pub type SendSuccessCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Sending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeForm {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ComposeForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing: Vec<ComposeField> = [
            (ComposeField::To, &self.to),
            (ComposeField::Subject, &self.subject),
            (ComposeField::Body, &self.body),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields { missing })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.subject.is_empty() && self.body.is_empty()
    }

    fn clear(&mut self) {
        self.to.clear();
        self.subject.clear();
        self.body.clear();
    }
}

/// A validated message as it leaves the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendableMessage {
    pub from: MailboxAddress,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl SendableMessage {
    /// Fields are sent exactly as entered; trimming only applies to validation.
    pub fn to_request(&self) -> SendEmailRequest {
        SendEmailRequest {
            to: self.to.clone(),
            subject: self.subject.clone(),
            content: self.body.clone(),
        }
    }
}

/// Latest known quota. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaView {
    display_text: String,
    error_text: Option<String>,
}

impl QuotaView {
    pub fn loading(catalog: &MessageCatalog) -> Self {
        Self {
            display_text: catalog.quota_loading.to_string(),
            error_text: None,
        }
    }

    pub fn available(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            error_text: None,
        }
    }

    pub fn unavailable(catalog: &MessageCatalog, error_text: impl Into<String>) -> Self {
        Self {
            display_text: catalog.quota_unavailable.to_string(),
            error_text: Some(error_text.into()),
        }
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error_text.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A toast-style notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn success(catalog: &MessageCatalog, description: impl Into<String>) -> Self {
        Self {
            title: catalog.success_title.to_string(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    fn error(catalog: &MessageCatalog, description: impl Into<String>) -> Self {
        Self {
            title: catalog.error_title.to_string(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Notice(Notice),
    QuotaUpdated(QuotaView),
    StateChanged(WorkflowState),
    DialogOpened,
    DialogClosed,
}

/// Result of one [`SendWorkflow::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    Rejected(ValidationError),
    ServerError(String),
    TransportError(ServiceError),
    /// A send was already in flight; nothing was dispatched.
    Busy,
}

impl SubmitOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SubmitOutcome::Sent)
    }
}

#[derive(Default)]
pub struct WorkflowOptions {
    pub locale: Locale,
    pub refresh_quota_on_open: bool,
    pub on_send_success: Option<SendSuccessCallback>,
}

struct WorkflowInner {
    state: WorkflowState,
    form: ComposeForm,
    quota: QuotaView,
    dialog_open: bool,
}

pub struct SendWorkflow {
    email_id: EmailId,
    from_address: MailboxAddress,
    quota_service: Arc<dyn QuotaService>,
    send_service: Arc<dyn SendService>,
    catalog: MessageCatalog,
    refresh_quota_on_open: bool,
    on_send_success: Option<SendSuccessCallback>,
    inner: Mutex<WorkflowInner>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl SendWorkflow {
    /// Uses one backend for both quota and send calls.
    pub fn new<S>(email_id: EmailId, from_address: MailboxAddress, api: Arc<S>) -> Self
    where
        S: QuotaService + SendService + 'static,
    {
        Self::new_with_services(
            email_id,
            from_address,
            api.clone(),
            api,
            WorkflowOptions::default(),
        )
    }

    pub fn new_with_services(
        email_id: EmailId,
        from_address: MailboxAddress,
        quota_service: Arc<dyn QuotaService>,
        send_service: Arc<dyn SendService>,
        options: WorkflowOptions,
    ) -> Self {
        let catalog = MessageCatalog::for_locale(options.locale);
        let (events, _) = broadcast::channel(64);
        Self {
            email_id,
            from_address,
            quota_service,
            send_service,
            catalog,
            refresh_quota_on_open: options.refresh_quota_on_open,
            on_send_success: options.on_send_success,
            inner: Mutex::new(WorkflowInner {
                state: WorkflowState::Idle,
                form: ComposeForm::default(),
                quota: QuotaView::loading(&catalog),
                dialog_open: false,
            }),
            events,
        }
    }

    pub fn email_id(&self) -> &EmailId {
        &self.email_id
    }

    pub fn from_address(&self) -> &MailboxAddress {
        &self.from_address
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Runs the initial quota fetch. Call once after construction.
    pub async fn activate(&self) -> QuotaView {
        self.refresh_quota().await
    }

    pub async fn open(&self) {
        self.inner.lock().await.dialog_open = true;
        self.emit(WorkflowEvent::DialogOpened);
        if self.refresh_quota_on_open {
            self.refresh_quota().await;
        }
    }

    /// Returns false while a send is in flight; the dialog stays open then.
    pub async fn close(&self) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == WorkflowState::Sending {
                return false;
            }
            inner.dialog_open = false;
        }
        self.emit(WorkflowEvent::DialogClosed);
        true
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.dialog_open
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state
    }

    pub async fn submit_label(&self) -> &'static str {
        match self.state().await {
            WorkflowState::Idle => self.catalog.send_label,
            WorkflowState::Sending => self.catalog.sending_label,
        }
    }

    pub async fn form(&self) -> ComposeForm {
        self.inner.lock().await.form.clone()
    }

    pub async fn quota(&self) -> QuotaView {
        self.inner.lock().await.quota.clone()
    }

    pub async fn set_to(&self, value: impl Into<String>) {
        self.inner.lock().await.form.to = value.into();
    }

    pub async fn set_subject(&self, value: impl Into<String>) {
        self.inner.lock().await.form.subject = value.into();
    }

    pub async fn set_body(&self, value: impl Into<String>) {
        self.inner.lock().await.form.body = value.into();
    }

    /// Fetches the allowance and replaces the current view with the result.
    /// Failures are terminal for this attempt; there is no retry.
    pub async fn refresh_quota(&self) -> QuotaView {
        let view = match self.quota_service.fetch_quota().await {
            Ok(limit_text) => {
                info!(email_id = %self.email_id, quota = %limit_text, "email quota updated");
                QuotaView::available(limit_text)
            }
            Err(ServiceError::Server(message)) => {
                warn!(email_id = %self.email_id, error = %message, "quota service reported an error");
                QuotaView::unavailable(&self.catalog, message)
            }
            Err(err) => {
                warn!(email_id = %self.email_id, error = %err, "failed to fetch email quota");
                QuotaView::unavailable(&self.catalog, self.catalog.quota_fetch_failed)
            }
        };

        self.inner.lock().await.quota = view.clone();
        self.emit(WorkflowEvent::QuotaUpdated(view.clone()));
        view
    }

    /// Validates the form and sends it. Every failure is turned into a
    /// notification; the returned outcome says which path ran.
    pub async fn submit(&self) -> SubmitOutcome {
        let message = {
            let mut inner = self.inner.lock().await;
            if inner.state == WorkflowState::Sending {
                debug!(email_id = %self.email_id, "submit ignored while a send is in flight");
                return SubmitOutcome::Busy;
            }
            let validation = inner.form.validate();
            if let Err(err) = validation {
                drop(inner);
                debug!(email_id = %self.email_id, error = %err, "compose form rejected");
                self.notify(Notice::error(&self.catalog, self.catalog.fields_required));
                return SubmitOutcome::Rejected(err);
            }
            inner.state = WorkflowState::Sending;
            SendableMessage {
                from: self.from_address.clone(),
                to: inner.form.to.clone(),
                subject: inner.form.subject.clone(),
                body: inner.form.body.clone(),
            }
        };
        self.emit(WorkflowEvent::StateChanged(WorkflowState::Sending));

        let result = self
            .send_service
            .send_email(&self.email_id, &message.to_request())
            .await;

        match result {
            Ok(()) => {
                info!(email_id = %self.email_id, from = %message.from, "email sent");
                let was_open = {
                    let mut inner = self.inner.lock().await;
                    inner.form.clear();
                    inner.state = WorkflowState::Idle;
                    std::mem::replace(&mut inner.dialog_open, false)
                };
                self.notify(Notice::success(&self.catalog, self.catalog.email_sent));
                if was_open {
                    self.emit(WorkflowEvent::DialogClosed);
                }
                self.emit(WorkflowEvent::StateChanged(WorkflowState::Idle));
                if let Some(callback) = &self.on_send_success {
                    callback();
                }
                self.refresh_quota().await;
                SubmitOutcome::Sent
            }
            Err(ServiceError::Server(error)) => {
                warn!(email_id = %self.email_id, %error, "send service rejected the email");
                self.finish_failed(Notice::error(&self.catalog, error.clone()))
                    .await;
                SubmitOutcome::ServerError(error)
            }
            Err(err) => {
                warn!(email_id = %self.email_id, error = %err, "failed to send email");
                self.finish_failed(Notice::error(&self.catalog, self.catalog.send_failed))
                    .await;
                SubmitOutcome::TransportError(err)
            }
        }
    }

    async fn finish_failed(&self, notice: Notice) {
        self.inner.lock().await.state = WorkflowState::Idle;
        self.notify(notice);
        self.emit(WorkflowEvent::StateChanged(WorkflowState::Idle));
    }

    fn notify(&self, notice: Notice) {
        self.emit(WorkflowEvent::Notice(notice));
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
