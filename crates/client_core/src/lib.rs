//! Client side of the mail compose dialog: the quota and send services, their
//! HTTP implementation, and the workflow controller that drives them.

pub mod error;
pub mod http;
pub mod messages;
pub mod service;
pub mod settings;
pub mod workflow;

pub use error::{ComposeField, ServiceError, SettingsError, ValidationError};
pub use http::HttpMailApi;
pub use messages::{Locale, MessageCatalog};
pub use service::{QuotaService, SendService};
pub use settings::{load_settings, ClientSettings};
pub use workflow::{
    ComposeForm, Notice, QuotaView, SendSuccessCallback, SendWorkflow, SendableMessage, Severity,
    SubmitOutcome, WorkflowEvent, WorkflowOptions, WorkflowState,
};
