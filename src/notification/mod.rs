//! Submission notification pipeline.
//!
//! For every rule on a submission's form:
//!
//! 1. the persisted config record is fetched from a [`NotificationConfigStore`]
//! 2. `to` / reply-to addresses are resolved from the submission's answers,
//!    falling back to the rule's literal addresses
//! 3. the rule's template is rendered to HTML and plain text
//! 4. the message is handed to a [`MailTransport`]
//! 5. the outcome is logged with form, submission and notification ids
//!
//! Rules run concurrently and fail independently. Use
//! [`create_config_store`] and [`create_mail_transport`] to build the
//! backends from configuration.

mod address;
mod error;
mod mailer;
mod outcome;
mod postgres_store;
mod render;
mod service;
mod store;

pub use address::{resolve_address, EffectiveFieldIds};
pub use error::{ProcessError, RuleError};
pub use mailer::{
    create_mail_transport, dispatch, MailTransport, MemoryMailTransport, OutboundEmail,
    SmtpMailTransport, TransportError, DEFAULT_CAPTURE_LIMIT,
};
pub use outcome::{
    report, OutcomeContext, ProcessReport, ProcessSummary, RuleOutcome, RuleReport, RuleSummary,
};
pub use postgres_store::PostgresConfigStore;
pub use render::{RenderError, RenderedEmail, TemplateRenderer};
pub use service::SubmissionNotificationService;
pub use store::{
    create_config_store, MemoryConfigStore, NotificationConfigRecord, NotificationConfigStore,
    StoreError,
};
