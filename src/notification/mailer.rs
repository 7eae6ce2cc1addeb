//! Outbound mail transport.
//!
//! The pipeline hands each rendered message to a [`MailTransport`] exactly
//! once. Retries, fallback transports and delivery tracking are not handled
//! here; transport-level timeouts belong to the transport implementation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::MailConfig;
use crate::metrics::NotificationMetrics;

/// Errors reported by a mail transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid {field} address '{address}': {source}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Transport rejected message: {0}")]
    Rejected(String),
}

/// A fully rendered notification email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Delivery backend for rendered notification emails
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Attempt delivery of one message
    async fn send(&self, message: &OutboundEmail) -> Result<(), TransportError>;

    /// Transport name for logging and health output
    fn name(&self) -> &'static str;
}

/// Hand a message to the transport, returning its error unmodified
#[tracing::instrument(
    name = "mailer.dispatch",
    skip(transport, message),
    fields(transport = transport.name())
)]
pub async fn dispatch(
    transport: &dyn MailTransport,
    message: &OutboundEmail,
) -> Result<(), TransportError> {
    let started = Instant::now();
    let result = transport.send(message).await;
    NotificationMetrics::observe_dispatch(started.elapsed());
    result
}

/// SMTP transport backed by lettre
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailTransport {
    /// Build an SMTP transport from configuration
    pub fn new(config: &MailConfig) -> Result<Self, TransportError> {
        let sender = parse_mailbox("from", &config.from)?;

        let tls = match config.tls.as_str() {
            "tls" => Tls::Wrapper(TlsParameters::new(config.host.clone())?),
            "starttls" => Tls::Required(TlsParameters::new(config.host.clone())?),
            _ => Tls::None,
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(tls)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            tls = %config.tls,
            "SMTP mail transport configured"
        );

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, TransportError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(parse_mailbox("to", &email.to)?)
            .subject(email.subject.as_str());

        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(parse_mailbox("reply-to", reply_to)?);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html.clone()),
                ),
        )?;

        Ok(message)
    }
}

fn parse_mailbox(field: &'static str, address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|source| TransportError::InvalidAddress {
            field,
            address: address.to_string(),
            source,
        })
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &OutboundEmail) -> Result<(), TransportError> {
        let message = self.build_message(message)?;
        self.transport.send(message).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Messages kept by a [`MemoryMailTransport`] unless configured otherwise
pub const DEFAULT_CAPTURE_LIMIT: usize = 100;

/// Transport that records messages in memory instead of delivering them.
///
/// Only the most recent `capture_limit` messages are retained; older ones
/// are dropped. [`sent_count`](Self::sent_count) still counts every accepted
/// message.
#[derive(Debug)]
pub struct MemoryMailTransport {
    capture: Mutex<Capture>,
    capture_limit: usize,
    failure: Option<FailureMode>,
}

#[derive(Debug, Default)]
struct Capture {
    messages: VecDeque<OutboundEmail>,
    accepted: usize,
}

#[derive(Debug, Clone)]
enum FailureMode {
    Always(String),
    Recipient(String),
}

impl Default for MemoryMailTransport {
    fn default() -> Self {
        Self::with_capture_limit(DEFAULT_CAPTURE_LIMIT)
    }
}

impl MemoryMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain at most `limit` messages; `0` keeps none
    pub fn with_capture_limit(limit: usize) -> Self {
        Self {
            capture: Mutex::default(),
            capture_limit: limit,
            failure: None,
        }
    }

    /// A transport that rejects every message
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(FailureMode::Always(reason.into())),
            ..Self::default()
        }
    }

    /// A transport that rejects messages addressed to `recipient`
    pub fn rejecting(recipient: impl Into<String>) -> Self {
        Self {
            failure: Some(FailureMode::Recipient(recipient.into())),
            ..Self::default()
        }
    }

    /// Retained messages, oldest first
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.capture.lock().await.messages.iter().cloned().collect()
    }

    /// Messages accepted since creation or the last [`clear`](Self::clear)
    pub async fn sent_count(&self) -> usize {
        self.capture.lock().await.accepted
    }

    pub fn capture_limit(&self) -> usize {
        self.capture_limit
    }

    pub async fn clear(&self) {
        let mut capture = self.capture.lock().await;
        capture.messages.clear();
        capture.accepted = 0;
    }
}

#[async_trait]
impl MailTransport for MemoryMailTransport {
    async fn send(&self, message: &OutboundEmail) -> Result<(), TransportError> {
        match &self.failure {
            Some(FailureMode::Always(reason)) => {
                return Err(TransportError::Rejected(reason.clone()));
            }
            Some(FailureMode::Recipient(recipient)) if *recipient == message.to => {
                return Err(TransportError::Rejected(format!(
                    "recipient {recipient} refused"
                )));
            }
            _ => {}
        }

        let mut capture = self.capture.lock().await;
        capture.accepted += 1;
        if self.capture_limit > 0 {
            if capture.messages.len() == self.capture_limit {
                capture.messages.pop_front();
            }
            capture.messages.push_back(message.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Create a mail transport based on configuration.
///
/// `"smtp"` builds a lettre SMTP transport; anything else (default
/// `"memory"`) records messages without sending them.
pub fn create_mail_transport(config: &MailConfig) -> Result<Arc<dyn MailTransport>, TransportError> {
    match config.transport.as_str() {
        "smtp" => Ok(Arc::new(SmtpMailTransport::new(config)?)),
        _ => {
            tracing::warn!(
                transport = %config.transport,
                capture_limit = config.capture_limit,
                "Using in-memory mail transport, notifications will not be delivered"
            );
            Ok(Arc::new(MemoryMailTransport::with_capture_limit(
                config.capture_limit,
            )))
        }
    }
}
