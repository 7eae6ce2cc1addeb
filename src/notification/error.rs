use std::fmt;

use thiserror::Error;

use crate::submission::{NotificationId, SubmissionId};

use super::mailer::TransportError;
use super::outcome::ProcessReport;
use super::render::RenderError;
use super::store::StoreError;

/// Failure of a single notification rule
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to load notification config: {0}")]
    ConfigStore(#[from] StoreError),

    #[error("Notification config {0} not found")]
    ConfigNotFound(NotificationId),

    #[error("No recipient address resolved")]
    MissingRecipient,

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] TransportError),
}

impl RuleError {
    /// Stable short name used in logs, metrics and API output
    pub fn kind(&self) -> &'static str {
        match self {
            RuleError::ConfigStore(_) | RuleError::ConfigNotFound(_) => "config",
            RuleError::MissingRecipient => "recipient",
            RuleError::Render(_) => "render",
            RuleError::Dispatch(_) => "dispatch",
        }
    }

    /// The error and its `source()` chain, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

/// At least one enabled rule of a submission failed.
///
/// Carries the complete report so callers can inspect every rule's outcome,
/// not only the first failure.
#[derive(Debug)]
pub struct ProcessError {
    report: ProcessReport,
}

impl ProcessError {
    pub(crate) fn new(report: ProcessReport) -> Self {
        Self { report }
    }

    pub fn submission_id(&self) -> SubmissionId {
        self.report.submission_id
    }

    /// Every rule failure, in rule order
    pub fn failures(&self) -> impl Iterator<Item = (NotificationId, &RuleError)> {
        self.report.failures()
    }

    pub fn report(&self) -> &ProcessReport {
        &self.report
    }

    pub fn into_report(self) -> ProcessReport {
        self.report
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} notifications failed for submission {}",
            self.report.failed(),
            self.report.attempted(),
            self.report.submission_id
        )?;
        if let Some((id, err)) = self.report.failures().next() {
            write!(f, " (notification {id}: {err})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.report
            .failures()
            .next()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}
