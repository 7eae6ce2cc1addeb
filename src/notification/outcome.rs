//! Per-rule outcomes and their reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::metrics::NotificationMetrics;
use crate::submission::{FormId, NotificationId, SubmissionId};

use super::error::RuleError;

/// Terminal state of one notification rule
#[derive(Debug)]
pub enum RuleOutcome {
    /// Rule disabled, nothing ran
    Skipped,
    /// Rendered and accepted by the transport
    Sent,
    Failed(RuleError),
}

impl RuleOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            RuleOutcome::Skipped => "skipped",
            RuleOutcome::Sent => "sent",
            RuleOutcome::Failed(_) => "failed",
        }
    }

    pub fn error(&self) -> Option<&RuleError> {
        match self {
            RuleOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome of one rule within a run
#[derive(Debug)]
pub struct RuleReport {
    pub notification_id: NotificationId,
    pub outcome: RuleOutcome,
}

/// Outcomes of every rule for one `process` call
#[derive(Debug)]
pub struct ProcessReport {
    /// Distinct per call; two runs over the same submission never share it
    pub run_id: Uuid,
    pub form_id: FormId,
    pub submission_id: SubmissionId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rules: Vec<RuleReport>,
}

impl ProcessReport {
    fn count(&self, status: &str) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.outcome.status() == status)
            .count()
    }

    pub fn sent(&self) -> usize {
        self.count("sent")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    /// Rules that were enabled and therefore attempted
    pub fn attempted(&self) -> usize {
        self.rules.len() - self.skipped()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (NotificationId, &RuleError)> {
        self.rules
            .iter()
            .filter_map(|rule| rule.outcome.error().map(|err| (rule.notification_id, err)))
    }

    /// Serializable summary for API responses
    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            run_id: self.run_id,
            form_id: self.form_id,
            submission_id: self.submission_id,
            success: self.is_success(),
            sent: self.sent(),
            failed: self.failed(),
            skipped: self.skipped(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            results: self
                .rules
                .iter()
                .map(|rule| RuleSummary {
                    notification_id: rule.notification_id,
                    status: rule.outcome.status(),
                    error_kind: rule.outcome.error().map(RuleError::kind),
                    error: rule.outcome.error().map(ToString::to_string),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub run_id: Uuid,
    pub form_id: FormId,
    pub submission_id: SubmissionId,
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<RuleSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub notification_id: NotificationId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Correlation ids attached to every outcome log entry
#[derive(Debug, Clone, Copy)]
pub struct OutcomeContext {
    pub run_id: Uuid,
    pub form_id: FormId,
    pub submission_id: SubmissionId,
    pub notification_id: NotificationId,
}

/// Emit the log entry and metrics for a finished rule.
///
/// Skipped rules are counted but never logged.
pub fn report(ctx: &OutcomeContext, outcome: &RuleOutcome) {
    match outcome {
        RuleOutcome::Skipped => NotificationMetrics::record_skipped(),
        RuleOutcome::Sent => {
            NotificationMetrics::record_sent();
            tracing::info!(
                run_id = %ctx.run_id,
                form_id = ctx.form_id,
                submission_id = ctx.submission_id,
                notification_id = ctx.notification_id,
                "sent notification"
            );
        }
        RuleOutcome::Failed(err) => {
            NotificationMetrics::record_failed(err.kind());
            tracing::error!(
                run_id = %ctx.run_id,
                form_id = ctx.form_id,
                submission_id = ctx.submission_id,
                notification_id = ctx.notification_id,
                error = %err,
                error_kind = err.kind(),
                error_chain = ?err.chain(),
                "failed to process notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(outcomes: Vec<RuleOutcome>) -> ProcessReport {
        ProcessReport {
            run_id: Uuid::new_v4(),
            form_id: 1,
            submission_id: 2,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            rules: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| RuleReport {
                    notification_id: i as NotificationId + 1,
                    outcome,
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_counters() {
        let report = report_with(vec![
            RuleOutcome::Sent,
            RuleOutcome::Skipped,
            RuleOutcome::Failed(RuleError::MissingRecipient),
            RuleOutcome::Sent,
        ]);

        assert_eq!(report.sent(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.attempted(), 3);
        assert!(!report.is_success());

        let failures: Vec<_> = report.failures().map(|(id, _)| id).collect();
        assert_eq!(failures, vec![3]);
    }

    #[test]
    fn test_summary_serialization() {
        let report = report_with(vec![
            RuleOutcome::Sent,
            RuleOutcome::Failed(RuleError::ConfigNotFound(2)),
        ]);
        let json = serde_json::to_value(report.summary()).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["results"][0]["status"], "sent");
        assert!(json["results"][0].get("error").is_none());
        assert_eq!(json["results"][1]["status"], "failed");
        assert_eq!(json["results"][1]["error_kind"], "config");
        assert_eq!(json["results"][1]["error"], "Notification config 2 not found");
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = report_with(vec![]);
        assert!(report.is_success());
        assert_eq!(report.attempted(), 0);
    }
}
