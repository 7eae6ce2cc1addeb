use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::metrics::NotificationMetrics;
use crate::submission::{NotificationRule, Submission};

use super::address::{resolve_address, EffectiveFieldIds};
use super::error::{ProcessError, RuleError};
use super::mailer::{dispatch, MailTransport, OutboundEmail};
use super::outcome::{report, OutcomeContext, ProcessReport, RuleOutcome, RuleReport};
use super::render::TemplateRenderer;
use super::store::NotificationConfigStore;

/// Sends the email notifications configured on a submission's form
pub struct SubmissionNotificationService {
    store: Arc<dyn NotificationConfigStore>,
    transport: Arc<dyn MailTransport>,
    renderer: TemplateRenderer,
}

impl SubmissionNotificationService {
    pub fn new(
        store: Arc<dyn NotificationConfigStore>,
        transport: Arc<dyn MailTransport>,
        renderer: TemplateRenderer,
    ) -> Self {
        Self {
            store,
            transport,
            renderer,
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Run every notification rule of the submission's form.
    ///
    /// All rules are attempted concurrently and the call returns only once
    /// each of them has settled. Fails if any enabled rule failed; the error
    /// carries the full report.
    pub async fn process(&self, submission: &Submission) -> Result<ProcessReport, ProcessError> {
        let report = self.process_all(submission).await;
        if report.is_success() {
            Ok(report)
        } else {
            Err(ProcessError::new(report))
        }
    }

    /// Run every notification rule and return all outcomes, failed or not
    #[tracing::instrument(
        name = "notifications.process",
        skip(self, submission),
        fields(
            form_id = submission.form_id,
            submission_id = submission.id,
            rules = submission.form.notifications.len()
        )
    )]
    pub async fn process_all(&self, submission: &Submission) -> ProcessReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let rules = join_all(
            submission
                .form
                .notifications
                .iter()
                .map(|rule| self.process_rule(run_id, submission, rule)),
        )
        .await;

        NotificationMetrics::record_submission();

        let report = ProcessReport {
            run_id,
            form_id: submission.form_id,
            submission_id: submission.id,
            started_at,
            finished_at: Utc::now(),
            rules,
        };

        tracing::debug!(
            run_id = %run_id,
            sent = report.sent(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Processed submission notifications"
        );

        report
    }

    async fn process_rule(
        &self,
        run_id: Uuid,
        submission: &Submission,
        rule: &NotificationRule,
    ) -> RuleReport {
        let outcome = if rule.enabled {
            match self.attempt(submission, rule).await {
                Ok(()) => RuleOutcome::Sent,
                Err(err) => RuleOutcome::Failed(err),
            }
        } else {
            RuleOutcome::Skipped
        };

        let ctx = OutcomeContext {
            run_id,
            form_id: submission.form_id,
            submission_id: submission.id,
            notification_id: rule.id,
        };
        report(&ctx, &outcome);

        RuleReport {
            notification_id: rule.id,
            outcome,
        }
    }

    /// fetch -> resolve -> render -> dispatch, strictly in order
    #[tracing::instrument(
        name = "notifications.attempt",
        skip(self, submission, rule),
        fields(notification_id = rule.id)
    )]
    async fn attempt(&self, submission: &Submission, rule: &NotificationRule) -> Result<(), RuleError> {
        let record = self
            .store
            .find_by_id(rule.id)
            .await?
            .ok_or(RuleError::ConfigNotFound(rule.id))?;

        let fields = EffectiveFieldIds::resolve(rule, &record);

        let to = resolve_address(submission, fields.to_field_id, rule.to_email.as_deref())
            .filter(|to| !to.trim().is_empty())
            .ok_or(RuleError::MissingRecipient)?;
        let reply_to = resolve_address(submission, fields.from_field_id, rule.from_email.as_deref())
            .filter(|from| !from.trim().is_empty());

        // template variables are not bound yet
        let rendered = self
            .renderer
            .render(&rule.html_template, &serde_json::json!({}))?;

        let message = OutboundEmail {
            to,
            reply_to,
            subject: rule.subject.clone(),
            html: rendered.html,
            text: rendered.text,
        };

        dispatch(self.transport.as_ref(), &message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::mailer::MemoryMailTransport;
    use crate::notification::store::{MemoryConfigStore, NotificationConfigRecord};
    use crate::submission::{Field, FieldContent, FieldRef, Form};

    const TEMPLATE: &str = "<mjml><mj-body><mj-section><mj-column><mj-text>New answer</mj-text></mj-column></mj-section></mj-body></mjml>";

    fn rule(id: i64) -> NotificationRule {
        NotificationRule {
            id,
            enabled: true,
            to_field: None,
            to_email: Some("a@x.com".to_string()),
            from_field: None,
            from_email: Some("b@x.com".to_string()),
            subject: "New submission".to_string(),
            html_template: TEMPLATE.to_string(),
        }
    }

    fn submission(rules: Vec<NotificationRule>, fields: Vec<Field>) -> Submission {
        Submission {
            id: 100,
            form_id: 10,
            fields,
            form: Form {
                id: 10,
                notifications: rules,
            },
        }
    }

    fn service(
        records: Vec<NotificationConfigRecord>,
        transport: Arc<MemoryMailTransport>,
    ) -> SubmissionNotificationService {
        let store: MemoryConfigStore = records.into_iter().collect();
        SubmissionNotificationService::new(
            Arc::new(store),
            transport,
            TemplateRenderer::default(),
        )
    }

    #[tokio::test]
    async fn test_field_answer_overrides_fallback() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(vec![NotificationConfigRecord::empty(1)], transport.clone());

        let mut r = rule(1);
        r.to_field = Some(FieldRef { id: 5 });
        let s = submission(
            vec![r],
            vec![Field {
                field_id: 5,
                content: Some(FieldContent::Text("visitor@y.com".into())),
            }],
        );

        svc.process(&s).await.unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent[0].to, "visitor@y.com");
        assert_eq!(sent[0].reply_to.as_deref(), Some("b@x.com"));
    }

    #[tokio::test]
    async fn test_persisted_record_supplies_field_ids() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(
            vec![NotificationConfigRecord {
                id: 1,
                to_field_id: None,
                from_field_id: Some(6),
            }],
            transport.clone(),
        );

        let s = submission(
            vec![rule(1)],
            vec![Field {
                field_id: 6,
                content: Some(FieldContent::Text("visitor@y.com".into())),
            }],
        );

        svc.process(&s).await.unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].reply_to.as_deref(), Some("visitor@y.com"));
    }

    #[tokio::test]
    async fn test_missing_config_record_fails_rule() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(vec![], transport.clone());

        let err = svc.process(&submission(vec![rule(1)], vec![])).await.unwrap_err();
        let (id, rule_err) = err.failures().next().unwrap();
        assert_eq!(id, 1);
        assert!(matches!(rule_err, RuleError::ConfigNotFound(1)));
        assert_eq!(transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_recipient_fails_before_dispatch() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(vec![NotificationConfigRecord::empty(1)], transport.clone());

        let mut r = rule(1);
        r.to_email = None;
        let err = svc.process(&submission(vec![r], vec![])).await.unwrap_err();

        assert!(matches!(
            err.failures().next(),
            Some((1, RuleError::MissingRecipient))
        ));
        assert_eq!(transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_reply_to_is_omitted() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(vec![NotificationConfigRecord::empty(1)], transport.clone());

        let mut r = rule(1);
        r.from_email = None;
        svc.process(&submission(vec![r], vec![])).await.unwrap();

        assert_eq!(transport.sent().await[0].reply_to, None);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported() {
        let transport = Arc::new(MemoryMailTransport::failing("connection refused"));
        let svc = service(vec![NotificationConfigRecord::empty(1)], transport.clone());

        let err = svc.process(&submission(vec![rule(1)], vec![])).await.unwrap_err();
        let (_, rule_err) = err.failures().next().unwrap();
        assert_eq!(rule_err.kind(), "dispatch");
        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_empty_form_succeeds() {
        let transport = Arc::new(MemoryMailTransport::new());
        let svc = service(vec![], transport.clone());

        let report = svc.process(&submission(vec![], vec![])).await.unwrap();
        assert!(report.rules.is_empty());
        assert_eq!(transport.sent_count().await, 0);
    }
}
