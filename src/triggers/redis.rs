use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::metrics::IngestMetrics;
use crate::notification::SubmissionNotificationService;
use crate::submission::Submission;

use super::backoff::ExponentialBackoff;

/// Channel used when none is configured
pub const DEFAULT_SUBMISSION_CHANNEL: &str = "forms:submission.completed";

/// Consumes completed-submission events from Redis Pub/Sub.
///
/// Each message payload is a JSON [`Submission`] (with its form and
/// notification rules embedded) and triggers one pipeline run.
pub struct RedisSubscriber {
    config: RedisConfig,
    notifications: Arc<SubmissionNotificationService>,
    shutdown: broadcast::Sender<()>,
}

impl RedisSubscriber {
    pub fn new(config: RedisConfig, notifications: Arc<SubmissionNotificationService>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            notifications,
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Run until shutdown, reconnecting with backoff on errors
    pub async fn start(&self) -> anyhow::Result<()> {
        if !self.config.enabled {
            tracing::info!("Redis ingestion disabled, skipping Redis subscriber");
            return Ok(());
        }

        let channels = self.channels();
        tracing::info!(channels = ?channels, "Starting Redis subscriber");

        let mut backoff = ExponentialBackoff::default();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&channels, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Redis subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    IngestMetrics::record_redis_reconnect();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    fn channels(&self) -> Vec<String> {
        if self.config.channels.is_empty() {
            vec![DEFAULT_SUBMISSION_CHANNEL.to_string()]
        } else {
            self.config.channels.clone()
        }
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ExponentialBackoff,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if is_pattern(channel) {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        tracing::info!("Redis subscription established");
        backoff.reset();

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    let Some(msg) = msg else {
                        anyhow::bail!("Redis message stream ended");
                    };

                    let channel = msg.get_channel_name().to_string();
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to get message payload");
                            continue;
                        }
                    };

                    self.handle_message(&channel, &payload).await;
                }
            }
        }
    }

    /// Parse and process one submission event; failures are logged only
    async fn handle_message(&self, channel: &str, payload: &str) {
        IngestMetrics::record_redis_received();
        tracing::debug!(channel = %channel, "Received submission event");

        let submission = match parse_submission(payload) {
            Ok(s) => s,
            Err(e) => {
                IngestMetrics::record_redis_invalid();
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    "Failed to parse submission event"
                );
                return;
            }
        };

        if let Err(e) = self.notifications.process(&submission).await {
            tracing::warn!(
                channel = %channel,
                error = %e,
                "Submission notifications failed"
            );
        }
    }
}

fn is_pattern(channel: &str) -> bool {
    channel.contains('*') || channel.contains('?') || channel.contains('[')
}

fn parse_submission(payload: &str) -> Result<Submission, serde_json::Error> {
    serde_json::from_str(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MemoryConfigStore, MemoryMailTransport, TemplateRenderer};

    fn subscriber(config: RedisConfig) -> RedisSubscriber {
        let service = SubmissionNotificationService::new(
            Arc::new(MemoryConfigStore::new()),
            Arc::new(MemoryMailTransport::new()),
            TemplateRenderer::default(),
        );
        RedisSubscriber::new(config, Arc::new(service))
    }

    #[test]
    fn test_parse_submission_event() {
        let json = r#"{
            "id": 55,
            "form_id": 9,
            "fields": [{"field_id": 1, "content": "visitor@example.com"}],
            "form": {
                "id": 9,
                "notifications": [{
                    "id": 3,
                    "enabled": true,
                    "to_field": {"id": 1},
                    "from_email": "forms@example.com",
                    "subject": "New entry",
                    "html_template": "<mjml><mj-body></mj-body></mjml>"
                }]
            }
        }"#;

        let submission = parse_submission(json).unwrap();
        assert_eq!(submission.id, 55);
        assert_eq!(submission.form.notifications.len(), 1);
        assert_eq!(submission.form.notifications[0].to_field.unwrap().id, 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_submission("not json").is_err());
        assert!(parse_submission(r#"{"id": 1}"#).is_err());
    }

    #[test]
    fn test_default_channel() {
        let sub = subscriber(RedisConfig::default());
        assert_eq!(sub.channels(), vec![DEFAULT_SUBMISSION_CHANNEL.to_string()]);

        let sub = subscriber(RedisConfig {
            channels: vec!["forms:*".to_string()],
            ..RedisConfig::default()
        });
        assert_eq!(sub.channels(), vec!["forms:*".to_string()]);
    }

    #[test]
    fn test_pattern_detection() {
        assert!(is_pattern("forms:*"));
        assert!(is_pattern("forms:submission.[ab]"));
        assert!(!is_pattern(DEFAULT_SUBMISSION_CHANNEL));
    }

    #[tokio::test]
    async fn test_disabled_subscriber_returns_immediately() {
        let sub = subscriber(RedisConfig::default());
        sub.start().await.unwrap();
    }
}
