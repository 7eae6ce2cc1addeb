use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use form_notification_service::config::Settings;
use form_notification_service::notification::{
    create_config_store, create_mail_transport, SubmissionNotificationService, TemplateRenderer,
};
use form_notification_service::postgres::PostgresPool;
use form_notification_service::server::{create_app, AppState};
use form_notification_service::telemetry::init_telemetry;
use form_notification_service::triggers::RedisSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Keep the guard alive until shutdown so pending spans are flushed
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    let postgres_pool = if settings.database.url.is_some() {
        Some(PostgresPool::new(&settings.database).await?)
    } else {
        None
    };

    let store = create_config_store(&settings.store, postgres_pool.clone());
    let transport = create_mail_transport(&settings.mail)?;
    let notifications = Arc::new(SubmissionNotificationService::new(
        store,
        transport,
        TemplateRenderer::new(&settings.render),
    ));
    tracing::info!(
        config_store = notifications.store_name(),
        mail_transport = notifications.transport_name(),
        "Notification pipeline initialized"
    );

    // Start Redis subscriber in background
    let redis_subscriber = Arc::new(RedisSubscriber::new(
        settings.redis.clone(),
        notifications.clone(),
    ));
    let shutdown_signal = redis_subscriber.shutdown_signal();
    let redis_handle = {
        let subscriber = redis_subscriber.clone();
        tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis subscriber failed");
            }
        })
    };

    let state = AppState::new(settings.clone(), notifications, postgres_pool.clone());
    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = redis_handle.await;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the Redis subscriber
    let _ = shutdown_tx.send(());
}
