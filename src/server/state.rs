use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::SubmissionNotificationService;
use crate::postgres::PostgresPool;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub notifications: Arc<SubmissionNotificationService>,
    pub postgres_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        notifications: Arc<SubmissionNotificationService>,
        postgres_pool: Option<PostgresPool>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            notifications,
            postgres_pool,
            start_time: Instant::now(),
        }
    }
}
