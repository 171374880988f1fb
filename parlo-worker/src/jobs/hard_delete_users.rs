use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use parlo_common::db::user::UserStore;

use crate::jobs::{Job, JobError};

/// Purges soft-deleted users whose retention window has elapsed. The purge
/// cascades through the user's dependent rows in the store, so a row that
/// survives a failed attempt is simply retried on the next sweep.
pub struct HardDeleteUsersJob {
    user_store: Arc<dyn UserStore>,
    retention: Duration,
    is_running: bool,
}

impl HardDeleteUsersJob {
    pub fn new(user_store: Arc<dyn UserStore>, retention: Duration) -> Self {
        Self {
            user_store,
            retention,
            is_running: false,
        }
    }

    async fn sweep(&self) -> Result<(), JobError> {
        let expired_users = self
            .user_store
            .get_soft_deleted_users_older_than(self.retention)
            .await?;

        if expired_users.is_empty() {
            return Ok(());
        }

        log::info!(
            "Purging {} user(s) past the retention window",
            expired_users.len()
        );

        for user in expired_users {
            match self.user_store.hard_delete_user(user.id).await {
                Ok(()) => log::info!("Purged user {}", user.id),
                // Leave the row for the next sweep
                Err(e) => log::error!("Failed to purge user {}: {e}", user.id),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Job for HardDeleteUsersJob {
    fn name(&self) -> &'static str {
        "Hard Delete Users"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        if !self.is_ready() {
            return Err(JobError::NotReady);
        }

        self.is_running = true;
        let result = self.sweep().await;
        self.is_running = false;

        result
    }
}
