use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use parlo_common::db::user_deletion::DeletionStore;
use parlo_common::models::user_deletion::{DeletionStatus, UserDeletion};

use crate::capacity::CapacityGate;
use crate::executor::DeletionExecutor;
use crate::jobs::{Job, JobError};
use crate::notifier::RecoveryNotifier;

/// Walks deletion records through their lifecycle. A `queued` record inside
/// the warning window gets its recovery email and advances to `scheduled`;
/// a `scheduled` record whose date has arrived is executed. Each step is
/// gated on the daily quotas, and a record that trips a quota simply waits
/// for a later tick.
pub struct ProcessUserDeletionsJob {
    deletion_store: Arc<dyn DeletionStore>,
    gate: Arc<CapacityGate>,
    notifier: Arc<RecoveryNotifier>,
    executor: Arc<DeletionExecutor>,
    warning_period: Duration,
    is_running: bool,
}

impl ProcessUserDeletionsJob {
    pub fn new(
        deletion_store: Arc<dyn DeletionStore>,
        gate: Arc<CapacityGate>,
        notifier: Arc<RecoveryNotifier>,
        executor: Arc<DeletionExecutor>,
        warning_period: Duration,
    ) -> Self {
        Self {
            deletion_store,
            gate,
            notifier,
            executor,
            warning_period,
            is_running: false,
        }
    }

    async fn run(&self) -> Result<(), JobError> {
        let now = SystemTime::now();
        let horizon = now + self.warning_period;

        // A scan failure aborts the whole tick; there is nothing to act on
        let due_records = self.deletion_store.get_deletions_due(horizon).await?;

        for record in due_records {
            if let Err(e) = self.process_record(&record, now).await {
                // One bad record must not starve the rest of the batch
                log::error!(
                    "Failed to process deletion record {} for user {}: {e}",
                    record.id,
                    record.user_id
                );
            }
        }

        Ok(())
    }

    async fn process_record(
        &self,
        record: &UserDeletion,
        now: SystemTime,
    ) -> Result<(), JobError> {
        match record.status {
            DeletionStatus::Queued => {
                if !self.gate.can_send_recovery_email(record.user_id).await {
                    log::info!(
                        "Recovery email quota reached for user {}; deferring warning",
                        record.user_id
                    );
                    return Ok(());
                }

                self.notifier
                    .send_recovery(record.user_id, record.scheduled_date)
                    .await?;

                let advanced = self.deletion_store.mark_scheduled(record.id).await?;
                if !advanced {
                    log::warn!(
                        "Deletion record {} left the queued state while its warning was sent",
                        record.id
                    );
                }

                self.gate.record_recovery_email(record.user_id).await;

                log::info!(
                    "Sent recovery warning for user {}; deletion scheduled for {:?}",
                    record.user_id,
                    record.scheduled_date
                );
            }
            DeletionStatus::Scheduled => {
                // Scheduled records surface warning_period early; only act
                // once the date has actually arrived
                if record.scheduled_date > now {
                    return Ok(());
                }

                if !self.gate.can_execute_deletion().await {
                    log::info!(
                        "Daily deletion capacity reached; deferring user {}",
                        record.user_id
                    );
                    return Ok(());
                }

                self.executor.execute(record).await?;
                self.gate.record_deletion().await;

                log::info!("Executed scheduled deletion for user {}", record.user_id);
            }
            DeletionStatus::Executed | DeletionStatus::Cancelled => (),
        }

        Ok(())
    }
}

#[async_trait]
impl Job for ProcessUserDeletionsJob {
    fn name(&self) -> &'static str {
        "Process User Deletions"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        if !self.is_ready() {
            return Err(JobError::NotReady);
        }

        self.is_running = true;
        let result = self.run().await;
        self.is_running = false;

        result
    }
}
