use std::sync::Arc;
use uuid::Uuid;

use parlo_common::cache::{global_deletion_key, today_utc, user_email_key, Counters};
use parlo_common::db::deletion_capacity::CapacityLedger;

/// Daily-quota gate in front of the two rate-limited actions: executing a
/// soft delete (global scope) and sending a recovery email (per-user scope).
///
/// The gate holds no counts of its own; everything lives in the counter
/// store, so any number of gate instances observe the same quota. When the
/// store is unreachable both checks deny. The deletion is irreversible and
/// the email is user-facing spam potential, so neither action should run
/// blind. A denied check is not an error; the caller simply retries on a
/// later tick.
///
/// Check-then-increment is deliberately not serialized across processes.
/// Concurrent ticks can overshoot the ceiling by a few actions, which is
/// acceptable for day-scale quotas of this size.
pub struct CapacityGate {
    counters: Arc<dyn Counters>,
    ledger: Arc<dyn CapacityLedger>,
    max_deletions_per_day: i32,
    max_recovery_emails_per_user_per_day: i32,
}

impl CapacityGate {
    pub fn new(
        counters: Arc<dyn Counters>,
        ledger: Arc<dyn CapacityLedger>,
        max_deletions_per_day: i32,
        max_recovery_emails_per_user_per_day: i32,
    ) -> Self {
        Self {
            counters,
            ledger,
            max_deletions_per_day,
            max_recovery_emails_per_user_per_day,
        }
    }

    pub async fn can_execute_deletion(&self) -> bool {
        let key = global_deletion_key(today_utc());

        match self.counters.current(&key).await {
            Ok(count) => count < i64::from(self.max_deletions_per_day),
            Err(e) => {
                log::error!("Counter store check failed for '{key}'; denying deletion: {e}");
                false
            }
        }
    }

    pub async fn can_send_recovery_email(&self, user_id: Uuid) -> bool {
        let key = user_email_key(user_id, today_utc());

        match self.counters.current(&key).await {
            Ok(count) => count < i64::from(self.max_recovery_emails_per_user_per_day),
            Err(e) => {
                log::error!("Counter store check failed for '{key}'; denying recovery email: {e}");
                false
            }
        }
    }

    /// Best-effort usage accounting; the gated action has already happened,
    /// so failures are logged rather than propagated.
    pub async fn record_deletion(&self) {
        let key = global_deletion_key(today_utc());

        match self.counters.increment(&key).await {
            Ok(count) => log::info!("Global deletion count is now {count}"),
            Err(e) => log::error!("Failed to increment '{key}': {e}"),
        }

        if let Err(e) = self
            .ledger
            .increment_day(today_utc(), self.max_deletions_per_day)
            .await
        {
            log::error!("Failed to record deletion in the capacity ledger: {e}");
        }
    }

    pub async fn record_recovery_email(&self, user_id: Uuid) {
        let key = user_email_key(user_id, today_utc());

        match self.counters.increment(&key).await {
            Ok(count) => log::info!("Recovery email count for user {user_id} is now {count}"),
            Err(e) => log::error!("Failed to increment '{key}': {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryCounters, MemoryLedger};

    fn gate(counters: &Arc<MemoryCounters>, ledger: &Arc<MemoryLedger>) -> CapacityGate {
        CapacityGate::new(counters.clone(), ledger.clone(), 2, 1)
    }

    #[tokio::test]
    async fn deletion_quota_denies_at_limit() {
        let counters = Arc::new(MemoryCounters::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gate = gate(&counters, &ledger);

        assert!(gate.can_execute_deletion().await);
        gate.record_deletion().await;
        assert!(gate.can_execute_deletion().await);
        gate.record_deletion().await;
        assert!(!gate.can_execute_deletion().await);
    }

    #[tokio::test]
    async fn email_quota_is_scoped_per_user() {
        let counters = Arc::new(MemoryCounters::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gate = gate(&counters, &ledger);

        let first_user = Uuid::now_v7();
        let second_user = Uuid::now_v7();

        assert!(gate.can_send_recovery_email(first_user).await);
        gate.record_recovery_email(first_user).await;

        assert!(!gate.can_send_recovery_email(first_user).await);
        assert!(gate.can_send_recovery_email(second_user).await);
    }

    #[tokio::test]
    async fn gate_fails_closed_when_store_is_unavailable() {
        let counters = Arc::new(MemoryCounters::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gate = gate(&counters, &ledger);

        counters.set_available(false);

        assert!(!gate.can_execute_deletion().await);
        assert!(!gate.can_send_recovery_email(Uuid::now_v7()).await);
    }

    #[tokio::test]
    async fn record_deletion_mirrors_into_the_ledger() {
        let counters = Arc::new(MemoryCounters::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gate = gate(&counters, &ledger);

        gate.record_deletion().await;
        gate.record_deletion().await;

        assert_eq!(ledger.count_for(today_utc()), 2);
    }

    #[tokio::test]
    async fn recording_survives_an_unavailable_store() {
        let counters = Arc::new(MemoryCounters::new());
        let ledger = Arc::new(MemoryLedger::new());
        let gate = gate(&counters, &ledger);

        counters.set_available(false);

        // Must not panic or propagate; accounting is best-effort
        gate.record_deletion().await;
        gate.record_recovery_email(Uuid::now_v7()).await;
    }
}
