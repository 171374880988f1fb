use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use parlo_common::db::user_deletion::DeletionStore;
use parlo_common::events::{
    EventBus, EventBusError, SUBJECT_USER_DELETE, SUBJECT_USER_DELETE_CANCEL,
};

#[derive(Debug, Deserialize)]
struct UserDeleteEvent {
    user_id: Uuid,
}

/// Consumer for the deletion-lifecycle subjects. The bus delivers
/// at-least-once with no ordering, so both handlers are idempotent: a
/// redelivered `user.delete` refreshes the existing record instead of
/// duplicating it, and a redelivered cancel is a no-op once the record has
/// left its pending state.
pub struct DeletionIngress {
    deletion_store: Arc<dyn DeletionStore>,
    queue_delay: Duration,
}

impl DeletionIngress {
    pub fn new(deletion_store: Arc<dyn DeletionStore>, queue_delay: Duration) -> Self {
        Self {
            deletion_store,
            queue_delay,
        }
    }

    /// Subscribes to the deletion subjects and dispatches until the bus
    /// closes.
    pub async fn run(self, bus: Arc<dyn EventBus>) -> Result<(), EventBusError> {
        let mut delete_subscription = bus.subscribe(SUBJECT_USER_DELETE).await?;
        let mut cancel_subscription = bus.subscribe(SUBJECT_USER_DELETE_CANCEL).await?;

        log::info!(
            "Deletion ingress subscribed to '{SUBJECT_USER_DELETE}' and \
             '{SUBJECT_USER_DELETE_CANCEL}'"
        );

        loop {
            tokio::select! {
                event = delete_subscription.next() => match event {
                    Some(event) => self.handle_delete(&event.data).await,
                    None => break,
                },
                event = cancel_subscription.next() => match event {
                    Some(event) => self.handle_cancel(&event.data).await,
                    None => break,
                },
            }
        }

        Ok(())
    }

    pub async fn handle_delete(&self, payload: &[u8]) {
        let event = match serde_json::from_slice::<UserDeleteEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                // Malformed payloads can never succeed on retry
                log::warn!("Dropping malformed '{SUBJECT_USER_DELETE}' event: {e}");
                return;
            }
        };

        let scheduled_date = SystemTime::now() + self.queue_delay;

        match self
            .deletion_store
            .upsert_queued_deletion(event.user_id, scheduled_date)
            .await
        {
            Ok(()) => log::info!(
                "Queued deletion for user {}; eligible for execution in {} hours",
                event.user_id,
                self.queue_delay.as_secs() / 3600
            ),
            // Retry depends on the broker's redelivery behavior
            Err(e) => log::error!("Failed to queue deletion for user {}: {e}", event.user_id),
        }
    }

    pub async fn handle_cancel(&self, payload: &[u8]) {
        let event = match serde_json::from_slice::<UserDeleteEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping malformed '{SUBJECT_USER_DELETE_CANCEL}' event: {e}");
                return;
            }
        };

        match self.deletion_store.cancel_deletion(event.user_id).await {
            Ok(true) => log::info!("Cancelled pending deletion for user {}", event.user_id),
            Ok(false) => log::info!(
                "No pending deletion to cancel for user {}",
                event.user_id
            ),
            Err(e) => log::error!(
                "Failed to cancel deletion for user {}: {e}",
                event.user_id
            ),
        }
    }
}
