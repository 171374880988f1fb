use std::sync::Arc;
use std::time::SystemTime;

use parlo_common::db::user::UserStore;
use parlo_common::db::user_deletion::DeletionStore;
use parlo_common::db::DaoError;
use parlo_common::models::user_deletion::UserDeletion;

/// Applies the soft delete for a due record. The flag update and the audit
/// append commit together inside the user store; only after that commit is
/// the deletion record advanced to `executed`. If the process dies between
/// the two writes, the next tick finds the record still `scheduled`, and the
/// conditional `WHERE is_deleted = false` guard makes the retry harmless.
pub struct DeletionExecutor {
    user_store: Arc<dyn UserStore>,
    deletion_store: Arc<dyn DeletionStore>,
}

impl DeletionExecutor {
    pub fn new(user_store: Arc<dyn UserStore>, deletion_store: Arc<dyn DeletionStore>) -> Self {
        Self {
            user_store,
            deletion_store,
        }
    }

    pub async fn execute(&self, record: &UserDeletion) -> Result<(), DaoError> {
        let newly_deleted = self
            .user_store
            .soft_delete_user(record.user_id, SystemTime::now())
            .await?;

        if !newly_deleted {
            log::warn!(
                "User {} was already soft-deleted; completing deletion record {}",
                record.user_id,
                record.id
            );
        }

        let marked = self.deletion_store.mark_executed(record.id).await?;
        if !marked {
            log::warn!(
                "Deletion record {} left the scheduled state before it could be marked executed",
                record.id
            );
        }

        Ok(())
    }
}
