use async_trait::async_trait;
use diesel::upsert::excluded;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::user_deletion::{DeletionStatus, NewUserDeletion, UserDeletion};

use crate::schema::user_deletions as user_deletion_fields;
use crate::schema::user_deletions::dsl::user_deletions;

/// Store for deletion lifecycle records. All mutations are conditional on
/// the current status so that a racing ingress upsert or a duplicate tick
/// cannot move a record backwards.
#[async_trait]
pub trait DeletionStore: Send + Sync {
    /// Creates or replaces the deletion record for a user. Redelivery of the
    /// same event refreshes `scheduled_date` and resets the record to
    /// `Queued` rather than creating a duplicate.
    async fn upsert_queued_deletion(
        &self,
        user_id: Uuid,
        scheduled_date: SystemTime,
    ) -> Result<(), DaoError>;

    /// Loads every record with status in {queued, scheduled} and
    /// `scheduled_date <= horizon`.
    async fn get_deletions_due(&self, horizon: SystemTime)
        -> Result<Vec<UserDeletion>, DaoError>;

    /// `queued -> scheduled`. Returns `false` when the record was no longer
    /// `queued` (cancelled or concurrently advanced).
    async fn mark_scheduled(&self, deletion_id: Uuid) -> Result<bool, DaoError>;

    /// `scheduled -> executed` (also sets the `executed` mirror column).
    async fn mark_executed(&self, deletion_id: Uuid) -> Result<bool, DaoError>;

    /// `queued|scheduled -> cancelled`. Returns `false` when there was no
    /// pending record to cancel.
    async fn cancel_deletion(&self, user_id: Uuid) -> Result<bool, DaoError>;
}

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }
}

#[async_trait]
impl DeletionStore for Dao {
    async fn upsert_queued_deletion(
        &self,
        user_id: Uuid,
        scheduled_date: SystemTime,
    ) -> Result<(), DaoError> {
        let new_deletion = NewUserDeletion {
            id: Uuid::now_v7(),
            user_id,
            scheduled_date,
            status: DeletionStatus::Queued,
            executed: false,
            created_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        dsl::insert_into(user_deletions)
            .values(&new_deletion)
            .on_conflict(user_deletion_fields::user_id)
            .do_update()
            .set((
                user_deletion_fields::scheduled_date
                    .eq(excluded(user_deletion_fields::scheduled_date)),
                user_deletion_fields::status.eq(excluded(user_deletion_fields::status)),
                user_deletion_fields::executed.eq(false),
                user_deletion_fields::created_timestamp
                    .eq(excluded(user_deletion_fields::created_timestamp)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn get_deletions_due(
        &self,
        horizon: SystemTime,
    ) -> Result<Vec<UserDeletion>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(user_deletions
            .filter(
                user_deletion_fields::status
                    .eq_any([DeletionStatus::Queued, DeletionStatus::Scheduled]),
            )
            .filter(user_deletion_fields::scheduled_date.le(horizon))
            .get_results(&mut conn)
            .await?)
    }

    async fn mark_scheduled(&self, deletion_id: Uuid) -> Result<bool, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let affected_rows = diesel::update(
            user_deletions.filter(
                user_deletion_fields::id
                    .eq(deletion_id)
                    .and(user_deletion_fields::status.eq(DeletionStatus::Queued)),
            ),
        )
        .set(user_deletion_fields::status.eq(DeletionStatus::Scheduled))
        .execute(&mut conn)
        .await?;

        Ok(affected_rows > 0)
    }

    async fn mark_executed(&self, deletion_id: Uuid) -> Result<bool, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let affected_rows = diesel::update(
            user_deletions.filter(
                user_deletion_fields::id
                    .eq(deletion_id)
                    .and(user_deletion_fields::status.eq(DeletionStatus::Scheduled)),
            ),
        )
        .set((
            user_deletion_fields::status.eq(DeletionStatus::Executed),
            user_deletion_fields::executed.eq(true),
        ))
        .execute(&mut conn)
        .await?;

        Ok(affected_rows > 0)
    }

    async fn cancel_deletion(&self, user_id: Uuid) -> Result<bool, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let affected_rows = diesel::update(
            user_deletions.filter(
                user_deletion_fields::user_id.eq(user_id).and(
                    user_deletion_fields::status
                        .eq_any([DeletionStatus::Queued, DeletionStatus::Scheduled]),
                ),
            ),
        )
        .set(user_deletion_fields::status.eq(DeletionStatus::Cancelled))
        .execute(&mut conn)
        .await?;

        Ok(affected_rows > 0)
    }
}
