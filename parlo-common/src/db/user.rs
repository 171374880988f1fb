use async_trait::async_trait;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::{AsyncConnection, RunQueryDsl};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::action_log::ActionLog;
use crate::models::user::User;

use crate::schema::action_logs::dsl::action_logs;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

/// The user-store collaborator consumed by the deletion pipeline. The audit
/// append is part of `soft_delete_user` because the flag update and the log
/// entry must commit or roll back together.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, DaoError>;

    /// Soft-deletes the user and appends an audit-log entry in one
    /// transaction. Returns `false` when the user was already soft-deleted
    /// (racing duplicate tick); no audit entry is written in that case.
    async fn soft_delete_user(
        &self,
        user_id: Uuid,
        timestamp: SystemTime,
    ) -> Result<bool, DaoError>;

    async fn hard_delete_user(&self, user_id: Uuid) -> Result<(), DaoError>;

    async fn get_soft_deleted_users_older_than(
        &self,
        retention: Duration,
    ) -> Result<Vec<User>, DaoError>;
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
impl UserStore for Dao {
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users
            .find(user_id)
            .first::<User>(&mut conn)
            .await
            .optional()?)
    }

    async fn soft_delete_user(
        &self,
        user_id: Uuid,
        timestamp: SystemTime,
    ) -> Result<bool, DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        let deleted = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    let affected_rows = diesel::update(
                        users.filter(
                            user_fields::id
                                .eq(user_id)
                                .and(user_fields::is_deleted.eq(false)),
                        ),
                    )
                    .set((
                        user_fields::is_deleted.eq(true),
                        user_fields::deleted_at.eq(timestamp),
                        user_fields::deletion_due_at.eq(timestamp),
                    ))
                    .execute(conn)
                    .await?;

                    if affected_rows == 0 {
                        // Already soft-deleted; writing a second audit entry
                        // would record a deletion that did not happen
                        return Ok(false);
                    }

                    let log_entry = ActionLog {
                        id: Uuid::now_v7(),
                        user_id,
                        action: String::from("user_deleted"),
                        meta: serde_json::json!({
                            "deleted_by": "system",
                            "reason": "scheduled_deletion",
                        }),
                        created_timestamp: timestamp,
                    };

                    dsl::insert_into(action_logs)
                        .values(&log_entry)
                        .execute(conn)
                        .await?;

                    Ok(true)
                })
            })
            .await?;

        Ok(deleted)
    }

    async fn hard_delete_user(&self, user_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        diesel::delete(users.find(user_id)).execute(&mut conn).await?;
        Ok(())
    }

    async fn get_soft_deleted_users_older_than(
        &self,
        retention: Duration,
    ) -> Result<Vec<User>, DaoError> {
        let cutoff = SystemTime::now() - retention;

        let mut conn = self.db_async_pool.get().await?;
        Ok(users
            .filter(user_fields::is_deleted.eq(true))
            .filter(user_fields::deleted_at.le(Some(cutoff)))
            .get_results(&mut conn)
            .await?)
    }
}
