use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{dsl, ExpressionMethods};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::deletion_capacity::DeletionCapacity;

use crate::schema::deletion_capacity as deletion_capacity_fields;
use crate::schema::deletion_capacity::dsl::deletion_capacity;

/// Postgres mirror of the day's executed-deletion count. The counter store
/// remains the source of truth for the gate check; this ledger exists so the
/// day's usage survives counter expiry and is queryable alongside the rest
/// of the audit data.
#[async_trait]
pub trait CapacityLedger: Send + Sync {
    async fn increment_day(&self, day: NaiveDate, max_limit: i32) -> Result<(), DaoError>;
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
impl CapacityLedger for Dao {
    async fn increment_day(&self, day: NaiveDate, max_limit: i32) -> Result<(), DaoError> {
        let now = SystemTime::now();

        let new_capacity = DeletionCapacity {
            day,
            count: 1,
            max_limit,
            updated_timestamp: now,
        };

        let mut conn = self.db_async_pool.get().await?;
        dsl::insert_into(deletion_capacity)
            .values(&new_capacity)
            .on_conflict(deletion_capacity_fields::day)
            .do_update()
            .set((
                deletion_capacity_fields::count.eq(deletion_capacity_fields::count + 1),
                deletion_capacity_fields::updated_timestamp.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
