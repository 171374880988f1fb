use async_trait::async_trait;
use diesel::dsl;
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::email_send::EmailSend;

use crate::schema::email_sends::dsl::email_sends;

/// Ledger of outbound emails. Recording is best-effort from the caller's
/// perspective; the send itself has already happened.
#[async_trait]
pub trait SendLog: Send + Sync {
    async fn record_send(&self, user_id: Option<Uuid>, template: &str) -> Result<(), DaoError>;
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
impl SendLog for Dao {
    async fn record_send(&self, user_id: Option<Uuid>, template: &str) -> Result<(), DaoError> {
        let send_record = EmailSend {
            id: Uuid::now_v7(),
            user_id,
            template: String::from(template),
            sent_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        dsl::insert_into(email_sends)
            .values(&send_record)
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
