use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use uuid::Uuid;

const GLOBAL_DELETION_COUNT_PREFIX: &str = "global:deletion:count:";
const USER_EMAIL_COUNT_PREFIX: &str = "user:email:count:";

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn global_deletion_key(day: NaiveDate) -> String {
    format!("{}{}", GLOBAL_DELETION_COUNT_PREFIX, day.format("%Y-%m-%d"))
}

pub fn user_email_key(user_id: Uuid, day: NaiveDate) -> String {
    format!(
        "{}{}:{}",
        USER_EMAIL_COUNT_PREFIX,
        user_id,
        day.format("%Y-%m-%d")
    )
}

// Unix timestamp of the next UTC midnight. Counter keys expire there so each
// calendar day starts from zero.
fn next_utc_day_boundary() -> i64 {
    let tomorrow = Utc::now().date_naive() + Days::new(1);
    tomorrow.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[derive(Debug)]
pub enum CounterError {
    StoreUnavailable(redis::RedisError),
}

impl std::error::Error for CounterError {}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterError::StoreUnavailable(e) => {
                write!(f, "CounterError: Counter store unavailable: {e}")
            }
        }
    }
}

impl From<redis::RedisError> for CounterError {
    fn from(error: redis::RedisError) -> Self {
        CounterError::StoreUnavailable(error)
    }
}

/// Atomic daily counters backing the capacity gate. An unreachable store is
/// always surfaced as `StoreUnavailable`; the fail-open/fail-closed decision
/// belongs to the caller, not to this layer.
#[async_trait]
pub trait Counters: Send + Sync {
    /// Increments the key and refreshes its expiry to the next UTC day
    /// boundary, atomically, returning the new count.
    async fn increment(&self, key: &str) -> Result<i64, CounterError>;

    /// Current count for the key, zero when the key is absent.
    async fn current(&self, key: &str) -> Result<i64, CounterError>;
}

pub struct RedisCounters {
    connection: ConnectionManager,
}

impl RedisCounters {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl Counters for RedisCounters {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        let mut connection = self.connection.clone();

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .cmd("EXPIREAT")
            .arg(key)
            .arg(next_utc_day_boundary())
            .ignore()
            .query_async(&mut connection)
            .await?;

        Ok(count)
    }

    async fn current(&self, key: &str) -> Result<i64, CounterError> {
        let mut connection = self.connection.clone();
        let count: Option<i64> = connection.get(key).await?;
        Ok(count.unwrap_or(0))
    }
}
