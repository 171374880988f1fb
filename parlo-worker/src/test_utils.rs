use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use parlo_common::cache::{CounterError, Counters};
use parlo_common::db::deletion_capacity::CapacityLedger;
use parlo_common::db::email_send::SendLog;
use parlo_common::db::user::UserStore;
use parlo_common::db::user_deletion::DeletionStore;
use parlo_common::db::DaoError;
use parlo_common::email::{EmailError, EmailMessage, SendEmail};
use parlo_common::models::user::User;
use parlo_common::models::user_deletion::{DeletionStatus, UserDeletion};

pub fn test_user(name: &str) -> User {
    User {
        id: Uuid::now_v7(),
        name: String::from(name),
        email: format!("{}@example.com", name.to_lowercase()),
        created_timestamp: SystemTime::now(),
        is_deleted: false,
        deleted_at: None,
        deletion_due_at: None,
    }
}

pub fn test_deletion(
    user_id: Uuid,
    status: DeletionStatus,
    scheduled_date: SystemTime,
) -> UserDeletion {
    UserDeletion {
        id: Uuid::now_v7(),
        user_id,
        scheduled_date,
        status,
        executed: status == DeletionStatus::Executed,
        created_timestamp: SystemTime::now(),
        recovery_token: None,
        recovery_token_expires_at: None,
    }
}

fn store_offline() -> DaoError {
    DaoError::DbAsyncPoolFailure(String::from("store offline"))
}

pub struct MemoryCounters {
    counts: Mutex<HashMap<String, i64>>,
    available: AtomicBool,
}

impl MemoryCounters {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drops every counter, as the daily key expiry does at UTC midnight.
    pub fn clear(&self) {
        self.counts.lock().unwrap().clear();
    }
}

#[async_trait]
impl Counters for MemoryCounters {
    async fn increment(&self, key: &str) -> Result<i64, CounterError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CounterError::StoreUnavailable(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "counter store offline",
            ))));
        }

        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(String::from(key)).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn current(&self, key: &str) -> Result<i64, CounterError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CounterError::StoreUnavailable(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "counter store offline",
            ))));
        }

        Ok(*self.counts.lock().unwrap().get(key).unwrap_or(&0))
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    days: Mutex<HashMap<NaiveDate, i32>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_for(&self, day: NaiveDate) -> i32 {
        *self.days.lock().unwrap().get(&day).unwrap_or(&0)
    }
}

#[async_trait]
impl CapacityLedger for MemoryLedger {
    async fn increment_day(&self, day: NaiveDate, _max_limit: i32) -> Result<(), DaoError> {
        *self.days.lock().unwrap().entry(day).or_insert(0) += 1;
        Ok(())
    }
}

/// In-memory `DeletionStore` honoring the same conditional-update semantics
/// as the postgres DAO.
#[derive(Default)]
pub struct MemoryDeletionStore {
    records: Mutex<HashMap<Uuid, UserDeletion>>,
    fail_scan: AtomicBool,
}

impl MemoryDeletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scan_failing(&self, failing: bool) {
        self.fail_scan.store(failing, Ordering::SeqCst);
    }

    pub fn insert(&self, record: UserDeletion) {
        self.records
            .lock()
            .unwrap()
            .insert(record.user_id, record);
    }

    pub fn record_for_user(&self, user_id: Uuid) -> Option<UserDeletion> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl DeletionStore for MemoryDeletionStore {
    async fn upsert_queued_deletion(
        &self,
        user_id: Uuid,
        scheduled_date: SystemTime,
    ) -> Result<(), DaoError> {
        let mut records = self.records.lock().unwrap();

        match records.get_mut(&user_id) {
            Some(record) => {
                record.scheduled_date = scheduled_date;
                record.status = DeletionStatus::Queued;
                record.executed = false;
                record.created_timestamp = SystemTime::now();
            }
            None => {
                records.insert(
                    user_id,
                    test_deletion(user_id, DeletionStatus::Queued, scheduled_date),
                );
            }
        }

        Ok(())
    }

    async fn get_deletions_due(
        &self,
        horizon: SystemTime,
    ) -> Result<Vec<UserDeletion>, DaoError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(store_offline());
        }

        let mut due: Vec<UserDeletion> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                matches!(
                    r.status,
                    DeletionStatus::Queued | DeletionStatus::Scheduled
                ) && r.scheduled_date <= horizon
            })
            .cloned()
            .collect();

        // Deterministic order for assertions
        due.sort_by_key(|r| r.created_timestamp);
        Ok(due)
    }

    async fn mark_scheduled(&self, deletion_id: Uuid) -> Result<bool, DaoError> {
        let mut records = self.records.lock().unwrap();
        for record in records.values_mut() {
            if record.id == deletion_id && record.status == DeletionStatus::Queued {
                record.status = DeletionStatus::Scheduled;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn mark_executed(&self, deletion_id: Uuid) -> Result<bool, DaoError> {
        let mut records = self.records.lock().unwrap();
        for record in records.values_mut() {
            if record.id == deletion_id && record.status == DeletionStatus::Scheduled {
                record.status = DeletionStatus::Executed;
                record.executed = true;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn cancel_deletion(&self, user_id: Uuid) -> Result<bool, DaoError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&user_id) {
            if matches!(
                record.status,
                DeletionStatus::Queued | DeletionStatus::Scheduled
            ) {
                record.status = DeletionStatus::Cancelled;
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    audit_entries: Mutex<Vec<Uuid>>,
    fail_soft_delete_for: Mutex<HashSet<Uuid>>,
    fail_hard_delete_for: Mutex<HashSet<Uuid>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn fail_soft_delete_for(&self, user_id: Uuid) {
        self.fail_soft_delete_for.lock().unwrap().insert(user_id);
    }

    pub fn fail_hard_delete_for(&self, user_id: Uuid) {
        self.fail_hard_delete_for.lock().unwrap().insert(user_id);
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.users.lock().unwrap().contains_key(&user_id)
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn audit_entry_count_for(&self, user_id: Uuid) -> usize {
        self.audit_entries
            .lock()
            .unwrap()
            .iter()
            .filter(|id| **id == user_id)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, DaoError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn soft_delete_user(
        &self,
        user_id: Uuid,
        timestamp: SystemTime,
    ) -> Result<bool, DaoError> {
        if self.fail_soft_delete_for.lock().unwrap().contains(&user_id) {
            return Err(store_offline());
        }

        let mut users = self.users.lock().unwrap();
        let user = match users.get_mut(&user_id) {
            Some(user) if !user.is_deleted => user,
            _ => return Ok(false),
        };

        user.is_deleted = true;
        user.deleted_at = Some(timestamp);
        user.deletion_due_at = Some(timestamp);

        self.audit_entries.lock().unwrap().push(user_id);
        Ok(true)
    }

    async fn hard_delete_user(&self, user_id: Uuid) -> Result<(), DaoError> {
        if self.fail_hard_delete_for.lock().unwrap().contains(&user_id) {
            return Err(store_offline());
        }

        self.users.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn get_soft_deleted_users_older_than(
        &self,
        retention: Duration,
    ) -> Result<Vec<User>, DaoError> {
        let cutoff = SystemTime::now() - retention;

        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.is_deleted && u.deleted_at.is_some_and(|at| at <= cutoff))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<String>>,
    fail_for: Mutex<HashSet<String>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, destination: &str) {
        self.fail_for
            .lock()
            .unwrap()
            .insert(String::from(destination));
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_to(&self, destination: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|d| *d == destination)
            .count()
    }
}

#[async_trait]
impl SendEmail for RecordingSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        if self
            .fail_for
            .lock()
            .unwrap()
            .contains(message.destination)
        {
            return Err(EmailError::RelayConnectionFailed(String::from(
                "relay offline",
            )));
        }

        self.sent
            .lock()
            .unwrap()
            .push(String::from(message.destination));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySendLog {
    sends: Mutex<Vec<(Option<Uuid>, String)>>,
}

impl MemorySendLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

#[async_trait]
impl SendLog for MemorySendLog {
    async fn record_send(&self, user_id: Option<Uuid>, template: &str) -> Result<(), DaoError> {
        self.sends
            .lock()
            .unwrap()
            .push((user_id, String::from(template)));
        Ok(())
    }
}
