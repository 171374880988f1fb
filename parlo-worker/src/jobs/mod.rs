mod hard_delete_users;
mod process_user_deletions;

pub use hard_delete_users::HardDeleteUsersJob;
pub use process_user_deletions::ProcessUserDeletionsJob;

use parlo_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;

use crate::notifier::NotifierError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    NotificationFailure(NotifierError),
    NotReady,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => write!(f, "JobError: {e}"),
            JobError::NotificationFailure(e) => write!(f, "JobError: {e}"),
            JobError::NotReady => {
                write!(f, "JobError: Attempted execution before job was ready")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<NotifierError> for JobError {
    fn from(e: NotifierError) -> Self {
        JobError::NotificationFailure(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}
