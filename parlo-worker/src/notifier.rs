use lettre::message::Mailbox;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use parlo_common::db::email_send::SendLog;
use parlo_common::db::user::UserStore;
use parlo_common::db::DaoError;
use parlo_common::email::templates::{AccountRecoveryMessage, ACCOUNT_RECOVERY_TEMPLATE};
use parlo_common::email::{EmailError, EmailMessage, SendEmail};

#[derive(Debug)]
pub enum NotifierError {
    DaoFailure(DaoError),
    UnknownUser(Uuid),
    EmailFailure(EmailError),
}

impl std::error::Error for NotifierError {}

impl fmt::Display for NotifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierError::DaoFailure(e) => write!(f, "NotifierError: {e}"),
            NotifierError::UnknownUser(user_id) => {
                write!(f, "NotifierError: No user with ID {user_id}")
            }
            NotifierError::EmailFailure(e) => write!(f, "NotifierError: {e}"),
        }
    }
}

impl From<DaoError> for NotifierError {
    fn from(e: DaoError) -> Self {
        NotifierError::DaoFailure(e)
    }
}

impl From<EmailError> for NotifierError {
    fn from(e: EmailError) -> Self {
        NotifierError::EmailFailure(e)
    }
}

/// Sends the time-boxed recovery warning ahead of a scheduled deletion. Any
/// failure propagates to the scheduler so the record stays `queued` and the
/// send is retried on a later tick.
pub struct RecoveryNotifier {
    user_store: Arc<dyn UserStore>,
    email_sender: Arc<dyn SendEmail>,
    send_log: Arc<dyn SendLog>,
    from_address: Mailbox,
    reply_to_address: Mailbox,
    recovery_url: String,
}

impl RecoveryNotifier {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        email_sender: Arc<dyn SendEmail>,
        send_log: Arc<dyn SendLog>,
        from_address: Mailbox,
        reply_to_address: Mailbox,
        recovery_url: String,
    ) -> Self {
        Self {
            user_store,
            email_sender,
            send_log,
            from_address,
            reply_to_address,
            recovery_url,
        }
    }

    pub async fn send_recovery(
        &self,
        user_id: Uuid,
        scheduled_date: SystemTime,
    ) -> Result<(), NotifierError> {
        let user = self
            .user_store
            .get_user_by_id(user_id)
            .await?
            .ok_or(NotifierError::UnknownUser(user_id))?;

        let message = EmailMessage {
            body: AccountRecoveryMessage::generate(&user.name, scheduled_date, &self.recovery_url),
            subject: AccountRecoveryMessage::subject(),
            from: self.from_address.clone(),
            reply_to: self.reply_to_address.clone(),
            destination: &user.email,
            is_html: true,
        };

        self.email_sender.send(message).await?;

        if let Err(e) = self
            .send_log
            .record_send(Some(user_id), ACCOUNT_RECOVERY_TEMPLATE)
            .await
        {
            log::error!("Failed to record recovery email send for user {user_id}: {e}");
        }

        Ok(())
    }
}
