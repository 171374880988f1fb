use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::user_deletions;

/// Lifecycle state of a deletion record. Transitions are monotonic:
/// `Queued -> Scheduled -> Executed`, or `Cancelled` from any non-terminal
/// state. A record never re-enters `Queued` (the ingress upsert replaces the
/// row rather than transitioning it).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum DeletionStatus {
    Queued,
    Scheduled,
    Executed,
    Cancelled,
}

impl DeletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Queued => "queued",
            DeletionStatus::Scheduled => "scheduled",
            DeletionStatus::Executed => "executed",
            DeletionStatus::Cancelled => "cancelled",
        }
    }
}

impl ToSql<Text, Pg> for DeletionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for DeletionStatus {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"queued" => Ok(DeletionStatus::Queued),
            b"scheduled" => Ok(DeletionStatus::Scheduled),
            b"executed" => Ok(DeletionStatus::Executed),
            b"cancelled" => Ok(DeletionStatus::Cancelled),
            other => Err(format!(
                "Unrecognized deletion status: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = user_deletions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserDeletion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_date: SystemTime,
    pub status: DeletionStatus,
    pub executed: bool,
    pub created_timestamp: SystemTime,
    pub recovery_token: Option<String>,
    pub recovery_token_expires_at: Option<SystemTime>,
}

// The recovery token columns are owned by the account-recovery surface, so
// inserts from the deletion pipeline leave them NULL.
#[derive(Debug, Insertable)]
#[diesel(table_name = user_deletions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUserDeletion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_date: SystemTime,
    pub status: DeletionStatus,
    pub executed: bool,
    pub created_timestamp: SystemTime,
}
