use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::action_logs;

#[derive(Debug, Serialize, Deserialize, Identifiable, Insertable, Queryable, QueryableByName)]
#[diesel(table_name = action_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActionLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub meta: serde_json::Value,
    pub created_timestamp: SystemTime,
}
