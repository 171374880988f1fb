use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::email_sends;

#[derive(Debug, Serialize, Deserialize, Identifiable, Insertable, Queryable, QueryableByName)]
#[diesel(table_name = email_sends)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmailSend {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub template: String,
    pub sent_timestamp: SystemTime,
}
