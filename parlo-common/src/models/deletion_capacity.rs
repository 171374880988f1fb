use chrono::NaiveDate;
use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::deletion_capacity;

// One row per UTC day, upserted lazily on the first recorded deletion of the
// day. Rows are never deleted by the pipeline.
#[derive(Debug, Serialize, Deserialize, Insertable, Queryable, QueryableByName)]
#[diesel(table_name = deletion_capacity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeletionCapacity {
    pub day: NaiveDate,
    pub count: i32,
    pub max_limit: i32,
    pub updated_timestamp: SystemTime,
}
