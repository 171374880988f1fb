pub mod action_log;
pub mod deletion_capacity;
pub mod email_send;
pub mod job_registry_item;
pub mod user;
pub mod user_deletion;
