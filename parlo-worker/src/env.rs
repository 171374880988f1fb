use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;

pub static CONF: Lazy<Conf> = Lazy::new(build_conf);

const CONF_FILE_PATH: &str = "conf/worker-conf.toml";

#[derive(Debug, Deserialize, Serialize)]
pub struct Conf {
    pub log_level: String,
    pub connections: Connections,
    pub runner: RunnerConf,
    pub deletion_scheduler_job: DeletionSchedulerJobConf,
    pub hard_delete_job: HardDeleteJobConf,
    pub email: EmailConf,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Connections {
    pub database_uri: String,
    pub max_db_connections: u32,
    pub redis_uri: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RunnerConf {
    pub update_frequency_secs: u64,
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeletionSchedulerJobConf {
    pub job_frequency_secs: u64,
    /// Delay between an ingested `user.delete` event and the earliest
    /// eligible execution of the record it creates.
    pub queue_delay_hours: u64,
    /// How far ahead of `scheduled_date` the recovery warning is sent.
    pub warning_period_hours: u64,
    /// Interval the originating deletion request applies before publishing
    /// `user.delete`; carried here so operators see the whole pipeline
    /// timeline in one place.
    pub grace_period_days: u64,
    pub max_global_deletions_per_day: i32,
    pub max_recovery_emails_per_user_per_day: i32,
    pub recovery_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HardDeleteJobConf {
    pub job_frequency_secs: u64,
    pub retention_days: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EmailConf {
    pub email_enabled: bool,
    pub from_address: String,
    pub reply_to_address: String,
    pub smtp_address: String,
    pub smtp_username: String,
    pub smtp_password: String,
}

fn build_conf() -> Conf {
    let mut conf_file = File::open(CONF_FILE_PATH).unwrap_or_else(|_| {
        eprintln!("ERROR: Expected configuration file at '{CONF_FILE_PATH}'");
        std::process::exit(1);
    });

    let mut contents = String::new();
    conf_file.read_to_string(&mut contents).unwrap_or_else(|_| {
        eprintln!(
            "ERROR: Configuration file at '{CONF_FILE_PATH}' should be a text file in the TOML format."
        );
        std::process::exit(1);
    });

    match toml::from_str::<Conf>(&contents) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("ERROR: Parsing '{CONF_FILE_PATH}' failed: {e}");
            std::process::exit(1);
        }
    }
}
