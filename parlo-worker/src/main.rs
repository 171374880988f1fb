use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parlo_common::cache::{Counters, RedisCounters};
use parlo_common::db::create_db_async_pool;
use parlo_common::db::deletion_capacity::{CapacityLedger, Dao as DeletionCapacityDao};
use parlo_common::db::email_send::{Dao as EmailSendDao, SendLog};
use parlo_common::db::job_registry::Dao as JobRegistryDao;
use parlo_common::db::user::{Dao as UserDao, UserStore};
use parlo_common::db::user_deletion::{Dao as UserDeletionDao, DeletionStore};
use parlo_common::email::senders::{MockSender, SmtpSender};
use parlo_common::email::EmailSender;
use parlo_common::events::{EventBus, RedisEventBus};

mod capacity;
mod env;
mod executor;
mod ingress;
mod jobs;
mod notifier;
mod runner;
#[cfg(test)]
mod test_utils;

use capacity::CapacityGate;
use executor::DeletionExecutor;
use ingress::DeletionIngress;
use jobs::{HardDeleteUsersJob, ProcessUserDeletionsJob};
use notifier::RecoveryNotifier;
use runner::JobRunner;

fn main() {
    let mut runtime = tokio::runtime::Builder::new_multi_thread();

    if let Some(worker_threads) = env::CONF.runner.worker_threads {
        runtime.worker_threads(worker_threads);
    }

    runtime
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            Logger::try_with_str(&env::CONF.log_level)
                .expect(
                    "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
                     Example: `info, my::critical::module=trace`",
                )
                .log_to_file(FileSpec::default().directory("./logs"))
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Timestamps,
                    Cleanup::KeepLogAndCompressedFiles(60, 365),
                )
                .cleanup_in_background_thread(true)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
                .format(|writer, now, record| {
                    write!(
                        writer,
                        "{:5} | {} | {}:{} | {}",
                        record.level(),
                        now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                        record.module_path().unwrap_or("<unknown>"),
                        record.line().unwrap_or(0),
                        record.args()
                    )
                })
                .use_utc()
                .start()
                .expect("Failed to start logger");

            log::info!(
                "Deletion pipeline timeline: {}d grace period before queueing, {}h queue \
                 delay, {}h recovery warning, {}d retention before purge",
                env::CONF.deletion_scheduler_job.grace_period_days,
                env::CONF.deletion_scheduler_job.queue_delay_hours,
                env::CONF.deletion_scheduler_job.warning_period_hours,
                env::CONF.hard_delete_job.retention_days,
            );

            let db_async_pool = create_db_async_pool(
                &env::CONF.connections.database_uri,
                env::CONF.connections.max_db_connections,
            )
            .await;

            let redis_client = redis::Client::open(env::CONF.connections.redis_uri.as_str())
                .expect("Invalid Redis URI");
            let redis_connection = redis::aio::ConnectionManager::new(redis_client)
                .await
                .expect("Failed to connect to Redis");

            let event_bus: Arc<dyn EventBus> = Arc::new(
                RedisEventBus::connect(&env::CONF.connections.redis_uri)
                    .await
                    .expect("Failed to connect event bus to Redis"),
            );

            let user_store: Arc<dyn UserStore> = Arc::new(UserDao::new(&db_async_pool));
            let deletion_store: Arc<dyn DeletionStore> =
                Arc::new(UserDeletionDao::new(&db_async_pool));
            let capacity_ledger: Arc<dyn CapacityLedger> =
                Arc::new(DeletionCapacityDao::new(&db_async_pool));
            let send_log: Arc<dyn SendLog> = Arc::new(EmailSendDao::new(&db_async_pool));
            let counters: Arc<dyn Counters> = Arc::new(RedisCounters::new(redis_connection));

            let email_sender: EmailSender = if env::CONF.email.email_enabled {
                Arc::new(
                    SmtpSender::new(
                        &env::CONF.email.smtp_address,
                        env::CONF.email.smtp_username.clone(),
                        env::CONF.email.smtp_password.clone(),
                    )
                    .expect("Failed to build SMTP transport"),
                )
            } else {
                Arc::new(MockSender::new())
            };

            let from_address = env::CONF
                .email
                .from_address
                .parse()
                .expect("Invalid email from address");
            let reply_to_address = env::CONF
                .email
                .reply_to_address
                .parse()
                .expect("Invalid email reply-to address");

            let gate = Arc::new(CapacityGate::new(
                counters,
                capacity_ledger,
                env::CONF.deletion_scheduler_job.max_global_deletions_per_day,
                env::CONF
                    .deletion_scheduler_job
                    .max_recovery_emails_per_user_per_day,
            ));

            let notifier = Arc::new(RecoveryNotifier::new(
                user_store.clone(),
                email_sender,
                send_log,
                from_address,
                reply_to_address,
                env::CONF.deletion_scheduler_job.recovery_url.clone(),
            ));

            let executor = Arc::new(DeletionExecutor::new(
                user_store.clone(),
                deletion_store.clone(),
            ));

            let ingress = DeletionIngress::new(
                deletion_store.clone(),
                Duration::from_secs(env::CONF.deletion_scheduler_job.queue_delay_hours * 3600),
            );

            tokio::spawn(async move {
                if let Err(e) = ingress.run(event_bus).await {
                    log::error!("Deletion ingress stopped: {e}");
                }
            });

            let mut job_runner = JobRunner::new(
                Duration::from_secs(env::CONF.runner.update_frequency_secs),
                Some(JobRegistryDao::new(&db_async_pool)),
            );

            job_runner
                .register(
                    Box::new(ProcessUserDeletionsJob::new(
                        deletion_store,
                        gate,
                        notifier,
                        executor,
                        Duration::from_secs(
                            env::CONF.deletion_scheduler_job.warning_period_hours * 3600,
                        ),
                    )),
                    Duration::from_secs(env::CONF.deletion_scheduler_job.job_frequency_secs),
                )
                .await;

            job_runner
                .register(
                    Box::new(HardDeleteUsersJob::new(
                        user_store,
                        Duration::from_secs(env::CONF.hard_delete_job.retention_days * 86400),
                    )),
                    Duration::from_secs(env::CONF.hard_delete_job.job_frequency_secs),
                )
                .await;

            job_runner.start().await;
        });
}
