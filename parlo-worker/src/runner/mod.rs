use parlo_common::db::job_registry::Dao as JobRegistryDao;

use futures::future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    job_registry: Option<JobRegistryDao>,
}

impl JobRunner {
    /// Without a registry, job schedules reset on process restart.
    pub fn new(update_frequency: Duration, job_registry: Option<JobRegistryDao>) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            job_registry,
        }
    }

    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name_ref = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name_ref,
            run_frequency.as_secs()
        );

        let last_run_time = match &self.job_registry {
            Some(registry) => registry
                .get_job_last_run_timestamp(job_name_ref)
                .await
                .unwrap_or_else(|e| {
                    log::error!(
                        "Failed to get last run timestamp for job '{job_name_ref}': {e}"
                    );
                    None
                }),
            None => None,
        };

        let job_container = JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or(SystemTime::now()),
        };

        self.jobs.push(job_container);
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            let mut job_names = Vec::with_capacity(self.jobs.len());
            let mut job_futures = Vec::with_capacity(self.jobs.len());
            let mut record_job_run_futures = Vec::with_capacity(self.jobs.len());

            for job_container in &mut self.jobs {
                let time_elapsed_since_last_run = SystemTime::now()
                    .duration_since(job_container.last_run_time)
                    .unwrap_or(Duration::from_nanos(0));
                let is_time_to_run = time_elapsed_since_last_run >= job_container.run_frequency;

                if is_time_to_run && job_container.job.is_ready() {
                    let run_time = SystemTime::now();
                    job_container.last_run_time = run_time;

                    let name_ref = job_container.job.name();
                    log::info!("Executing job \"{}\"", name_ref);
                    job_names.push(name_ref);
                    job_futures.push(job_container.job.execute());

                    if let Some(registry) = &self.job_registry {
                        record_job_run_futures
                            .push(registry.set_job_last_run_timestamp(name_ref, run_time));
                    }
                }
            }

            let (job_results, recording_results) = future::join(
                future::join_all(job_futures),
                future::join_all(record_job_run_futures),
            )
            .await;

            for (i, result) in job_results.into_iter().enumerate() {
                if let Err(e) = result {
                    log::error!("{}", e);
                } else {
                    log::info!("Job \"{}\" finished successfully", job_names[i]);
                }
            }

            for result in recording_results.into_iter() {
                if let Err(e) = result {
                    log::error!("Error recording job run: {}", e);
                }
            }

            let after = Instant::now();
            let delta = after - before;

            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }
}
