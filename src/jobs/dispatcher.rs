//! Queue dispatcher: the driver that turns persisted jobs into executions.
//!
//! One dispatcher serves one queue. Each poll tick it:
//!
//! 1. promotes delayed jobs whose retry backoff has elapsed back to pending,
//! 2. skips the tick entirely while the queue is paused or inactive,
//! 3. pulls a batch of pending jobs and runs each through
//!    [`JobQueueService::process_job`] under a semaphore sized to the queue's
//!    concurrency limit.
//!
//! The semaphore is sized from the queue's concurrency at start; restart the
//! dispatcher to pick up a changed limit.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::clock::Clock;
use crate::jobs::repository::{JobRepository, QueueRepository};
use crate::jobs::service::{JobQueueService, WorkProcessor};
use crate::jobs::JobStatus;

/// Configuration for a queue dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Queue this dispatcher serves
    pub queue_name: String,
    /// Poll interval for checking the queue (milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum jobs fetched per poll
    pub batch_size: usize,
    /// Dispatcher name for logging
    pub name: String,
}

impl DispatcherConfig {
    /// Sensible defaults for the named queue.
    pub fn for_queue(queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        Self {
            name: format!("dispatcher-{}", queue_name),
            queue_name,
            poll_interval_ms: 1000,
            batch_size: 20,
        }
    }
}

/// Shared counters for a running dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DispatcherStats {
    /// Total executions driven
    pub processed: Arc<AtomicU64>,
    /// Executions that completed
    pub succeeded: Arc<AtomicU64>,
    /// Executions that failed permanently
    pub failed: Arc<AtomicU64>,
    /// Executions currently in flight
    pub active: Arc<AtomicU64>,
}

impl DispatcherStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }
}

/// Handle for controlling a running dispatcher.
pub struct DispatcherHandle {
    shutdown: tokio::sync::watch::Sender<bool>,
    stats: DispatcherStats,
}

impl DispatcherHandle {
    /// Signal the dispatcher to stop polling. In-flight executions finish.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Get dispatcher statistics.
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }
}

/// Drives one queue's jobs through the service under its concurrency limit.
pub struct QueueDispatcher {
    service: Arc<JobQueueService>,
    jobs: Arc<dyn JobRepository>,
    queues: Arc<dyn QueueRepository>,
    clock: Arc<dyn Clock>,
    processor: Arc<dyn WorkProcessor>,
    config: DispatcherConfig,
}

impl QueueDispatcher {
    pub fn new(
        service: Arc<JobQueueService>,
        jobs: Arc<dyn JobRepository>,
        queues: Arc<dyn QueueRepository>,
        clock: Arc<dyn Clock>,
        processor: Arc<dyn WorkProcessor>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            service,
            jobs,
            queues,
            clock,
            processor,
            config,
        }
    }

    /// Start polling, returning a handle for control.
    pub async fn start(self) -> DispatcherHandle {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        let stats = DispatcherStats::default();

        let concurrency = self
            .queues
            .find_by_name(&self.config.queue_name)
            .await
            .ok()
            .flatten()
            .map(|queue| queue.concurrency())
            .unwrap_or(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let in_flight: Arc<Mutex<HashSet<Uuid>>> = Arc::new(Mutex::new(HashSet::new()));

        let task_stats = stats.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            let poll_interval = tokio::time::Duration::from_millis(config.poll_interval_ms);
            tracing::info!(
                dispatcher = %config.name,
                queue = %config.queue_name,
                concurrency,
                "Dispatcher started"
            );

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!(dispatcher = %config.name, "Dispatcher shutting down");
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        self.tick(&semaphore, &in_flight, &task_stats).await;
                    }
                }
            }
        });

        DispatcherHandle {
            shutdown: shutdown_tx,
            stats,
        }
    }

    async fn tick(
        &self,
        semaphore: &Arc<Semaphore>,
        in_flight: &Arc<Mutex<HashSet<Uuid>>>,
        stats: &DispatcherStats,
    ) {
        let now = self.clock.now();

        // Wake delayed jobs whose backoff has elapsed.
        match self.jobs.find_delayed_ready_for_retry(now).await {
            Ok(ready) => {
                for job in ready
                    .into_iter()
                    .filter(|job| job.queue_name == self.config.queue_name)
                {
                    if let Err(error) = self.service.retry_job(job.id).await {
                        tracing::warn!(
                            dispatcher = %self.config.name,
                            job_id = %job.id,
                            error = %error,
                            "Failed to promote delayed job"
                        );
                    }
                }
            }
            Err(error) => {
                tracing::warn!(
                    dispatcher = %self.config.name,
                    error = %error,
                    "Failed to query delayed jobs"
                );
            }
        }

        // Paused or inactive queues hold their pending work.
        match self.queues.find_by_name(&self.config.queue_name).await {
            Ok(Some(queue)) if queue.accepts_work() => {}
            Ok(_) => return,
            Err(error) => {
                tracing::warn!(
                    dispatcher = %self.config.name,
                    error = %error,
                    "Failed to load queue"
                );
                return;
            }
        }

        let batch = match self
            .jobs
            .find_pending(&self.config.queue_name, Some(self.config.batch_size))
            .await
        {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(
                    dispatcher = %self.config.name,
                    error = %error,
                    "Failed to fetch pending jobs"
                );
                return;
            }
        };

        for job in batch {
            if !in_flight.lock().insert(job.id.0) {
                continue;
            }
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    // Concurrency limit reached; leave the job for a later tick.
                    in_flight.lock().remove(&job.id.0);
                    break;
                }
            };

            let service = Arc::clone(&self.service);
            let processor = Arc::clone(&self.processor);
            let stats = stats.clone();
            let in_flight = Arc::clone(in_flight);
            let job_id = job.id.0;

            tokio::spawn(async move {
                stats.active.fetch_add(1, Ordering::Relaxed);
                let result = service.process_job(job, processor.as_ref()).await;
                stats.active.fetch_sub(1, Ordering::Relaxed);
                stats.processed.fetch_add(1, Ordering::Relaxed);

                match result {
                    Ok(job) => match job.status() {
                        JobStatus::Completed => {
                            stats.succeeded.fetch_add(1, Ordering::Relaxed);
                        }
                        JobStatus::Failed => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {}
                    },
                    Err(error) => {
                        tracing::error!(error = %error, "Job execution errored");
                    }
                }

                in_flight.lock().remove(&job_id);
                drop(permit);
            });
        }
    }
}
