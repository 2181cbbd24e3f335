//! Job queue orchestration.
//!
//! [`JobQueueService`] is the only writer of queue counters and the single
//! place where job execution and queue statistics are kept consistent. It
//! owns no threads; callers (typically the dispatcher) drive it.

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::JobEngineConfig;
use crate::error::{ErrorCode, MeridianError, Result};
use crate::jobs::job::{BackgroundJob, JobId, JobPriority, JobStatus};
use crate::jobs::queue::JobQueue;
use crate::jobs::repository::{GlobalQueueStatistics, JobCounts, JobRepository, QueueRepository};

// ═══════════════════════════════════════════════════════════════════════════════
// Work Processor
// ═══════════════════════════════════════════════════════════════════════════════

/// Error raised by a work processor.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProcessorError(pub String);

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The capability that actually executes a unit of work.
///
/// Injected by the caller; the engine treats it as opaque and only observes
/// success or failure.
#[async_trait]
pub trait WorkProcessor: Send + Sync {
    /// Execute the job, returning an optional result payload.
    async fn process(
        &self,
        job: &BackgroundJob,
    ) -> std::result::Result<Option<serde_json::Value>, ProcessorError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Requests & Statistics
// ═══════════════════════════════════════════════════════════════════════════════

/// Options for creating a queue; unset fields fall back to engine defaults.
#[derive(Debug, Clone, Default)]
pub struct CreateQueueOptions {
    pub description: Option<String>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub default_priority: Option<JobPriority>,
    pub default_timeout_ms: Option<u64>,
    pub default_delay_ms: Option<u64>,
}

/// Options for adding a job; unset fields default from the owning queue.
#[derive(Debug, Clone, Default)]
pub struct AddJobOptions {
    pub priority: Option<JobPriority>,
    pub delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Queue-level counters merged with job-repository truth.
///
/// When the two sides disagree (for example after a partial write), the
/// `jobs` counts are authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub queue_name: String,
    pub concurrency: usize,
    pub active: bool,
    pub paused: bool,
    pub job_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub pending_count: u64,
    pub success_rate: f64,
    pub jobs: JobCounts,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Orchestrates queues and jobs over the injected repositories.
pub struct JobQueueService {
    jobs: Arc<dyn JobRepository>,
    queues: Arc<dyn QueueRepository>,
    clock: Arc<dyn Clock>,
    config: JobEngineConfig,
}

impl fmt::Debug for JobQueueService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueueService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JobQueueService {
    /// Create a new service over the given repositories.
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        queues: Arc<dyn QueueRepository>,
        clock: Arc<dyn Clock>,
        config: JobEngineConfig,
    ) -> Self {
        Self {
            jobs,
            queues,
            clock,
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queue lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new queue. Fails if the name is taken.
    pub async fn create_queue(
        &self,
        name: &str,
        options: CreateQueueOptions,
    ) -> Result<JobQueue> {
        if name.trim().is_empty() {
            return Err(MeridianError::required("name"));
        }
        if self.queues.exists_by_name(name).await? {
            return Err(MeridianError::conflict(
                ErrorCode::DuplicateQueue,
                format!("queue already exists: {}", name),
            ));
        }

        let now = self.clock.now();
        let mut queue = JobQueue::new(name, options.concurrency.unwrap_or(4), now)?
            .with_max_retries(
                options
                    .max_retries
                    .unwrap_or(self.config.default_max_attempts),
            );
        if let Some(description) = options.description {
            queue = queue.with_description(description);
        }
        if let Some(priority) = options.default_priority {
            queue = queue.with_default_priority(priority);
        }
        queue.set_default_timeout_ms(options.default_timeout_ms, now)?;
        queue.set_default_delay_ms(options.default_delay_ms, now)?;

        self.queues.save(&queue).await?;
        info!(queue = %queue.name, concurrency = queue.concurrency(), "Queue created");
        Ok(queue)
    }

    /// Pause a queue: dispatch stops, the queue itself stays addressable.
    pub async fn pause_queue(&self, name: &str) -> Result<JobQueue> {
        self.update_queue(name, |queue, now| queue.pause(now)).await
    }

    /// Resume a paused queue.
    pub async fn resume_queue(&self, name: &str) -> Result<JobQueue> {
        self.update_queue(name, |queue, now| queue.resume(now)).await
    }

    /// Activate a queue so it accepts new work again.
    pub async fn activate_queue(&self, name: &str) -> Result<JobQueue> {
        self.update_queue(name, |queue, now| queue.activate(now))
            .await
    }

    /// Deactivate a queue; `add_job` against it fails.
    pub async fn deactivate_queue(&self, name: &str) -> Result<JobQueue> {
        self.update_queue(name, |queue, now| queue.deactivate(now))
            .await
    }

    /// Delete a queue by name.
    pub async fn delete_queue(&self, name: &str) -> Result<()> {
        if !self.queues.delete_by_name(name).await? {
            return Err(MeridianError::not_found(
                ErrorCode::QueueNotFound,
                "Queue",
                name,
            ));
        }
        info!(queue = %name, "Queue deleted");
        Ok(())
    }

    async fn update_queue<F>(&self, name: &str, mutate: F) -> Result<JobQueue>
    where
        F: FnOnce(&mut JobQueue, chrono::DateTime<chrono::Utc>),
    {
        let mut queue = self.require_queue(name).await?;
        mutate(&mut queue, self.clock.now());
        self.queues.save(&queue).await?;
        Ok(queue)
    }

    async fn require_queue(&self, name: &str) -> Result<JobQueue> {
        self.queues
            .find_by_name(name)
            .await?
            .ok_or_else(|| MeridianError::not_found(ErrorCode::QueueNotFound, "Queue", name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Job lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and persist a job on the named queue.
    ///
    /// The job is persisted before the queue counter moves, so a failure
    /// between the two leaves the system in a previously-valid state that
    /// [`Self::queue_statistics`] can reconcile.
    pub async fn add_job(
        &self,
        queue_name: &str,
        job_name: &str,
        payload: serde_json::Value,
        options: AddJobOptions,
    ) -> Result<BackgroundJob> {
        let mut queue = self.require_queue(queue_name).await?;
        if !queue.is_active() {
            return Err(MeridianError::new(
                ErrorCode::QueueInactive,
                format!("queue is inactive: {}", queue_name),
            ));
        }

        let now = self.clock.now();
        let mut job = BackgroundJob::new(job_name, queue_name, payload, now)
            .with_priority(options.priority.unwrap_or(queue.default_priority))
            .with_max_attempts(options.max_attempts.unwrap_or_else(|| queue.max_retries()));
        let delay = options
            .delay_ms
            .or_else(|| queue.default_delay_ms())
            .unwrap_or(self.config.retry_base_delay_ms);
        job = job.with_delay_ms(delay);
        let timeout = options
            .timeout_ms
            .or_else(|| queue.default_timeout_ms())
            .unwrap_or(self.config.default_timeout_ms);
        job = job.with_timeout_ms(timeout);

        self.jobs.save(&job).await?;
        queue.increment_job_count();
        self.queues.save(&queue).await?;

        counter!("meridian_jobs_enqueued_total", "queue" => queue_name.to_string()).increment(1);
        info!(
            job_id = %job.id,
            job = %job.name,
            queue = %queue_name,
            priority = %job.priority,
            "Job enqueued"
        );
        Ok(job)
    }

    /// Execute one job through the injected processor and keep job state and
    /// queue counters consistent.
    ///
    /// Robust to the processor failing: a failure is recorded on the job
    /// (delaying or permanently failing it), never propagated as a service
    /// error.
    pub async fn process_job(
        &self,
        mut job: BackgroundJob,
        processor: &dyn WorkProcessor,
    ) -> Result<BackgroundJob> {
        if job.status() != JobStatus::Active {
            if !job.start(self.clock.now()) {
                return Err(MeridianError::invalid_state(format!(
                    "job {} cannot start from status {}",
                    job.id,
                    job.status()
                )));
            }
            self.jobs.save(&job).await?;
        }

        let attempt = job.attempts();
        let outcome = processor.process(&job).await;
        let now = self.clock.now();

        match outcome {
            Ok(payload) => {
                job.complete(payload, now);
                counter!("meridian_jobs_completed_total", "queue" => job.queue_name.clone())
                    .increment(1);
                info!(job_id = %job.id, queue = %job.queue_name, attempt, "Job completed");
            }
            Err(error) => {
                job.fail(error.to_string(), now);
                match job.status() {
                    JobStatus::Failed => {
                        counter!("meridian_jobs_failed_total", "queue" => job.queue_name.clone())
                            .increment(1);
                        warn!(
                            job_id = %job.id,
                            queue = %job.queue_name,
                            attempt,
                            error = %error,
                            "Job failed permanently"
                        );
                    }
                    _ => {
                        counter!("meridian_jobs_delayed_total", "queue" => job.queue_name.clone())
                            .increment(1);
                        warn!(
                            job_id = %job.id,
                            queue = %job.queue_name,
                            attempt,
                            error = %error,
                            next_retry_at = ?job.next_retry_at,
                            "Job failed, retry scheduled"
                        );
                    }
                }
            }
        }

        self.jobs.save(&job).await?;

        // A DELAYED job is not a terminal outcome; only completed and
        // permanently failed runs move the queue counters.
        if let Some(mut queue) = self.queues.find_by_name(&job.queue_name).await? {
            match job.status() {
                JobStatus::Completed => {
                    queue.increment_completed_count();
                    self.queues.save(&queue).await?;
                }
                JobStatus::Failed => {
                    queue.increment_failed_count();
                    self.queues.save(&queue).await?;
                }
                _ => {}
            }
        }

        Ok(job)
    }

    /// Reset a failed or delayed job for another attempt.
    pub async fn retry_job(&self, id: JobId) -> Result<BackgroundJob> {
        let mut job = self
            .jobs
            .find_by_id(id)
            .await?
            .ok_or_else(|| MeridianError::not_found(ErrorCode::JobNotFound, "Job", id))?;

        if !job.can_retry() {
            return Err(MeridianError::new(
                ErrorCode::RetriesExhausted,
                format!("job {} has exhausted its {} attempts", id, job.max_attempts()),
            ));
        }
        if !job.retry() {
            return Err(MeridianError::invalid_state(format!(
                "job {} cannot be retried from status {}",
                id,
                job.status()
            )));
        }

        self.jobs.save(&job).await?;
        counter!("meridian_jobs_retried_total", "queue" => job.queue_name.clone()).increment(1);
        info!(job_id = %job.id, queue = %job.queue_name, attempts = job.attempts(), "Job reset for retry");
        Ok(job)
    }

    /// Delete a job by id.
    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        if !self.jobs.delete_by_id(id).await? {
            return Err(MeridianError::not_found(ErrorCode::JobNotFound, "Job", id));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue counters merged with job-repository-derived counts.
    pub async fn queue_statistics(&self, name: &str) -> Result<QueueStatistics> {
        let queue = self.require_queue(name).await?;
        let jobs = self.jobs.queue_statistics(name).await?;
        Ok(QueueStatistics {
            queue_name: queue.name.clone(),
            concurrency: queue.concurrency(),
            active: queue.is_active(),
            paused: queue.is_paused(),
            job_count: queue.job_count(),
            completed_count: queue.completed_count(),
            failed_count: queue.failed_count(),
            pending_count: queue.pending_count(),
            success_rate: queue.success_rate(),
            jobs,
        })
    }

    /// Aggregate totals across all queues.
    pub async fn global_statistics(&self) -> Result<GlobalQueueStatistics> {
        self.queues.global_statistics().await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
