//! Persistence seams for jobs and queues.
//!
//! The engine reaches storage only through these traits; concrete adapters
//! (Postgres, Redis, ...) live in the platform's infrastructure crates. The
//! in-memory implementations here back tests and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::jobs::job::{BackgroundJob, JobId, JobStatus};
use crate::jobs::queue::{JobQueue, QueueId};

// ═══════════════════════════════════════════════════════════════════════════════
// Statistics
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-status job counts for one queue, computed from the job store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub total: u64,
    pub pending: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
}

/// Aggregate totals across all queues.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalQueueStatistics {
    pub total_queues: u64,
    pub active_queues: u64,
    pub paused_queues: u64,
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Repository Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage seam for jobs.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert or update a job.
    async fn save(&self, job: &BackgroundJob) -> Result<()>;

    async fn find_by_id(&self, id: JobId) -> Result<Option<BackgroundJob>>;

    async fn find_by_queue(&self, queue_name: &str) -> Result<Vec<BackgroundJob>>;

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<BackgroundJob>>;

    /// Pending jobs for one queue, most urgent first, oldest first within a
    /// priority.
    async fn find_pending(&self, queue_name: &str, limit: Option<usize>)
        -> Result<Vec<BackgroundJob>>;

    /// Permanently failed jobs for one queue, most recent failure first.
    async fn find_failed(&self, queue_name: &str, limit: Option<usize>)
        -> Result<Vec<BackgroundJob>>;

    /// Delayed jobs whose `next_retry_at` has elapsed.
    async fn find_delayed_ready_for_retry(&self, now: DateTime<Utc>)
        -> Result<Vec<BackgroundJob>>;

    /// Remove a job; returns whether it existed.
    async fn delete_by_id(&self, id: JobId) -> Result<bool>;

    /// Retention sweep: drop completed jobs finished before `cutoff`.
    async fn delete_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Retention sweep: drop permanently failed jobs that failed before `cutoff`.
    async fn delete_failed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn count_by_queue(&self, queue_name: &str) -> Result<u64>;

    async fn count_by_status(&self, status: JobStatus) -> Result<u64>;

    /// Per-status counts for one queue.
    async fn queue_statistics(&self, queue_name: &str) -> Result<JobCounts>;
}

/// Storage seam for queues.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert or update a queue.
    async fn save(&self, queue: &JobQueue) -> Result<()>;

    async fn find_by_id(&self, id: QueueId) -> Result<Option<JobQueue>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<JobQueue>>;

    async fn find_all(&self) -> Result<Vec<JobQueue>>;

    async fn find_active(&self) -> Result<Vec<JobQueue>>;

    async fn find_paused(&self) -> Result<Vec<JobQueue>>;

    /// Remove a queue by id; returns whether it existed.
    async fn delete_by_id(&self, id: QueueId) -> Result<bool>;

    /// Remove a queue by name; returns whether it existed.
    async fn delete_by_name(&self, name: &str) -> Result<bool>;

    async fn exists_by_name(&self, name: &str) -> Result<bool>;

    async fn count(&self) -> Result<u64>;

    async fn count_active(&self) -> Result<u64>;

    /// Aggregate totals across all queues.
    async fn global_statistics(&self) -> Result<GlobalQueueStatistics>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Implementations
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory job store for testing and development.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<Uuid, BackgroundJob>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save(&self, job: &BackgroundJob) -> Result<()> {
        self.jobs.insert(job.id.0, job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<BackgroundJob>> {
        Ok(self.jobs.get(&id.0).map(|entry| entry.value().clone()))
    }

    async fn find_by_queue(&self, queue_name: &str) -> Result<Vec<BackgroundJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.queue_name == queue_name)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<BackgroundJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status() == status)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_pending(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<BackgroundJob>> {
        let mut pending: Vec<BackgroundJob> = self
            .jobs
            .iter()
            .filter(|entry| {
                entry.queue_name == queue_name && entry.status() == JobStatus::Pending
            })
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        if let Some(limit) = limit {
            pending.truncate(limit);
        }
        Ok(pending)
    }

    async fn find_failed(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<BackgroundJob>> {
        let mut failed: Vec<BackgroundJob> = self
            .jobs
            .iter()
            .filter(|entry| entry.queue_name == queue_name && entry.status() == JobStatus::Failed)
            .map(|entry| entry.value().clone())
            .collect();
        failed.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        if let Some(limit) = limit {
            failed.truncate(limit);
        }
        Ok(failed)
    }

    async fn find_delayed_ready_for_retry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<BackgroundJob>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.is_ready_for_retry(now))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_by_id(&self, id: JobId) -> Result<bool> {
        Ok(self.jobs.remove(&id.0).is_some())
    }

    async fn delete_completed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.status() == JobStatus::Completed
                && job.completed_at.map(|at| at < cutoff).unwrap_or(false))
        });
        Ok((before - self.jobs.len()) as u64)
    }

    async fn delete_failed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.status() == JobStatus::Failed
                && job.failed_at.map(|at| at < cutoff).unwrap_or(false))
        });
        Ok((before - self.jobs.len()) as u64)
    }

    async fn count_by_queue(&self, queue_name: &str) -> Result<u64> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.queue_name == queue_name)
            .count() as u64)
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<u64> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status() == status)
            .count() as u64)
    }

    async fn queue_statistics(&self, queue_name: &str) -> Result<JobCounts> {
        let mut counts = JobCounts::default();
        for entry in self.jobs.iter() {
            if entry.queue_name != queue_name {
                continue;
            }
            counts.total += 1;
            match entry.status() {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Active | JobStatus::Paused => counts.active += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Delayed => counts.delayed += 1,
            }
        }
        Ok(counts)
    }
}

/// In-memory queue store for testing and development.
#[derive(Default)]
pub struct InMemoryQueueRepository {
    queues: DashMap<Uuid, JobQueue>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn save(&self, queue: &JobQueue) -> Result<()> {
        self.queues.insert(queue.id.0, queue.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: QueueId) -> Result<Option<JobQueue>> {
        Ok(self.queues.get(&id.0).map(|entry| entry.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<JobQueue>> {
        Ok(self
            .queues
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<JobQueue>> {
        Ok(self.queues.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn find_active(&self) -> Result<Vec<JobQueue>> {
        Ok(self
            .queues
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_paused(&self) -> Result<Vec<JobQueue>> {
        Ok(self
            .queues
            .iter()
            .filter(|entry| entry.is_paused())
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_by_id(&self, id: QueueId) -> Result<bool> {
        Ok(self.queues.remove(&id.0).is_some())
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let id = self
            .queues
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id);
        match id {
            Some(id) => Ok(self.queues.remove(&id.0).is_some()),
            None => Ok(false),
        }
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        Ok(self.queues.iter().any(|entry| entry.name == name))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.queues.len() as u64)
    }

    async fn count_active(&self) -> Result<u64> {
        Ok(self.queues.iter().filter(|entry| entry.is_active()).count() as u64)
    }

    async fn global_statistics(&self) -> Result<GlobalQueueStatistics> {
        let mut stats = GlobalQueueStatistics::default();
        for entry in self.queues.iter() {
            stats.total_queues += 1;
            if entry.is_active() {
                stats.active_queues += 1;
            }
            if entry.is_paused() {
                stats.paused_queues += 1;
            }
            stats.total_jobs += entry.job_count();
            stats.completed_jobs += entry.completed_count();
            stats.failed_jobs += entry.failed_count();
        }
        Ok(stats)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
