//! Queue entity: a named lane with its own concurrency and retry policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{MeridianError, Result};
use crate::jobs::job::JobPriority;

/// Unique identifier for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub Uuid);

impl QueueId {
    /// Create a new random queue ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named lane of work with its own concurrency/retry policy and counters.
///
/// The counters are write-optimised approximations maintained by
/// `JobQueueService`; the job repository's per-status counts are the source of
/// truth when the two disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobQueue {
    /// Internal identifier
    pub id: QueueId,
    /// Unique queue name
    pub name: String,
    /// Human description
    pub description: Option<String>,
    /// Priority applied to jobs that do not specify one
    pub default_priority: JobPriority,
    /// Maximum concurrently active jobs (>= 1)
    concurrency: usize,
    /// Retry budget applied to jobs that do not specify one
    max_retries: u32,
    /// Default execution timeout (milliseconds)
    default_timeout_ms: Option<u64>,
    /// Default retry base / dispatch delay (milliseconds)
    default_delay_ms: Option<u64>,
    /// Inactive queues reject new work entirely
    active: bool,
    /// Paused queues hold new work without rejecting the queue itself
    paused: bool,
    /// Total jobs ever added
    job_count: u64,
    /// Jobs that finished successfully
    completed_count: u64,
    /// Jobs that failed permanently
    failed_count: u64,
    /// When the queue was created
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
}

impl JobQueue {
    /// Create a new active, unpaused queue.
    pub fn new(name: impl Into<String>, concurrency: usize, now: DateTime<Utc>) -> Result<Self> {
        if concurrency < 1 {
            return Err(MeridianError::validation(
                "concurrency",
                "concurrency must be at least 1",
            ));
        }
        Ok(Self {
            id: QueueId::new(),
            name: name.into(),
            description: None,
            default_priority: JobPriority::default(),
            concurrency,
            max_retries: 3,
            default_timeout_ms: None,
            default_delay_ms: None,
            active: true,
            paused: false,
            job_count: 0,
            completed_count: 0,
            failed_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default priority.
    pub fn with_default_priority(mut self, priority: JobPriority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn default_timeout_ms(&self) -> Option<u64> {
        self.default_timeout_ms
    }

    pub fn default_delay_ms(&self) -> Option<u64> {
        self.default_delay_ms
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the queue currently accepts new work.
    pub fn accepts_work(&self) -> bool {
        self.active && !self.paused
    }

    pub fn job_count(&self) -> u64 {
        self.job_count
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count
    }

    /// Jobs added but not yet finished, derived from the counters.
    pub fn pending_count(&self) -> u64 {
        self.job_count
            .saturating_sub(self.completed_count)
            .saturating_sub(self.failed_count)
    }

    /// Completion ratio as a percentage; 0 when nothing has finished.
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed_count + self.failed_count;
        if finished == 0 {
            0.0
        } else {
            self.completed_count as f64 / finished as f64 * 100.0
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guarded setters
    // ─────────────────────────────────────────────────────────────────────────

    /// Change the concurrency limit. Rejects values below 1.
    pub fn set_concurrency(&mut self, concurrency: usize, now: DateTime<Utc>) -> Result<()> {
        if concurrency < 1 {
            return Err(MeridianError::validation(
                "concurrency",
                "concurrency must be at least 1",
            ));
        }
        self.concurrency = concurrency;
        self.updated_at = now;
        Ok(())
    }

    /// Change the retry budget.
    pub fn set_max_retries(&mut self, max_retries: u32, now: DateTime<Utc>) -> Result<()> {
        self.max_retries = max_retries;
        self.updated_at = now;
        Ok(())
    }

    /// Change the default timeout. Rejects zero.
    pub fn set_default_timeout_ms(
        &mut self,
        timeout_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if timeout_ms == Some(0) {
            return Err(MeridianError::validation(
                "timeout",
                "timeout must be positive",
            ));
        }
        self.default_timeout_ms = timeout_ms;
        self.updated_at = now;
        Ok(())
    }

    /// Change the default delay. Rejects zero.
    pub fn set_default_delay_ms(
        &mut self,
        delay_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if delay_ms == Some(0) {
            return Err(MeridianError::validation("delay", "delay must be positive"));
        }
        self.default_delay_ms = delay_ms;
        self.updated_at = now;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Flags
    // ─────────────────────────────────────────────────────────────────────────

    /// Hold new work without deactivating the queue.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.paused = true;
        self.updated_at = now;
    }

    /// Release a paused queue.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.paused = false;
        self.updated_at = now;
    }

    /// Reactivate the queue.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.active = true;
        self.updated_at = now;
    }

    /// Deactivate the queue; `add_job` against it fails.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Counters (called only by JobQueueService)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn increment_job_count(&mut self) {
        self.job_count += 1;
    }

    pub fn increment_completed_count(&mut self) {
        self.completed_count += 1;
    }

    pub fn increment_failed_count(&mut self) {
        self.failed_count += 1;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_queue_rejects_zero_concurrency() {
        assert!(JobQueue::new("reports", 0, t0()).is_err());
        assert!(JobQueue::new("reports", 1, t0()).is_ok());
    }

    #[test]
    fn test_guarded_setters() {
        let mut queue = JobQueue::new("reports", 5, t0()).unwrap();
        assert!(queue.set_concurrency(0, t0()).is_err());
        assert!(queue.set_concurrency(10, t0()).is_ok());
        assert_eq!(queue.concurrency(), 10);

        assert!(queue.set_default_timeout_ms(Some(0), t0()).is_err());
        assert!(queue.set_default_timeout_ms(Some(30_000), t0()).is_ok());
        assert!(queue.set_default_delay_ms(Some(0), t0()).is_err());
        assert!(queue.set_default_delay_ms(None, t0()).is_ok());
    }

    #[test]
    fn test_flags_are_independent() {
        let mut queue = JobQueue::new("reports", 5, t0()).unwrap();
        assert!(queue.accepts_work());

        queue.pause(t0());
        assert!(queue.is_active());
        assert!(queue.is_paused());
        assert!(!queue.accepts_work());

        queue.resume(t0());
        queue.deactivate(t0());
        assert!(!queue.is_active());
        assert!(!queue.is_paused());
        assert!(!queue.accepts_work());

        queue.activate(t0());
        assert!(queue.accepts_work());
    }

    #[test]
    fn test_success_rate() {
        let mut queue = JobQueue::new("reports", 5, t0()).unwrap();
        assert_eq!(queue.success_rate(), 0.0);

        for _ in 0..3 {
            queue.increment_job_count();
        }
        queue.increment_completed_count();
        queue.increment_completed_count();
        queue.increment_failed_count();

        assert!((queue.success_rate() - 66.666).abs() < 0.01);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_pending_count_derivation() {
        let mut queue = JobQueue::new("reports", 5, t0()).unwrap();
        for _ in 0..10 {
            queue.increment_job_count();
        }
        queue.increment_completed_count();
        queue.increment_failed_count();
        assert_eq!(queue.pending_count(), 8);
    }
}
