//! Job entity and state machine.
//!
//! This module provides the core value types and the [`BackgroundJob`] entity:
//!
//! - **JobPriority**: closed set of urgency levels with numeric ordering
//! - **JobStatus**: closed set of lifecycle states
//! - **JobOutcome**: success flag plus optional payload or error
//! - **BackgroundJob**: one unit of work owning its own state machine, retry
//!   counter, and timing
//!
//! Transition methods return `bool`: `true` when the transition applied,
//! `false` when it was an illegal-but-harmless no-op. Terminal states refuse
//! further mutation; `retry()` from `Failed` is the one documented manual
//! escape hatch. All methods take an explicit `now` so the entity performs no
//! I/O and no ambient clock reads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Base delay for exponential retry backoff when the job carries no delay of
/// its own (milliseconds).
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 5000;

// ═══════════════════════════════════════════════════════════════════════════════
// Job Identification
// ═══════════════════════════════════════════════════════════════════════════════

/// Unique identifier for a job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Priority
// ═══════════════════════════════════════════════════════════════════════════════

/// Priority level for jobs. Ordering is numeric; higher is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Processed when nothing more urgent is waiting
    Low = 1,
    /// Default for most jobs
    Normal = 5,
    /// Elevated
    Medium = 10,
    /// Processed before normal work
    High = 15,
    /// Most urgent
    Critical = 20,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl JobPriority {
    /// Get the numeric value for queue ordering.
    pub fn score(&self) -> i64 {
        *self as i64
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Status
// ═══════════════════════════════════════════════════════════════════════════════

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be picked up
    Pending,
    /// Currently being executed
    Active,
    /// Finished successfully
    Completed,
    /// Failed permanently, retry budget exhausted
    Failed,
    /// Failed, waiting for its retry backoff to elapse
    Delayed,
    /// Manually paused
    Paused,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Delayed => write!(f, "delayed"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Job Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a finished job execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Whether the execution succeeded
    pub success: bool,
    /// Payload produced on success
    pub payload: Option<serde_json::Value>,
    /// Error message on failure
    pub error: Option<String>,
}

impl JobOutcome {
    /// A successful outcome with an optional payload.
    pub fn success(payload: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    /// A failed outcome.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Background Job Entity
// ═══════════════════════════════════════════════════════════════════════════════

/// One unit of work dispatched through a queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundJob {
    /// Unique job identifier
    pub id: JobId,
    /// Job name
    pub name: String,
    /// Name of the owning queue
    pub queue_name: String,
    /// Priority level
    pub priority: JobPriority,
    /// Arbitrary payload handed to the processor
    pub payload: serde_json::Value,
    /// Current status
    status: JobStatus,
    /// Result of the last finished execution
    outcome: Option<JobOutcome>,
    /// Progress percentage (0-100)
    progress: u8,
    /// Number of execution attempts so far
    attempts: u32,
    /// Maximum attempts allowed
    max_attempts: u32,
    /// Retry backoff base / initial dispatch delay (milliseconds)
    pub delay_ms: Option<u64>,
    /// Execution timeout (milliseconds)
    pub timeout_ms: Option<u64>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the current/last execution started
    pub started_at: Option<DateTime<Utc>>,
    /// When the job completed
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job last failed
    pub failed_at: Option<DateTime<Utc>>,
    /// When a delayed job becomes eligible for retry
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Last error message
    last_error: Option<String>,
}

impl BackgroundJob {
    /// Create a new pending job.
    pub fn new(
        name: impl Into<String>,
        queue_name: impl Into<String>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            queue_name: queue_name.into(),
            priority: JobPriority::default(),
            payload,
            status: JobStatus::Pending,
            outcome: None,
            progress: 0,
            attempts: 0,
            max_attempts: 3,
            delay_ms: None,
            timeout_ms: None,
            created_at,
            started_at: None,
            completed_at: None,
            failed_at: None,
            next_retry_at: None,
            last_error: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the maximum attempts.
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the retry base / dispatch delay.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Set the execution timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Result of the last finished execution, if any.
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// Progress percentage (0-100).
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Number of execution attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Maximum attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Last error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the retry budget still has room.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Whether this is a delayed job whose backoff has elapsed.
    pub fn is_ready_for_retry(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Delayed
            && self.next_retry_at.map(|at| at <= now).unwrap_or(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Begin executing: stamps `started_at` and consumes one attempt.
    ///
    /// No-op if already active, terminal, or the attempt budget is spent.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == JobStatus::Active || self.status.is_terminal() {
            return false;
        }
        if self.attempts >= self.max_attempts {
            return false;
        }
        self.status = JobStatus::Active;
        self.started_at = Some(now);
        self.attempts += 1;
        true
    }

    /// Finish successfully. Only applies while active.
    pub fn complete(&mut self, outcome: Option<serde_json::Value>, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Active {
            return false;
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        self.progress = 100;
        self.outcome = Some(JobOutcome::success(outcome));
        true
    }

    /// Record a failed execution. Only applies while active.
    ///
    /// With budget remaining the job parks as `Delayed` with
    /// `next_retry_at = now + base * 2^(attempts-1)`; otherwise it fails
    /// permanently.
    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Active {
            return false;
        }
        let error = error.into();
        self.failed_at = Some(now);
        self.last_error = Some(error.clone());

        if self.attempts < self.max_attempts {
            self.status = JobStatus::Delayed;
            self.next_retry_at = Some(now + Duration::milliseconds(self.retry_backoff_ms() as i64));
        } else {
            self.status = JobStatus::Failed;
            self.next_retry_at = None;
            self.outcome = Some(JobOutcome::failure(error));
        }
        true
    }

    /// Reset to pending for another attempt. Only from `Failed` or `Delayed`.
    ///
    /// Clears the error and retry timestamp; does not reset `attempts`.
    pub fn retry(&mut self) -> bool {
        if !matches!(self.status, JobStatus::Failed | JobStatus::Delayed) {
            return false;
        }
        self.status = JobStatus::Pending;
        self.last_error = None;
        self.next_retry_at = None;
        true
    }

    /// Update progress, clamped to 0-100. No status change; no-op once terminal.
    pub fn update_progress(&mut self, progress: u8) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.progress = progress.min(100);
        true
    }

    /// Pause a job that is active or waiting on a retry.
    pub fn pause(&mut self) -> bool {
        if !matches!(self.status, JobStatus::Active | JobStatus::Delayed) {
            return false;
        }
        self.status = JobStatus::Paused;
        true
    }

    /// Resume a paused job back to active.
    pub fn resume(&mut self) -> bool {
        if self.status != JobStatus::Paused {
            return false;
        }
        self.status = JobStatus::Active;
        true
    }

    /// Backoff before the next retry, exponential in the attempt count.
    fn retry_backoff_ms(&self) -> u64 {
        let base = self.delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
        let exponent = self.attempts.saturating_sub(1).min(20);
        base.saturating_mul(1u64 << exponent)
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

    fn job() -> BackgroundJob {
        BackgroundJob::new("render", "reports", serde_json::json!({"id": 1}), t0())
    }

    #[test]
    fn test_priority_ordering() {
        assert!(JobPriority::Critical > JobPriority::High);
        assert!(JobPriority::High > JobPriority::Medium);
        assert!(JobPriority::Medium > JobPriority::Normal);
        assert!(JobPriority::Normal > JobPriority::Low);
        assert_eq!(JobPriority::Low.score(), 1);
        assert_eq!(JobPriority::Critical.score(), 20);
    }

    #[test]
    fn test_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Delayed.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut job = job();
        assert!(job.start(t0()));
        assert_eq!(job.status(), JobStatus::Active);
        assert_eq!(job.attempts(), 1);

        // Second start is a no-op and does not consume an attempt.
        assert!(!job.start(t0()));
        assert_eq!(job.attempts(), 1);
    }

    #[test]
    fn test_complete_only_from_active() {
        let mut job = job();
        assert!(!job.complete(None, t0()));
        assert_eq!(job.status(), JobStatus::Pending);

        job.start(t0());
        assert!(job.complete(Some(serde_json::json!("ok")), t0()));
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.progress(), 100);
        assert!(job.outcome().unwrap().success);

        // Terminal: nothing moves it again.
        assert!(!job.start(t0()));
        assert!(!job.fail("late", t0()));
        assert!(!job.update_progress(10));
    }

    #[test]
    fn test_fail_delays_until_budget_spent() {
        let mut job = job().with_max_attempts(2);

        job.start(t0());
        assert!(job.fail("boom", t0()));
        assert_eq!(job.status(), JobStatus::Delayed);
        assert!(job.next_retry_at.is_some());
        assert_eq!(job.last_error(), Some("boom"));

        job.start(t0());
        assert!(job.fail("boom again", t0()));
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.next_retry_at.is_none());
        assert!(!job.outcome().unwrap().success);
    }

    #[test]
    fn test_exponential_backoff() {
        let base = 1000;
        let mut job = job().with_max_attempts(4).with_delay_ms(base);

        for attempt in 1..=3u32 {
            job.start(t0());
            job.fail("transient", t0());
            let delta = job.next_retry_at.unwrap() - job.failed_at.unwrap();
            let expected = (base * (1 << (attempt - 1))) as i64;
            assert_eq!(delta.num_milliseconds(), expected);
            assert!(job.retry());
        }
    }

    #[test]
    fn test_default_backoff_base() {
        let mut job = job();
        job.start(t0());
        job.fail("boom", t0());
        let delta = job.next_retry_at.unwrap() - t0();
        assert_eq!(delta.num_milliseconds(), DEFAULT_RETRY_BASE_DELAY_MS as i64);
    }

    #[test]
    fn test_attempts_never_exceed_max() {
        let mut job = job().with_max_attempts(2);
        for _ in 0..5 {
            if job.start(t0()) {
                job.fail("boom", t0());
                job.retry();
            }
        }
        assert!(job.attempts() <= job.max_attempts());
        assert_eq!(job.attempts(), 2);
    }

    #[test]
    fn test_retry_clears_error_state() {
        let mut job = job();
        job.start(t0());
        job.fail("boom", t0());
        assert_eq!(job.status(), JobStatus::Delayed);

        assert!(job.retry());
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.last_error().is_none());
        assert!(job.next_retry_at.is_none());
        assert_eq!(job.attempts(), 1);
    }

    #[test]
    fn test_retry_rejected_from_other_states() {
        let mut job = job();
        assert!(!job.retry());
        job.start(t0());
        assert!(!job.retry());
        job.complete(None, t0());
        assert!(!job.retry());
    }

    #[test]
    fn test_can_retry() {
        let mut job = job().with_max_attempts(1);
        assert!(job.can_retry());
        job.start(t0());
        assert!(!job.can_retry());
    }

    #[test]
    fn test_progress_clamps() {
        let mut job = job();
        job.start(t0());
        assert!(job.update_progress(250));
        assert_eq!(job.progress(), 100);
        assert!(job.update_progress(42));
        assert_eq!(job.progress(), 42);
    }

    #[test]
    fn test_pause_resume() {
        let mut job = job();
        assert!(!job.pause());

        job.start(t0());
        assert!(job.pause());
        assert_eq!(job.status(), JobStatus::Paused);

        assert!(job.resume());
        assert_eq!(job.status(), JobStatus::Active);

        // Delayed jobs can pause too; resume always lands on Active.
        job.fail("boom", t0());
        assert_eq!(job.status(), JobStatus::Delayed);
        assert!(job.pause());
        assert!(job.resume());
        assert_eq!(job.status(), JobStatus::Active);
    }

    #[test]
    fn test_ready_for_retry() {
        let mut job = job().with_delay_ms(1000);
        job.start(t0());
        job.fail("boom", t0());

        assert!(!job.is_ready_for_retry(t0()));
        assert!(job.is_ready_for_retry(t0() + Duration::milliseconds(1000)));
    }
}
