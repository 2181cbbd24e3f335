//! Report collaborator summary and the scheduled-report entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

use crate::scheduling::schedule::{DeliveryConfig, ScheduleConfig};

// ═══════════════════════════════════════════════════════════════════════════════
// Report (external collaborator)
// ═══════════════════════════════════════════════════════════════════════════════

/// Publication state of a report definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Published,
    Archived,
}

/// The slice of a report definition the scheduler needs.
///
/// The full report aggregate (datasets, layout, permissions) lives in the
/// platform's reporting crates; scheduling only checks identity and
/// publication state, once, at schedule-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub name: String,
    pub status: ReportStatus,
    pub owner: String,
}

impl Report {
    pub fn is_published(&self) -> bool {
        self.status == ReportStatus::Published
    }

    pub fn is_archived(&self) -> bool {
        self.status == ReportStatus::Archived
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scheduled Report
// ═══════════════════════════════════════════════════════════════════════════════

/// Unique identifier for a scheduled report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleId(pub Uuid);

impl ScheduleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScheduleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a scheduled report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Archived,
}

/// A recurring definition that, when due, produces a job to regenerate and
/// deliver a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledReport {
    pub id: ScheduleId,
    pub name: String,
    pub description: Option<String>,
    /// The report this schedule regenerates
    pub report_id: Uuid,
    pub schedule: ScheduleConfig,
    pub delivery: DeliveryConfig,
    status: ScheduleStatus,
    pub created_by: String,
    pub organization_id: Option<Uuid>,
    /// Total executions driven by this schedule
    execution_count: u64,
    /// Executions that failed
    failure_count: u64,
    /// Outcomes of the most recent executions, oldest first
    recent_outcomes: VecDeque<bool>,
    /// Cap on `recent_outcomes`
    recent_window: usize,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub next_execution_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledReport {
    /// Create an active schedule with a computed next execution.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        report_id: Uuid,
        schedule: ScheduleConfig,
        delivery: DeliveryConfig,
        created_by: impl Into<String>,
        next_execution_at: DateTime<Utc>,
        recent_window: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ScheduleId::new(),
            name: name.into(),
            description: None,
            report_id,
            schedule,
            delivery,
            status: ScheduleStatus::Active,
            created_by: created_by.into(),
            organization_id: None,
            execution_count: 0,
            failure_count: 0,
            recent_outcomes: VecDeque::new(),
            recent_window: recent_window.max(1),
            last_executed_at: None,
            next_execution_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Scope to an organization.
    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ScheduleStatus::Active
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Failure ratio in [0, 1]; 0 before the first execution.
    pub fn failure_rate(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.execution_count as f64
        }
    }

    /// Success ratio in [0, 1]; 0 before the first execution.
    pub fn success_rate(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            1.0 - self.failure_rate()
        }
    }

    /// Whether the overall failure ratio exceeds `threshold`.
    pub fn has_high_failure_rate(&self, threshold: f64) -> bool {
        self.execution_count > 0 && self.failure_rate() > threshold
    }

    /// Failures among the most recent executions (bounded window).
    pub fn recent_failures(&self) -> usize {
        self.recent_outcomes.iter().filter(|ok| !**ok).count()
    }

    /// Whether this schedule is due within `[start, end]`.
    pub fn is_due_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.next_execution_at >= start && self.next_execution_at <= end
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutators (driven by the execution driver)
    // ─────────────────────────────────────────────────────────────────────────

    /// Record one finished execution and advance to the next firing time.
    pub fn record_execution(
        &mut self,
        success: bool,
        next_execution_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.execution_count += 1;
        if !success {
            self.failure_count += 1;
        }
        self.recent_outcomes.push_back(success);
        while self.recent_outcomes.len() > self.recent_window {
            self.recent_outcomes.pop_front();
        }
        self.last_executed_at = Some(now);
        self.next_execution_at = next_execution_at;
        self.updated_at = now;
    }

    /// Pause the schedule.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.status == ScheduleStatus::Active {
            self.status = ScheduleStatus::Paused;
            self.updated_at = now;
        }
    }

    /// Resume a paused schedule with a freshly computed next execution.
    pub fn resume(&mut self, next_execution_at: DateTime<Utc>, now: DateTime<Utc>) {
        if self.status == ScheduleStatus::Paused {
            self.status = ScheduleStatus::Active;
            self.next_execution_at = next_execution_at;
            self.updated_at = now;
        }
    }

    /// Retire the schedule permanently.
    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.status = ScheduleStatus::Archived;
        self.updated_at = now;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::schedule::ReportFormat;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn schedule() -> ScheduledReport {
        ScheduledReport::new(
            "weekly-revenue",
            Uuid::new_v4(),
            ScheduleConfig::weekly(1, 9, 0, "UTC"),
            DeliveryConfig::email(vec!["ops@example.com".into()], ReportFormat::Pdf),
            "alice",
            t0() + chrono::Duration::days(2),
            10,
            t0(),
        )
    }

    #[test]
    fn test_new_schedule_is_active() {
        let report = schedule();
        assert!(report.is_active());
        assert_eq!(report.execution_count(), 0);
        assert_eq!(report.failure_rate(), 0.0);
        assert!(report.next_execution_at > report.created_at);
    }

    #[test]
    fn test_record_execution_counters() {
        let mut report = schedule();
        let next = t0() + chrono::Duration::days(9);
        report.record_execution(true, next, t0());
        report.record_execution(false, next, t0());
        report.record_execution(true, next, t0());

        assert_eq!(report.execution_count(), 3);
        assert_eq!(report.failure_count(), 1);
        assert!(report.failure_count() <= report.execution_count());
        assert!((report.failure_rate() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.recent_failures(), 1);
        assert_eq!(report.next_execution_at, next);
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let mut report = schedule();
        // recent_window was 10; only failures inside the window count.
        for _ in 0..10 {
            report.record_execution(false, t0(), t0());
        }
        for _ in 0..10 {
            report.record_execution(true, t0(), t0());
        }
        assert_eq!(report.recent_failures(), 0);
        assert_eq!(report.failure_count(), 10);
    }

    #[test]
    fn test_high_failure_rate() {
        let mut report = schedule();
        assert!(!report.has_high_failure_rate(0.5));
        report.record_execution(false, t0(), t0());
        report.record_execution(false, t0(), t0());
        report.record_execution(true, t0(), t0());
        assert!(report.has_high_failure_rate(0.5));
        assert!(!report.has_high_failure_rate(0.7));
    }

    #[test]
    fn test_pause_resume_archive() {
        let mut report = schedule();
        report.pause(t0());
        assert_eq!(report.status(), ScheduleStatus::Paused);

        let next = t0() + chrono::Duration::days(7);
        report.resume(next, t0());
        assert!(report.is_active());
        assert_eq!(report.next_execution_at, next);

        report.archive(t0());
        assert_eq!(report.status(), ScheduleStatus::Archived);
        // Archived schedules do not resume.
        report.resume(next, t0());
        assert_eq!(report.status(), ScheduleStatus::Archived);
    }

    #[test]
    fn test_due_within_window() {
        let report = schedule();
        let at = report.next_execution_at;
        assert!(report.is_due_within(at - chrono::Duration::hours(1), at));
        assert!(!report.is_due_within(at + chrono::Duration::seconds(1), at + chrono::Duration::hours(1)));
    }
}
