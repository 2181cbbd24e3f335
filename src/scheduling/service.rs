//! Report scheduling service.
//!
//! Stateless with respect to domain data: every method is a function of its
//! inputs plus the injected repositories, clock, and policy. Validation is
//! synchronous and side-effect-free; repository errors propagate unchanged.

use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SchedulingPolicy;
use crate::error::{ErrorCode, MeridianError, Result};
use crate::scheduling::occurrence::{next_occurrence, next_occurrences, parse_timezone};
use crate::scheduling::report::{Report, ScheduleId, ScheduledReport};
use crate::scheduling::repository::{ReportRepository, ScheduledReportRepository};
use crate::scheduling::schedule::{
    DeliveryConfig, DeliveryMethod, Frequency, ReportFormat, ScheduleConfig,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Pre-compiled Regex Patterns
// ═══════════════════════════════════════════════════════════════════════════════

/// Email validation regex (RFC 5322 simplified).
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

/// URL validation regex.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)$"
    ).expect("Invalid URL regex")
});

// ═══════════════════════════════════════════════════════════════════════════════
// Requests & Results
// ═══════════════════════════════════════════════════════════════════════════════

/// Request to create a scheduled report.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub name: String,
    pub description: Option<String>,
    pub report_id: Uuid,
    pub schedule: ScheduleConfig,
    pub delivery: DeliveryConfig,
    pub created_by: String,
    pub organization_id: Option<Uuid>,
}

/// One hard rule violation found during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleIssue {
    pub field: String,
    pub message: String,
}

impl ScheduleIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating a [`ScheduleConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleValidation {
    pub is_valid: bool,
    /// Hard rule violations
    pub errors: Vec<ScheduleIssue>,
    /// Soft heuristics worth surfacing to the user
    pub warnings: Vec<String>,
    /// The next five firing timestamps, strictly increasing
    pub next_executions: Vec<DateTime<Utc>>,
}

/// Inclusive time window for planning queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Priority tag for ordering within an execution plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPriority {
    High,
    Medium,
    Low,
}

impl fmt::Display for PlanPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One due schedule inside an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedExecution {
    pub schedule_id: ScheduleId,
    pub report_id: Uuid,
    pub name: String,
    pub scheduled_for: DateTime<Utc>,
    pub estimated_duration_secs: u64,
    pub priority: PlanPriority,
}

/// Ordered list of schedules due within a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub window: TimeWindow,
    pub entries: Vec<PlannedExecution>,
}

/// A group of schedules colliding on one execution time beyond the limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub time: DateTime<Utc>,
    pub schedule_ids: Vec<ScheduleId>,
}

/// Proposed move for one report out of a conflicted slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSuggestion {
    pub schedule_id: ScheduleId,
    pub current_time: DateTime<Utc>,
    pub suggested_time: DateTime<Utc>,
    pub reason: String,
}

/// Outcome of conflict analysis over a set of schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOptimization {
    pub conflicts: Vec<ScheduleConflict>,
    pub suggestions: Vec<ScheduleSuggestion>,
}

/// One historical execution with its observed consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSample {
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    /// How many times the produced report was accessed
    pub access_count: u64,
    /// Average delay between execution and first access (seconds)
    pub avg_access_delay_secs: u64,
}

/// Frequency recommendation derived from execution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencySuggestion {
    pub suggested_frequency: Frequency,
    /// In [0, 1]
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

/// Recommendation from the failure-driven pause check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseRecommendation {
    pub should_pause: bool,
    pub reason: Option<String>,
    pub suggested_action: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

// Plan priority thresholds. Local policy, not a contract: a schedule earns a
// higher tag with more history and a better success rate.
const PLAN_HIGH_MIN_EXECUTIONS: u64 = 10;
const PLAN_HIGH_MIN_SUCCESS: f64 = 0.9;
const PLAN_MEDIUM_MIN_EXECUTIONS: u64 = 3;
const PLAN_MEDIUM_MIN_SUCCESS: f64 = 0.75;

/// Validates schedule requests, computes execution times, builds execution
/// plans, detects conflicts, and recommends frequency adjustments.
pub struct ReportSchedulingService {
    reports: Arc<dyn ReportRepository>,
    schedules: Arc<dyn ScheduledReportRepository>,
    clock: Arc<dyn Clock>,
    policy: SchedulingPolicy,
}

impl ReportSchedulingService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        schedules: Arc<dyn ScheduledReportRepository>,
        clock: Arc<dyn Clock>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            reports,
            schedules,
            clock,
            policy,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Schedule creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Materialize and persist a [`ScheduledReport`] from a published report
    /// and a validated request.
    pub async fn schedule_report(
        &self,
        report: &Report,
        request: ScheduleRequest,
    ) -> Result<ScheduledReport> {
        if request.name.trim().is_empty() {
            return Err(MeridianError::required("name"));
        }
        if request.created_by.trim().is_empty() {
            return Err(MeridianError::required("created_by"));
        }
        if request.report_id != report.id {
            return Err(MeridianError::validation(
                "report_id",
                "report_id does not match the supplied report",
            ));
        }
        if !self.reports.exists(request.report_id).await? {
            return Err(MeridianError::not_found(
                ErrorCode::ReportNotFound,
                "Report",
                request.report_id,
            ));
        }
        if report.is_archived() {
            return Err(MeridianError::business_rule(
                "cannot schedule an archived report",
            ));
        }
        if !report.is_published() {
            return Err(MeridianError::business_rule(
                "cannot schedule a report that is not published",
            ));
        }

        let validation = self.validate_schedule(&request.schedule);
        if let Some(issue) = validation.errors.into_iter().next() {
            return Err(MeridianError::validation(issue.field, issue.message));
        }
        validate_delivery(&request.delivery)?;

        if self
            .schedules
            .exists_by_name(&request.name, &request.created_by, request.organization_id)
            .await?
        {
            return Err(MeridianError::conflict(
                ErrorCode::DuplicateSchedule,
                format!("scheduled report already exists: {}", request.name),
            ));
        }

        let now = self.clock.now();
        let next_execution_at = next_occurrence(&request.schedule, now)?;
        let mut schedule = ScheduledReport::new(
            request.name,
            request.report_id,
            request.schedule,
            request.delivery,
            request.created_by,
            next_execution_at,
            self.policy.recent_window,
            now,
        );
        if let Some(description) = request.description {
            schedule = schedule.with_description(description);
        }
        if let Some(organization_id) = request.organization_id {
            schedule = schedule.with_organization(organization_id);
        }

        self.schedules.save(&schedule).await?;
        counter!("meridian_schedules_created_total").increment(1);
        info!(
            schedule_id = %schedule.id,
            report_id = %schedule.report_id,
            frequency = %schedule.schedule.frequency,
            next_execution_at = %schedule.next_execution_at,
            "Scheduled report created"
        );
        Ok(schedule)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Check a schedule configuration: hard rule violations, soft warnings,
    /// and a preview of the next five firing times.
    pub fn validate_schedule(&self, config: &ScheduleConfig) -> ScheduleValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.hour > 23 {
            errors.push(ScheduleIssue::new("hour", "hour must be between 0 and 23"));
        }
        if config.minute > 59 {
            errors.push(ScheduleIssue::new(
                "minute",
                "minute must be between 0 and 59",
            ));
        }
        if let Some(day) = config.day_of_week {
            if day > 6 {
                errors.push(ScheduleIssue::new(
                    "day_of_week",
                    "day of week must be between 0 (Sunday) and 6 (Saturday)",
                ));
            }
        }
        if config.frequency == Frequency::Monthly && config.day_of_month.is_none() {
            errors.push(ScheduleIssue::new(
                "day_of_month",
                "day of month is required for monthly schedules",
            ));
        }
        if let Some(day) = config.day_of_month {
            if !(1..=31).contains(&day) {
                errors.push(ScheduleIssue::new(
                    "day_of_month",
                    "day of month must be between 1 and 31",
                ));
            }
        }
        if let Err(error) = parse_timezone(&config.timezone) {
            errors.push(ScheduleIssue::new("timezone", error.message().to_string()));
        }

        if config.frequency == Frequency::Weekly {
            if let Some(day) = config.day_of_week {
                if day == 0 || day == 6 {
                    warnings.push(
                        "schedule falls on a weekend; recipients may not see it until Monday"
                            .to_string(),
                    );
                }
            }
        }
        if config.hour < self.policy.business_hours_start
            || config.hour > self.policy.business_hours_end
        {
            warnings.push(format!(
                "schedule is outside business hours ({:02}:00-{:02}:00)",
                self.policy.business_hours_start, self.policy.business_hours_end
            ));
        }
        if config.frequency.month_stride().is_some() {
            if let Some(day) = config.day_of_month {
                if day > 28 {
                    warnings.push(format!(
                        "day {} does not exist in every month; short months run on their last day",
                        day
                    ));
                }
            }
        }

        let next_executions = if errors.is_empty() {
            match next_occurrences(config, self.clock.now(), 5) {
                Ok(series) => series,
                Err(error) => {
                    errors.push(ScheduleIssue::new(
                        error.field().unwrap_or("schedule").to_string(),
                        error.message().to_string(),
                    ));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        ScheduleValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            next_executions,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Planning
    // ─────────────────────────────────────────────────────────────────────────

    /// The ordered list of active schedules due within the window, annotated
    /// with estimated cost and a history-derived priority tag.
    pub fn create_execution_plan(
        &self,
        schedules: &[ScheduledReport],
        window: TimeWindow,
    ) -> ExecutionPlan {
        let mut entries: Vec<PlannedExecution> = schedules
            .iter()
            .filter(|s| s.is_active() && s.is_due_within(window.start, window.end))
            .map(|s| PlannedExecution {
                schedule_id: s.id,
                report_id: s.report_id,
                name: s.name.clone(),
                scheduled_for: s.next_execution_at,
                estimated_duration_secs: self.estimate_duration(&s.delivery),
                priority: plan_priority(s),
            })
            .collect();
        entries.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.name.cmp(&b.name))
        });
        ExecutionPlan { window, entries }
    }

    /// Group active schedules by exact execution time and report any group
    /// larger than `max_concurrent`, with staggered move suggestions for each
    /// report beyond the limit.
    pub fn optimize_schedule(
        &self,
        schedules: &[ScheduledReport],
        max_concurrent: usize,
    ) -> ScheduleOptimization {
        let max_concurrent = max_concurrent.max(1);
        let stagger = chrono::Duration::seconds(self.policy.conflict_stagger_secs.max(1));

        let mut groups: BTreeMap<DateTime<Utc>, Vec<&ScheduledReport>> = BTreeMap::new();
        for schedule in schedules.iter().filter(|s| s.is_active()) {
            groups
                .entry(schedule.next_execution_at)
                .or_default()
                .push(schedule);
        }

        let mut occupancy: HashMap<DateTime<Utc>, usize> = groups
            .iter()
            .map(|(time, group)| (*time, group.len().min(max_concurrent)))
            .collect();

        let mut conflicts = Vec::new();
        let mut suggestions = Vec::new();

        for (time, group) in &groups {
            if group.len() <= max_concurrent {
                continue;
            }
            conflicts.push(ScheduleConflict {
                time: *time,
                schedule_ids: group.iter().map(|s| s.id).collect(),
            });

            for schedule in &group[max_concurrent..] {
                let mut candidate = *time + stagger;
                while occupancy.get(&candidate).copied().unwrap_or(0) >= max_concurrent {
                    candidate += stagger;
                }
                *occupancy.entry(candidate).or_insert(0) += 1;
                suggestions.push(ScheduleSuggestion {
                    schedule_id: schedule.id,
                    current_time: *time,
                    suggested_time: candidate,
                    reason: "concurrent execution conflict".to_string(),
                });
            }
        }

        ScheduleOptimization {
            conflicts,
            suggestions,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Heuristics
    // ─────────────────────────────────────────────────────────────────────────

    /// Suggest a frequency from how the report's past executions were
    /// actually consumed.
    pub fn suggest_optimal_frequency(&self, history: &[ExecutionSample]) -> FrequencySuggestion {
        if history.len() < self.policy.min_history_samples {
            return FrequencySuggestion {
                suggested_frequency: Frequency::Weekly,
                confidence: self.policy.low_confidence,
                reasoning: vec![format!(
                    "insufficient execution history: {} samples, need at least {}",
                    history.len(),
                    self.policy.min_history_samples
                )],
            };
        }

        let count = history.len() as f64;
        let avg_access = history.iter().map(|s| s.access_count as f64).sum::<f64>() / count;
        let avg_delay =
            history.iter().map(|s| s.avg_access_delay_secs as f64).sum::<f64>() / count;
        let success_ratio = history.iter().filter(|s| s.success).count() as f64 / count;

        let mut reasoning = Vec::new();
        let suggested_frequency = if avg_delay > self.policy.long_access_delay_secs as f64 {
            reasoning.push(
                "long delay between execution and access suggests a less frequent schedule"
                    .to_string(),
            );
            Frequency::Weekly
        } else if avg_access >= self.policy.high_access_threshold {
            reasoning.push(format!(
                "high access count (avg {:.1} per execution) supports a daily schedule",
                avg_access
            ));
            Frequency::Daily
        } else if avg_access <= self.policy.low_access_threshold {
            reasoning.push(format!(
                "low access count (avg {:.1} per execution) supports a weekly schedule",
                avg_access
            ));
            Frequency::Weekly
        } else {
            reasoning.push(format!(
                "moderate access count (avg {:.1} per execution) supports a daily schedule",
                avg_access
            ));
            Frequency::Daily
        };

        let mut confidence = self.policy.base_confidence;
        if success_ratio < self.policy.success_ratio_threshold {
            confidence = (confidence - 0.3).max(self.policy.confidence_floor);
            reasoning.push(format!(
                "confidence reduced by execution failures (success ratio {:.0}%)",
                success_ratio * 100.0
            ));
        }

        FrequencySuggestion {
            suggested_frequency,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning,
        }
    }

    /// Recommend pausing a schedule whose executions keep failing.
    pub fn should_pause_for_failures(&self, schedule: &ScheduledReport) -> PauseRecommendation {
        if schedule.has_high_failure_rate(self.policy.failure_rate_threshold) {
            return PauseRecommendation {
                should_pause: true,
                reason: Some(format!(
                    "failure rate {:.0}% exceeds the {:.0}% threshold",
                    schedule.failure_rate() * 100.0,
                    self.policy.failure_rate_threshold * 100.0
                )),
                suggested_action: Some(
                    "review the report configuration and data sources".to_string(),
                ),
            };
        }

        if schedule.recent_failures() >= self.policy.recent_failure_threshold {
            return PauseRecommendation {
                should_pause: true,
                reason: Some("multiple recent failures detected".to_string()),
                suggested_action: Some("check dependencies and data availability".to_string()),
            };
        }

        PauseRecommendation {
            should_pause: false,
            reason: None,
            suggested_action: None,
        }
    }

    fn estimate_duration(&self, delivery: &DeliveryConfig) -> u64 {
        match delivery.format {
            ReportFormat::Pdf => self.policy.estimate_pdf_secs,
            ReportFormat::Xlsx => self.policy.estimate_xlsx_secs,
            ReportFormat::Csv => self.policy.estimate_csv_secs,
            ReportFormat::Json => self.policy.estimate_json_secs,
        }
    }
}

fn plan_priority(schedule: &ScheduledReport) -> PlanPriority {
    let executions = schedule.execution_count();
    let success = schedule.success_rate();
    if executions >= PLAN_HIGH_MIN_EXECUTIONS && success >= PLAN_HIGH_MIN_SUCCESS {
        PlanPriority::High
    } else if executions >= PLAN_MEDIUM_MIN_EXECUTIONS && success >= PLAN_MEDIUM_MIN_SUCCESS {
        PlanPriority::Medium
    } else {
        PlanPriority::Low
    }
}

fn validate_delivery(delivery: &DeliveryConfig) -> Result<()> {
    match delivery.method {
        DeliveryMethod::Email => {
            if delivery.recipients.is_empty() {
                return Err(MeridianError::validation(
                    "recipients",
                    "email delivery requires at least one recipient",
                ));
            }
            for recipient in &delivery.recipients {
                if !EMAIL_REGEX.is_match(recipient) {
                    return Err(MeridianError::validation(
                        "recipients",
                        format!("invalid email address: {}", recipient),
                    ));
                }
            }
        }
        DeliveryMethod::Sms => {
            if delivery.recipients.is_empty() {
                return Err(MeridianError::validation(
                    "recipients",
                    "sms delivery requires at least one recipient",
                ));
            }
        }
        DeliveryMethod::Webhook => {
            let url = delivery.webhook_url.as_deref().unwrap_or("");
            if url.is_empty() {
                return Err(MeridianError::validation(
                    "webhook_url",
                    "webhook delivery requires a URL",
                ));
            }
            if !URL_REGEX.is_match(url) {
                return Err(MeridianError::validation(
                    "webhook_url",
                    format!("invalid webhook URL: {}", url),
                ));
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduling::repository::{
        InMemoryReportRepository, InMemoryScheduledReportRepository,
    };
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn service() -> ReportSchedulingService {
        ReportSchedulingService::new(
            Arc::new(InMemoryReportRepository::new()),
            Arc::new(InMemoryScheduledReportRepository::new()),
            Arc::new(ManualClock::new(t0())),
            SchedulingPolicy::default(),
        )
    }

    #[test]
    fn test_validate_schedule_hard_errors() {
        let service = service();
        let mut config = ScheduleConfig::daily(9, 0, "UTC");
        config.hour = 24;
        config.minute = 60;
        let result = service.validate_schedule(&config);
        assert!(!result.is_valid);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"hour"));
        assert!(fields.contains(&"minute"));
        assert!(result.next_executions.is_empty());
    }

    #[test]
    fn test_validate_schedule_next_five() {
        let service = service();
        let config = ScheduleConfig::daily(9, 0, "UTC");
        let result = service.validate_schedule(&config);
        assert!(result.is_valid);
        assert_eq!(result.next_executions.len(), 5);
        for pair in result.next_executions.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_validate_delivery() {
        let email_ok =
            DeliveryConfig::email(vec!["ops@example.com".into()], ReportFormat::Pdf);
        assert!(validate_delivery(&email_ok).is_ok());

        let email_bad = DeliveryConfig::email(vec!["not-an-address".into()], ReportFormat::Pdf);
        assert!(validate_delivery(&email_bad).is_err());

        let email_empty = DeliveryConfig::email(vec![], ReportFormat::Pdf);
        let err = validate_delivery(&email_empty).unwrap_err();
        assert_eq!(err.field(), Some("recipients"));

        let hook_ok = DeliveryConfig::webhook("https://example.com/ingest", ReportFormat::Json);
        assert!(validate_delivery(&hook_ok).is_ok());

        let hook_bad = DeliveryConfig::webhook("not a url", ReportFormat::Json);
        let err = validate_delivery(&hook_bad).unwrap_err();
        assert_eq!(err.field(), Some("webhook_url"));
    }

    #[test]
    fn test_plan_priority_thresholds() {
        let mut schedule = ScheduledReport::new(
            "s",
            Uuid::new_v4(),
            ScheduleConfig::daily(9, 0, "UTC"),
            DeliveryConfig::email(vec!["ops@example.com".into()], ReportFormat::Csv),
            "alice",
            t0() + chrono::Duration::hours(1),
            10,
            t0(),
        );
        assert_eq!(plan_priority(&schedule), PlanPriority::Low);

        for _ in 0..4 {
            schedule.record_execution(true, t0(), t0());
        }
        assert_eq!(plan_priority(&schedule), PlanPriority::Medium);

        for _ in 0..8 {
            schedule.record_execution(true, t0(), t0());
        }
        assert_eq!(plan_priority(&schedule), PlanPriority::High);
    }

    #[test]
    fn test_suggest_frequency_insufficient_history() {
        let service = service();
        let samples: Vec<ExecutionSample> = (0..3)
            .map(|i| ExecutionSample {
                executed_at: t0() - chrono::Duration::days(i),
                success: true,
                access_count: 100,
                avg_access_delay_secs: 60,
            })
            .collect();
        let suggestion = service.suggest_optimal_frequency(&samples);
        assert_eq!(suggestion.confidence, 0.3);
        assert!(suggestion.reasoning[0].contains("insufficient execution history"));
    }

    #[test]
    fn test_suggest_frequency_directions() {
        let service = service();
        let sample = |access: u64, delay: u64, success: bool| ExecutionSample {
            executed_at: t0(),
            success,
            access_count: access,
            avg_access_delay_secs: delay,
        };

        let high_access: Vec<_> = (0..6).map(|_| sample(50, 600, true)).collect();
        let suggestion = service.suggest_optimal_frequency(&high_access);
        assert_eq!(suggestion.suggested_frequency, Frequency::Daily);
        assert!(suggestion.reasoning[0].contains("high access count"));

        let low_access: Vec<_> = (0..6).map(|_| sample(1, 600, true)).collect();
        let suggestion = service.suggest_optimal_frequency(&low_access);
        assert_eq!(suggestion.suggested_frequency, Frequency::Weekly);
        assert!(suggestion.reasoning[0].contains("low access count"));

        // Long access delay wins even when access counts are high.
        let slow_access: Vec<_> = (0..6).map(|_| sample(50, 200_000, true)).collect();
        let suggestion = service.suggest_optimal_frequency(&slow_access);
        assert_eq!(suggestion.suggested_frequency, Frequency::Weekly);
        assert!(suggestion.reasoning[0].contains("long delay"));
    }

    #[test]
    fn test_suggest_frequency_failure_penalty() {
        let service = service();
        let samples: Vec<_> = (0..10)
            .map(|i| ExecutionSample {
                executed_at: t0(),
                success: i % 2 == 0,
                access_count: 50,
                avg_access_delay_secs: 60,
            })
            .collect();
        let suggestion = service.suggest_optimal_frequency(&samples);
        assert!(suggestion.confidence < SchedulingPolicy::default().base_confidence);
        assert!(suggestion.confidence >= SchedulingPolicy::default().confidence_floor);
        assert!(suggestion
            .reasoning
            .iter()
            .any(|r| r.contains("confidence reduced")));
    }
}
