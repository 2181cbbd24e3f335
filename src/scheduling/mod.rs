//! Recurring-report scheduling.
//!
//! This module turns report definitions into recurring execution state:
//!
//! - **Schedule config**: frequency, timezone, and firing-time value types
//! - **Scheduled report**: the recurring definition with execution counters
//! - **Occurrence math**: timezone-aware next-execution computation
//! - **Service**: [`ReportSchedulingService`] for validation, planning,
//!   conflict detection, and frequency suggestions
//! - **Repositories**: storage seams plus in-memory implementations
//!
//! # Usage
//!
//! ```rust,ignore
//! use meridian_core::scheduling::{
//!     ReportSchedulingService, ScheduleConfig, ScheduleRequest,
//! };
//!
//! let service = ReportSchedulingService::new(reports, schedules, clock, policy);
//! let schedule = service.schedule_report(&report, request).await?;
//! let plan = service.create_execution_plan(&due, window);
//! ```

pub mod occurrence;
pub mod report;
pub mod repository;
pub mod schedule;
pub mod service;

pub use occurrence::{next_occurrence, next_occurrences, parse_timezone};
pub use report::{Report, ReportStatus, ScheduleId, ScheduleStatus, ScheduledReport};
pub use repository::{
    InMemoryReportRepository, InMemoryScheduledReportRepository, ReportRepository,
    ScheduledReportRepository,
};
pub use schedule::{DeliveryConfig, DeliveryMethod, Frequency, ReportFormat, ScheduleConfig};
pub use service::{
    ExecutionPlan, ExecutionSample, FrequencySuggestion, PauseRecommendation, PlanPriority,
    PlannedExecution, ReportSchedulingService, ScheduleConflict, ScheduleIssue,
    ScheduleOptimization, ScheduleRequest, ScheduleSuggestion, ScheduleValidation, TimeWindow,
};
