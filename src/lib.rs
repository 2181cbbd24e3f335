//! # Meridian Core
//!
//! Background job execution engine and recurring-report scheduler for the
//! Meridian reporting platform.
//!
//! ## Architecture
//!
//! - **Jobs**: queue and job entities, bounded retries with exponential
//!   backoff, a service keeping job state and queue statistics consistent,
//!   and a semaphore-bounded dispatcher enforcing per-queue concurrency
//! - **Scheduling**: timezone-aware next-execution computation, execution
//!   planning over a time window, conflict detection with staggered
//!   suggestions, and access-pattern-driven frequency recommendations
//! - **Clock**: injectable time source so all timing math is testable
//! - **Telemetry**: structured logging bootstrap for host processes
//!
//! Persistence and work execution stay behind seams: repositories
//! (`JobRepository`, `QueueRepository`, `ReportRepository`,
//! `ScheduledReportRepository`) and the `WorkProcessor` capability. The crate
//! ships in-memory repository implementations for tests and development; the
//! platform's adapter crates provide the durable ones.
//!
//! The engine performs no internal threading and offers at-least-once
//! execution: idempotency across process crashes and duplicate-dispatch
//! prevention across scheduler instances are the host's responsibility.

pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod scheduling;
pub mod telemetry;

pub use error::{ErrorCode, MeridianError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{EngineConfig, JobEngineConfig, SchedulingPolicy};
    pub use crate::error::{ErrorCode, MeridianError, Result};
    pub use crate::jobs::{
        AddJobOptions, BackgroundJob, CreateQueueOptions, DispatcherConfig, JobId, JobOutcome,
        JobPriority, JobQueue, JobQueueService, JobStatus, ProcessorError, QueueDispatcher,
        QueueStatistics, WorkProcessor,
    };
    pub use crate::scheduling::{
        DeliveryConfig, DeliveryMethod, ExecutionPlan, ExecutionSample, Frequency,
        FrequencySuggestion, PauseRecommendation, PlanPriority, Report, ReportFormat,
        ReportSchedulingService, ReportStatus, ScheduleConfig, ScheduleRequest, ScheduleStatus,
        ScheduledReport, TimeWindow,
    };
}
