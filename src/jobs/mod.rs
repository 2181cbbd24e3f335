//! Background job execution engine.
//!
//! This module provides job lifecycle management with bounded retries and
//! exponential backoff, per-queue concurrency limits, and queue-level
//! statistics:
//!
//! - **Job**: the [`BackgroundJob`] entity owning its own state machine
//! - **Queue**: the [`JobQueue`] entity holding policy and counters
//! - **Repositories**: storage seams plus in-memory implementations
//! - **Service**: [`JobQueueService`], the orchestration layer
//! - **Dispatcher**: a semaphore-bounded driver enforcing queue concurrency
//!
//! # Usage
//!
//! ```rust,ignore
//! use meridian_core::jobs::{
//!     AddJobOptions, CreateQueueOptions, JobQueueService, WorkProcessor,
//! };
//!
//! let service = JobQueueService::new(jobs, queues, clock, config);
//! service.create_queue("reports", CreateQueueOptions::default()).await?;
//! let job = service
//!     .add_job("reports", "render-monthly", payload, AddJobOptions::default())
//!     .await?;
//! let job = service.process_job(job, processor.as_ref()).await?;
//! ```

pub mod dispatcher;
pub mod job;
pub mod queue;
pub mod repository;
pub mod service;

pub use dispatcher::{DispatcherConfig, DispatcherHandle, DispatcherStats, QueueDispatcher};
pub use job::{
    BackgroundJob, JobId, JobOutcome, JobPriority, JobStatus, DEFAULT_RETRY_BASE_DELAY_MS,
};
pub use queue::{JobQueue, QueueId};
pub use repository::{
    GlobalQueueStatistics, InMemoryJobRepository, InMemoryQueueRepository, JobCounts,
    JobRepository, QueueRepository,
};
pub use service::{
    AddJobOptions, CreateQueueOptions, JobQueueService, ProcessorError, QueueStatistics,
    WorkProcessor,
};
