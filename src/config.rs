//! Configuration management.

use serde::Deserialize;

use crate::telemetry::TelemetryConfig;

/// Main engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Job engine configuration
    #[serde(default)]
    pub jobs: JobEngineConfig,

    /// Scheduling policy knobs
    #[serde(default)]
    pub scheduling: SchedulingPolicy,

    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Defaults applied to jobs and the dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEngineConfig {
    /// Default retry budget for jobs whose queue does not override it
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Default job execution timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Dispatcher poll interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub dispatcher_poll_interval_ms: u64,

    /// Maximum jobs fetched per dispatcher poll
    #[serde(default = "default_batch_size")]
    pub dispatcher_batch_size: usize,
}

impl Default for JobEngineConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            default_timeout_ms: default_timeout_ms(),
            dispatcher_poll_interval_ms: default_poll_interval_ms(),
            dispatcher_batch_size: default_batch_size(),
        }
    }
}

/// Tunable constants for the report scheduling heuristics.
///
/// The qualitative behavior (which warnings fire, which frequency is
/// suggested) is contractual; the exact numbers here are policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingPolicy {
    /// Start of the business-hours band (inclusive, 0-23)
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u8,

    /// End of the business-hours band (inclusive, 0-23)
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u8,

    /// Minimum execution-history samples before a real frequency suggestion
    #[serde(default = "default_min_history_samples")]
    pub min_history_samples: usize,

    /// Confidence reported when history is insufficient
    #[serde(default = "default_low_confidence")]
    pub low_confidence: f64,

    /// Confidence for a suggestion backed by sufficient history
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,

    /// Confidence never drops below this floor
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Success ratio below which confidence is reduced
    #[serde(default = "default_success_ratio_threshold")]
    pub success_ratio_threshold: f64,

    /// Average access count at or above which DAILY is suggested
    #[serde(default = "default_high_access_threshold")]
    pub high_access_threshold: f64,

    /// Average access count at or below which WEEKLY is suggested
    #[serde(default = "default_low_access_threshold")]
    pub low_access_threshold: f64,

    /// Average execution-to-access delay that biases toward WEEKLY (seconds)
    #[serde(default = "default_long_access_delay_secs")]
    pub long_access_delay_secs: u64,

    /// Failure ratio above which a schedule should be paused
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// How many recent executions the burst-failure check looks at
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Failures within the recent window that trigger a pause recommendation
    #[serde(default = "default_recent_failure_threshold")]
    pub recent_failure_threshold: usize,

    /// Gap between staggered slots when resolving conflicts (seconds)
    #[serde(default = "default_conflict_stagger_secs")]
    pub conflict_stagger_secs: i64,

    /// Estimated execution duration for PDF deliveries (seconds)
    #[serde(default = "default_estimate_pdf_secs")]
    pub estimate_pdf_secs: u64,

    /// Estimated execution duration for XLSX deliveries (seconds)
    #[serde(default = "default_estimate_xlsx_secs")]
    pub estimate_xlsx_secs: u64,

    /// Estimated execution duration for CSV deliveries (seconds)
    #[serde(default = "default_estimate_csv_secs")]
    pub estimate_csv_secs: u64,

    /// Estimated execution duration for JSON deliveries (seconds)
    #[serde(default = "default_estimate_json_secs")]
    pub estimate_json_secs: u64,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
            min_history_samples: default_min_history_samples(),
            low_confidence: default_low_confidence(),
            base_confidence: default_base_confidence(),
            confidence_floor: default_confidence_floor(),
            success_ratio_threshold: default_success_ratio_threshold(),
            high_access_threshold: default_high_access_threshold(),
            low_access_threshold: default_low_access_threshold(),
            long_access_delay_secs: default_long_access_delay_secs(),
            failure_rate_threshold: default_failure_rate_threshold(),
            recent_window: default_recent_window(),
            recent_failure_threshold: default_recent_failure_threshold(),
            conflict_stagger_secs: default_conflict_stagger_secs(),
            estimate_pdf_secs: default_estimate_pdf_secs(),
            estimate_xlsx_secs: default_estimate_xlsx_secs(),
            estimate_csv_secs: default_estimate_csv_secs(),
            estimate_json_secs: default_estimate_json_secs(),
        }
    }
}

// Default value functions
fn default_max_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 5000 }
fn default_timeout_ms() -> u64 { 300_000 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_batch_size() -> usize { 20 }
fn default_business_hours_start() -> u8 { 7 }
fn default_business_hours_end() -> u8 { 19 }
fn default_min_history_samples() -> usize { 5 }
fn default_low_confidence() -> f64 { 0.3 }
fn default_base_confidence() -> f64 { 0.8 }
fn default_confidence_floor() -> f64 { 0.4 }
fn default_success_ratio_threshold() -> f64 { 0.8 }
fn default_high_access_threshold() -> f64 { 10.0 }
fn default_low_access_threshold() -> f64 { 2.0 }
fn default_long_access_delay_secs() -> u64 { 86_400 }
fn default_failure_rate_threshold() -> f64 { 0.5 }
fn default_recent_window() -> usize { 10 }
fn default_recent_failure_threshold() -> usize { 3 }
fn default_conflict_stagger_secs() -> i64 { 900 }
fn default_estimate_pdf_secs() -> u64 { 300 }
fn default_estimate_xlsx_secs() -> u64 { 240 }
fn default_estimate_csv_secs() -> u64 { 120 }
fn default_estimate_json_secs() -> u64 { 60 }

impl EngineConfig {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MERIDIAN").separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MERIDIAN").separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_engine_defaults() {
        let config = JobEngineConfig::default();
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 5000);
        assert_eq!(config.dispatcher_poll_interval_ms, 1000);
        assert_eq!(config.dispatcher_batch_size, 20);
    }

    #[test]
    fn test_scheduling_policy_defaults() {
        let policy = SchedulingPolicy::default();
        assert_eq!(policy.business_hours_start, 7);
        assert_eq!(policy.business_hours_end, 19);
        assert_eq!(policy.min_history_samples, 5);
        assert_eq!(policy.low_confidence, 0.3);
        assert_eq!(policy.recent_failure_threshold, 3);
        assert!(policy.confidence_floor < policy.base_confidence);
    }

    #[test]
    fn test_engine_config_deserializes_partial() {
        let cfg: EngineConfig = serde_json::from_str(
            r#"{"jobs": {"default_max_attempts": 5}, "scheduling": {"business_hours_start": 8}}"#,
        )
        .unwrap();
        assert_eq!(cfg.jobs.default_max_attempts, 5);
        assert_eq!(cfg.jobs.retry_base_delay_ms, 5000);
        assert_eq!(cfg.scheduling.business_hours_start, 8);
        assert_eq!(cfg.scheduling.business_hours_end, 19);
    }
}
