//! Error handling for Meridian Core.
//!
//! This module provides:
//! - A machine-readable [`ErrorCode`] taxonomy shared by every component
//! - A single crate error type with user-facing and internal messages
//! - Field-level context for validation failures
//! - Retryability and category helpers for callers applying their own policy
//! - Metrics integration for error tracking

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for Meridian operations.
pub type Result<T> = std::result::Result<T, MeridianError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by callers for programmatic error
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation Errors (1000-1099)
    ValidationError,
    InvalidInput,
    MissingRequiredField,

    // Not Found (1100-1199)
    QueueNotFound,
    JobNotFound,
    ReportNotFound,
    ScheduleNotFound,
    RecordNotFound,

    // Conflicts (1200-1299)
    DuplicateQueue,
    DuplicateSchedule,

    // Domain Rules (1300-1399)
    BusinessRuleViolation,
    InvalidStateTransition,
    RetriesExhausted,
    QueueInactive,

    // Infrastructure (2000-2099)
    RepositoryError,
    SerializationError,

    // Configuration (5000-5099)
    ConfigurationError,

    // Internal (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::ValidationError => 1000,
            Self::InvalidInput => 1001,
            Self::MissingRequiredField => 1002,

            Self::QueueNotFound => 1100,
            Self::JobNotFound => 1101,
            Self::ReportNotFound => 1102,
            Self::ScheduleNotFound => 1103,
            Self::RecordNotFound => 1104,

            Self::DuplicateQueue => 1200,
            Self::DuplicateSchedule => 1201,

            Self::BusinessRuleViolation => 1300,
            Self::InvalidStateTransition => 1301,
            Self::RetriesExhausted => 1302,
            Self::QueueInactive => 1303,

            Self::RepositoryError => 2000,
            Self::SerializationError => 2001,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Check if the failed operation is worth retrying as-is.
    ///
    /// Only infrastructure faults qualify; validation, not-found, and domain
    /// rule violations will fail identically on a retry.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RepositoryError)
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "validation",
            1100..=1199 => "not_found",
            1200..=1299 => "conflict",
            1300..=1399 => "domain_rule",
            2000..=2099 => "infrastructure",
            5000..=5099 => "configuration",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Meridian Core.
///
/// Supports:
/// - Structured error codes
/// - Field-level context for validation failures
/// - User-friendly vs internal messages
/// - Error chaining
#[derive(Error, Debug)]
pub struct MeridianError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-friendly error message (safe to expose to clients)
    message: Cow<'static, str>,

    /// The offending field, for validation errors
    field: Option<String>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for MeridianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code)?;
        if let Some(ref field) = self.field {
            write!(f, "{}: ", field)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl MeridianError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            message: message.into(),
            field: None,
            internal_message: None,
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ValidationError, message).with_field(field)
    }

    /// Create a missing-required-field error.
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    /// Create a not-found error for a named entity.
    pub fn not_found(code: ErrorCode, entity: &str, id: impl fmt::Display) -> Self {
        Self::new(code, format!("{} not found: {}", entity, id))
    }

    /// Create a conflict error.
    pub fn conflict(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(code, message)
    }

    /// Create a business rule violation.
    pub fn business_rule(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::BusinessRuleViolation, message)
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidStateTransition, message)
    }

    /// Create a repository error wrapping a storage-layer failure.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RepositoryError, "Repository operation failed")
            .with_internal_message(message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, "An internal error occurred")
            .with_internal_message(message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach the offending field name.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach an internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    /// Attach a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the offending field, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the internal message, if any.
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Check if the failed operation is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    fn record_metrics(&self) {
        counter!(
            "meridian_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category()
        )
        .increment(1);
    }
}

impl From<serde_json::Error> for MeridianError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, "Serialization failed").with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeridianError::validation("hour", "hour must be between 0 and 23");
        assert_eq!(
            err.to_string(),
            "[ValidationError] hour: hour must be between 0 and 23"
        );
        assert_eq!(err.field(), Some("hour"));
    }

    #[test]
    fn test_not_found() {
        let err = MeridianError::not_found(ErrorCode::QueueNotFound, "Queue", "reports");
        assert_eq!(err.code(), ErrorCode::QueueNotFound);
        assert_eq!(err.message(), "Queue not found: reports");
        assert_eq!(err.code().category(), "not_found");
    }

    #[test]
    fn test_retryable() {
        assert!(MeridianError::repository("connection reset").is_retryable());
        assert!(!MeridianError::business_rule("report is not published").is_retryable());
        assert!(!MeridianError::required("name").is_retryable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::DuplicateQueue.category(), "conflict");
        assert_eq!(ErrorCode::RetriesExhausted.category(), "domain_rule");
        assert_eq!(ErrorCode::RepositoryError.category(), "infrastructure");
        assert_eq!(ErrorCode::InternalError.category(), "internal");
    }

    #[test]
    fn test_internal_message_not_in_user_message() {
        let err = MeridianError::repository("pg timeout on jobs table");
        assert_eq!(err.message(), "Repository operation failed");
        assert_eq!(err.internal_message(), Some("pg timeout on jobs table"));
    }
}
