//! Schedule and delivery value types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How often a scheduled report fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Month stride for the month-anchored frequencies.
    pub(crate) fn month_stride(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::Yearly => Some(12),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Quarterly => write!(f, "quarterly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// When a recurring report fires.
///
/// `day_of_week` uses 0 = Sunday through 6 = Saturday and only applies to
/// weekly schedules; `day_of_month` (1-31) applies to the month-anchored
/// frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub frequency: Frequency,
    /// IANA timezone identifier (e.g. "America/New_York")
    pub timezone: String,
    /// Hour of day, 0-23
    pub hour: u8,
    /// Minute of hour, 0-59
    pub minute: u8,
    /// Day of week for weekly schedules, 0 = Sunday
    pub day_of_week: Option<u8>,
    /// Day of month for monthly/quarterly/yearly schedules, 1-31
    pub day_of_month: Option<u8>,
}

impl ScheduleConfig {
    /// An hourly schedule firing at the given minute.
    pub fn hourly(minute: u8, timezone: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Hourly,
            timezone: timezone.into(),
            hour: 0,
            minute,
            day_of_week: None,
            day_of_month: None,
        }
    }

    /// A daily schedule at hour:minute.
    pub fn daily(hour: u8, minute: u8, timezone: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Daily,
            timezone: timezone.into(),
            hour,
            minute,
            day_of_week: None,
            day_of_month: None,
        }
    }

    /// A weekly schedule on the given day (0 = Sunday) at hour:minute.
    pub fn weekly(day_of_week: u8, hour: u8, minute: u8, timezone: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            timezone: timezone.into(),
            hour,
            minute,
            day_of_week: Some(day_of_week),
            day_of_month: None,
        }
    }

    /// A monthly schedule on the given day of month at hour:minute.
    pub fn monthly(day_of_month: u8, hour: u8, minute: u8, timezone: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Monthly,
            timezone: timezone.into(),
            hour,
            minute,
            day_of_week: None,
            day_of_month: Some(day_of_month),
        }
    }
}

/// How a finished report is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    Sms,
    Webhook,
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

/// Output format of the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Pdf,
    Csv,
    Xlsx,
    Json,
}

/// Where and how a scheduled report is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub method: DeliveryMethod,
    /// Email addresses or phone numbers, depending on the method
    pub recipients: Vec<String>,
    pub format: ReportFormat,
    pub subject: Option<String>,
    pub message: Option<String>,
    /// Required when method is `Webhook`
    pub webhook_url: Option<String>,
}

impl DeliveryConfig {
    /// Email delivery to the given recipients.
    pub fn email(recipients: Vec<String>, format: ReportFormat) -> Self {
        Self {
            method: DeliveryMethod::Email,
            recipients,
            format,
            subject: None,
            message: None,
            webhook_url: None,
        }
    }

    /// Webhook delivery to the given URL.
    pub fn webhook(url: impl Into<String>, format: ReportFormat) -> Self {
        Self {
            method: DeliveryMethod::Webhook,
            recipients: Vec::new(),
            format,
            subject: None,
            message: None,
            webhook_url: Some(url.into()),
        }
    }

    /// Set the subject line.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the body message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let schedule = ScheduleConfig::weekly(1, 9, 30, "UTC");
        assert_eq!(schedule.frequency, Frequency::Weekly);
        assert_eq!(schedule.day_of_week, Some(1));
        assert_eq!(schedule.hour, 9);
        assert_eq!(schedule.minute, 30);

        let monthly = ScheduleConfig::monthly(15, 6, 0, "Europe/Berlin");
        assert_eq!(monthly.day_of_month, Some(15));
        assert_eq!(monthly.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_month_strides() {
        assert_eq!(Frequency::Monthly.month_stride(), Some(1));
        assert_eq!(Frequency::Quarterly.month_stride(), Some(3));
        assert_eq!(Frequency::Yearly.month_stride(), Some(12));
        assert_eq!(Frequency::Daily.month_stride(), None);
    }

    #[test]
    fn test_delivery_builders() {
        let delivery = DeliveryConfig::email(vec!["ops@example.com".into()], ReportFormat::Pdf)
            .with_subject("Monthly revenue");
        assert_eq!(delivery.method, DeliveryMethod::Email);
        assert_eq!(delivery.subject.as_deref(), Some("Monthly revenue"));

        let hook = DeliveryConfig::webhook("https://example.com/ingest", ReportFormat::Json);
        assert_eq!(hook.method, DeliveryMethod::Webhook);
        assert!(hook.recipients.is_empty());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Frequency::Quarterly).unwrap();
        assert_eq!(json, "\"quarterly\"");
        let method: DeliveryMethod = serde_json::from_str("\"webhook\"").unwrap();
        assert_eq!(method, DeliveryMethod::Webhook);
    }
}
