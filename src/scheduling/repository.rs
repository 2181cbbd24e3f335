//! Persistence seams for reports and scheduled reports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::scheduling::report::{Report, ScheduleId, ScheduledReport};

/// Read-only view of the platform's report store.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn exists(&self, id: Uuid) -> Result<bool>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>>;
}

/// Storage seam for scheduled reports.
#[async_trait]
pub trait ScheduledReportRepository: Send + Sync {
    /// Insert or update a schedule.
    async fn save(&self, schedule: &ScheduledReport) -> Result<()>;

    async fn find_by_id(&self, id: ScheduleId) -> Result<Option<ScheduledReport>>;

    /// Uniqueness check scoped to (creator, organization).
    async fn exists_by_name(
        &self,
        name: &str,
        created_by: &str,
        organization_id: Option<Uuid>,
    ) -> Result<bool>;

    /// Active schedules due within `[start, end]`.
    async fn find_due(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledReport>>;

    async fn find_all(&self) -> Result<Vec<ScheduledReport>>;

    /// Remove a schedule; returns whether it existed.
    async fn delete_by_id(&self, id: ScheduleId) -> Result<bool>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-Memory Implementations
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory report store for testing and development.
#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: DashMap<Uuid, Report>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a report (test helper).
    pub fn insert(&self, report: Report) {
        self.reports.insert(report.id, report);
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.reports.contains_key(&id))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.reports.get(&id).map(|entry| entry.value().clone()))
    }
}

/// In-memory scheduled-report store for testing and development.
#[derive(Default)]
pub struct InMemoryScheduledReportRepository {
    schedules: DashMap<Uuid, ScheduledReport>,
}

impl InMemoryScheduledReportRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduledReportRepository for InMemoryScheduledReportRepository {
    async fn save(&self, schedule: &ScheduledReport) -> Result<()> {
        self.schedules.insert(schedule.id.0, schedule.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ScheduleId) -> Result<Option<ScheduledReport>> {
        Ok(self.schedules.get(&id.0).map(|entry| entry.value().clone()))
    }

    async fn exists_by_name(
        &self,
        name: &str,
        created_by: &str,
        organization_id: Option<Uuid>,
    ) -> Result<bool> {
        Ok(self.schedules.iter().any(|entry| {
            entry.name == name
                && entry.created_by == created_by
                && entry.organization_id == organization_id
        }))
    }

    async fn find_due(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduledReport>> {
        Ok(self
            .schedules
            .iter()
            .filter(|entry| entry.is_active() && entry.is_due_within(start, end))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<ScheduledReport>> {
        Ok(self.schedules.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn delete_by_id(&self, id: ScheduleId) -> Result<bool> {
        Ok(self.schedules.remove(&id.0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::report::ReportStatus;
    use crate::scheduling::schedule::{DeliveryConfig, ReportFormat, ScheduleConfig};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn sample_schedule(name: &str, next: DateTime<Utc>) -> ScheduledReport {
        ScheduledReport::new(
            name,
            Uuid::new_v4(),
            ScheduleConfig::daily(9, 0, "UTC"),
            DeliveryConfig::email(vec!["ops@example.com".into()], ReportFormat::Csv),
            "alice",
            next,
            10,
            t0(),
        )
    }

    #[tokio::test]
    async fn test_report_repository() {
        let repo = InMemoryReportRepository::new();
        let report = Report {
            id: Uuid::new_v4(),
            name: "revenue".into(),
            status: ReportStatus::Published,
            owner: "alice".into(),
        };
        repo.insert(report.clone());

        assert!(repo.exists(report.id).await.unwrap());
        assert!(!repo.exists(Uuid::new_v4()).await.unwrap());
        assert_eq!(repo.find_by_id(report.id).await.unwrap().unwrap().name, "revenue");
    }

    #[tokio::test]
    async fn test_name_uniqueness_is_scoped() {
        let repo = InMemoryScheduledReportRepository::new();
        let org = Uuid::new_v4();
        let mut schedule = sample_schedule("weekly-revenue", t0() + Duration::days(1));
        schedule = schedule.with_organization(org);
        repo.save(&schedule).await.unwrap();

        assert!(repo
            .exists_by_name("weekly-revenue", "alice", Some(org))
            .await
            .unwrap());
        // Same name, different creator or org: no conflict.
        assert!(!repo
            .exists_by_name("weekly-revenue", "bob", Some(org))
            .await
            .unwrap());
        assert!(!repo
            .exists_by_name("weekly-revenue", "alice", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_find_due_filters_inactive() {
        let repo = InMemoryScheduledReportRepository::new();
        let due = sample_schedule("due", t0() + Duration::hours(1));
        let later = sample_schedule("later", t0() + Duration::days(3));
        let mut paused = sample_schedule("paused", t0() + Duration::hours(1));
        paused.pause(t0());

        for schedule in [&due, &later, &paused] {
            repo.save(schedule).await.unwrap();
        }

        let found = repo.find_due(t0(), t0() + Duration::days(1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "due");
    }
}
