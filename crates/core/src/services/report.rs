//! Audit reports and dashboard counts.

use audit_common::{AppResult, Caller};
use serde::Serialize;

use super::audit::AuditService;
use super::survey::SurveyService;
use crate::statistics::{AuditReport, build_report};

/// Counts shown on the caller's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub surveys_count: u64,
    pub audits_count: u64,
}

/// Read-only reporting over audits.
#[derive(Clone)]
pub struct ReportService {
    audit_service: AuditService,
    survey_service: SurveyService,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(audit_service: AuditService, survey_service: SurveyService) -> Self {
        Self {
            audit_service,
            survey_service,
        }
    }

    /// Yes/no statistics, star rating and category ranking of an audit.
    ///
    /// Access follows [`AuditService::get`].
    pub async fn get_audit_report(&self, caller: &Caller, audit_id: &str) -> AppResult<AuditReport> {
        let view = self.audit_service.get(caller, audit_id).await?;
        let report = build_report(&view.grouped_questions, &view.questions, &view.responses);

        tracing::debug!(
            audit_id = %audit_id,
            total = report.stats.total_count,
            star_rating = report.star_rating,
            "Audit report built"
        );

        Ok(report)
    }

    /// Surveys and audits visible to the caller.
    pub async fn stats(&self, caller: &Caller) -> AppResult<DashboardStats> {
        let surveys_count = self.survey_service.count_visible(caller).await?;
        let audits_count = self.audit_service.count_visible(caller).await?;

        Ok(DashboardStats {
            surveys_count,
            audits_count,
        })
    }
}
