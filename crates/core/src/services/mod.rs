//! Business logic services.

#![allow(missing_docs)]

pub mod audit;
pub mod report;
pub mod survey;
pub mod upload;

pub use audit::{
    AuditBrief, AuditFieldsInput, AuditFieldsPatch, AuditListEntry, AuditService, AuditView,
    CreateAuditInput, FeedbackInput, ListAuditsInput, UpdateAuditInput,
};
pub use report::{DashboardStats, ReportService};
pub use survey::{ListSurveysInput, SurveyInput, SurveyService, SurveySummary, SurveyView};
pub use upload::{UploadInput, UploadService};
