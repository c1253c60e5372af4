//! Repositories. All SQL lives here.

pub mod audit;
pub mod survey;

pub use audit::{AuditFields, AuditFilter, AuditRepository, NewAudit, ResponseWrite};
pub use survey::{
    CategoryWrite, QuestionWrite, SurveyFields, SurveyFilter, SurveyRepository, SurveyTree,
};
