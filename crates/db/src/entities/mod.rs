//! Database entities.

pub mod audit;
pub mod audit_category;
pub mod question;
pub mod response;
pub mod survey;
pub mod survey_category;

pub use audit::Entity as Audit;
pub use audit_category::Entity as AuditCategory;
pub use question::Entity as Question;
pub use response::Entity as Response;
pub use survey::Entity as Survey;
pub use survey_category::Entity as SurveyCategory;
