//! Audit service.

use std::collections::BTreeMap;

use audit_common::{AppError, AppResult, Caller, FileRef, IdGenerator, Role};
use audit_db::entities::audit::{self, AuditStatus};
use audit_db::entities::{question, response, survey, survey_category};
use audit_db::repositories::{
    AuditFields, AuditFilter, AuditRepository, CategoryWrite, NewAudit, SurveyRepository,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::classifier::QuestionIndex;
use crate::grouping::{CategoryGroup, CategoryHeader, group_questions};
use crate::reconcile::{ResponseInput, ResponsePlan, plan_new_responses, plan_response_updates};

/// Upload keys an inspector may attach files to.
const SUMMARY_UPLOAD_KEYS: [&str; 5] = [
    "expense",
    "brandStandard",
    "detailedSummary",
    "executiveSummary",
    "scenario",
];

/// Upload key reserved for the client's feedback.
const FEEDBACK_UPLOAD_KEY: &str = "feedback";

/// Inspector-editable audit fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditFieldsInput {
    #[serde(default)]
    pub status: AuditStatus,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub expense: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub brand_standard: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub detailed_summary: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub executive_summary: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub scenario: String,
    /// Summary field name to files.
    #[serde(default)]
    pub uploads: BTreeMap<String, Vec<FileRef>>,
}

/// Audit fields an update may change. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuditFieldsPatch {
    #[serde(default)]
    pub status: Option<AuditStatus>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub expense: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub brand_standard: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub detailed_summary: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub executive_summary: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub scenario: Option<String>,
    /// Replaces the files of each listed key; unlisted keys are kept.
    #[serde(default)]
    pub uploads: Option<BTreeMap<String, Vec<FileRef>>>,
}

/// Input for creating an audit.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditInput {
    #[validate(length(min = 1))]
    pub survey_id: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: AuditFieldsInput,
    #[serde(default)]
    pub responses: Vec<ResponseInput>,
}

/// Input for updating an audit.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditInput {
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: AuditFieldsPatch,
    #[serde(default)]
    pub responses: Vec<ResponseInput>,
}

/// Input for the client's feedback.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub feedback: Option<String>,
    /// Only the `feedback` key is read; other keys are left as stored.
    #[serde(default)]
    pub uploads: BTreeMap<String, Vec<FileRef>>,
}

/// Input for listing audits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAuditsInput {
    #[serde(default)]
    pub search: Option<String>,
}

/// An audit with its responses and grouped questions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditView {
    pub audit: audit::Model,
    pub responses: Vec<response::Model>,
    pub grouped_questions: Vec<CategoryGroup>,
    /// Every current question of the survey, grouped or not.
    #[serde(skip)]
    pub questions: Vec<question::Model>,
}

/// An audit listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListEntry {
    #[serde(flatten)]
    pub audit: audit::Model,
    pub hotel_name: Option<String>,
    pub client_name: Option<String>,
    pub campaign: Option<String>,
}

/// Short form of an audit, as listed under its survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditBrief {
    pub id: String,
    pub status: AuditStatus,
    pub created_at: DateTime<FixedOffset>,
    pub inspector_id: String,
}

impl From<audit::Model> for AuditBrief {
    fn from(a: audit::Model) -> Self {
        Self {
            id: a.id,
            status: a.status,
            created_at: a.created_at,
            inspector_id: a.inspector_id,
        }
    }
}

/// Service for audits and their responses.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditRepository,
    survey_repo: SurveyRepository,
    id_gen: IdGenerator,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(audit_repo: AuditRepository, survey_repo: SurveyRepository) -> Self {
        Self {
            audit_repo,
            survey_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Start an audit of a survey with its first responses.
    pub async fn create(&self, caller: &Caller, input: CreateAuditInput) -> AppResult<audit::Model> {
        input.validate()?;
        let survey = self.survey_repo.get_by_id(&input.survey_id).await?;

        let assigned = caller.role == Role::Inspector && survey.is_assigned(&caller.id);
        if !(assigned || caller.is_admin()) {
            return Err(AppError::Forbidden(
                "You are not assigned to this survey".to_string(),
            ));
        }
        Self::check_upload_keys(&input.fields.uploads)?;

        let categories = self.survey_repo.find_categories(&survey.id).await?;
        let questions = self.survey_repo.find_questions(&survey.id).await?;
        let index = QuestionIndex::new(&questions);
        let plan = plan_new_responses(&input.responses, &index, &self.id_gen)?;

        let new = NewAudit {
            id: self.id_gen.generate(),
            survey_id: survey.id.clone(),
            inspector_id: caller.id.clone(),
        };
        let fields = Self::fields(&survey, input.fields);
        let snapshot = Self::snapshot(&categories);

        let audit = self
            .audit_repo
            .create_with_responses(new, fields, &plan.writes, &snapshot)
            .await?;

        Self::log_write("Audit created", &audit, caller, &plan);
        Ok(audit)
    }

    /// Update an audit's fields and add or change responses.
    ///
    /// Responses missing from the input are kept. The category snapshot
    /// follows the survey until the audit has been completed.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        input: UpdateAuditInput,
    ) -> AppResult<audit::Model> {
        input.validate()?;
        let existing = self.audit_repo.get_by_id(id).await?;
        if !(caller.is_admin() || caller.is_inspector(&existing.inspector_id)) {
            return Err(AppError::Forbidden(
                "Only the audit's inspector can change it".to_string(),
            ));
        }
        if let Some(uploads) = &input.fields.uploads {
            Self::check_upload_keys(uploads)?;
        }

        let survey = self.survey_repo.get_by_id(&existing.survey_id).await?;
        let questions = self.survey_repo.find_questions(&survey.id).await?;
        let stored = self.audit_repo.find_responses(id).await?;
        let index = QuestionIndex::new(&questions);
        let plan = plan_response_updates(&input.responses, &stored, &index, &self.id_gen)?;

        let snapshot = if existing.status == AuditStatus::Completed {
            None
        } else {
            let categories = self.survey_repo.find_categories(&survey.id).await?;
            Some(Self::snapshot(&categories))
        };

        let fields = Self::merge_fields(&survey, &existing, input.fields);
        let audit = self
            .audit_repo
            .update_with_responses(id, fields, &plan.writes, snapshot.as_deref())
            .await?;

        Self::log_write("Audit updated", &audit, caller, &plan);
        Ok(audit)
    }

    /// Update the client's feedback and feedback files.
    pub async fn update_feedback(
        &self,
        caller: &Caller,
        id: &str,
        input: FeedbackInput,
    ) -> AppResult<audit::Model> {
        input.validate()?;
        let existing = self.audit_repo.get_by_id(id).await?;
        let survey = self.survey_repo.get_by_id(&existing.survey_id).await?;
        if !(caller.is_admin() || caller.is_client(&survey.client_id)) {
            return Err(AppError::Forbidden(
                "Only the survey's client can leave feedback".to_string(),
            ));
        }

        let mut uploads = upload_map(&existing.uploads);
        if let Some(files) = input.uploads.get(FEEDBACK_UPLOAD_KEY) {
            uploads.insert(FEEDBACK_UPLOAD_KEY.to_string(), json!(files));
        }

        let audit = self
            .audit_repo
            .update_feedback(id, input.feedback, json!(uploads))
            .await?;

        tracing::info!(audit_id = %id, user_id = %caller.id, "Audit feedback updated");
        Ok(audit)
    }

    /// Get an audit with its responses and grouped questions.
    pub async fn get(&self, caller: &Caller, id: &str) -> AppResult<AuditView> {
        let audit = self.audit_repo.get_by_id(id).await?;
        if !Self::can_view(caller, &audit) {
            return Err(AppError::Forbidden("Audit is not visible to you".to_string()));
        }

        let survey = self.survey_repo.get_by_id(&audit.survey_id).await?;
        let questions = self.survey_repo.find_questions(&survey.id).await?;
        let responses = self.audit_repo.find_responses(id).await?;

        let mut headers: Vec<CategoryHeader> = Vec::new();
        if audit.status == AuditStatus::Completed {
            headers = self
                .audit_repo
                .find_snapshot(id)
                .await?
                .iter()
                .map(CategoryHeader::from)
                .collect();
        }
        if headers.is_empty() {
            headers = self
                .survey_repo
                .find_categories(&survey.id)
                .await?
                .iter()
                .map(CategoryHeader::from)
                .collect();
        }

        let sorted = survey.sorted_category_ids();
        let grouped_questions = group_questions(&headers, &questions, Some(&sorted));

        Ok(AuditView {
            audit,
            responses,
            grouped_questions,
            questions,
        })
    }

    /// List audits visible to the caller, newest first.
    pub async fn list(
        &self,
        caller: &Caller,
        input: ListAuditsInput,
    ) -> AppResult<Vec<AuditListEntry>> {
        let filter = AuditFilter {
            search: input.search,
            ..Self::scope(caller)
        };
        let rows = self.audit_repo.list(&filter).await?;

        Ok(rows
            .into_iter()
            .map(|(audit, survey)| AuditListEntry {
                audit,
                hotel_name: survey.as_ref().map(|s| s.hotel_name.clone()),
                client_name: survey.as_ref().and_then(|s| s.client_name.clone()),
                campaign: survey.map(|s| s.campaign),
            })
            .collect())
    }

    /// Audits run against one survey.
    ///
    /// Inspectors only see their own.
    pub async fn list_for_survey(
        &self,
        caller: &Caller,
        survey_id: &str,
    ) -> AppResult<Vec<AuditBrief>> {
        let survey = self.survey_repo.get_by_id(survey_id).await?;
        let own_only = match caller.role {
            Role::Admin => false,
            Role::Client if caller.id == survey.client_id => false,
            Role::Inspector if survey.is_assigned(&caller.id) => true,
            _ => {
                return Err(AppError::Forbidden(
                    "Survey is not visible to you".to_string(),
                ));
            }
        };

        let audits = self.audit_repo.find_by_survey(survey_id).await?;
        Ok(audits
            .into_iter()
            .filter(|a| !own_only || a.inspector_id == caller.id)
            .map(AuditBrief::from)
            .collect())
    }

    /// Delete an audit with its responses.
    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        if !caller.is_admin() {
            return Err(AppError::Forbidden("Only admins can delete audits".to_string()));
        }

        self.audit_repo.delete(id).await?;

        tracing::info!(audit_id = %id, user_id = %caller.id, "Audit deleted");
        Ok(())
    }

    /// Number of audits visible to the caller.
    pub async fn count_visible(&self, caller: &Caller) -> AppResult<u64> {
        self.audit_repo.count(&Self::scope(caller)).await
    }

    fn scope(caller: &Caller) -> AuditFilter {
        match caller.role {
            Role::Admin => AuditFilter::default(),
            Role::Client => AuditFilter {
                client_id: Some(caller.id.clone()),
                ..Default::default()
            },
            Role::Inspector => AuditFilter {
                inspector_id: Some(caller.id.clone()),
                ..Default::default()
            },
        }
    }

    fn can_view(caller: &Caller, audit: &audit::Model) -> bool {
        caller.is_admin()
            || caller.is_inspector(&audit.inspector_id)
            || caller.is_client(&audit.client_id)
    }

    fn check_upload_keys(uploads: &BTreeMap<String, Vec<FileRef>>) -> AppResult<()> {
        match uploads
            .keys()
            .find(|k| !SUMMARY_UPLOAD_KEYS.contains(&k.as_str()))
        {
            Some(key) => Err(AppError::Validation(format!("Unknown upload field: {key}"))),
            None => Ok(()),
        }
    }

    fn snapshot(categories: &[survey_category::Model]) -> Vec<CategoryWrite> {
        categories
            .iter()
            .map(|c| CategoryWrite {
                id: c.id.clone(),
                title: c.title.clone(),
                display_order: c.display_order,
            })
            .collect()
    }

    /// Audit fields of a new audit.
    fn fields(survey: &survey::Model, input: AuditFieldsInput) -> AuditFields {
        let uploads: serde_json::Map<String, serde_json::Value> = input
            .uploads
            .into_iter()
            .map(|(key, files)| (key, json!(files)))
            .collect();

        AuditFields {
            client_id: survey.client_id.clone(),
            status: input.status,
            expense: input.expense,
            brand_standard: input.brand_standard,
            detailed_summary: input.detailed_summary,
            executive_summary: input.executive_summary,
            scenario: input.scenario,
            uploads: serde_json::Value::Object(uploads),
        }
    }

    /// Stored audit fields with `patch` applied over them.
    fn merge_fields(
        survey: &survey::Model,
        existing: &audit::Model,
        patch: AuditFieldsPatch,
    ) -> AuditFields {
        let mut uploads = upload_map(&existing.uploads);
        for (key, files) in patch.uploads.unwrap_or_default() {
            uploads.insert(key, json!(files));
        }

        AuditFields {
            client_id: survey.client_id.clone(),
            status: patch.status.unwrap_or(existing.status),
            expense: patch.expense.unwrap_or_else(|| existing.expense.clone()),
            brand_standard: patch
                .brand_standard
                .unwrap_or_else(|| existing.brand_standard.clone()),
            detailed_summary: patch
                .detailed_summary
                .unwrap_or_else(|| existing.detailed_summary.clone()),
            executive_summary: patch
                .executive_summary
                .unwrap_or_else(|| existing.executive_summary.clone()),
            scenario: patch.scenario.unwrap_or_else(|| existing.scenario.clone()),
            uploads: serde_json::Value::Object(uploads),
        }
    }

    fn log_write(message: &str, audit: &audit::Model, caller: &Caller, plan: &ResponsePlan) {
        tracing::info!(
            audit_id = %audit.id,
            survey_id = %audit.survey_id,
            user_id = %caller.id,
            inserted = plan.inserts(),
            updated = plan.updates(),
            dropped = plan.dropped,
            "{message}"
        );
    }
}

fn upload_map(value: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}
