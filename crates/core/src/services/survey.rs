//! Survey service.

use audit_common::{AppError, AppResult, Caller, IdGenerator, Role};
use audit_db::entities::survey::{self, SurveyType};
use audit_db::repositories::{SurveyFields, SurveyFilter, SurveyRepository, SurveyTree};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::grouping::{CategoryGroup, CategoryHeader, group_questions};
use crate::sheet::{self, SheetRow};
use crate::tree::{CategoryInput, QuestionInput, TreeMode, diff, plan_tree};

/// Input for creating or updating a survey.
///
/// `categories` and `questions` are always the complete desired set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInput {
    /// Owning client. Required for admins, ignored for clients.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub client_name: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub hotel_name: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub campaign: String,
    #[serde(default)]
    #[validate(length(max = 512))]
    pub location: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub inspectors: Vec<String>,
    #[serde(rename = "type", default)]
    pub survey_type: SurveyType,
    #[serde(default)]
    pub sorted_categories: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Vec<CategoryInput>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
    /// Spreadsheet rows replacing `categories` and `questions` on create.
    #[serde(default)]
    pub sheet_rows: Option<Vec<SheetRow>>,
}

/// Input for listing surveys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSurveysInput {
    #[serde(rename = "type", default)]
    pub survey_type: SurveyType,
    #[serde(default)]
    pub search: Option<String>,
}

/// A survey with its grouped questions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    pub survey: survey::Model,
    pub grouped_questions: Vec<CategoryGroup>,
}

/// A survey listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySummary {
    #[serde(flatten)]
    pub survey: survey::Model,
    pub audit_count: u64,
}

/// Service for managing surveys and their category/question trees.
#[derive(Clone)]
pub struct SurveyService {
    survey_repo: SurveyRepository,
    id_gen: IdGenerator,
}

impl SurveyService {
    /// Create a new survey service.
    #[must_use]
    pub const fn new(survey_repo: SurveyRepository) -> Self {
        Self {
            survey_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a survey with its categories and questions.
    pub async fn create(&self, caller: &Caller, mut input: SurveyInput) -> AppResult<survey::Model> {
        let client_id = Self::owner_for_write(caller, input.client_id.as_deref())?;
        Self::validate(&input)?;

        if let Some(rows) = input.sheet_rows.take() {
            let (categories, questions) = sheet::extract(&rows, &self.id_gen);
            input.categories = categories;
            input.questions = questions;
        }

        let tree = plan_tree(&input.categories, &input.questions, TreeMode::Create, &self.id_gen)?;
        let id = self.id_gen.generate();
        self.ensure_questions_local(&id, &tree).await?;

        let fields = Self::fields(client_id, input, &tree);
        let survey = self.survey_repo.create_with_tree(id, fields, &tree).await?;

        tracing::info!(
            survey_id = %survey.id,
            client_id = %survey.client_id,
            categories = tree.categories.len(),
            questions = tree.questions.len(),
            "Survey created"
        );

        Ok(survey)
    }

    /// Replace a survey's fields and reconcile its categories and questions.
    pub async fn update(
        &self,
        caller: &Caller,
        id: &str,
        input: SurveyInput,
    ) -> AppResult<survey::Model> {
        let existing = self.survey_repo.get_by_id(id).await?;
        Self::ensure_can_edit(caller, &existing)?;
        Self::validate(&input)?;

        let client_id = if caller.is_admin() {
            input
                .client_id
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| existing.client_id.clone())
        } else {
            existing.client_id.clone()
        };

        let tree = plan_tree(&input.categories, &input.questions, TreeMode::Update, &self.id_gen)?;
        self.ensure_questions_local(id, &tree).await?;

        let stored_categories: Vec<String> = self
            .survey_repo
            .find_categories(id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let stored_questions: Vec<String> = self
            .survey_repo
            .find_questions(id)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();
        let changes = diff(&stored_categories, &stored_questions, &tree);

        let fields = Self::fields(client_id, input, &tree);
        let survey = self.survey_repo.update_with_tree(id, fields, &tree).await?;

        tracing::info!(
            survey_id = %id,
            user_id = %caller.id,
            categories_added = changes.categories_added.len(),
            categories_removed = changes.categories_removed.len(),
            questions_added = changes.questions_added.len(),
            questions_removed = changes.questions_removed.len(),
            "Survey updated"
        );

        Ok(survey)
    }

    /// Delete a survey with everything that depends on it.
    pub async fn delete(&self, caller: &Caller, id: &str) -> AppResult<()> {
        let existing = self.survey_repo.get_by_id(id).await?;
        Self::ensure_can_edit(caller, &existing)?;

        self.survey_repo.delete(id).await?;

        tracing::info!(survey_id = %id, user_id = %caller.id, "Survey deleted");
        Ok(())
    }

    /// Get a survey with its questions grouped by category.
    pub async fn get(&self, caller: &Caller, id: &str) -> AppResult<SurveyView> {
        let survey = self.survey_repo.get_by_id(id).await?;
        if !Self::can_view(caller, &survey) {
            return Err(AppError::Forbidden("Survey is not visible to you".to_string()));
        }

        let categories = self.survey_repo.find_categories(id).await?;
        let questions = self.survey_repo.find_questions(id).await?;
        let headers: Vec<CategoryHeader> = categories.iter().map(CategoryHeader::from).collect();
        let sorted = survey.sorted_category_ids();
        let grouped_questions = group_questions(&headers, &questions, Some(&sorted));

        Ok(SurveyView {
            survey,
            grouped_questions,
        })
    }

    /// List surveys visible to the caller, newest first.
    pub async fn list(
        &self,
        caller: &Caller,
        input: ListSurveysInput,
    ) -> AppResult<Vec<SurveySummary>> {
        let filter = SurveyFilter {
            survey_type: Some(input.survey_type),
            search: input.search,
            ..Self::scope(caller)
        };
        let surveys = self.survey_repo.list(&filter).await?;

        let ids: Vec<String> = surveys.iter().map(|s| s.id.clone()).collect();
        let counts = self.survey_repo.count_audits(&ids).await?;

        Ok(surveys
            .into_iter()
            .map(|survey| SurveySummary {
                audit_count: counts.get(&survey.id).copied().unwrap_or(0),
                survey,
            })
            .collect())
    }

    /// Number of surveys of any type visible to the caller.
    pub async fn count_visible(&self, caller: &Caller) -> AppResult<u64> {
        self.survey_repo.count(&Self::scope(caller)).await
    }

    /// Listing filter restricting results to what the caller may see.
    fn scope(caller: &Caller) -> SurveyFilter {
        match caller.role {
            Role::Admin => SurveyFilter::default(),
            Role::Client => SurveyFilter {
                client_id: Some(caller.id.clone()),
                ..Default::default()
            },
            Role::Inspector => SurveyFilter {
                inspector_id: Some(caller.id.clone()),
                ..Default::default()
            },
        }
    }

    fn can_view(caller: &Caller, survey: &survey::Model) -> bool {
        caller.is_admin()
            || caller.is_client(&survey.client_id)
            || (caller.role == Role::Inspector && survey.is_assigned(&caller.id))
    }

    fn ensure_can_edit(caller: &Caller, survey: &survey::Model) -> AppResult<()> {
        if caller.is_admin() || caller.is_client(&survey.client_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only an admin or the owning client can change this survey".to_string(),
            ))
        }
    }

    /// Resolve the owning client of a new survey.
    fn owner_for_write(caller: &Caller, requested: Option<&str>) -> AppResult<String> {
        match caller.role {
            Role::Admin => requested
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("clientId is required".to_string())),
            Role::Client => Ok(caller.id.clone()),
            Role::Inspector => Err(AppError::Forbidden(
                "Inspectors cannot create surveys".to_string(),
            )),
        }
    }

    fn validate(input: &SurveyInput) -> AppResult<()> {
        input.validate()?;

        if matches!((input.start_date, input.end_date), (Some(start), Some(end)) if start > end) {
            return Err(AppError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }
        if input.inspectors.iter().any(|i| i.trim().is_empty()) {
            return Err(AppError::Validation("Inspector ids must not be empty".to_string()));
        }

        Ok(())
    }

    /// Reject question ids that already belong to another survey.
    async fn ensure_questions_local(&self, survey_id: &str, tree: &SurveyTree) -> AppResult<()> {
        let ids: Vec<String> = tree.questions.iter().map(|q| q.id.clone()).collect();
        let foreign = self
            .survey_repo
            .find_foreign_question_ids(survey_id, &ids)
            .await?;

        match foreign.first() {
            Some(id) => Err(AppError::Conflict(format!(
                "Question {id} belongs to another survey"
            ))),
            None => Ok(()),
        }
    }

    fn fields(client_id: String, input: SurveyInput, tree: &SurveyTree) -> SurveyFields {
        let sorted_categories = input
            .sorted_categories
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| tree.categories.iter().map(|c| c.id.clone()).collect());

        let mut inspectors = Vec::with_capacity(input.inspectors.len());
        for inspector in input.inspectors {
            let inspector = inspector.trim().to_string();
            if !inspectors.contains(&inspector) {
                inspectors.push(inspector);
            }
        }

        SurveyFields {
            client_id,
            client_name: input.client_name.filter(|n| !n.trim().is_empty()),
            hotel_name: input.hotel_name.trim().to_string(),
            campaign: input.campaign,
            location: input.location,
            start_date: input.start_date,
            end_date: input.end_date,
            inspectors,
            survey_type: input.survey_type,
            sorted_categories,
        }
    }
}
