//! Survey repository.
//!
//! Owns the survey aggregate: the survey row, its categories and its
//! questions. Every write that touches more than one row runs in a single
//! transaction.

use std::collections::HashMap;
use std::sync::Arc;

use audit_common::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;

use crate::entities::{
    Audit, AuditCategory, Question, Response, Survey, SurveyCategory, audit, audit_category,
    question, response, survey, survey::SurveyType, survey_category,
};

/// Scalar survey fields written on create and update.
#[derive(Debug, Clone)]
pub struct SurveyFields {
    pub client_id: String,
    pub client_name: Option<String>,
    pub hotel_name: String,
    pub campaign: String,
    pub location: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub inspectors: Vec<String>,
    pub survey_type: SurveyType,
    pub sorted_categories: Vec<String>,
}

/// A category as it should exist after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryWrite {
    pub id: String,
    pub title: String,
    pub display_order: i32,
}

/// A question as it should exist after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWrite {
    pub id: String,
    pub category_id: String,
    pub question_type: question::QuestionType,
    pub text: String,
    pub options: serde_json::Value,
    pub display_order: i32,
}

/// The full category/question set of a survey.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyTree {
    pub categories: Vec<CategoryWrite>,
    pub questions: Vec<QuestionWrite>,
}

/// Listing filter. `client_id` and `inspector_id` narrow the result to what
/// that caller may see.
#[derive(Debug, Clone, Default)]
pub struct SurveyFilter {
    pub survey_type: Option<SurveyType>,
    pub client_id: Option<String>,
    pub inspector_id: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct SurveyAuditCount {
    survey_id: String,
    num_items: i64,
}

/// Repository for survey operations.
#[derive(Clone)]
pub struct SurveyRepository {
    db: Arc<DatabaseConnection>,
}

impl SurveyRepository {
    /// Create a new survey repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find survey by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<survey::Model>> {
        Survey::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get survey by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<survey::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey: {id}")))
    }

    /// Categories of a survey in stored order.
    pub async fn find_categories(&self, survey_id: &str) -> AppResult<Vec<survey_category::Model>> {
        SurveyCategory::find()
            .filter(survey_category::Column::SurveyId.eq(survey_id))
            .order_by(survey_category::Column::DisplayOrder, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Questions of a survey in stored order.
    pub async fn find_questions(&self, survey_id: &str) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(question::Column::SurveyId.eq(survey_id))
            .order_by(question::Column::DisplayOrder, Order::Asc)
            .order_by(question::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Of the given question ids, those that belong to a different survey.
    pub async fn find_foreign_question_ids(
        &self,
        survey_id: &str,
        ids: &[String],
    ) -> AppResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Question::find()
            .select_only()
            .column(question::Column::Id)
            .filter(question::Column::Id.is_in(ids.iter().cloned()))
            .filter(question::Column::SurveyId.ne(survey_id))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List surveys visible under a filter, newest first.
    pub async fn list(&self, filter: &SurveyFilter) -> AppResult<Vec<survey::Model>> {
        Survey::find()
            .filter(Self::condition(filter))
            .order_by(survey::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count surveys visible under a filter.
    pub async fn count(&self, filter: &SurveyFilter) -> AppResult<u64> {
        Survey::find()
            .filter(Self::condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn condition(filter: &SurveyFilter) -> Condition {
        let mut cond = Condition::all();

        if let Some(survey_type) = filter.survey_type {
            cond = cond.add(survey::Column::SurveyType.eq(survey_type));
        }
        if let Some(client_id) = &filter.client_id {
            cond = cond.add(survey::Column::ClientId.eq(client_id.as_str()));
        }
        if let Some(inspector_id) = &filter.inspector_id {
            cond = cond.add(Expr::cust_with_values(
                "\"survey\".\"inspectors\" @> $1",
                [json!([inspector_id])],
            ));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(survey::Column::ClientName.contains(search))
                    .add(survey::Column::HotelName.contains(search)),
            );
        }

        cond
    }

    /// Number of audits per survey, for the given surveys.
    pub async fn count_audits(&self, survey_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if survey_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Audit::find()
            .select_only()
            .column(audit::Column::SurveyId)
            .column_as(Expr::col(audit::Column::Id).count(), "num_items")
            .filter(audit::Column::SurveyId.is_in(survey_ids.iter().cloned()))
            .group_by(audit::Column::SurveyId)
            .into_model::<SurveyAuditCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.survey_id, u64::try_from(r.num_items).unwrap_or(0)))
            .collect())
    }

    /// Insert a survey together with its categories and questions.
    pub async fn create_with_tree(
        &self,
        id: String,
        fields: SurveyFields,
        tree: &SurveyTree,
    ) -> AppResult<survey::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = survey::ActiveModel {
            id: Set(id.clone()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
            ..Self::fields_to_active(fields)
        };
        Survey::insert(model)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::upsert_tree(&txn, &id, tree).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_by_id(&id).await
    }

    /// Replace a survey's fields and reconcile its categories and questions
    /// against `tree`.
    ///
    /// Rows whose id is absent from `tree` are deleted, the rest are inserted
    /// or updated in place. Upserts run before deletes so a kept question can
    /// leave a category that is about to be removed.
    pub async fn update_with_tree(
        &self,
        id: &str,
        fields: SurveyFields,
        tree: &SurveyTree,
    ) -> AppResult<survey::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut model = Self::fields_to_active(fields);
        model.updated_at = Set(Some(Utc::now().into()));
        let updated = Survey::update_many()
            .set(model)
            .filter(survey::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if updated.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Survey: {id}")));
        }

        Self::upsert_tree(&txn, id, tree).await?;

        let question_ids: Vec<String> = tree.questions.iter().map(|q| q.id.clone()).collect();
        Question::delete_many()
            .filter(question::Column::SurveyId.eq(id))
            .filter(question::Column::Id.is_not_in(question_ids))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let category_ids: Vec<String> = tree.categories.iter().map(|c| c.id.clone()).collect();
        SurveyCategory::delete_many()
            .filter(survey_category::Column::SurveyId.eq(id))
            .filter(survey_category::Column::Id.is_not_in(category_ids))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_by_id(id).await
    }

    /// Delete a survey with its categories, questions, audits and responses.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let audits_of_survey = Query::select()
            .column(audit::Column::Id)
            .from(audit::Entity)
            .and_where(audit::Column::SurveyId.eq(id))
            .to_owned();

        Response::delete_many()
            .filter(response::Column::AuditId.in_subquery(audits_of_survey.clone()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        AuditCategory::delete_many()
            .filter(audit_category::Column::AuditId.in_subquery(audits_of_survey))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Audit::delete_many()
            .filter(audit::Column::SurveyId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Question::delete_many()
            .filter(question::Column::SurveyId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        SurveyCategory::delete_many()
            .filter(survey_category::Column::SurveyId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = Survey::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Survey: {id}")));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn fields_to_active(fields: SurveyFields) -> survey::ActiveModel {
        survey::ActiveModel {
            client_id: Set(fields.client_id),
            client_name: Set(fields.client_name),
            hotel_name: Set(fields.hotel_name),
            campaign: Set(fields.campaign),
            location: Set(fields.location),
            start_date: Set(fields.start_date),
            end_date: Set(fields.end_date),
            inspectors: Set(json!(fields.inspectors)),
            survey_type: Set(fields.survey_type),
            sorted_categories: Set(json!(fields.sorted_categories)),
            ..Default::default()
        }
    }

    async fn upsert_tree<C: ConnectionTrait>(
        conn: &C,
        survey_id: &str,
        tree: &SurveyTree,
    ) -> AppResult<()> {
        let now = Utc::now();

        if !tree.categories.is_empty() {
            let rows = tree.categories.iter().map(|c| survey_category::ActiveModel {
                survey_id: Set(survey_id.to_string()),
                id: Set(c.id.clone()),
                title: Set(c.title.clone()),
                display_order: Set(c.display_order),
                created_at: Set(now.into()),
            });
            SurveyCategory::insert_many(rows)
                .on_conflict(
                    OnConflict::columns([
                        survey_category::Column::SurveyId,
                        survey_category::Column::Id,
                    ])
                    .update_columns([
                        survey_category::Column::Title,
                        survey_category::Column::DisplayOrder,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        if !tree.questions.is_empty() {
            let rows = tree.questions.iter().map(|q| question::ActiveModel {
                id: Set(q.id.clone()),
                survey_id: Set(survey_id.to_string()),
                category_id: Set(q.category_id.clone()),
                question_type: Set(q.question_type),
                text: Set(q.text.clone()),
                options: Set(q.options.clone()),
                display_order: Set(q.display_order),
                created_at: Set(now.into()),
                updated_at: Set(None),
            });
            Question::insert_many(rows)
                .on_conflict(
                    OnConflict::column(question::Column::Id)
                        .update_columns([
                            question::Column::CategoryId,
                            question::Column::QuestionType,
                            question::Column::Text,
                            question::Column::Options,
                            question::Column::DisplayOrder,
                        ])
                        .value(question::Column::UpdatedAt, Expr::current_timestamp())
                        .to_owned(),
                )
                .exec_without_returning(conn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_survey(id: &str, client_id: &str) -> survey::Model {
        survey::Model {
            id: id.to_string(),
            client_id: client_id.to_string(),
            client_name: Some("Acme Hotels".to_string()),
            hotel_name: "Grand Acme".to_string(),
            campaign: "Spring".to_string(),
            location: "Lisbon".to_string(),
            start_date: None,
            end_date: None,
            inspectors: json!(["insp1"]),
            survey_type: SurveyType::External,
            sorted_categories: json!(["1"]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_fields() -> SurveyFields {
        SurveyFields {
            client_id: "client1".to_string(),
            client_name: Some("Acme Hotels".to_string()),
            hotel_name: "Grand Acme".to_string(),
            campaign: "Spring".to_string(),
            location: "Lisbon".to_string(),
            start_date: None,
            end_date: None,
            inspectors: vec!["insp1".to_string()],
            survey_type: SurveyType::External,
            sorted_categories: vec!["1".to_string()],
        }
    }

    fn test_tree() -> SurveyTree {
        SurveyTree {
            categories: vec![CategoryWrite {
                id: "1".to_string(),
                title: "Cleanliness".to_string(),
                display_order: 0,
            }],
            questions: vec![QuestionWrite {
                id: "11".to_string(),
                category_id: "1".to_string(),
                question_type: question::QuestionType::MultiChoice,
                text: "Room clean?".to_string(),
                options: json!({"1": "YES", "2": "NO"}),
                display_order: 0,
            }],
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let survey = create_test_survey("s1", "client1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[survey.clone()]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);
        let result = repo.find_by_id("s1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().hotel_name, "Grand Acme");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<survey::Model>::new()])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_with_tree_runs_in_one_transaction() {
        let survey = create_test_survey("s1", "client1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1)])
                .append_query_results([[survey.clone()]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db.clone());
        let result = repo
            .create_with_tree("s1".to_string(), test_fields(), &test_tree())
            .await
            .unwrap();
        assert_eq!(result.id, "s1");

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        // One transaction (survey + categories + questions), then the re-read
        assert_eq!(log.len(), 2);
        let statements = log[0].statements();
        assert_eq!(statements.len(), 5);
        assert_eq!(statements[0].sql, "BEGIN");
        assert!(statements[1].sql.starts_with(r#"INSERT INTO "survey""#));
        assert_eq!(statements[4].sql, "COMMIT");
    }

    #[tokio::test]
    async fn test_update_with_tree_deletes_after_upserts() {
        let survey = create_test_survey("s1", "client1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1), exec(2), exec(1)])
                .append_query_results([[survey.clone()]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db.clone());
        repo.update_with_tree("s1", test_fields(), &test_tree())
            .await
            .unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements: Vec<String> = log[0]
            .statements()
            .iter()
            .map(|s| s.sql.clone())
            .collect();

        // BEGIN, update, category upsert, question upsert, question delete, category delete, COMMIT
        assert_eq!(statements.len(), 7);
        assert!(statements[1].starts_with(r#"UPDATE "survey""#));
        assert!(statements[2].starts_with(r#"INSERT INTO "survey_category""#));
        assert!(statements[2].contains("ON CONFLICT"));
        assert!(statements[3].starts_with(r#"INSERT INTO "question""#));
        assert!(statements[4].starts_with(r#"DELETE FROM "question""#));
        assert!(statements[5].starts_with(r#"DELETE FROM "survey_category""#));
    }

    #[tokio::test]
    async fn test_update_with_tree_missing_survey() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);
        let result = repo
            .update_with_tree("missing", test_fields(), &SurveyTree::default())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_with_empty_tree_clears_children() {
        let survey = create_test_survey("s1", "client1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(3), exec(2)])
                .append_query_results([[survey]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db.clone());
        repo.update_with_tree("s1", test_fields(), &SurveyTree::default())
            .await
            .unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements = log[0].statements();
        // BEGIN, update, two deletes, COMMIT
        assert_eq!(statements.len(), 5);
        assert!(statements[2].sql.starts_with(r#"DELETE FROM "question""#));
        assert!(statements[3].sql.starts_with(r#"DELETE FROM "survey_category""#));
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(4))
                }]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);
        let filter = SurveyFilter {
            client_id: Some("client1".to_string()),
            ..Default::default()
        };

        assert_eq!(repo.count(&filter).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_count_audits() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    maplit::btreemap! {
                        "survey_id" => sea_orm::Value::String(Some(Box::new("s1".to_string()))),
                        "num_items" => sea_orm::Value::BigInt(Some(3))
                    },
                    maplit::btreemap! {
                        "survey_id" => sea_orm::Value::String(Some(Box::new("s2".to_string()))),
                        "num_items" => sea_orm::Value::BigInt(Some(1))
                    },
                ]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);
        let counts = repo
            .count_audits(&["s1".to_string(), "s2".to_string(), "s3".to_string()])
            .await
            .unwrap();

        assert_eq!(counts.get("s1"), Some(&3));
        assert_eq!(counts.get("s2"), Some(&1));
        assert_eq!(counts.get("s3"), None);
    }

    #[tokio::test]
    async fn test_find_foreign_question_ids_empty_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = SurveyRepository::new(db);
        let ids = repo.find_foreign_question_ids("s1", &[]).await.unwrap();

        assert!(ids.is_empty());
    }
}
