//! Audit repository.

use std::sync::Arc;

use audit_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use super::survey::CategoryWrite;
use crate::entities::{
    Audit, AuditCategory, Response, Survey, audit, audit::AuditStatus, audit_category, response,
    response::ResponseState, survey,
};

/// Mutable audit fields written by the inspector.
#[derive(Debug, Clone)]
pub struct AuditFields {
    /// Owner of the audited survey.
    pub client_id: String,
    pub status: AuditStatus,
    pub expense: String,
    pub brand_standard: String,
    pub detailed_summary: String,
    pub executive_summary: String,
    pub scenario: String,
    pub uploads: serde_json::Value,
}

/// Identity of a new audit.
#[derive(Debug, Clone)]
pub struct NewAudit {
    pub id: String,
    pub survey_id: String,
    pub inspector_id: String,
}

/// A response row to insert (`is_new`) or update in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseWrite {
    pub id: String,
    pub question_id: String,
    pub category_id: String,
    pub answer: Option<String>,
    pub option_answer: Option<String>,
    pub option_text: Option<String>,
    pub skip: bool,
    pub files: serde_json::Value,
    pub state: ResponseState,
    pub is_new: bool,
}

/// Listing filter.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub inspector_id: Option<String>,
    pub client_id: Option<String>,
    pub search: Option<String>,
}

/// Repository for audit operations.
#[derive(Clone)]
pub struct AuditRepository {
    db: Arc<DatabaseConnection>,
}

impl AuditRepository {
    /// Create a new audit repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find audit by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<audit::Model>> {
        Audit::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get audit by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<audit::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Audit: {id}")))
    }

    /// Responses of an audit, oldest first.
    pub async fn find_responses(&self, audit_id: &str) -> AppResult<Vec<response::Model>> {
        Response::find()
            .filter(response::Column::AuditId.eq(audit_id))
            .order_by(response::Column::CreatedAt, Order::Asc)
            .order_by(response::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Category snapshot of an audit.
    pub async fn find_snapshot(&self, audit_id: &str) -> AppResult<Vec<audit_category::Model>> {
        AuditCategory::find()
            .filter(audit_category::Column::AuditId.eq(audit_id))
            .order_by(audit_category::Column::DisplayOrder, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Audits of one survey, newest first.
    pub async fn find_by_survey(&self, survey_id: &str) -> AppResult<Vec<audit::Model>> {
        Audit::find()
            .filter(audit::Column::SurveyId.eq(survey_id))
            .order_by(audit::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List audits with their survey, newest first.
    pub async fn list(
        &self,
        filter: &AuditFilter,
    ) -> AppResult<Vec<(audit::Model, Option<survey::Model>)>> {
        Audit::find()
            .find_also_related(Survey)
            .filter(Self::condition(filter))
            .order_by(audit::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count audits visible under a filter.
    pub async fn count(&self, filter: &AuditFilter) -> AppResult<u64> {
        Audit::find()
            .join(JoinType::InnerJoin, audit::Relation::Survey.def())
            .filter(Self::condition(filter))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn condition(filter: &AuditFilter) -> Condition {
        let mut cond = Condition::all();

        if let Some(inspector_id) = &filter.inspector_id {
            cond = cond.add(audit::Column::InspectorId.eq(inspector_id.as_str()));
        }
        if let Some(client_id) = &filter.client_id {
            cond = cond.add(audit::Column::ClientId.eq(client_id.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(survey::Column::HotelName.contains(search))
                    .add(survey::Column::ClientName.contains(search))
                    .add(survey::Column::Campaign.contains(search)),
            );
        }

        cond
    }

    /// Insert an audit with its responses and category snapshot.
    ///
    /// Responses colliding on (audit, question) are skipped.
    pub async fn create_with_responses(
        &self,
        new: NewAudit,
        fields: AuditFields,
        responses: &[ResponseWrite],
        snapshot: &[CategoryWrite],
    ) -> AppResult<audit::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let audit_id = new.id.clone();
        let model = audit::ActiveModel {
            id: Set(new.id),
            survey_id: Set(new.survey_id),
            inspector_id: Set(new.inspector_id),
            feedback: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
            ..Self::fields_to_active(fields)
        };
        Audit::insert(model)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::insert_responses(&txn, &audit_id, responses).await?;
        Self::replace_snapshot(&txn, &audit_id, snapshot).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_by_id(&audit_id).await
    }

    /// Update an audit's fields and upsert responses. Responses not listed
    /// are left untouched. The snapshot is replaced when one is given.
    pub async fn update_with_responses(
        &self,
        id: &str,
        fields: AuditFields,
        responses: &[ResponseWrite],
        snapshot: Option<&[CategoryWrite]>,
    ) -> AppResult<audit::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut model = Self::fields_to_active(fields);
        model.updated_at = Set(Some(Utc::now().into()));
        let updated = Audit::update_many()
            .set(model)
            .filter(audit::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if updated.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Audit: {id}")));
        }

        let now = Utc::now();
        for write in responses.iter().filter(|r| !r.is_new) {
            let active = response::ActiveModel {
                answer: Set(write.answer.clone()),
                option_answer: Set(write.option_answer.clone()),
                option_text: Set(write.option_text.clone()),
                skip: Set(write.skip),
                files: Set(write.files.clone()),
                state: Set(write.state),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            };
            Response::update_many()
                .set(active)
                .filter(response::Column::Id.eq(write.id.as_str()))
                .filter(response::Column::AuditId.eq(id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Self::insert_responses(&txn, id, responses).await?;

        if let Some(snapshot) = snapshot {
            Self::replace_snapshot(&txn, id, snapshot).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_by_id(id).await
    }

    /// Update client feedback and uploads.
    pub async fn update_feedback(
        &self,
        id: &str,
        feedback: Option<String>,
        uploads: serde_json::Value,
    ) -> AppResult<audit::Model> {
        let active = audit::ActiveModel {
            feedback: Set(feedback),
            uploads: Set(uploads),
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };
        let updated = Audit::update_many()
            .set(active)
            .filter(audit::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if updated.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Audit: {id}")));
        }

        self.get_by_id(id).await
    }

    /// Delete an audit with its responses and snapshot.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Response::delete_many()
            .filter(response::Column::AuditId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        AuditCategory::delete_many()
            .filter(audit_category::Column::AuditId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = Audit::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Audit: {id}")));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn fields_to_active(fields: AuditFields) -> audit::ActiveModel {
        audit::ActiveModel {
            client_id: Set(fields.client_id),
            status: Set(fields.status),
            expense: Set(fields.expense),
            brand_standard: Set(fields.brand_standard),
            detailed_summary: Set(fields.detailed_summary),
            executive_summary: Set(fields.executive_summary),
            scenario: Set(fields.scenario),
            uploads: Set(fields.uploads),
            ..Default::default()
        }
    }

    async fn insert_responses<C: ConnectionTrait>(
        conn: &C,
        audit_id: &str,
        responses: &[ResponseWrite],
    ) -> AppResult<()> {
        let now = Utc::now();
        let rows: Vec<response::ActiveModel> = responses
            .iter()
            .filter(|r| r.is_new)
            .map(|r| response::ActiveModel {
                id: Set(r.id.clone()),
                audit_id: Set(audit_id.to_string()),
                question_id: Set(r.question_id.clone()),
                category_id: Set(r.category_id.clone()),
                answer: Set(r.answer.clone()),
                option_answer: Set(r.option_answer.clone()),
                option_text: Set(r.option_text.clone()),
                skip: Set(r.skip),
                files: Set(r.files.clone()),
                state: Set(r.state),
                created_at: Set(now.into()),
                updated_at: Set(None),
            })
            .collect();

        if rows.is_empty() {
            return Ok(());
        }

        Response::insert_many(rows)
            .on_conflict(
                OnConflict::columns([response::Column::AuditId, response::Column::QuestionId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn replace_snapshot<C: ConnectionTrait>(
        conn: &C,
        audit_id: &str,
        snapshot: &[CategoryWrite],
    ) -> AppResult<()> {
        AuditCategory::delete_many()
            .filter(audit_category::Column::AuditId.eq(audit_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if snapshot.is_empty() {
            return Ok(());
        }

        let rows = snapshot.iter().map(|c| audit_category::ActiveModel {
            audit_id: Set(audit_id.to_string()),
            category_id: Set(c.id.clone()),
            title: Set(c.title.clone()),
            display_order: Set(c.display_order),
        });
        AuditCategory::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn create_test_audit(id: &str, status: AuditStatus) -> audit::Model {
        audit::Model {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            inspector_id: "insp1".to_string(),
            client_id: "client1".to_string(),
            status,
            expense: String::new(),
            brand_standard: String::new(),
            detailed_summary: String::new(),
            executive_summary: String::new(),
            scenario: String::new(),
            feedback: None,
            uploads: json!({}),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_fields() -> AuditFields {
        AuditFields {
            client_id: "client1".to_string(),
            status: AuditStatus::InProgress,
            expense: "120 EUR".to_string(),
            brand_standard: String::new(),
            detailed_summary: String::new(),
            executive_summary: String::new(),
            scenario: String::new(),
            uploads: json!({}),
        }
    }

    fn response_write(id: &str, question_id: &str, is_new: bool) -> ResponseWrite {
        ResponseWrite {
            id: id.to_string(),
            question_id: question_id.to_string(),
            category_id: "1".to_string(),
            answer: None,
            option_answer: Some("2".to_string()),
            option_text: Some("NO".to_string()),
            skip: false,
            files: json!([]),
            state: ResponseState::NotAddressed,
            is_new,
        }
    }

    fn snapshot() -> Vec<CategoryWrite> {
        vec![CategoryWrite {
            id: "1".to_string(),
            title: "Cleanliness".to_string(),
            display_order: 0,
        }]
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let audit = create_test_audit("a1", AuditStatus::InProgress);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[audit.clone()]])
                .into_connection(),
        );

        let repo = AuditRepository::new(db);
        let result = repo.find_by_id("a1").await.unwrap();

        assert_eq!(result.unwrap().inspector_id, "insp1");
    }

    #[tokio::test]
    async fn test_create_with_responses() {
        let audit = create_test_audit("a1", AuditStatus::InProgress);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // audit insert, responses insert, snapshot delete, snapshot insert
                .append_exec_results([exec(1), exec(1), exec(0), exec(1)])
                .append_query_results([[audit.clone()]])
                .into_connection(),
        );

        let repo = AuditRepository::new(db.clone());
        let new = NewAudit {
            id: "a1".to_string(),
            survey_id: "s1".to_string(),
            inspector_id: "insp1".to_string(),
        };
        let result = repo
            .create_with_responses(
                new,
                test_fields(),
                &[response_write("r1", "11", true)],
                &snapshot(),
            )
            .await
            .unwrap();
        assert_eq!(result.id, "a1");

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements = log[0].statements();
        assert_eq!(statements.len(), 6);
        assert!(statements[1].sql.starts_with(r#"INSERT INTO "audit""#));
        assert!(statements[2].sql.starts_with(r#"INSERT INTO "response""#));
        assert!(statements[2].sql.contains("DO NOTHING"));
        assert!(statements[4].sql.starts_with(r#"INSERT INTO "audit_category""#));
    }

    #[tokio::test]
    async fn test_update_with_responses_updates_then_inserts() {
        let audit = create_test_audit("a1", AuditStatus::InProgress);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // audit update, response update, response insert
                .append_exec_results([exec(1), exec(1), exec(1)])
                .append_query_results([[audit.clone()]])
                .into_connection(),
        );

        let repo = AuditRepository::new(db.clone());
        repo.update_with_responses(
            "a1",
            test_fields(),
            &[
                response_write("r1", "11", false),
                response_write("r2", "12", true),
            ],
            None,
        )
        .await
        .unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements = log[0].statements();
        // BEGIN, audit update, response update, response insert, COMMIT
        assert_eq!(statements.len(), 5);
        assert!(statements[2].sql.starts_with(r#"UPDATE "response""#));
        assert!(statements[3].sql.starts_with(r#"INSERT INTO "response""#));
    }

    #[tokio::test]
    async fn test_update_with_responses_missing_audit() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = AuditRepository::new(db);
        let result = repo
            .update_with_responses("missing", test_fields(), &[], None)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_feedback() {
        let mut audit = create_test_audit("a1", AuditStatus::Completed);
        audit.feedback = Some("Great job".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1)])
                .append_query_results([[audit]])
                .into_connection(),
        );

        let repo = AuditRepository::new(db);
        let result = repo
            .update_feedback("a1", Some("Great job".to_string()), json!({}))
            .await
            .unwrap();

        assert_eq!(result.feedback.as_deref(), Some("Great job"));
    }

    #[tokio::test]
    async fn test_delete_missing_audit() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0), exec(0)])
                .into_connection(),
        );

        let repo = AuditRepository::new(db);
        let result = repo.delete("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = AuditRepository::new(db);
        let filter = AuditFilter {
            inspector_id: Some("insp1".to_string()),
            ..Default::default()
        };

        assert_eq!(repo.count(&filter).await.unwrap(), 7);
    }
}
