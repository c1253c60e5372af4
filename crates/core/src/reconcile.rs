//! Response reconciliation.
//!
//! Plans the response rows an audit write produces, keeping at most one
//! response per question. Responses are only ever added or changed here;
//! omitting one from a payload never removes it.

use std::collections::{HashMap, HashSet};

use audit_common::{AppError, AppResult, FileRef, IdGenerator};
use audit_db::entities::response;
use audit_db::repositories::ResponseWrite;
use serde::{Deserialize, Serialize};

use crate::classifier::{QuestionIndex, classify};

/// A submitted response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInput {
    /// Existing response to update. Ignored when creating an audit.
    #[serde(default)]
    pub id: Option<String>,
    /// Question answered. Required unless `id` is given.
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub option_answer: Option<String>,
    /// Selected option label. Looked up from the question when only the key is sent.
    #[serde(default)]
    pub option_text: Option<String>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// Planned writes for one audit write.
#[derive(Debug, Clone, Default)]
pub struct ResponsePlan {
    pub writes: Vec<ResponseWrite>,
    /// Entries skipped because an earlier entry already covered their response.
    pub dropped: usize,
}

impl ResponsePlan {
    /// Number of rows to insert.
    #[must_use]
    pub fn inserts(&self) -> usize {
        self.writes.iter().filter(|w| w.is_new).count()
    }

    /// Number of rows to update.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.writes.len() - self.inserts()
    }
}

/// Plan responses for a new audit. Every entry becomes a new row; later
/// entries for an already answered question are dropped.
pub fn plan_new_responses(
    incoming: &[ResponseInput],
    questions: &QuestionIndex,
    id_gen: &IdGenerator,
) -> AppResult<ResponsePlan> {
    let mut planner = Planner::new(&[], questions, id_gen);
    for input in incoming {
        planner.plan_by_question(input)?;
    }
    Ok(planner.finish())
}

/// Plan responses for an existing audit.
///
/// An entry with an id updates that response, which must belong to the audit.
/// An entry without an id updates the audit's response to the same question
/// if there is one, otherwise it creates one.
pub fn plan_response_updates(
    incoming: &[ResponseInput],
    existing: &[response::Model],
    questions: &QuestionIndex,
    id_gen: &IdGenerator,
) -> AppResult<ResponsePlan> {
    let mut planner = Planner::new(existing, questions, id_gen);
    for input in incoming {
        match input.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => planner.plan_by_id(id, input)?,
            None => planner.plan_by_question(input)?,
        }
    }
    Ok(planner.finish())
}

struct Planner<'a> {
    by_id: HashMap<&'a str, &'a response::Model>,
    by_question: HashMap<&'a str, &'a response::Model>,
    questions: &'a QuestionIndex,
    id_gen: &'a IdGenerator,
    planned_ids: HashSet<String>,
    planned_questions: HashSet<String>,
    plan: ResponsePlan,
}

impl<'a> Planner<'a> {
    fn new(
        existing: &'a [response::Model],
        questions: &'a QuestionIndex,
        id_gen: &'a IdGenerator,
    ) -> Self {
        Self {
            by_id: existing.iter().map(|r| (r.id.as_str(), r)).collect(),
            by_question: existing.iter().map(|r| (r.question_id.as_str(), r)).collect(),
            questions,
            id_gen,
            planned_ids: HashSet::new(),
            planned_questions: HashSet::new(),
            plan: ResponsePlan::default(),
        }
    }

    fn plan_by_id(&mut self, id: &str, input: &ResponseInput) -> AppResult<()> {
        let existing = *self
            .by_id
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Response: {id}")))?;
        self.plan_update(existing, input);
        Ok(())
    }

    fn plan_by_question(&mut self, input: &ResponseInput) -> AppResult<()> {
        let question_id = input
            .question_id
            .as_deref()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::Validation("Response is missing questionId".to_string()))?;

        if let Some(existing) = self.by_question.get(question_id).copied() {
            self.plan_update(existing, input);
            return Ok(());
        }

        let category_id = self
            .questions
            .category_of(question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question: {question_id}")))?
            .to_string();

        if !self.planned_questions.insert(question_id.to_string()) {
            self.drop_duplicate(question_id);
            return Ok(());
        }

        let id = self.id_gen.generate();
        self.planned_ids.insert(id.clone());
        let write = self.write(id, question_id, category_id, input, true);
        self.plan.writes.push(write);
        Ok(())
    }

    fn plan_update(&mut self, existing: &response::Model, input: &ResponseInput) {
        if !self.planned_ids.insert(existing.id.clone()) {
            self.drop_duplicate(&existing.question_id);
            return;
        }
        self.planned_questions.insert(existing.question_id.clone());

        let write = self.write(
            existing.id.clone(),
            &existing.question_id,
            existing.category_id.clone(),
            input,
            false,
        );
        self.plan.writes.push(write);
    }

    fn write(
        &self,
        id: String,
        question_id: &str,
        category_id: String,
        input: &ResponseInput,
        is_new: bool,
    ) -> ResponseWrite {
        let option_text = input.option_text.clone().or_else(|| {
            input
                .option_answer
                .as_deref()
                .and_then(|key| self.questions.option_label(question_id, key))
                .map(str::to_string)
        });

        ResponseWrite {
            id,
            question_id: question_id.to_string(),
            category_id,
            answer: input.answer.clone(),
            option_answer: input.option_answer.clone(),
            state: classify(option_text.as_deref()),
            option_text,
            skip: input.skip,
            files: serde_json::json!(input.files),
            is_new,
        }
    }

    fn drop_duplicate(&mut self, question_id: &str) {
        tracing::debug!(question_id = question_id, "Dropping duplicate response");
        self.plan.dropped += 1;
    }

    fn finish(self) -> ResponsePlan {
        self.plan
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use audit_db::entities::question;
    use audit_db::entities::response::ResponseState;
    use chrono::Utc;
    use serde_json::json;

    fn questions() -> QuestionIndex {
        let q = |id: &str, category_id: &str| question::Model {
            id: id.to_string(),
            survey_id: "s1".to_string(),
            category_id: category_id.to_string(),
            question_type: question::QuestionType::MultiChoice,
            text: "Room clean?".to_string(),
            options: json!({"1": "YES", "2": "NO"}),
            display_order: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        QuestionIndex::new(&[q("11", "1"), q("12", "1"), q("21", "2")])
    }

    fn stored(id: &str, question_id: &str, category_id: &str) -> response::Model {
        response::Model {
            id: id.to_string(),
            audit_id: "a1".to_string(),
            question_id: question_id.to_string(),
            category_id: category_id.to_string(),
            answer: None,
            option_answer: Some("1".to_string()),
            option_text: Some("YES".to_string()),
            skip: false,
            files: json!([]),
            state: ResponseState::Addressed,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn answer(question_id: &str, option_text: &str) -> ResponseInput {
        ResponseInput {
            question_id: Some(question_id.to_string()),
            option_text: Some(option_text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_responses_get_category_and_state() {
        let id_gen = IdGenerator::new();
        let plan = plan_new_responses(&[answer("11", "NO")], &questions(), &id_gen).unwrap();

        assert_eq!(plan.writes.len(), 1);
        let write = &plan.writes[0];
        assert!(write.is_new);
        assert_eq!(write.category_id, "1");
        assert_eq!(write.state, ResponseState::NotAddressed);
    }

    #[test]
    fn test_new_responses_ignore_ids() {
        let id_gen = IdGenerator::new();
        let mut input = answer("11", "YES");
        input.id = Some("client-side".to_string());

        let plan = plan_new_responses(&[input], &questions(), &id_gen).unwrap();

        assert!(plan.writes[0].is_new);
        assert_ne!(plan.writes[0].id, "client-side");
    }

    #[test]
    fn test_duplicate_questions_keep_first() {
        let id_gen = IdGenerator::new();
        let plan = plan_new_responses(
            &[answer("11", "YES"), answer("11", "NO"), answer("12", "NO")],
            &questions(),
            &id_gen,
        )
        .unwrap();

        assert_eq!(plan.writes.len(), 2);
        assert_eq!(plan.dropped, 1);
        assert_eq!(plan.writes[0].option_text.as_deref(), Some("YES"));
    }

    #[test]
    fn test_unknown_question_is_not_found() {
        let id_gen = IdGenerator::new();
        let err = plan_new_responses(&[answer("99", "YES")], &questions(), &id_gen).unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_missing_question_id_is_invalid() {
        let id_gen = IdGenerator::new();
        let input = ResponseInput {
            option_text: Some("YES".to_string()),
            ..Default::default()
        };

        let err = plan_new_responses(&[input], &questions(), &id_gen).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_option_text_from_option_key() {
        let id_gen = IdGenerator::new();
        let input = ResponseInput {
            question_id: Some("11".to_string()),
            option_answer: Some("2".to_string()),
            ..Default::default()
        };

        let plan = plan_new_responses(&[input], &questions(), &id_gen).unwrap();

        assert_eq!(plan.writes[0].option_text.as_deref(), Some("NO"));
        assert_eq!(plan.writes[0].state, ResponseState::NotAddressed);
    }

    #[test]
    fn test_update_by_id_keeps_category() {
        let id_gen = IdGenerator::new();
        let existing = [stored("501", "11", "1")];
        let input = ResponseInput {
            id: Some("501".to_string()),
            answer: Some("edited".to_string()),
            ..Default::default()
        };

        let plan = plan_response_updates(&[input], &existing, &questions(), &id_gen).unwrap();

        assert_eq!(plan.updates(), 1);
        let write = &plan.writes[0];
        assert_eq!(write.id, "501");
        assert_eq!(write.question_id, "11");
        assert_eq!(write.category_id, "1");
        assert_eq!(write.answer.as_deref(), Some("edited"));
        assert_eq!(write.state, ResponseState::NotSeen);
    }

    #[test]
    fn test_update_with_foreign_id_is_not_found() {
        let id_gen = IdGenerator::new();
        let input = ResponseInput {
            id: Some("999".to_string()),
            ..Default::default()
        };

        let err = plan_response_updates(&[input], &[], &questions(), &id_gen).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_update_without_id_reuses_existing_response() {
        let id_gen = IdGenerator::new();
        let existing = [stored("501", "11", "1")];

        let plan =
            plan_response_updates(&[answer("11", "NO")], &existing, &questions(), &id_gen).unwrap();

        assert_eq!(plan.inserts(), 0);
        assert_eq!(plan.writes[0].id, "501");
        assert_eq!(plan.writes[0].state, ResponseState::NotAddressed);
    }

    #[test]
    fn test_update_keeps_response_of_removed_question() {
        let id_gen = IdGenerator::new();
        let existing = [stored("777", "gone", "9")];
        let input = ResponseInput {
            id: Some("777".to_string()),
            option_text: Some("YES".to_string()),
            ..Default::default()
        };

        let plan = plan_response_updates(&[input], &existing, &questions(), &id_gen).unwrap();

        assert_eq!(plan.writes[0].category_id, "9");
        assert_eq!(plan.writes[0].state, ResponseState::Addressed);
    }

    #[test]
    fn test_repeated_updates_keep_one_row_per_question() {
        let id_gen = IdGenerator::new();
        let qs = questions();

        // First call creates the response.
        let first = plan_response_updates(&[answer("11", "YES")], &[], &qs, &id_gen).unwrap();
        assert_eq!(first.inserts(), 1);
        let created = &first.writes[0];
        let rows = vec![stored(&created.id, "11", &created.category_id)];

        // Second call, by id, updates in place.
        let by_id = ResponseInput {
            id: Some(created.id.clone()),
            answer: Some("edited".to_string()),
            ..Default::default()
        };
        let second = plan_response_updates(&[by_id], &rows, &qs, &id_gen).unwrap();
        assert_eq!(second.inserts(), 0);
        assert_eq!(second.writes[0].id, created.id);

        // Third call, again without an id, still targets the same row.
        let third = plan_response_updates(&[answer("11", "NO")], &rows, &qs, &id_gen).unwrap();
        assert_eq!(third.inserts(), 0);
        assert_eq!(third.writes[0].id, created.id);
    }

    #[test]
    fn test_id_and_question_for_same_response_keep_first() {
        let id_gen = IdGenerator::new();
        let existing = [stored("501", "11", "1")];
        let by_id = ResponseInput {
            id: Some("501".to_string()),
            option_text: Some("YES".to_string()),
            ..Default::default()
        };

        let plan = plan_response_updates(
            &[by_id, answer("11", "NO")],
            &existing,
            &questions(),
            &id_gen,
        )
        .unwrap();

        assert_eq!(plan.writes.len(), 1);
        assert_eq!(plan.dropped, 1);
        assert_eq!(plan.writes[0].state, ResponseState::Addressed);
    }
}
