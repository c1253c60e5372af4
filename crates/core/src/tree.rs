//! Category/question tree planning.
//!
//! Turns a submitted category/question list into the exact set of rows the
//! survey should hold afterwards. Callers always submit the complete desired
//! set; anything stored but absent is removed by the repository in the same
//! transaction.

use std::collections::{BTreeMap, HashSet};

use audit_common::{AppError, AppResult, IdGenerator};
use audit_db::entities::question::QuestionType;
use audit_db::repositories::{CategoryWrite, QuestionWrite, SurveyTree};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A submitted category. No id means new.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, max = 512))]
    pub title: String,
}

/// A submitted question. No id means new.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    pub category_id: String,
}

/// Whether a tree is being written for a new survey or replacing an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    Create,
    Update,
}

/// Ids added and removed by a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeChanges {
    pub categories_added: Vec<String>,
    pub categories_removed: Vec<String>,
    pub questions_added: Vec<String>,
    pub questions_removed: Vec<String>,
}

/// Build the target tree from submitted lists.
///
/// Missing ids are generated. Fails on duplicate ids, on a question whose
/// category is not part of the same submission, and on an empty category
/// list when creating.
pub fn plan_tree(
    categories: &[CategoryInput],
    questions: &[QuestionInput],
    mode: TreeMode,
    id_gen: &IdGenerator,
) -> AppResult<SurveyTree> {
    if mode == TreeMode::Create && categories.is_empty() {
        return Err(AppError::Validation(
            "Your survey is probably empty".to_string(),
        ));
    }

    let mut category_ids = HashSet::new();
    let mut planned_categories = Vec::with_capacity(categories.len());
    for (position, category) in categories.iter().enumerate() {
        category.validate()?;

        let id = match non_blank(category.id.as_deref()) {
            Some(id) => id.to_string(),
            None => id_gen.generate_category_id(),
        };
        if !category_ids.insert(id.clone()) {
            return Err(AppError::Validation(format!("Duplicate category id: {id}")));
        }

        planned_categories.push(CategoryWrite {
            id,
            title: category.title.trim().to_string(),
            display_order: position as i32,
        });
    }

    let mut question_ids = HashSet::new();
    let mut planned_questions = Vec::with_capacity(questions.len());
    for (position, question) in questions.iter().enumerate() {
        question.validate()?;

        if !category_ids.contains(question.category_id.as_str()) {
            return Err(AppError::ReferentialIntegrity(format!(
                "Question \"{}\" references unknown category: {}",
                question.text, question.category_id
            )));
        }

        let id = match non_blank(question.id.as_deref()) {
            Some(id) => id.to_string(),
            None => id_gen.generate(),
        };
        if !question_ids.insert(id.clone()) {
            return Err(AppError::Validation(format!("Duplicate question id: {id}")));
        }

        let options = match question.question_type {
            QuestionType::Text => BTreeMap::new(),
            QuestionType::MultiChoice if question.options.is_empty() => {
                return Err(AppError::Validation(format!(
                    "Multiple choice question has no options: {}",
                    question.text
                )));
            }
            QuestionType::MultiChoice => question.options.clone(),
        };

        planned_questions.push(QuestionWrite {
            id,
            category_id: question.category_id.clone(),
            question_type: question.question_type,
            text: question.text.trim().to_string(),
            options: serde_json::json!(options),
            display_order: position as i32,
        });
    }

    Ok(SurveyTree {
        categories: planned_categories,
        questions: planned_questions,
    })
}

/// Compare stored ids with a planned tree.
#[must_use]
pub fn diff(
    existing_category_ids: &[String],
    existing_question_ids: &[String],
    tree: &SurveyTree,
) -> TreeChanges {
    let planned_categories: HashSet<&str> = tree.categories.iter().map(|c| c.id.as_str()).collect();
    let planned_questions: HashSet<&str> = tree.questions.iter().map(|q| q.id.as_str()).collect();
    let stored_categories: HashSet<&str> = existing_category_ids.iter().map(String::as_str).collect();
    let stored_questions: HashSet<&str> = existing_question_ids.iter().map(String::as_str).collect();

    TreeChanges {
        categories_added: tree
            .categories
            .iter()
            .filter(|c| !stored_categories.contains(c.id.as_str()))
            .map(|c| c.id.clone())
            .collect(),
        categories_removed: existing_category_ids
            .iter()
            .filter(|id| !planned_categories.contains(id.as_str()))
            .cloned()
            .collect(),
        questions_added: tree
            .questions
            .iter()
            .filter(|q| !stored_questions.contains(q.id.as_str()))
            .map(|q| q.id.clone())
            .collect(),
        questions_removed: existing_question_ids
            .iter()
            .filter(|id| !planned_questions.contains(id.as_str()))
            .cloned()
            .collect(),
    }
}

fn non_blank(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: Option<&str>, title: &str) -> CategoryInput {
        CategoryInput {
            id: id.map(str::to_string),
            title: title.to_string(),
        }
    }

    fn question(id: Option<&str>, category_id: &str, text: &str) -> QuestionInput {
        QuestionInput {
            id: id.map(str::to_string),
            question_type: QuestionType::MultiChoice,
            text: text.to_string(),
            options: BTreeMap::from([
                ("1".to_string(), "YES".to_string()),
                ("2".to_string(), "NO".to_string()),
            ]),
            category_id: category_id.to_string(),
        }
    }

    // Upsert by id, then drop what is absent, as the repository does in SQL.
    fn apply(stored: &SurveyTree, planned: &SurveyTree) -> SurveyTree {
        fn upsert<T: Clone>(stored: &[T], planned: &[T], id: impl Fn(&T) -> &str) -> Vec<T> {
            let mut rows: Vec<T> = stored.to_vec();
            for row in planned {
                match rows.iter().position(|r| id(r) == id(row)) {
                    Some(i) => rows[i] = row.clone(),
                    None => rows.push(row.clone()),
                }
            }
            let keep: HashSet<&str> = planned.iter().map(&id).collect();
            rows.into_iter().filter(|r| keep.contains(id(r))).collect()
        }

        SurveyTree {
            categories: upsert(&stored.categories, &planned.categories, |c| c.id.as_str()),
            questions: upsert(&stored.questions, &planned.questions, |q| q.id.as_str()),
        }
    }

    fn ids<T>(rows: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        let mut ids: Vec<String> = rows.iter().map(|r| id(r).to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_create_rejects_empty_survey() {
        let id_gen = IdGenerator::new();
        let err = plan_tree(&[], &[], TreeMode::Create, &id_gen).unwrap_err();

        assert!(matches!(err, AppError::Validation(msg) if msg.contains("probably empty")));
    }

    #[test]
    fn test_update_allows_empty_tree() {
        let id_gen = IdGenerator::new();
        let tree = plan_tree(&[], &[], TreeMode::Update, &id_gen).unwrap();

        assert!(tree.categories.is_empty());
        assert!(tree.questions.is_empty());
    }

    #[test]
    fn test_generates_missing_ids() {
        let id_gen = IdGenerator::new();
        let tree = plan_tree(
            &[category(Some("1"), "Lobby"), category(None, "Spa")],
            &[question(None, "1", "Clean?")],
            TreeMode::Create,
            &id_gen,
        )
        .unwrap();

        assert_eq!(tree.categories[0].id, "1");
        assert!(tree.categories[1].id.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(tree.questions[0].id.len(), 26);
        assert_eq!(tree.categories[1].display_order, 1);
    }

    #[test]
    fn test_question_with_unknown_category_is_rejected() {
        let id_gen = IdGenerator::new();
        let err = plan_tree(
            &[category(Some("1"), "Lobby")],
            &[question(Some("11"), "1", "Clean?"), question(Some("12"), "2", "Tidy?")],
            TreeMode::Update,
            &id_gen,
        )
        .unwrap_err();

        assert!(matches!(err, AppError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let id_gen = IdGenerator::new();
        let err = plan_tree(
            &[category(Some("1"), "Lobby"), category(Some("1"), "Room")],
            &[],
            TreeMode::Update,
            &id_gen,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = plan_tree(
            &[category(Some("1"), "Lobby")],
            &[question(Some("11"), "1", "A"), question(Some("11"), "1", "B")],
            TreeMode::Update,
            &id_gen,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let id_gen = IdGenerator::new();
        let err = plan_tree(&[category(Some("1"), "")], &[], TreeMode::Create, &id_gen).unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_text_question_drops_options() {
        let id_gen = IdGenerator::new();
        let mut q = question(Some("11"), "1", "Comments");
        q.question_type = QuestionType::Text;

        let tree = plan_tree(&[category(Some("1"), "Lobby")], &[q], TreeMode::Create, &id_gen)
            .unwrap();

        assert_eq!(tree.questions[0].options, serde_json::json!({}));
    }

    #[test]
    fn test_multi_choice_requires_options() {
        let id_gen = IdGenerator::new();
        let mut q = question(Some("11"), "1", "Clean?");
        q.options.clear();

        let err = plan_tree(&[category(Some("1"), "Lobby")], &[q], TreeMode::Create, &id_gen)
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_diff_reports_added_and_removed() {
        let id_gen = IdGenerator::new();
        let tree = plan_tree(
            &[category(Some("1"), "Lobby"), category(Some("3"), "Bar")],
            &[question(Some("11"), "1", "Clean?"), question(Some("31"), "3", "Stocked?")],
            TreeMode::Update,
            &id_gen,
        )
        .unwrap();

        let changes = diff(
            &["1".to_string(), "2".to_string()],
            &["11".to_string(), "21".to_string()],
            &tree,
        );

        assert_eq!(changes.categories_added, ["3"]);
        assert_eq!(changes.categories_removed, ["2"]);
        assert_eq!(changes.questions_added, ["31"]);
        assert_eq!(changes.questions_removed, ["21"]);
    }

    #[test]
    fn test_reconciliation_yields_submitted_set() {
        let id_gen = IdGenerator::new();
        let stored = plan_tree(
            &[category(Some("1"), "Lobby"), category(Some("2"), "Room")],
            &[question(Some("11"), "1", "Clean?"), question(Some("21"), "2", "Tidy?")],
            TreeMode::Create,
            &id_gen,
        )
        .unwrap();

        let submissions = [
            (vec![category(Some("2"), "Room")], vec![question(Some("11"), "2", "Moved")]),
            (vec![category(Some("3"), "Spa")], vec![]),
            (
                vec![category(Some("1"), "Lobby v2"), category(Some("4"), "Pool")],
                vec![question(Some("41"), "4", "Heated?"), question(Some("11"), "1", "Clean?")],
            ),
            (vec![], vec![]),
        ];

        for (categories, questions) in submissions {
            let planned = plan_tree(&categories, &questions, TreeMode::Update, &id_gen).unwrap();
            let result = apply(&stored, &planned);

            assert_eq!(
                ids(&result.categories, |c| c.id.as_str()),
                ids(&planned.categories, |c| c.id.as_str())
            );
            assert_eq!(
                ids(&result.questions, |q| q.id.as_str()),
                ids(&planned.questions, |q| q.id.as_str())
            );
            for q in &result.questions {
                assert!(result.categories.iter().any(|c| c.id == q.category_id));
            }
        }
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let id_gen = IdGenerator::new();
        let stored = plan_tree(
            &[category(Some("1"), "Lobby")],
            &[question(Some("11"), "1", "Clean?")],
            TreeMode::Create,
            &id_gen,
        )
        .unwrap();

        let categories = [category(Some("1"), "Lobby"), category(Some("2"), "Room")];
        let questions = [question(Some("11"), "1", "Clean?"), question(Some("21"), "2", "Tidy?")];
        let planned = plan_tree(&categories, &questions, TreeMode::Update, &id_gen).unwrap();

        let once = apply(&stored, &planned);
        let twice = apply(&once, &planned);

        assert_eq!(once, twice);
        assert_eq!(twice.categories.len(), 2);
        assert_eq!(twice.questions.len(), 2);
        assert_eq!(
            diff(
                &ids(&once.categories, |c| c.id.as_str()),
                &ids(&once.questions, |q| q.id.as_str()),
                &planned
            ),
            TreeChanges::default()
        );
    }
}
