//! Survey import from spreadsheet rows.
//!
//! Reading the spreadsheet file happens outside this crate; this module takes
//! its rows (header already removed) and builds the category and question
//! lists accepted by survey creation.

use std::collections::BTreeMap;

use audit_common::IdGenerator;
use audit_db::entities::question::QuestionType;
use serde::{Deserialize, Serialize};

use crate::tree::{CategoryInput, QuestionInput};

/// One spreadsheet row: category title, question text, comma-separated options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub category: String,
    pub question: String,
    #[serde(default)]
    pub options: Option<String>,
}

/// Build categories and questions from rows.
///
/// Rows group by trimmed category title; the first row of a title creates the
/// category with a generated numeric id. A row with options yields a multiple
/// choice question keyed `"1".."n"`, otherwise a text question. Rows with a
/// blank category or question are skipped.
#[must_use]
pub fn extract(rows: &[SheetRow], id_gen: &IdGenerator) -> (Vec<CategoryInput>, Vec<QuestionInput>) {
    let mut categories: Vec<CategoryInput> = Vec::new();
    let mut questions = Vec::new();

    for row in rows {
        let title = row.category.trim();
        let text = row.question.trim();
        if title.is_empty() || text.is_empty() {
            continue;
        }

        let category_id = match categories.iter().find(|c| c.title == title) {
            Some(existing) => existing.id.clone().unwrap_or_default(),
            None => {
                let id = id_gen.generate_category_id();
                categories.push(CategoryInput {
                    id: Some(id.clone()),
                    title: title.to_string(),
                });
                id
            }
        };

        let options: BTreeMap<String, String> = row
            .options
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .enumerate()
                    .map(|(i, label)| ((i + 1).to_string(), label.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        questions.push(QuestionInput {
            id: None,
            question_type: if options.is_empty() {
                QuestionType::Text
            } else {
                QuestionType::MultiChoice
            },
            text: text.to_string(),
            options,
            category_id,
        });
    }

    (categories, questions)
}
