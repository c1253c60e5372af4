//! Grouped view of a survey: categories with their questions.
//!
//! Always derived on read. A question whose category is not in the set is
//! left out of every group; that leniency is for display only, writes reject
//! such questions.

use audit_db::entities::{audit_category, question, survey_category};
use serde::Serialize;

/// Identity of a category as shown in a grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryHeader {
    pub id: String,
    pub title: String,
}

impl From<&survey_category::Model> for CategoryHeader {
    fn from(c: &survey_category::Model) -> Self {
        Self {
            id: c.id.clone(),
            title: c.title.clone(),
        }
    }
}

impl From<&audit_category::Model> for CategoryHeader {
    fn from(c: &audit_category::Model) -> Self {
        Self {
            id: c.category_id.clone(),
            title: c.title.clone(),
        }
    }
}

/// A category with the questions bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub id: String,
    pub title: String,
    pub questions: Vec<question::Model>,
}

/// Group questions under their categories.
///
/// Questions keep their input order within a group. With a non-empty
/// `sorted_category_ids` groups are ordered by position in that list; ids
/// missing from it rank as -1 and so come first, in their input order.
#[must_use]
pub fn group_questions(
    categories: &[CategoryHeader],
    questions: &[question::Model],
    sorted_category_ids: Option<&[String]>,
) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = categories
        .iter()
        .map(|c| CategoryGroup {
            id: c.id.clone(),
            title: c.title.clone(),
            questions: questions
                .iter()
                .filter(|q| q.category_id == c.id)
                .cloned()
                .collect(),
        })
        .collect();

    if let Some(order) = sorted_category_ids.filter(|o| !o.is_empty()) {
        groups.sort_by_key(|g| {
            order
                .iter()
                .position(|id| *id == g.id)
                .map_or(-1, |p| p as i64)
        });
    }

    groups
}
