//! Report statistics.
//!
//! Read-only derivation of yes/no figures from an audit's responses and its
//! grouped questions.

use std::collections::HashMap;

use audit_db::entities::{question, response};
use serde::Serialize;

use crate::classifier::Verdict;
use crate::grouping::CategoryGroup;

/// Whole-audit yes/no figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatistics {
    pub total_count: u64,
    pub yes_count: u64,
    pub no_count: u64,
    pub yes_percentage: f64,
    pub no_percentage: f64,
}

/// Yes/no figures of one category. Percentages are shares of the whole
/// audit's yes+no total, not of the category's own answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatistics {
    pub category_id: String,
    pub title: String,
    pub yes_count: u64,
    pub no_count: u64,
    pub yes_percentage: f64,
    pub no_percentage: f64,
}

/// A yes or no answer listed in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub response_id: String,
    pub question_id: String,
    pub category_id: String,
    pub question: String,
    pub option_text: Option<String>,
    pub answer: Option<String>,
    pub files: serde_json::Value,
}

/// Full report of one audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub stats: QuestionStatistics,
    pub star_rating: u8,
    pub category_stats: Vec<CategoryStatistics>,
    pub best_category: Option<CategoryStatistics>,
    pub underperforming_category: Option<CategoryStatistics>,
    pub yes_questions: Vec<ReportEntry>,
    pub no_questions: Vec<ReportEntry>,
}

/// Round to two decimals. Non-finite input yields 0.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    }
}

/// Yes/no totals and percentages from the two partitions.
#[must_use]
pub fn calculate_question_statistics<T>(yes: &[T], no: &[T]) -> QuestionStatistics {
    let yes_count = yes.len() as u64;
    let no_count = no.len() as u64;
    let total_count = yes_count + no_count;

    QuestionStatistics {
        total_count,
        yes_count,
        no_count,
        yes_percentage: percentage(yes_count, total_count),
        no_percentage: percentage(no_count, total_count),
    }
}

/// Stars for a yes percentage: 3 from 80, 2 from 60, else 1.
#[must_use]
pub fn star_rating(yes_percentage: f64) -> u8 {
    if yes_percentage >= 80.0 {
        3
    } else if yes_percentage >= 60.0 {
        2
    } else {
        1
    }
}

/// Split responses into yes and no entries.
///
/// Responses to questions no longer in `questions` are skipped, as are labels
/// other than yes/no.
#[must_use]
pub fn partition(
    questions: &[question::Model],
    responses: &[response::Model],
) -> (Vec<ReportEntry>, Vec<ReportEntry>) {
    let by_id: HashMap<&str, &question::Model> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();

    let mut yes = Vec::new();
    let mut no = Vec::new();
    for r in responses {
        let Some(question) = by_id.get(r.question_id.as_str()) else {
            continue;
        };
        let Some(verdict) = Verdict::from_option_text(r.option_text.as_deref()) else {
            continue;
        };

        let entry = ReportEntry {
            response_id: r.id.clone(),
            question_id: r.question_id.clone(),
            category_id: r.category_id.clone(),
            question: question.text.clone(),
            option_text: r.option_text.clone(),
            answer: r.answer.clone(),
            files: r.files.clone(),
        };
        match verdict {
            Verdict::Yes => yes.push(entry),
            Verdict::No => no.push(entry),
        }
    }

    (yes, no)
}

/// Per-category figures, in group order.
///
/// Each question counts once, by its first response.
#[must_use]
pub fn category_statistics(
    groups: &[CategoryGroup],
    responses: &[response::Model],
    audit_total: u64,
) -> Vec<CategoryStatistics> {
    let mut first_by_question: HashMap<&str, &response::Model> = HashMap::new();
    for r in responses {
        first_by_question.entry(r.question_id.as_str()).or_insert(r);
    }

    groups
        .iter()
        .map(|group| {
            let (mut yes_count, mut no_count) = (0, 0);
            for q in &group.questions {
                let verdict = first_by_question
                    .get(q.id.as_str())
                    .and_then(|r| Verdict::from_option_text(r.option_text.as_deref()));
                match verdict {
                    Some(Verdict::Yes) => yes_count += 1,
                    Some(Verdict::No) => no_count += 1,
                    None => {}
                }
            }

            CategoryStatistics {
                category_id: group.id.clone(),
                title: group.title.clone(),
                yes_count,
                no_count,
                yes_percentage: percentage(yes_count, audit_total),
                no_percentage: percentage(no_count, audit_total),
            }
        })
        .collect()
}

/// Order categories for ranking: stable sort by no percentage descending,
/// then a second stable sort by yes percentage descending. The first entry is
/// the best performer, the last the underperformer.
#[must_use]
pub fn rank_categories(stats: &[CategoryStatistics]) -> Vec<CategoryStatistics> {
    let mut ranked = stats.to_vec();
    ranked.sort_by(|a, b| b.no_percentage.total_cmp(&a.no_percentage));
    ranked.sort_by(|a, b| b.yes_percentage.total_cmp(&a.yes_percentage));
    ranked
}

/// Build the report of one audit.
#[must_use]
pub fn build_report(
    groups: &[CategoryGroup],
    questions: &[question::Model],
    responses: &[response::Model],
) -> AuditReport {
    let (yes_questions, no_questions) = partition(questions, responses);
    let stats = calculate_question_statistics(&yes_questions, &no_questions);
    let category_stats = category_statistics(groups, responses, stats.total_count);
    let ranked = rank_categories(&category_stats);

    AuditReport {
        star_rating: star_rating(stats.yes_percentage),
        best_category: ranked.first().cloned(),
        underperforming_category: ranked.last().cloned(),
        stats,
        category_stats,
        yes_questions,
        no_questions,
    }
}
