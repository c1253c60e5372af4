//! Response classification.
//!
//! Maps a response's selected option label to a [`ResponseState`] and
//! resolves which category a question belongs to. Both run when a response
//! is written, never lazily on read.

use std::collections::{BTreeMap, HashMap};

use audit_db::entities::question;
use audit_db::entities::response::ResponseState;

/// Classify a selected option label.
///
/// Exact match on the stored tokens: `"YES"` is addressed, `"NO"` is not,
/// anything else (missing, blank, `"N/A"`, free text) was not seen.
#[must_use]
pub fn classify(option_text: Option<&str>) -> ResponseState {
    match option_text {
        Some("YES") => ResponseState::Addressed,
        Some("NO") => ResponseState::NotAddressed,
        _ => ResponseState::NotSeen,
    }
}

/// Yes/no reading of an option label for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Case-insensitive reading of `"YES"`/`"NO"`. Other labels have no verdict.
    #[must_use]
    pub fn from_option_text(option_text: Option<&str>) -> Option<Self> {
        match option_text.map(|t| t.trim().to_uppercase()).as_deref() {
            Some("YES") => Some(Self::Yes),
            Some("NO") => Some(Self::No),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedQuestion {
    category_id: String,
    options: BTreeMap<String, String>,
}

/// Lookup from question id to its category and option labels.
#[derive(Debug, Clone, Default)]
pub struct QuestionIndex {
    by_id: HashMap<String, IndexedQuestion>,
}

impl QuestionIndex {
    /// Index a survey's questions.
    #[must_use]
    pub fn new(questions: &[question::Model]) -> Self {
        let by_id = questions
            .iter()
            .map(|q| {
                (
                    q.id.clone(),
                    IndexedQuestion {
                        category_id: q.category_id.clone(),
                        options: serde_json::from_value(q.options.clone()).unwrap_or_default(),
                    },
                )
            })
            .collect();
        Self { by_id }
    }

    /// Whether the question exists.
    #[must_use]
    pub fn contains(&self, question_id: &str) -> bool {
        self.by_id.contains_key(question_id)
    }

    /// Category of a question.
    #[must_use]
    pub fn category_of(&self, question_id: &str) -> Option<&str> {
        self.by_id.get(question_id).map(|q| q.category_id.as_str())
    }

    /// Label of one of a question's options.
    #[must_use]
    pub fn option_label(&self, question_id: &str, option_key: &str) -> Option<&str> {
        self.by_id
            .get(question_id)
            .and_then(|q| q.options.get(option_key))
            .map(String::as_str)
    }

    /// Number of indexed questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether no questions are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
