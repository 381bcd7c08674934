//! Question sets and their canonical answers

pub mod categories;
pub mod loader;

pub use categories::QuestionCategory;
pub use loader::{
    load_qa_pairs, load_qa_pairs_from_file, load_qa_pairs_from_json_file, load_qa_pairs_from_str,
    parse_indices, select_indices, LoadError,
};

use serde::{Deserialize, Serialize};

/// A question with its canonical answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// 1-based position in the source file
    pub index: usize,
    pub question: String,
    pub standard_answer: String,
}

impl QaPair {
    pub fn new(index: usize, question: impl Into<String>, standard_answer: impl Into<String>) -> Self {
        Self {
            index,
            question: question.into(),
            standard_answer: standard_answer.into(),
        }
    }

    pub fn category(&self) -> QuestionCategory {
        QuestionCategory::classify(&self.question)
    }
}
