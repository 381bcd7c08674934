//! Shape classification
//!
//! The standard answer defines the expected structure. The actual answer is
//! only consulted for the percentage check and the scalar fallback.

use crate::extract::{extract, is_numeric_label, is_period_label, labelled_segments};
use crate::types::AnswerShape;

/// Decide which equivalence rule applies to a pair of answers.
pub fn classify(standard: &str, actual: &str) -> AnswerShape {
    if has_percent(standard) && has_percent(actual) {
        return AnswerShape::Percentage;
    }

    if let Some(shape) = structure(standard) {
        return shape;
    }

    if extract(standard).has_numeric() || extract(actual).has_numeric() {
        return AnswerShape::ScalarNumeric;
    }

    AnswerShape::FreeText
}

/// `EntitySet` or `TimeSeries` when the standard answer's labelled segments
/// form one, judged from the standard alone.
pub(crate) fn structure(standard: &str) -> Option<AnswerShape> {
    let segments = labelled_segments(standard);
    let periods = segments
        .iter()
        .filter(|(label, _)| is_period_label(label))
        .count();
    let entities = segments
        .iter()
        .filter(|(label, _)| !is_period_label(label) && !is_numeric_label(label))
        .count();

    if entities >= 2 && periods == 0 {
        return Some(AnswerShape::EntitySet);
    }

    if !segments.is_empty()
        && periods == segments.len()
        && segments.iter().all(|(_, value)| extract(value).has_numeric())
    {
        return Some(AnswerShape::TimeSeries);
    }

    None
}

fn has_percent(raw: &str) -> bool {
    raw.contains('%') || raw.contains('％')
}
