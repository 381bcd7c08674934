//! Combining evaluation logs from split runs

use crate::evaluation::EvaluationRecord;

/// Append `extra` to `base`, shifting its ids by `id_offset`, ordered by id.
///
/// Used when part of a question set was re-run on its own and numbered
/// from 1. The sort is stable, so repeats of an id keep their log order.
pub fn merge_runs(
    base: Vec<EvaluationRecord>,
    extra: Vec<EvaluationRecord>,
    id_offset: usize,
) -> Vec<EvaluationRecord> {
    let mut merged = base;
    merged.extend(extra.into_iter().map(|mut r| {
        r.id += id_offset;
        r
    }));
    merged.sort_by_key(|r| r.id);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::QaPair;
    use answer_oracle::AnswerOracle;

    fn record(id: usize, answer: &str) -> EvaluationRecord {
        let pair = QaPair::new(id, format!("Q{}", id), "1");
        EvaluationRecord::judge(&pair, answer, "nl2sql", 1, &AnswerOracle::default())
    }

    #[test]
    fn test_merge_offsets_and_sorts() {
        let base = vec![record(2, "a"), record(1, "b"), record(3, "c")];
        let extra = vec![record(2, "e"), record(1, "d")];
        let merged = merge_runs(base, extra, 3);

        let ids: Vec<usize> = merged.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(merged[3].actual_answer, "d");
        assert_eq!(merged[4].actual_answer, "e");
    }

    #[test]
    fn test_merge_keeps_order_of_repeats() {
        let merged = merge_runs(vec![record(1, "first")], vec![record(1, "second")], 0);
        assert_eq!(merged[0].actual_answer, "first");
        assert_eq!(merged[1].actual_answer, "second");
    }
}
