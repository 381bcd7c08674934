//! Question/answer loading from answer files and JSON

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::QaPair;

/// `12. 问题：...` or `问题：...`
static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+\.\s*)?问题[:：]\s*(.*)$").unwrap());

static ANSWER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^答案[:：]\s*(.*)$").unwrap());

/// Error type for dataset loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid index selection '{0}'")]
    InvalidIndices(String),
}

/// Load question/answer pairs from an answer file
pub fn load_qa_pairs_from_file(path: impl AsRef<Path>) -> Result<Vec<QaPair>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Ok(load_qa_pairs_from_str(&content))
}

/// Parse the line-oriented answer format.
///
/// A question line opens a new pair; the `答案` line that follows sets its
/// answer. Pairs that never receive a non-empty answer are dropped.
pub fn load_qa_pairs_from_str(content: &str) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut current: Option<(String, Option<String>)> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = QUESTION_LINE.captures(line) {
            flush(&mut pairs, current.take());
            current = Some((caps[1].trim().to_string(), None));
        } else if let Some(caps) = ANSWER_LINE.captures(line) {
            if let Some((_, answer)) = current.as_mut() {
                *answer = Some(caps[1].trim().to_string());
            }
        }
    }
    flush(&mut pairs, current);

    pairs
}

fn flush(pairs: &mut Vec<QaPair>, entry: Option<(String, Option<String>)>) {
    if let Some((question, Some(answer))) = entry {
        if question.is_empty() || answer.is_empty() {
            return;
        }
        pairs.push(QaPair::new(pairs.len() + 1, question, answer));
    }
}

// ── JSON question set loading ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QaFile {
    Bare(Vec<QaDefinition>),
    Wrapped {
        #[allow(dead_code)]
        #[serde(default)]
        description: Option<String>,
        questions: Vec<QaDefinition>,
    },
}

#[derive(Debug, Deserialize)]
struct QaDefinition {
    question: String,
    #[serde(alias = "standard_answer")]
    answer: String,
}

/// Load pairs from a JSON file: an array of `{question, answer}` objects,
/// or an object with such an array under `questions`
pub fn load_qa_pairs_from_json_file(path: impl AsRef<Path>) -> Result<Vec<QaPair>, LoadError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let file: QaFile = serde_json::from_str(&content)
        .map_err(|e| LoadError::Parse(format!("{}: {}", path.as_ref().display(), e)))?;

    let definitions = match file {
        QaFile::Bare(defs) => defs,
        QaFile::Wrapped { questions, .. } => questions,
    };

    Ok(definitions
        .into_iter()
        .enumerate()
        .map(|(i, def)| QaPair::new(i + 1, def.question.trim(), def.answer.trim()))
        .collect())
}

/// Load from either format, picking JSON by extension
pub fn load_qa_pairs(path: impl AsRef<Path>) -> Result<Vec<QaPair>, LoadError> {
    let path = path.as_ref();
    let pairs = if path.extension().map(|e| e == "json").unwrap_or(false) {
        load_qa_pairs_from_json_file(path)?
    } else {
        load_qa_pairs_from_file(path)?
    };
    tracing::info!("Loaded {} questions from {}", pairs.len(), path.display());
    Ok(pairs)
}

/// Parse an index list such as `1,2,5-9`
pub fn parse_indices(spec: &str) -> Result<Vec<usize>, LoadError> {
    let invalid = || LoadError::InvalidIndices(spec.to_string());
    let mut indices = Vec::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| invalid())?;
                let end: usize = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                indices.extend(start..=end);
            }
            None => indices.push(part.parse().map_err(|_| invalid())?),
        }
    }

    if indices.is_empty() {
        return Err(invalid());
    }
    Ok(indices)
}

/// Keep the requested 1-based indices, in the order requested
pub fn select_indices(pairs: &[QaPair], indices: &[usize]) -> Vec<QaPair> {
    let (valid, invalid): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| i >= 1 && i <= pairs.len());

    if !invalid.is_empty() {
        tracing::warn!(
            "Indices out of range (1-{}), skipped: {:?}",
            pairs.len(),
            invalid
        );
    }

    valid.into_iter().map(|i| pairs[i - 1].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1. 问题：2024年3月比亚迪的销量是多少？
答案：31140 辆

2. 问题：一汽大众和比亚迪3月销量分别是多少？
答案：一汽大众: 9533 辆, 比亚迪: 31140 辆

问题：没有答案的问题
问题: 2024年全年销量是多少？
答案：旧答案
答案: 4045 辆
";

    #[test]
    fn test_parse_answer_file() {
        let pairs = load_qa_pairs_from_str(SAMPLE);
        assert_eq!(pairs.len(), 3);

        assert_eq!(pairs[0].index, 1);
        assert_eq!(pairs[0].question, "2024年3月比亚迪的销量是多少？");
        assert_eq!(pairs[0].standard_answer, "31140 辆");

        assert_eq!(pairs[1].standard_answer, "一汽大众: 9533 辆, 比亚迪: 31140 辆");
    }

    #[test]
    fn test_unanswered_question_dropped_and_last_answer_wins() {
        let pairs = load_qa_pairs_from_str(SAMPLE);
        assert!(pairs.iter().all(|p| p.question != "没有答案的问题"));
        assert_eq!(pairs[2].index, 3);
        assert_eq!(pairs[2].question, "2024年全年销量是多少？");
        assert_eq!(pairs[2].standard_answer, "4045 辆");
    }

    #[test]
    fn test_answer_before_question_ignored() {
        let pairs = load_qa_pairs_from_str("答案：孤立的答案\n问题：Q\n答案：A\n");
        assert_eq!(pairs, vec![QaPair::new(1, "Q", "A")]);
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();

        let bare = dir.path().join("bare.json");
        std::fs::write(&bare, r#"[{"question": "Q1", "answer": " 12 "}, {"question": "Q2", "standard_answer": "B"}]"#).unwrap();
        let pairs = load_qa_pairs(&bare).unwrap();
        assert_eq!(pairs, vec![QaPair::new(1, "Q1", "12"), QaPair::new(2, "Q2", "B")]);

        let wrapped = dir.path().join("wrapped.json");
        std::fs::write(&wrapped, r#"{"description": "x", "questions": [{"question": "Q", "answer": "A"}]}"#).unwrap();
        assert_eq!(load_qa_pairs(&wrapped).unwrap().len(), 1);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        assert!(matches!(load_qa_pairs(&broken), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(parse_indices("1,2,5-7").unwrap(), vec![1, 2, 5, 6, 7]);
        assert_eq!(parse_indices(" 3 ").unwrap(), vec![3]);
        assert!(parse_indices("7-5").is_err());
        assert!(parse_indices("a").is_err());
        assert!(parse_indices("").is_err());
    }

    #[test]
    fn test_select_indices_keeps_order_and_skips_out_of_range() {
        let pairs = load_qa_pairs_from_str(SAMPLE);
        let selected = select_indices(&pairs, &[3, 0, 1, 99]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].index, 3);
        assert_eq!(selected[1].index, 1);
    }
}
