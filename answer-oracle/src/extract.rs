//! Value extraction and segment parsing
//!
//! Everything here is a pure function of its input. Extraction never fails:
//! a numeric token that cannot be turned into a finite `f64` simply leaves
//! `numeric` empty and the caller degrades to text comparison.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ExtractedValue;

/// Optional sign, digits, optional decimal part, optional percent sign
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]*)?[%％]?").unwrap());

static WHOLE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(?:\.[0-9]*)?[%％]?$").unwrap());

static PERIOD_LABELS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{1,2}\s*月份?$",
        r"^\d{4}\s*年(?:\s*\d{1,2}\s*月份?)?$",
        r"^\d{4}[-/.]\d{1,2}$",
        r"^(?:\d{4}\s*)?[Qq][1-4]$",
        r"^(?:\d{4}\s*年)?第?[一二三四1-4]季度$",
        r"^[上下]半年$",
        r"(?i)^(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?(?:\s+\d{4})?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const SEGMENT_SEPARATORS: &[char] = &[',', ';', '，', '；'];
const LABEL_SEPARATORS: &[char] = &[':', '：'];

/// A numeric token that could not become a finite number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseFailure {
    #[error("no numeric token in '{0}'")]
    NoNumber(String),

    #[error("numeric token '{0}' is not a finite number")]
    NotFinite(String),
}

/// Extract the first comparable value from a raw answer.
pub fn extract(raw: &str) -> ExtractedValue {
    if raw.trim().is_empty() {
        return ExtractedValue::empty();
    }

    match NUMBER.find(raw) {
        Some(token) => {
            let text = token.as_str().to_string();
            let is_percentage = text.ends_with('%') || text.ends_with('％');
            let numeric = parse_token(&text).ok();
            ExtractedValue {
                numeric,
                is_percentage,
                text,
            }
        }
        None => ExtractedValue {
            numeric: None,
            is_percentage: false,
            text: collapse_whitespace(raw),
        },
    }
}

/// The first percentage-bearing token of a raw answer, skipping plain
/// numbers such as the digits of a `1月` label.
pub fn extract_percentage(raw: &str) -> Option<ExtractedValue> {
    NUMBER
        .find_iter(raw)
        .map(|token| token.as_str())
        .find(|text| text.ends_with('%') || text.ends_with('％'))
        .map(|text| ExtractedValue {
            numeric: parse_token(text).ok(),
            is_percentage: true,
            text: text.to_string(),
        })
}

/// Numeric magnitude of an extracted value, or why there is none.
pub fn numeric_of(value: &ExtractedValue) -> Result<f64, ParseFailure> {
    match value.numeric {
        Some(n) => Ok(n),
        None if NUMBER.is_match(&value.text) => Err(ParseFailure::NotFinite(value.text.clone())),
        None => Err(ParseFailure::NoNumber(value.text.clone())),
    }
}

fn parse_token(token: &str) -> Result<f64, ParseFailure> {
    let digits = token
        .trim_end_matches(['%', '％'])
        .trim_end_matches('.');
    match digits.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ParseFailure::NotFinite(token.to_string())),
    }
}

/// Collapse whitespace runs to single spaces and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split an answer on `,` / `;` (ASCII or full-width), dropping empty pieces.
pub fn split_segments(raw: &str) -> Vec<&str> {
    raw.split(SEGMENT_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a `label: value` segment at its first colon.
pub fn parse_segment(segment: &str) -> Option<(String, &str)> {
    let (label, value) = segment.split_once(LABEL_SEPARATORS)?;
    let label = collapse_whitespace(label);
    let value = value.trim();
    if label.is_empty() || value.is_empty() {
        return None;
    }
    Some((label, value))
}

/// All `label: value` pairs of an answer, in source order.
pub fn labelled_segments(raw: &str) -> Vec<(String, &str)> {
    split_segments(raw)
        .into_iter()
        .filter_map(parse_segment)
        .collect()
}

/// Whether a label is a short period token such as `3月`, `Q2` or `2024年`.
pub fn is_period_label(label: &str) -> bool {
    let label = label.trim();
    PERIOD_LABELS.iter().any(|re| re.is_match(label))
}

/// Whether a label is a bare number rather than a name.
pub fn is_numeric_label(label: &str) -> bool {
    WHOLE_NUMBER.is_match(label.trim())
}

/// The count unit attached to the first number of `raw`, if that number is
/// an integer and is directly followed by one of `units`.
pub fn count_unit<'a>(raw: &str, units: &'a [String]) -> Option<&'a str> {
    let token = NUMBER.find(raw)?;
    let text = token.as_str();
    if text.contains('.') || text.ends_with('%') || text.ends_with('％') {
        return None;
    }
    let rest = raw[token.end()..].trim_start();
    units
        .iter()
        .find(|unit| !unit.is_empty() && rest.starts_with(unit.as_str()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_percentage_skips_label_digits() {
        let v = extract_percentage("1月: 5%; 2月: 6%").unwrap();
        assert_eq!(v.numeric, Some(5.0));
        assert_eq!(v.text, "5%");
        assert_eq!(extract_percentage("同比 -3.5％").unwrap().numeric, Some(-3.5));
        assert_eq!(extract_percentage("1月: 5"), None);
    }

    #[test]
    fn test_extract_plain_number_with_unit() {
        let v = extract("4045 辆");
        assert_eq!(v.numeric, Some(4045.0));
        assert!(!v.is_percentage);
        assert_eq!(v.text, "4045");
    }

    #[test]
    fn test_extract_percentage() {
        let v = extract("同比增长 -11.56%");
        assert_eq!(v.numeric, Some(-11.56));
        assert!(v.is_percentage);
        assert_eq!(v.text, "-11.56%");
    }

    #[test]
    fn test_extract_first_token_wins() {
        let v = extract("3月销量为 7370 辆");
        assert_eq!(v.numeric, Some(3.0));
    }

    #[test]
    fn test_extract_trailing_dot() {
        let v = extract("总计 4045. 辆");
        assert_eq!(v.numeric, Some(4045.0));
        assert_eq!(v.text, "4045.");
    }

    #[test]
    fn test_extract_text_fallback() {
        let v = extract("  比亚迪   最高 \n");
        assert_eq!(v.numeric, None);
        assert_eq!(v.text, "比亚迪 最高");
    }

    #[test]
    fn test_extract_empty() {
        assert_eq!(extract(""), ExtractedValue::empty());
        assert_eq!(extract("   "), ExtractedValue::empty());
    }

    #[test]
    fn test_extract_overflow_is_not_numeric() {
        let huge = "9".repeat(400);
        let v = extract(&huge);
        assert_eq!(v.numeric, None);
        assert_eq!(v.text, huge);
        assert!(matches!(numeric_of(&v), Err(ParseFailure::NotFinite(_))));
    }

    #[test]
    fn test_extract_is_idempotent() {
        for raw in ["4045 辆", "-37.619421%", "比亚迪  最高", "", "1月: 4890辆"] {
            let once = extract(raw);
            assert_eq!(extract(&once.text), once, "input {:?}", raw);
        }
    }

    #[test]
    fn test_split_segments_mixed_separators() {
        let segs = split_segments("一汽大众: 9533 辆，比亚迪: 31140 辆; ;");
        assert_eq!(segs, vec!["一汽大众: 9533 辆", "比亚迪: 31140 辆"]);
    }

    #[test]
    fn test_parse_segment_fullwidth_colon() {
        let (label, value) = parse_segment("比亚迪：31140 辆").unwrap();
        assert_eq!(label, "比亚迪");
        assert_eq!(value, "31140 辆");
        assert!(parse_segment("no colon here").is_none());
        assert!(parse_segment(": 12").is_none());
    }

    #[test]
    fn test_period_labels() {
        for label in ["1月", "12月份", "2024年", "2024年3月", "2024-03", "Q3", "2024Q1", "第二季度", "Jan", "March 2024"] {
            assert!(is_period_label(label), "{} should be a period", label);
        }
        for label in ["比亚迪", "一汽大众", "Model 3", "Mayor", "A"] {
            assert!(!is_period_label(label), "{} should not be a period", label);
        }
    }

    #[test]
    fn test_numeric_label() {
        assert!(is_numeric_label("2024"));
        assert!(is_numeric_label("12.5%"));
        assert!(!is_numeric_label("Model 3"));
    }

    #[test]
    fn test_count_unit() {
        let units: Vec<String> = vec!["辆".into(), "台".into()];
        assert_eq!(count_unit("4045 辆", &units), Some("辆"));
        assert_eq!(count_unit("4045辆", &units), Some("辆"));
        assert_eq!(count_unit("4045", &units), None);
        assert_eq!(count_unit("40.5 辆", &units), None);
        assert_eq!(count_unit("4045 万元", &units), None);
    }
}
