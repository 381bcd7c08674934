//! Verdict explanations
//!
//! Every rule returns a [`Reason`]; its `Display` output is the audit string
//! persisted next to the verdict. Rendering is deterministic: no clocks, and
//! entities and periods are listed in standard-answer order.

use std::fmt;

use crate::types::AnswerShape;

/// Which input tripped the empty-answer guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Standard,
    Actual,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Standard => "standard",
            Side::Actual => "actual",
        }
    }
}

/// How a numeric pair was judged
#[derive(Debug, Clone, PartialEq)]
pub enum Band {
    /// Values are identical
    Exact,
    /// Relative band around the standard value
    Relative { delta: f64, tolerance: f64 },
    /// The standard counts discrete items, so only equality is accepted
    ExactCount { unit: String },
}

/// Outcome of the text rule
#[derive(Debug, Clone, PartialEq)]
pub enum TextCheck {
    Equal(String),
    Containment(String),
    Mismatch { standard: String, actual: String },
}

impl TextCheck {
    pub fn matched(&self) -> bool {
        !matches!(self, TextCheck::Mismatch { .. })
    }
}

impl fmt::Display for TextCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextCheck::Equal(text) => write!(f, "text match: equal '{}'", text),
            TextCheck::Containment(text) => write!(f, "text match: containment '{}'", text),
            TextCheck::Mismatch { standard, actual } => {
                write!(f, "text mismatch: '{}' vs '{}'", standard, actual)
            }
        }
    }
}

/// Outcome of comparing one pair of values
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCheck {
    Percentage {
        standard: f64,
        actual: f64,
        delta: f64,
        tolerance: f64,
    },
    Numeric {
        standard: f64,
        actual: f64,
        band: Band,
    },
    /// Numeric parsing failed on at least one side
    Text {
        from: AnswerShape,
        check: TextCheck,
    },
}

impl ValueCheck {
    pub fn matched(&self) -> bool {
        match self {
            ValueCheck::Percentage { delta, tolerance, .. } => delta <= tolerance,
            ValueCheck::Numeric { band, .. } => match band {
                Band::Exact => true,
                Band::Relative { delta, tolerance } => delta <= tolerance,
                Band::ExactCount { .. } => false,
            },
            ValueCheck::Text { check, .. } => check.matched(),
        }
    }

    /// Short `std vs act` form used inside entity and period listings
    pub fn compact(&self) -> String {
        match self {
            ValueCheck::Percentage { standard, actual, .. } => {
                format!("{}% vs {}%", standard, actual)
            }
            ValueCheck::Numeric { standard, actual, .. } => format!("{} vs {}", standard, actual),
            ValueCheck::Text { check, .. } => match check {
                TextCheck::Mismatch { standard, actual } => {
                    format!("'{}' vs '{}'", standard, actual)
                }
                TextCheck::Equal(text) | TextCheck::Containment(text) => format!("'{}'", text),
            },
        }
    }
}

impl fmt::Display for ValueCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.matched() { "match" } else { "mismatch" };
        match self {
            ValueCheck::Percentage {
                standard,
                actual,
                delta,
                tolerance,
            } => {
                let sep = if self.matched() { "≈" } else { "vs" };
                write!(
                    f,
                    "percentage {}: {}% {} {}% (Δ {}, tolerance {})",
                    verdict,
                    standard,
                    sep,
                    actual,
                    short(*delta),
                    short(*tolerance)
                )
            }
            ValueCheck::Numeric {
                standard,
                actual,
                band,
            } => match band {
                Band::Exact => write!(f, "numeric match: {} == {}", standard, actual),
                Band::Relative { delta, tolerance } => {
                    let sep = if self.matched() { "≈" } else { "vs" };
                    write!(
                        f,
                        "numeric {}: {} {} {} (Δ {}, tolerance {})",
                        verdict,
                        standard,
                        sep,
                        actual,
                        short(*delta),
                        short(*tolerance)
                    )
                }
                Band::ExactCount { unit } => write!(
                    f,
                    "numeric mismatch: {} vs {} (exact count required: {})",
                    standard, actual, unit
                ),
            },
            ValueCheck::Text { from, check } => {
                write!(f, "{} parse failed, {}", shape_word(*from), check)
            }
        }
    }
}

/// A problem with one entity of an entity-set answer
#[derive(Debug, Clone, PartialEq)]
pub enum EntityIssue {
    Missing(String),
    Value { name: String, check: ValueCheck },
}

impl fmt::Display for EntityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityIssue::Missing(name) => write!(f, "missing entity: {}", name),
            EntityIssue::Value { name, check } => write!(f, "{}: {}", name, check.compact()),
        }
    }
}

/// Why a comparison came out the way it did.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    EmptyAnswer(Side),
    Value(ValueCheck),
    EntitySet {
        total: usize,
        issues: Vec<EntityIssue>,
    },
    PeriodSequence {
        standard: Vec<String>,
        actual: Vec<String>,
    },
    TimeSeries {
        total: usize,
        issues: Vec<(String, ValueCheck)>,
    },
    SinglePoint {
        period: String,
        check: ValueCheck,
    },
    Text(TextCheck),
}

impl Reason {
    pub fn matched(&self) -> bool {
        match self {
            Reason::EmptyAnswer(_) => false,
            Reason::Value(check) => check.matched(),
            Reason::EntitySet { issues, .. } => issues.is_empty(),
            Reason::PeriodSequence { .. } => false,
            Reason::TimeSeries { issues, .. } => issues.is_empty(),
            Reason::SinglePoint { check, .. } => check.matched(),
            Reason::Text(check) => check.matched(),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::EmptyAnswer(side) => write!(f, "answer empty: {}", side.as_str()),
            Reason::Value(check) => write!(f, "{}", check),
            Reason::EntitySet { total, issues } if issues.is_empty() => {
                write!(f, "entity set match: {} entities", total)
            }
            Reason::EntitySet { issues, .. } => {
                write!(f, "entity set mismatch: {}", join(issues.iter().map(|i| i.to_string())))
            }
            Reason::PeriodSequence { standard, actual } => write!(
                f,
                "time series mismatch: period sequence [{}] vs [{}]",
                standard.join(", "),
                actual.join(", ")
            ),
            Reason::TimeSeries { total, issues } if issues.is_empty() => {
                write!(f, "time series match: {} periods", total)
            }
            Reason::TimeSeries { issues, .. } => write!(
                f,
                "time series mismatch: {}",
                join(issues.iter().map(|(period, check)| format!("{}: {}", period, check.compact())))
            ),
            Reason::SinglePoint { period, check } => {
                write!(f, "time series single point {}: {}", period, check)
            }
            Reason::Text(check) => write!(f, "{}", check),
        }
    }
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join("; ")
}

fn shape_word(shape: AnswerShape) -> &'static str {
    match shape {
        AnswerShape::Percentage => "percentage",
        AnswerShape::ScalarNumeric => "numeric",
        AnswerShape::EntitySet => "entity",
        AnswerShape::TimeSeries => "period",
        AnswerShape::FreeText => "text",
    }
}

/// Six decimals at most, trailing zeros dropped.
fn short(x: f64) -> String {
    let s = format!("{:.6}", x);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_number() {
        assert_eq!(short(5.0), "5");
        assert_eq!(short(202.25), "202.25");
        assert_eq!(short(1.0000000031741e-6), "0.000001");
        assert_eq!(short(-0.0000001), "0");
    }

    #[test]
    fn test_numeric_reasons() {
        let exact = ValueCheck::Numeric {
            standard: 4045.0,
            actual: 4045.0,
            band: Band::Exact,
        };
        assert_eq!(exact.to_string(), "numeric match: 4045 == 4045");

        let count = ValueCheck::Numeric {
            standard: 4045.0,
            actual: 4046.0,
            band: Band::ExactCount { unit: "辆".to_string() },
        };
        assert!(!count.matched());
        assert_eq!(
            count.to_string(),
            "numeric mismatch: 4045 vs 4046 (exact count required: 辆)"
        );
    }

    #[test]
    fn test_entity_reason_lists_missing() {
        let reason = Reason::EntitySet {
            total: 2,
            issues: vec![EntityIssue::Missing("一汽大众".to_string())],
        };
        assert!(!reason.matched());
        assert_eq!(reason.to_string(), "entity set mismatch: missing entity: 一汽大众");
    }

    #[test]
    fn test_fallback_reason_names_failed_shape() {
        let check = ValueCheck::Text {
            from: AnswerShape::ScalarNumeric,
            check: TextCheck::Equal("N/A".to_string()),
        };
        assert_eq!(check.to_string(), "numeric parse failed, text match: equal 'N/A'");
    }

    #[test]
    fn test_empty_reason() {
        assert_eq!(Reason::EmptyAnswer(Side::Actual).to_string(), "answer empty: actual");
    }
}
