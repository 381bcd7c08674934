//! Core types for the answer oracle

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Absolute band, in percentage points, for two percentages to be equal.
pub const DEFAULT_PERCENTAGE_POINTS: f64 = 0.01;
/// Relative band for two plain numbers to be equal.
pub const DEFAULT_RELATIVE: f64 = 0.05;
/// Measure words for discrete items. A standard answer that attaches one of
/// these to an integer is compared exactly.
pub const DEFAULT_COUNT_UNITS: &[&str] = &["辆", "台", "个", "家", "款", "次", "人", "件"];

// =============================================================================
// Extracted values
// =============================================================================

/// A comparable value pulled out of a raw answer string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedValue {
    /// Magnitude of the first numeric token, without the `%` sign
    pub numeric: Option<f64>,
    /// Whether the numeric token carried a trailing `%`
    pub is_percentage: bool,
    /// The numeric token itself, or the whitespace-collapsed input
    pub text: String,
}

impl ExtractedValue {
    pub fn empty() -> Self {
        Self {
            numeric: None,
            is_percentage: false,
            text: String::new(),
        }
    }

    pub fn has_numeric(&self) -> bool {
        self.numeric.is_some()
    }
}

impl fmt::Display for ExtractedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.numeric {
            Some(n) if self.is_percentage => write!(f, "{}%", n),
            Some(n) => write!(f, "{}", n),
            None => write!(f, "'{}'", self.text),
        }
    }
}

/// One `name: value` segment of an entity-set answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    pub name: String,
    pub value: ExtractedValue,
}

/// One `period: value` segment of a time-series answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub period: String,
    pub value: ExtractedValue,
}

// =============================================================================
// Shapes and verdicts
// =============================================================================

/// Structural category of a canonical answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerShape {
    Percentage,
    ScalarNumeric,
    EntitySet,
    TimeSeries,
    FreeText,
}

impl AnswerShape {
    pub fn all() -> Vec<AnswerShape> {
        vec![
            AnswerShape::Percentage,
            AnswerShape::ScalarNumeric,
            AnswerShape::EntitySet,
            AnswerShape::TimeSeries,
            AnswerShape::FreeText,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerShape::Percentage => "percentage",
            AnswerShape::ScalarNumeric => "scalar_numeric",
            AnswerShape::EntitySet => "entity_set",
            AnswerShape::TimeSeries => "time_series",
            AnswerShape::FreeText => "free_text",
        }
    }
}

impl fmt::Display for AnswerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub matched: bool,
    /// One line naming the rule that fired and the values compared
    pub reason: String,
    /// `None` only when the empty-answer guard fired before classification
    pub shape: Option<AnswerShape>,
}

// =============================================================================
// Tolerances
// =============================================================================

/// Tolerance bands applied by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    #[serde(default = "default_percentage_points")]
    pub percentage_points: f64,
    #[serde(default = "default_relative")]
    pub relative: f64,
    #[serde(default = "default_count_units")]
    pub count_units: Vec<String>,
}

fn default_percentage_points() -> f64 { DEFAULT_PERCENTAGE_POINTS }
fn default_relative() -> f64 { DEFAULT_RELATIVE }
fn default_count_units() -> Vec<String> {
    DEFAULT_COUNT_UNITS.iter().map(|u| u.to_string()).collect()
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            percentage_points: default_percentage_points(),
            relative: default_relative(),
            count_units: default_count_units(),
        }
    }
}

impl Tolerances {
    pub fn with_percentage_points(mut self, points: f64) -> Self {
        self.percentage_points = points;
        self
    }

    pub fn with_relative(mut self, relative: f64) -> Self {
        self.relative = relative;
        self
    }

    pub fn with_count_units<I, S>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.count_units = units.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_extracted_value() {
        let pct = ExtractedValue {
            numeric: Some(-11.56),
            is_percentage: true,
            text: "-11.56%".to_string(),
        };
        assert_eq!(pct.to_string(), "-11.56%");

        let text = ExtractedValue {
            numeric: None,
            is_percentage: false,
            text: "比亚迪".to_string(),
        };
        assert_eq!(text.to_string(), "'比亚迪'");
    }

    #[test]
    fn test_default_tolerances() {
        let t = Tolerances::default();
        assert_eq!(t.percentage_points, 0.01);
        assert_eq!(t.relative, 0.05);
        assert!(t.count_units.iter().any(|u| u == "辆"));
    }

    #[test]
    fn test_shape_serde_names() {
        let json = serde_json::to_string(&AnswerShape::EntitySet).unwrap();
        assert_eq!(json, "\"entity_set\"");
    }
}
