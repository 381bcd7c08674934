//! Question category definitions

use serde::{Deserialize, Serialize};

/// Kind of data query a question asks for, judged from its wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    MonthlyBreakdown,
    Total,
    YearOverYear,
    MonthOverMonth,
    Ranking,
    NullAnswer,
    PointLookup,
}

/// First matching rule wins
const RULES: &[(QuestionCategory, &[&str])] = &[
    (QuestionCategory::MonthlyBreakdown, &["每个月", "每个", "各月"]),
    (QuestionCategory::Total, &["总销量", "销量总和", "全年"]),
    (QuestionCategory::YearOverYear, &["同比", "增长"]),
    (QuestionCategory::MonthOverMonth, &["环比"]),
    (QuestionCategory::Ranking, &["对比", "哪个", "最高", "最低"]),
    (QuestionCategory::NullAnswer, &["null"]),
];

impl QuestionCategory {
    pub fn all() -> Vec<QuestionCategory> {
        vec![
            QuestionCategory::MonthlyBreakdown,
            QuestionCategory::Total,
            QuestionCategory::YearOverYear,
            QuestionCategory::MonthOverMonth,
            QuestionCategory::Ranking,
            QuestionCategory::NullAnswer,
            QuestionCategory::PointLookup,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::MonthlyBreakdown => "monthly_breakdown",
            QuestionCategory::Total => "total",
            QuestionCategory::YearOverYear => "year_over_year",
            QuestionCategory::MonthOverMonth => "month_over_month",
            QuestionCategory::Ranking => "ranking",
            QuestionCategory::NullAnswer => "null_answer",
            QuestionCategory::PointLookup => "point_lookup",
        }
    }

    /// Categorize a question by keyword
    pub fn classify(question: &str) -> Self {
        let lowered = question.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(QuestionCategory::PointLookup)
    }
}

impl std::str::FromStr for QuestionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionCategory::all()
            .into_iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown question category: {}", s))
    }
}

impl std::fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
