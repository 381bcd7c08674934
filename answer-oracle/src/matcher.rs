//! Shape-specific equivalence rules
//!
//! Each [`AnswerShape`] maps to exactly one rule. Rules never fail: a numeric
//! path that cannot parse falls back to the text rule for that pair.

use indexmap::IndexMap;

use crate::classify::structure;
use crate::extract::{
    collapse_whitespace, count_unit, extract, extract_percentage, is_numeric_label,
    is_period_label, labelled_segments, numeric_of,
};
use crate::reason::{Band, EntityIssue, Reason, TextCheck, ValueCheck};
use crate::types::{AnswerShape, EntityValue, ExtractedValue, TimePoint, Tolerances};

/// A rule takes both raw answers and produces the reason for its verdict.
pub type Rule = fn(&Tolerances, &str, &str) -> Reason;

/// Look up the rule for a shape.
pub fn rule_for(shape: AnswerShape) -> Rule {
    match shape {
        AnswerShape::Percentage => match_percentage,
        AnswerShape::ScalarNumeric => match_scalar,
        AnswerShape::EntitySet => match_entity_set,
        AnswerShape::TimeSeries => match_time_series,
        AnswerShape::FreeText => match_free_text,
    }
}

// =============================================================================
// Whole-answer rules
// =============================================================================

/// Labelled percentage answers are compared entity by entity or period by
/// period; otherwise the first percentage of each side is compared.
fn match_percentage(tol: &Tolerances, standard: &str, actual: &str) -> Reason {
    match structure(standard) {
        Some(AnswerShape::EntitySet) => return match_entity_set(tol, standard, actual),
        Some(AnswerShape::TimeSeries) => return match_time_series(tol, standard, actual),
        _ => {}
    }

    match (extract_percentage(standard), extract_percentage(actual)) {
        (Some(std_value), Some(act_value)) => {
            Reason::Value(check_percentage(tol, &std_value, &act_value, standard, actual))
        }
        _ => {
            tracing::debug!("no percentage token on one side, comparing as text");
            Reason::Value(ValueCheck::Text {
                from: AnswerShape::Percentage,
                check: check_text(standard, actual),
            })
        }
    }
}

fn match_scalar(tol: &Tolerances, standard: &str, actual: &str) -> Reason {
    let std_value = extract(standard);
    let act_value = extract(actual);
    Reason::Value(check_numeric(tol, &std_value, &act_value, standard, actual))
}

fn match_free_text(_tol: &Tolerances, standard: &str, actual: &str) -> Reason {
    Reason::Text(check_text(standard, actual))
}

fn match_entity_set(tol: &Tolerances, standard: &str, actual: &str) -> Reason {
    let std_entities = entity_map(standard);
    let act_entities = entity_map(actual);

    let mut issues = Vec::new();
    for (key, (entity, std_raw)) in &std_entities {
        match act_entities.get(key) {
            None => issues.push(EntityIssue::Missing(entity.name.clone())),
            Some((act_entity, act_raw)) => {
                let check = check_value(tol, &entity.value, &act_entity.value, std_raw, act_raw);
                if !check.matched() {
                    issues.push(EntityIssue::Value {
                        name: entity.name.clone(),
                        check,
                    });
                }
            }
        }
    }

    Reason::EntitySet {
        total: std_entities.len(),
        issues,
    }
}

fn match_time_series(tol: &Tolerances, standard: &str, actual: &str) -> Reason {
    let std_points = period_map(standard);
    let act_points = period_map(actual);

    if std_points.len() == 1 && act_points.is_empty() {
        if let Some((point, std_raw)) = std_points.values().next() {
            let act_value = extract(actual);
            return Reason::SinglePoint {
                period: point.period.clone(),
                check: check_value(tol, &point.value, &act_value, std_raw, actual),
            };
        }
    }

    if !std_points.keys().eq(act_points.keys()) {
        return Reason::PeriodSequence {
            standard: std_points.values().map(|(p, _)| p.period.clone()).collect(),
            actual: act_points.values().map(|(p, _)| p.period.clone()).collect(),
        };
    }

    let issues = std_points
        .values()
        .zip(act_points.values())
        .filter_map(|((std_point, std_raw), (act_point, act_raw))| {
            let check = check_value(tol, &std_point.value, &act_point.value, std_raw, act_raw);
            (!check.matched()).then(|| (std_point.period.clone(), check))
        })
        .collect();

    Reason::TimeSeries {
        total: std_points.len(),
        issues,
    }
}

// =============================================================================
// Structured parsing
// =============================================================================

/// Entities keyed by a normalized name; a repeated name keeps its first
/// position and its last value.
fn entity_map(raw: &str) -> IndexMap<String, (EntityValue, &str)> {
    let mut entities = IndexMap::new();
    for (name, value) in labelled_segments(raw) {
        if is_numeric_label(&name) || is_period_label(&name) {
            continue;
        }
        let entity = EntityValue {
            value: extract(value),
            name: name.clone(),
        };
        entities.insert(name.to_lowercase(), (entity, value));
    }
    entities
}

/// Period-labelled points in source order, keyed by the label without spaces.
fn period_map(raw: &str) -> IndexMap<String, (TimePoint, &str)> {
    let mut points = IndexMap::new();
    for (period, value) in labelled_segments(raw) {
        if !is_period_label(&period) {
            continue;
        }
        let key: String = period.chars().filter(|c| !c.is_whitespace()).collect();
        let point = TimePoint {
            value: extract(value),
            period,
        };
        points.insert(key.to_lowercase(), (point, value));
    }
    points
}

// =============================================================================
// Pair checks
// =============================================================================

/// Percentage band when both values are percentages, scalar band otherwise.
fn check_value(
    tol: &Tolerances,
    std_value: &ExtractedValue,
    act_value: &ExtractedValue,
    std_raw: &str,
    act_raw: &str,
) -> ValueCheck {
    if std_value.is_percentage && act_value.is_percentage {
        check_percentage(tol, std_value, act_value, std_raw, act_raw)
    } else {
        check_numeric(tol, std_value, act_value, std_raw, act_raw)
    }
}

fn check_percentage(
    tol: &Tolerances,
    std_value: &ExtractedValue,
    act_value: &ExtractedValue,
    std_raw: &str,
    act_raw: &str,
) -> ValueCheck {
    let (standard, actual) = match (numeric_of(std_value), numeric_of(act_value)) {
        (Ok(s), Ok(a)) => (s, a),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "percentage parse failed, comparing as text");
            return ValueCheck::Text {
                from: AnswerShape::Percentage,
                check: check_text(std_raw, act_raw),
            };
        }
    };

    ValueCheck::Percentage {
        standard,
        actual,
        delta: (standard - actual).abs(),
        tolerance: tol.percentage_points,
    }
}

fn check_numeric(
    tol: &Tolerances,
    std_value: &ExtractedValue,
    act_value: &ExtractedValue,
    std_raw: &str,
    act_raw: &str,
) -> ValueCheck {
    let (standard, actual) = match (numeric_of(std_value), numeric_of(act_value)) {
        (Ok(s), Ok(a)) => (s, a),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!(error = %e, "numeric parse failed, comparing as text");
            return ValueCheck::Text {
                from: AnswerShape::ScalarNumeric,
                check: check_text(std_raw, act_raw),
            };
        }
    };

    let band = if standard == actual {
        Band::Exact
    } else if let Some(unit) = count_unit(std_raw, &tol.count_units) {
        Band::ExactCount {
            unit: unit.to_string(),
        }
    } else {
        Band::Relative {
            delta: (standard - actual).abs(),
            tolerance: standard.abs() * tol.relative,
        }
    };

    ValueCheck::Numeric {
        standard,
        actual,
        band,
    }
}

/// Equality of extracted text, or containment of one side's extracted text
/// in the other side's raw answer.
fn check_text(standard: &str, actual: &str) -> TextCheck {
    let std_text = text_of(standard);
    let act_text = text_of(actual);

    if std_text == act_text {
        TextCheck::Equal(std_text)
    } else if !std_text.is_empty() && actual.contains(&std_text) {
        TextCheck::Containment(std_text)
    } else if !act_text.is_empty() && standard.contains(&act_text) {
        TextCheck::Containment(act_text)
    } else {
        TextCheck::Mismatch {
            standard: std_text,
            actual: act_text,
        }
    }
}

fn text_of(raw: &str) -> String {
    let value = extract(raw);
    if value.text.is_empty() {
        collapse_whitespace(raw)
    } else {
        value.text
    }
}
