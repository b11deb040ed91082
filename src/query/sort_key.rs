//! Translation of relational comparisons on one sort-capable attribute into
//! native range conditions.
//!
//! Every usable qualifier yields a candidate; the planner decides which one
//! to keep. Qualifiers that cannot be expressed natively are dropped here and
//! never reported to the caller.

use crate::query::condition::{ComparisonOperator, KeyCondition};
use crate::query::qualifier::{Operator, Qualifier};
use crate::query::topology::KeyField;
use crate::query::value::Value;

/// A translated native condition and its normalized strength.
#[derive(Clone, Debug, PartialEq)]
pub struct SortKeyCandidate {
    /// Native condition on the field's physical attribute.
    pub condition: KeyCondition,
    /// `strength / 7`, in `(0, 1]`.
    pub score: f64,
}

impl SortKeyCandidate {
    fn new(condition: KeyCondition) -> Self {
        let score = condition.comparison_operator.score();
        Self { condition, score }
    }
}

/// Emits every native condition the qualifiers on `field` can be expressed as.
///
/// An operator used more than once on the field conflicts with itself and is
/// skipped. Any two `=`/`LIKE` qualifiers on the field conflict with each
/// other, so neither yields a candidate; range operators are unaffected. `BETWEEN` is synthesized only from exactly one `>=` and exactly
/// one `<=`, in addition to the individual candidates.
pub fn sort_key_candidates(quals: &[Qualifier], field: &KeyField) -> Vec<SortKeyCandidate> {
    let on_field: Vec<&Qualifier> = quals
        .iter()
        .filter(|qual| qual.field == field.logical_name)
        .collect();

    let occurrences = |op: Operator| on_field.iter().filter(|q| q.operator == op).count();
    // `=` and `LIKE` each pin the key to one point or prefix; two of them
    // cannot share a single native condition.
    let point_conflict = occurrences(Operator::Eq) + occurrences(Operator::Like) > 1;

    let mut candidates = Vec::new();
    for qual in &on_field {
        if occurrences(qual.operator) != 1 {
            continue;
        }
        if point_conflict && matches!(qual.operator, Operator::Eq | Operator::Like) {
            continue;
        }
        let Some(value) = qual.scalar() else {
            continue;
        };
        match qual.operator {
            Operator::Like => {
                if let Some(prefix) = value.as_str().and_then(like_prefix) {
                    candidates.push(SortKeyCandidate::new(KeyCondition::new(
                        ComparisonOperator::BeginsWith,
                        Value::String(prefix),
                    )));
                }
            }
            op => {
                if let Some(native) = ComparisonOperator::from_operator(op) {
                    candidates.push(SortKeyCandidate::new(KeyCondition::new(
                        native,
                        value.clone(),
                    )));
                }
            }
        }
    }

    let single = |op: Operator| {
        let mut matching = on_field.iter().filter(|q| q.operator == op);
        match (matching.next(), matching.next()) {
            (Some(qual), None) => qual.scalar(),
            _ => None,
        }
    };
    if let (Some(low), Some(high)) = (single(Operator::Ge), single(Operator::Le)) {
        candidates.push(SortKeyCandidate::new(KeyCondition::between(
            low.clone(),
            high.clone(),
        )));
    }

    candidates
}

/// Converts a `LIKE` pattern into a begins-with prefix.
///
/// The pattern qualifies only when its only unescaped wildcard is a single
/// trailing `%`. `\%`, `\_` and `\\` stand for the literal character; a
/// backslash before anything else is kept as is. A bare `%` has no useful
/// prefix.
pub fn like_prefix(pattern: &str) -> Option<String> {
    let mut prefix = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&escaped @ ('%' | '_' | '\\')) => {
                    prefix.push(escaped);
                    chars.next();
                }
                _ => prefix.push('\\'),
            },
            '%' if chars.peek().is_none() => {
                return (!prefix.is_empty()).then_some(prefix);
            }
            '%' | '_' => return None,
            other => prefix.push(other),
        }
    }
    None
}
