//! The store's native key-condition vocabulary.
//!
//! These types are the payload of a Query operation and are also what the
//! plan trace prints, so their serialized form mirrors the store's request
//! shape (`KeyConditions`, `ComparisonOperator`, `AttributeValueList`) with
//! keys in sorted order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::qualifier::{Operator, Qualifier};
use crate::query::value::Value;

/// Native range-condition operator usable on key attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    /// Exact match.
    Eq,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// String prefix match.
    BeginsWith,
    /// Inclusive range `[low, high]`.
    Between,
}

impl ComparisonOperator {
    /// Fixed operator strength used to rank sort-key refinements.
    pub fn strength(self) -> u8 {
        match self {
            ComparisonOperator::Eq => 7,
            ComparisonOperator::Between => 6,
            ComparisonOperator::BeginsWith => 5,
            ComparisonOperator::Lt => 4,
            ComparisonOperator::Gt => 3,
            ComparisonOperator::Le => 2,
            ComparisonOperator::Ge => 1,
        }
    }

    /// Strength normalized to `(0, 1]`.
    pub fn score(self) -> f64 {
        f64::from(self.strength()) / 7.0
    }

    /// Maps a scalar relational operator onto its native equivalent.
    /// `LIKE` and `IN` have no direct mapping.
    pub fn from_operator(op: Operator) -> Option<Self> {
        match op {
            Operator::Eq => Some(ComparisonOperator::Eq),
            Operator::Lt => Some(ComparisonOperator::Lt),
            Operator::Le => Some(ComparisonOperator::Le),
            Operator::Gt => Some(ComparisonOperator::Gt),
            Operator::Ge => Some(ComparisonOperator::Ge),
            Operator::Like | Operator::In => None,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparisonOperator::Eq => "EQ",
            ComparisonOperator::Lt => "LT",
            ComparisonOperator::Le => "LE",
            ComparisonOperator::Gt => "GT",
            ComparisonOperator::Ge => "GE",
            ComparisonOperator::BeginsWith => "BEGINS_WITH",
            ComparisonOperator::Between => "BETWEEN",
        };
        f.write_str(name)
    }
}

/// One native condition on a key attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyCondition {
    /// Operands: one value, or two for `BETWEEN`.
    pub attribute_value_list: Vec<Value>,
    /// Native operator.
    pub comparison_operator: ComparisonOperator,
}

impl KeyCondition {
    /// Single-operand condition.
    pub fn new(comparison_operator: ComparisonOperator, value: Value) -> Self {
        Self {
            attribute_value_list: vec![value],
            comparison_operator,
        }
    }

    /// Exact match.
    pub fn eq(value: Value) -> Self {
        Self::new(ComparisonOperator::Eq, value)
    }

    /// Inclusive range.
    pub fn between(low: Value, high: Value) -> Self {
        Self {
            attribute_value_list: vec![low, high],
            comparison_operator: ComparisonOperator::Between,
        }
    }

    /// Renders the condition as a relational predicate over `column`.
    pub fn describe(&self, column: &str) -> String {
        let operand = |idx: usize| {
            self.attribute_value_list
                .get(idx)
                .map(Value::to_literal)
                .unwrap_or_else(|| "?".to_owned())
        };
        match self.comparison_operator {
            ComparisonOperator::Eq => format!("{column} = {}", operand(0)),
            ComparisonOperator::Lt => format!("{column} < {}", operand(0)),
            ComparisonOperator::Le => format!("{column} <= {}", operand(0)),
            ComparisonOperator::Gt => format!("{column} > {}", operand(0)),
            ComparisonOperator::Ge => format!("{column} >= {}", operand(0)),
            ComparisonOperator::BeginsWith => {
                let prefix = match self.attribute_value_list.first() {
                    Some(Value::String(s)) => escape_like(s),
                    Some(other) => other.to_string(),
                    None => "?".to_owned(),
                };
                format!("{column} LIKE '{}%'", prefix.replace('\'', "''"))
            }
            ComparisonOperator::Between => {
                format!("{column} BETWEEN {} AND {}", operand(0), operand(1))
            }
        }
    }

    /// Qualifiers equivalent to this condition over `column`.
    pub fn to_qualifiers(&self, column: &str) -> Vec<Qualifier> {
        let values = &self.attribute_value_list;
        match self.comparison_operator {
            ComparisonOperator::Between => match values.as_slice() {
                [low, high] => vec![
                    Qualifier::new(column, Operator::Ge, low.clone()),
                    Qualifier::new(column, Operator::Le, high.clone()),
                ],
                _ => Vec::new(),
            },
            ComparisonOperator::BeginsWith => match values.first() {
                Some(Value::String(prefix)) => {
                    vec![Qualifier::like(column, format!("{}%", escape_like(prefix)))]
                }
                _ => Vec::new(),
            },
            op => {
                let operator = match op {
                    ComparisonOperator::Eq => Operator::Eq,
                    ComparisonOperator::Lt => Operator::Lt,
                    ComparisonOperator::Le => Operator::Le,
                    ComparisonOperator::Gt => Operator::Gt,
                    _ => Operator::Ge,
                };
                values
                    .first()
                    .map(|value| vec![Qualifier::new(column, operator, value.clone())])
                    .unwrap_or_default()
            }
        }
    }

    /// Evaluates the condition against an attribute value.
    pub fn matches(&self, value: &Value) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        let first = match self.attribute_value_list.first() {
            Some(first) => first,
            None => return false,
        };
        match self.comparison_operator {
            ComparisonOperator::Eq => value == first || value.compare(first) == Some(Equal),
            ComparisonOperator::Lt => value.compare(first) == Some(Less),
            ComparisonOperator::Le => matches!(value.compare(first), Some(Less | Equal)),
            ComparisonOperator::Gt => value.compare(first) == Some(Greater),
            ComparisonOperator::Ge => matches!(value.compare(first), Some(Greater | Equal)),
            ComparisonOperator::BeginsWith => match (value, first) {
                (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            ComparisonOperator::Between => {
                let Some(high) = self.attribute_value_list.get(1) else {
                    return false;
                };
                matches!(value.compare(first), Some(Greater | Equal))
                    && matches!(value.compare(high), Some(Less | Equal))
            }
        }
    }
}

fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parameters of one Query operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryParams {
    /// Index to read instead of the base table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Conditions keyed by physical attribute name.
    #[serde(default)]
    pub key_conditions: BTreeMap<String, KeyCondition>,
}

impl QueryParams {
    /// Adds (or replaces) the condition on `attr`.
    pub fn with_condition(mut self, attr: impl Into<String>, condition: KeyCondition) -> Self {
        self.key_conditions.insert(attr.into(), condition);
        self
    }

    /// Targets a secondary index.
    pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Pretty JSON payload, as printed by the plan trace.
    pub fn to_trace_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| format!("<unprintable: {err}>"))
    }
}
