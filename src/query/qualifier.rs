//! Normalized relational filter qualifiers handed in by the host for one fetch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::value::Value;

/// Relational comparison operator carried by a [`Qualifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `LIKE` (the host's `~~`).
    #[serde(rename = "LIKE", alias = "~~")]
    Like,
    /// `IN (...)`
    #[serde(rename = "IN")]
    In,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a qualifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QualValue {
    /// Value set, as produced by `IN (...)` or `= ANY(...)`.
    Set(Vec<Value>),
    /// Single value. May be [`Value::Null`].
    Scalar(Value),
}

/// One relational filter condition: `field <operator> value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    /// Logical column name.
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Compared value or value set.
    pub value: QualValue,
}

impl Qualifier {
    /// Builds a scalar qualifier.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: QualValue::Scalar(value.into()),
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// `field LIKE pattern`
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, Operator::Like, Value::String(pattern.into()))
    }

    /// `field IN (values...)`
    pub fn in_set<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            field: field.into(),
            operator: Operator::In,
            value: QualValue::Set(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Scalar right-hand side, if this is not a set qualifier.
    pub fn scalar(&self) -> Option<&Value> {
        match &self.value {
            QualValue::Scalar(value) => Some(value),
            QualValue::Set(_) => None,
        }
    }

    /// Value set of a multi-valued equality (`IN` or `= ANY`).
    pub fn multi_values(&self) -> Option<&[Value]> {
        match (&self.value, self.operator) {
            (QualValue::Set(values), Operator::Eq | Operator::In) => Some(values),
            _ => None,
        }
    }

    /// Scalar right-hand side of an exact equality. `IN` with a scalar counts.
    pub fn exact_value(&self) -> Option<&Value> {
        match self.operator {
            Operator::Eq | Operator::In => self.scalar(),
            _ => None,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            QualValue::Scalar(value) => {
                write!(f, "{} {} {}", self.field, self.operator, value.to_literal())
            }
            QualValue::Set(values) => {
                let rendered: Vec<String> = values.iter().map(Value::to_literal).collect();
                write!(f, "{} {} ({})", self.field, self.operator, rendered.join(", "))
            }
        }
    }
}

/// First multi-valued equality on `field`.
pub(crate) fn find_multi_values<'a>(quals: &'a [Qualifier], field: &str) -> Option<&'a [Value]> {
    quals
        .iter()
        .filter(|qual| qual.field == field)
        .find_map(Qualifier::multi_values)
}

/// First exact equality value on `field`. `Some(&Value::Null)` is a real match
/// on null; `None` means the field carries no usable equality.
pub(crate) fn find_exact_value<'a>(quals: &'a [Qualifier], field: &str) -> Option<&'a Value> {
    quals
        .iter()
        .filter(|qual| qual.field == field)
        .find_map(Qualifier::exact_value)
}
