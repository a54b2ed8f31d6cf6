//! Observation templates and typed observation records

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Kind of an observation
///
/// Template catalogs spell the kind as a free-form string; `boolean` and
/// `numeric` are recognized and everything else is treated as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    #[serde(alias = "number")]
    Numeric,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(other)]
    Text,
}

/// Observation value; the variant is the record's kind
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationValue {
    Numeric(f64),
    Boolean(bool),
    Text(String),
}

impl ObservationValue {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::Numeric(_) => ObservationKind::Numeric,
            Self::Boolean(_) => ObservationKind::Boolean,
            Self::Text(_) => ObservationKind::Text,
        }
    }

    /// JSON form stored in the document
    ///
    /// Integral numbers are written without a fractional part, so `42.0`
    /// is stored as `42`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Numeric(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::from(*n as i64)
            }
            Self::Numeric(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    fn is_materializable(&self) -> bool {
        match self {
            Self::Numeric(n) => n.is_finite(),
            Self::Boolean(_) => true,
            Self::Text(s) => !s.is_empty(),
        }
    }
}

/// One typed observation about an image
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    name: String,
    value: ObservationValue,
}

impl ObservationRecord {
    /// Returns `None` for an empty name, empty text, or a non-finite number
    pub fn new(name: impl Into<String>, value: ObservationValue) -> Option<Self> {
        let name = name.into();
        if name.is_empty() || !value.is_materializable() {
            return None;
        }
        Some(Self { name, value })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObservationKind {
        self.value.kind()
    }

    pub fn value(&self) -> &ObservationValue {
        &self.value
    }
}

/// Template catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: ObservationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}
