//! Flow positions, field values and transition history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field's current input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Field values collected by a flow, keyed by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Text value of `key`, or `""` when absent or not text.
pub fn text_value<'a>(values: &'a FieldValues, key: &str) -> &'a str {
    values.get(key).and_then(FieldValue::as_text).unwrap_or("")
}

/// Where a flow is: on a step, or past the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowPosition {
    Step { index: usize },
    Completed,
}

impl FlowPosition {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for FlowPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step { index } => write!(f, "step {index}"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What caused a position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Advance,
    Retreat,
    Jump,
    Reopen,
    Reset,
}

/// A recorded position change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowTransition {
    pub from: FlowPosition,
    pub to: FlowPosition,
    pub kind: TransitionKind,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_untagged_serde() {
        let values: FieldValues = serde_json::from_str(
            r#"{"phone": "(+1) 234", "opt_in": true, "mood": 7}"#,
        )
        .unwrap();
        assert_eq!(values["phone"], FieldValue::from("(+1) 234"));
        assert_eq!(values["opt_in"].as_flag(), Some(true));
        assert_eq!(values["mood"].as_number(), Some(7.0));

        let json = serde_json::to_string(&FieldValue::from(false)).unwrap();
        assert_eq!(json, "false");
    }

    #[test]
    fn text_value_defaults_to_empty() {
        let mut values = FieldValues::new();
        values.insert("flag".to_string(), FieldValue::from(true));
        assert_eq!(text_value(&values, "missing"), "");
        assert_eq!(text_value(&values, "flag"), "");
    }

    #[test]
    fn position_serde() {
        let json = serde_json::to_value(FlowPosition::Step { index: 2 }).unwrap();
        assert_eq!(json["state"], "step");
        assert_eq!(json["index"], 2);

        let json = serde_json::to_value(FlowPosition::Completed).unwrap();
        assert_eq!(json["state"], "completed");
        assert!(FlowPosition::Completed.is_terminal());
    }
}
