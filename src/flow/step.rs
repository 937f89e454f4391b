//! Steps and per-step validation.

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::state::FieldValues;

/// Stable identifier of a step, unique within its flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StepId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Outcome of running a step's validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepCheck {
    Valid,
    Invalid { reason: String },
}

impl StepCheck {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// `Valid` when `ok`, otherwise `Invalid` with the given reason.
    pub fn require(ok: bool, reason: impl Into<String>) -> Self {
        if ok {
            Self::Valid
        } else {
            Self::invalid(reason)
        }
    }
}

/// Decides whether a step's fields are acceptable.
///
/// Closures of the form `Fn(&FieldValues) -> StepCheck` implement this.
pub trait StepValidator: Send + Sync {
    fn validate(&self, values: &FieldValues) -> StepCheck;
}

impl<F> StepValidator for F
where
    F: Fn(&FieldValues) -> StepCheck + Send + Sync,
{
    fn validate(&self, values: &FieldValues) -> StepCheck {
        self(values)
    }
}

/// One screen of a guided flow.
#[derive(Clone)]
pub struct Step {
    id: StepId,
    title: String,
    pub(crate) order: usize,
    optional: bool,
    validator: Option<Arc<dyn StepValidator>>,
}

impl Step {
    /// A required step with no validator. It still has to be marked valid
    /// before the flow can move past it.
    pub fn new(id: impl Into<StepId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            order: 0,
            optional: false,
            validator: None,
        }
    }

    /// Allow advancing past this step without validation.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_validator(mut self, validator: impl StepValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn id(&self) -> &StepId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Zero-based position in the flow.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Run the validator; a step without one is always valid.
    pub fn check(&self, values: &FieldValues) -> StepCheck {
        match &self.validator {
            Some(validator) => validator.validate(values),
            None => StepCheck::Valid,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("order", &self.order)
            .field("optional", &self.optional)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}
