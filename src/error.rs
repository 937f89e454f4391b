//! Error types for Solace.

use uuid::Uuid;

use crate::flow::StepId;

/// Top-level error type for the flow core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Refused flow operations.
///
/// Every variant leaves the flow exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("A flow needs at least one step")]
    EmptyFlow,

    #[error("Step {id} is defined more than once")]
    DuplicateStep { id: StepId },

    #[error("Step {id} is not part of this flow")]
    UnknownStep { id: StepId },

    #[error("Flow {id} not found")]
    UnknownFlow { id: Uuid },

    #[error(
        "Cannot leave step {step}: {}",
        .reason.as_deref().unwrap_or("step has not been validated")
    )]
    ValidationBlocked {
        step: StepId,
        reason: Option<String>,
    },

    #[error("Step index {index} is out of range for a flow of {len} steps")]
    OutOfRangeIndex { index: i64, len: usize },

    #[error("Flow is already completed")]
    AlreadyCompleted,
}

impl FlowError {
    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyFlow => "empty_flow",
            Self::DuplicateStep { .. } => "duplicate_step",
            Self::UnknownStep { .. } => "unknown_step",
            Self::UnknownFlow { .. } => "unknown_flow",
            Self::ValidationBlocked { .. } => "validation_blocked",
            Self::OutOfRangeIndex { .. } => "out_of_range_index",
            Self::AlreadyCompleted => "already_completed",
        }
    }
}

/// Rejected field input. The field keeps its previous value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Malformed input for {field}: {reason}")]
    Malformed { field: String, reason: String },

    #[error("Slot {slot} does not exist (only {len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },
}

impl InputError {
    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed_input",
            Self::SlotOutOfRange { .. } => "slot_out_of_range",
        }
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Solace.
pub type Result<T> = std::result::Result<T, Error>;
