//! Guided flows — onboarding carousels and account setup.
//!
//! A flow is an ordered list of steps. The presentation layer renders the
//! current step from a [`FlowSnapshot`], feeds field input back in, and turns
//! button presses into `advance`, `retreat` or `jump_to`. Moving forward with
//! "Continue" is gated on the current step being validated; tapping a
//! progress dot (`jump_to`) is not.

pub mod engine;
pub mod manager;
pub mod presets;
pub mod routes;
pub mod state;
pub mod step;

pub use engine::{Advance, FlowSnapshot, Retreat, StepFlow, StepSummary};
pub use manager::FlowManager;
pub use presets::{FlowKind, account_setup, fields, welcome_carousel};
pub use routes::{FlowRouteState, flow_routes};
pub use state::{FieldValue, FieldValues, FlowPosition, FlowTransition, TransitionKind};
pub use step::{Step, StepCheck, StepId, StepValidator};
