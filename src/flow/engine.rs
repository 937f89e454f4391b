//! Step flow engine — ordered steps with validation-gated forward navigation.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::state::{FieldValue, FieldValues, FlowPosition, FlowTransition, TransitionKind};
use super::step::{Step, StepCheck, StepId};
use crate::error::FlowError;

/// Transition history is capped to this many entries.
const MAX_TRANSITIONS: usize = 200;

/// Result of a successful `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Advance {
    Moved { from: usize, to: usize },
    Completed,
}

/// Result of `retreat()`. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Retreat {
    Moved { from: usize, to: usize },
    /// Left the terminal state back onto the last step.
    Reopened { index: usize },
    AtFirstStep,
}

/// Summary of one step for progress indicators.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub id: StepId,
    pub title: String,
    pub order: usize,
    pub optional: bool,
    pub completed: bool,
}

/// Read-only view of a flow handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub id: Uuid,
    pub position: FlowPosition,
    pub current_index: usize,
    pub current_step: StepId,
    pub steps: Vec<StepSummary>,
    pub completed: Vec<StepId>,
    pub values: FieldValues,
    /// Whether `advance()` would currently succeed.
    pub can_advance: bool,
    /// Fraction of the flow reached, 0.0-1.0.
    pub progress: f32,
    /// Last recorded failure of the current step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A running flow instance.
///
/// `current_index` always points at a real step. Once the last step is
/// advanced past the flow is completed: it keeps pointing at the last step
/// but only `retreat()` and `reset()` are accepted.
#[derive(Debug, Clone)]
pub struct StepFlow {
    id: Uuid,
    steps: Vec<Step>,
    current_index: usize,
    completed: HashSet<StepId>,
    failures: HashMap<StepId, String>,
    values: FieldValues,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    transitions: Vec<FlowTransition>,
}

impl StepFlow {
    /// Build a flow from steps in traversal order.
    ///
    /// Each step's `order` is set to its position. Fails on an empty list or
    /// a repeated step id.
    pub fn new(steps: Vec<Step>) -> Result<Self, FlowError> {
        if steps.is_empty() {
            return Err(FlowError::EmptyFlow);
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(steps.len());
        for (order, mut step) in steps.into_iter().enumerate() {
            if !seen.insert(step.id().clone()) {
                return Err(FlowError::DuplicateStep {
                    id: step.id().clone(),
                });
            }
            step.order = order;
            ordered.push(step);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            steps: ordered,
            current_index: 0,
            completed: HashSet::new(),
            failures: HashMap::new(),
            values: FieldValues::new(),
            started_at: Utc::now(),
            completed_at: None,
            transitions: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: construction rejects empty flows.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_step(&self) -> &Step {
        &self.steps[self.current_index]
    }

    pub fn position(&self) -> FlowPosition {
        if self.is_completed() {
            FlowPosition::Completed
        } else {
            FlowPosition::Step {
                index: self.current_index,
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_step_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn transitions(&self) -> &[FlowTransition] {
        &self.transitions
    }

    /// Whether `advance()` would succeed right now.
    pub fn can_advance(&self) -> bool {
        let step = self.current_step();
        !self.is_completed() && (step.is_optional() || self.completed.contains(step.id()))
    }

    /// Move to the next step, or complete the flow from the last one.
    ///
    /// Refused with `ValidationBlocked` while the current step is required
    /// and not marked valid; the last recorded failure reason is attached.
    pub fn advance(&mut self) -> Result<Advance, FlowError> {
        self.ensure_active()?;

        if !self.can_advance() {
            let step = self.current_step().id().clone();
            let reason = self.failures.get(&step).cloned();
            debug!(flow_id = %self.id, step = %step, "Advance blocked by validation");
            return Err(FlowError::ValidationBlocked { step, reason });
        }

        let from = self.position();
        let outcome = if self.current_index + 1 == self.steps.len() {
            self.completed_at = Some(Utc::now());
            Advance::Completed
        } else {
            self.current_index += 1;
            Advance::Moved {
                from: self.current_index - 1,
                to: self.current_index,
            }
        };
        self.record(from, TransitionKind::Advance);
        Ok(outcome)
    }

    /// Move back one step, or reopen a completed flow on its last step.
    pub fn retreat(&mut self) -> Retreat {
        if self.is_completed() {
            let from = self.position();
            self.completed_at = None;
            self.record(from, TransitionKind::Reopen);
            return Retreat::Reopened {
                index: self.current_index,
            };
        }

        if self.current_index == 0 {
            return Retreat::AtFirstStep;
        }

        let from = self.position();
        self.current_index -= 1;
        self.record(from, TransitionKind::Retreat);
        Retreat::Moved {
            from: self.current_index + 1,
            to: self.current_index,
        }
    }

    /// Jump straight to `index` without validating anything in between.
    pub fn jump_to(&mut self, index: i64) -> Result<(), FlowError> {
        self.ensure_active()?;

        let target = usize::try_from(index)
            .ok()
            .filter(|i| *i < self.steps.len())
            .ok_or(FlowError::OutOfRangeIndex {
                index,
                len: self.steps.len(),
            })?;

        if target != self.current_index {
            let from = self.position();
            self.current_index = target;
            self.record(from, TransitionKind::Jump);
        }
        Ok(())
    }

    /// Record that a step's fields passed validation.
    pub fn mark_valid(&mut self, id: &str) -> Result<(), FlowError> {
        self.ensure_active()?;
        let step = self.step_id(id)?;
        self.failures.remove(&step);
        self.completed.insert(step);
        Ok(())
    }

    /// Record that a step's fields failed validation.
    pub fn mark_invalid(&mut self, id: &str, reason: impl Into<String>) -> Result<(), FlowError> {
        self.ensure_active()?;
        let step = self.step_id(id)?;
        self.completed.remove(&step);
        self.failures.insert(step, reason.into());
        Ok(())
    }

    /// Run a step's validator over the current values and record the verdict.
    pub fn validate_step(&mut self, id: &str) -> Result<StepCheck, FlowError> {
        self.ensure_active()?;
        let index = self.index_of(id)?;
        let check = self.steps[index].check(&self.values);
        match &check {
            StepCheck::Valid => self.mark_valid(id)?,
            StepCheck::Invalid { reason } => self.mark_invalid(id, reason.clone())?,
        }
        Ok(check)
    }

    /// Validate the step the user is on.
    pub fn validate_current(&mut self) -> Result<StepCheck, FlowError> {
        let id = self.current_step().id().clone();
        self.validate_step(id.as_str())
    }

    /// Insert or update a field value.
    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<(), FlowError> {
        self.ensure_active()?;
        self.values.insert(key.into(), value.into());
        Ok(())
    }

    /// Start over: first step, no values, nothing completed.
    pub fn reset(&mut self) {
        let from = self.position();
        self.current_index = 0;
        self.completed.clear();
        self.failures.clear();
        self.values.clear();
        self.completed_at = None;
        self.record(from, TransitionKind::Reset);
    }

    /// Fraction of the flow reached; 1.0 once completed.
    pub fn progress(&self) -> f32 {
        if self.is_completed() {
            1.0
        } else {
            (self.current_index + 1) as f32 / self.steps.len() as f32
        }
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let current = self.current_step();
        let steps = self
            .steps
            .iter()
            .map(|step| StepSummary {
                id: step.id().clone(),
                title: step.title().to_string(),
                order: step.order(),
                optional: step.is_optional(),
                completed: self.completed.contains(step.id()),
            })
            .collect();
        let completed = self
            .steps
            .iter()
            .filter(|step| self.completed.contains(step.id()))
            .map(|step| step.id().clone())
            .collect();

        FlowSnapshot {
            id: self.id,
            position: self.position(),
            current_index: self.current_index,
            current_step: current.id().clone(),
            steps,
            completed,
            values: self.values.clone(),
            can_advance: self.can_advance(),
            progress: self.progress(),
            blocked_reason: self.failures.get(current.id()).cloned(),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    fn ensure_active(&self) -> Result<(), FlowError> {
        if self.is_completed() {
            Err(FlowError::AlreadyCompleted)
        } else {
            Ok(())
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, FlowError> {
        self.steps
            .iter()
            .position(|step| step.id().as_str() == id)
            .ok_or_else(|| FlowError::UnknownStep {
                id: StepId::from(id),
            })
    }

    fn step_id(&self, id: &str) -> Result<StepId, FlowError> {
        let index = self.index_of(id)?;
        Ok(self.steps[index].id().clone())
    }

    fn record(&mut self, from: FlowPosition, kind: TransitionKind) {
        let to = self.position();
        debug!(flow_id = %self.id, %from, %to, ?kind, "Flow transition");
        self.transitions.push(FlowTransition {
            from,
            to,
            kind,
            timestamp: Utc::now(),
        });

        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::text_value;

    fn three_steps() -> StepFlow {
        StepFlow::new(vec![
            Step::new("name", "Name"),
            Step::new("goals", "Goals"),
            Step::new("done", "Done"),
        ])
        .unwrap()
    }

    fn mark_all_valid(flow: &mut StepFlow) {
        for id in ["name", "goals", "done"] {
            flow.mark_valid(id).unwrap();
        }
    }

    #[test]
    fn empty_flow_is_rejected() {
        assert_eq!(StepFlow::new(vec![]).unwrap_err(), FlowError::EmptyFlow);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = StepFlow::new(vec![Step::new("a", "A"), Step::new("a", "Again")]).unwrap_err();
        assert_eq!(err, FlowError::DuplicateStep { id: StepId::from("a") });
    }

    #[test]
    fn order_follows_insertion() {
        let flow = three_steps();
        let orders: Vec<usize> = flow.steps().iter().map(Step::order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(flow.current_index(), 0);
        assert_eq!(flow.position(), FlowPosition::Step { index: 0 });
    }

    #[test]
    fn advance_is_gated_on_validation() {
        let mut flow = three_steps();

        let err = flow.advance().unwrap_err();
        assert!(matches!(err, FlowError::ValidationBlocked { ref step, reason: None } if step.as_str() == "name"));
        assert_eq!(flow.current_index(), 0);

        flow.mark_valid("name").unwrap();
        assert_eq!(flow.advance().unwrap(), Advance::Moved { from: 0, to: 1 });
        assert_eq!(flow.current_index(), 1);
    }

    #[test]
    fn blocked_advance_carries_failure_reason() {
        let mut flow = three_steps();
        flow.mark_invalid("name", "Tell us what to call you").unwrap();

        match flow.advance() {
            Err(FlowError::ValidationBlocked { reason, .. }) => {
                assert_eq!(reason.as_deref(), Some("Tell us what to call you"));
            }
            other => panic!("expected ValidationBlocked, got {other:?}"),
        }
        assert_eq!(flow.snapshot().blocked_reason.as_deref(), Some("Tell us what to call you"));
    }

    #[test]
    fn mark_invalid_revokes_completion() {
        let mut flow = three_steps();
        flow.mark_valid("name").unwrap();
        assert!(flow.is_step_completed("name"));

        flow.mark_invalid("name", "changed").unwrap();
        assert!(!flow.is_step_completed("name"));
        assert!(flow.advance().is_err());
    }

    #[test]
    fn optional_steps_advance_without_validation() {
        let mut flow = StepFlow::new(vec![
            Step::new("intro", "Intro").optional(),
            Step::new("name", "Name"),
        ])
        .unwrap();
        assert!(flow.can_advance());
        assert_eq!(flow.advance().unwrap(), Advance::Moved { from: 0, to: 1 });
    }

    #[test]
    fn last_step_completes_and_retreat_reopens() {
        let mut flow = three_steps();
        mark_all_valid(&mut flow);

        flow.advance().unwrap();
        flow.advance().unwrap();
        assert_eq!(flow.advance().unwrap(), Advance::Completed);
        assert!(flow.is_completed());
        assert_eq!(flow.position(), FlowPosition::Completed);
        assert_eq!(flow.current_index(), 2);
        assert_eq!(flow.progress(), 1.0);

        assert_eq!(flow.retreat(), Retreat::Reopened { index: 2 });
        assert!(!flow.is_completed());
        assert_eq!(flow.current_index(), 2);
    }

    #[test]
    fn completed_flow_refuses_everything_but_retreat_and_reset() {
        let mut flow = StepFlow::new(vec![Step::new("only", "Only").optional()]).unwrap();
        assert_eq!(flow.advance().unwrap(), Advance::Completed);

        assert_eq!(flow.advance().unwrap_err(), FlowError::AlreadyCompleted);
        assert_eq!(flow.jump_to(0).unwrap_err(), FlowError::AlreadyCompleted);
        assert_eq!(flow.mark_valid("only").unwrap_err(), FlowError::AlreadyCompleted);
        assert_eq!(flow.set_value("k", "v").unwrap_err(), FlowError::AlreadyCompleted);

        flow.reset();
        assert!(!flow.is_completed());
    }

    #[test]
    fn retreat_at_first_step_is_a_noop() {
        let mut flow = three_steps();
        assert_eq!(flow.retreat(), Retreat::AtFirstStep);
        assert_eq!(flow.current_index(), 0);
        assert!(flow.transitions().is_empty());
    }

    #[test]
    fn retreat_moves_back() {
        let mut flow = three_steps();
        flow.jump_to(2).unwrap();
        assert_eq!(flow.retreat(), Retreat::Moved { from: 2, to: 1 });
        assert_eq!(flow.current_index(), 1);
    }

    #[test]
    fn jump_to_bounds() {
        let mut flow = three_steps();
        flow.jump_to(1).unwrap();

        assert_eq!(
            flow.jump_to(-1).unwrap_err(),
            FlowError::OutOfRangeIndex { index: -1, len: 3 }
        );
        assert_eq!(
            flow.jump_to(3).unwrap_err(),
            FlowError::OutOfRangeIndex { index: 3, len: 3 }
        );
        assert_eq!(flow.current_index(), 1);
    }

    #[test]
    fn jump_to_ignores_completion() {
        let mut flow = three_steps();
        flow.jump_to(2).unwrap();
        assert_eq!(flow.current_index(), 2);
        assert!(flow.completed.is_empty());
        // Landing on an unvalidated step still blocks advance.
        assert!(flow.advance().is_err());
    }

    #[test]
    fn unknown_step_is_rejected() {
        let mut flow = three_steps();
        assert_eq!(
            flow.mark_valid("nope").unwrap_err(),
            FlowError::UnknownStep { id: StepId::from("nope") }
        );
        assert!(flow.mark_invalid("nope", "x").is_err());
    }

    #[test]
    fn validate_current_runs_step_validator() {
        let mut flow = StepFlow::new(vec![
            Step::new("name", "Name").with_validator(|values: &FieldValues| {
                StepCheck::require(!text_value(values, "name").is_empty(), "Name is required")
            }),
            Step::new("done", "Done"),
        ])
        .unwrap();

        assert_eq!(
            flow.validate_current().unwrap(),
            StepCheck::invalid("Name is required")
        );
        assert!(!flow.can_advance());

        flow.set_value("name", "Sam").unwrap();
        assert!(flow.validate_current().unwrap().is_valid());
        assert!(flow.can_advance());
        flow.advance().unwrap();
        assert_eq!(flow.current_step().id().as_str(), "done");
    }

    #[test]
    fn values_update_and_reset_clears() {
        let mut flow = three_steps();
        flow.set_value("name", "Sam").unwrap();
        flow.set_value("name", "Alex").unwrap();
        flow.set_value("opt_in", true).unwrap();
        assert_eq!(flow.values().len(), 2);
        assert_eq!(flow.value("name"), Some(&FieldValue::from("Alex")));

        flow.mark_valid("name").unwrap();
        flow.advance().unwrap();
        flow.reset();

        assert_eq!(flow.current_index(), 0);
        assert!(flow.values().is_empty());
        assert!(!flow.is_step_completed("name"));
        assert_eq!(
            flow.transitions().last().map(|t| t.kind),
            Some(TransitionKind::Reset)
        );
    }

    #[test]
    fn values_survive_navigation_and_reopen() {
        let mut flow = three_steps();
        mark_all_valid(&mut flow);
        flow.set_value("name", "Sam").unwrap();
        flow.advance().unwrap();
        flow.set_value("goals", 3.0).unwrap();

        flow.retreat();
        assert_eq!(flow.current_index(), 0);
        flow.jump_to(2).unwrap();
        flow.set_value("opt_in", true).unwrap();
        assert_eq!(flow.advance().unwrap(), Advance::Completed);
        assert_eq!(flow.retreat(), Retreat::Reopened { index: 2 });
        flow.jump_to(0).unwrap();

        assert_eq!(flow.values().len(), 3);
        assert_eq!(flow.value("name"), Some(&FieldValue::from("Sam")));
        assert_eq!(flow.value("goals"), Some(&FieldValue::from(3.0)));
        assert_eq!(flow.value("opt_in"), Some(&FieldValue::from(true)));
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut flow = three_steps();
        flow.mark_valid("goals").unwrap();
        flow.mark_valid("name").unwrap();
        flow.advance().unwrap();

        let snap = flow.snapshot();
        assert_eq!(snap.current_index, 1);
        assert_eq!(snap.current_step.as_str(), "goals");
        // Completed ids come back in flow order.
        assert_eq!(snap.completed, vec![StepId::from("name"), StepId::from("goals")]);
        assert!(snap.can_advance);
        assert!(snap.steps[0].completed);
        assert!(!snap.steps[2].completed);
        assert!((snap.progress - 2.0 / 3.0).abs() < f32::EPSILON);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["position"]["state"], "step");
        assert_eq!(json["current_step"], "goals");
        assert!(json.get("completed_at").is_none());
    }

    #[test]
    fn transition_history_capped() {
        let mut flow = three_steps();
        for _ in 0..150 {
            flow.jump_to(2).unwrap();
            flow.jump_to(0).unwrap();
        }
        assert_eq!(flow.transitions().len(), MAX_TRANSITIONS);
    }

    #[test]
    fn outcome_serde() {
        let json = serde_json::to_value(Advance::Moved { from: 0, to: 1 }).unwrap();
        assert_eq!(json["outcome"], "moved");
        assert_eq!(json["to"], 1);

        let json = serde_json::to_value(Retreat::AtFirstStep).unwrap();
        assert_eq!(json["outcome"], "at_first_step");
    }
}
