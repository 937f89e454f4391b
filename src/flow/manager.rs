//! FlowManager — owns every in-progress flow and serialises mutations.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::engine::{Advance, FlowSnapshot, Retreat, StepFlow};
use super::presets::FlowKind;
use super::state::FieldValue;
use super::step::StepCheck;
use crate::config::FlowLimits;
use crate::error::FlowError;

/// A flow plus the last time an operation touched it.
struct LiveFlow {
    flow: StepFlow,
    last_active: Instant,
}

/// Registry of live flows, one per user session.
///
/// Each operation holds the write lock for its whole duration, so a flow's
/// position and completion set always change together. Flows idle for longer
/// than [`FlowLimits::idle_ttl`] are evicted whenever a new one is admitted,
/// and the least recently used flow makes room once `max_flows` is reached.
pub struct FlowManager {
    country_code: String,
    limits: FlowLimits,
    flows: RwLock<HashMap<Uuid, LiveFlow>>,
}

impl FlowManager {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self::with_limits(country_code, FlowLimits::default())
    }

    pub fn with_limits(country_code: impl Into<String>, limits: FlowLimits) -> Self {
        Self {
            country_code: country_code.into(),
            limits,
            flows: RwLock::new(HashMap::new()),
        }
    }

    /// Start a built-in flow.
    pub async fn start(&self, kind: FlowKind) -> Result<FlowSnapshot, FlowError> {
        let flow = kind.build(&self.country_code)?;
        let snapshot = flow.snapshot();
        self.admit(flow).await;
        tracing::info!(flow_id = %snapshot.id, %kind, steps = snapshot.steps.len(), "Flow started");
        Ok(snapshot)
    }

    /// Register a custom flow.
    pub async fn insert(&self, flow: StepFlow) -> Uuid {
        let id = self.admit(flow).await;
        tracing::info!(flow_id = %id, "Flow registered");
        id
    }

    /// Discard a flow, completed or not.
    pub async fn abandon(&self, id: Uuid) -> Result<(), FlowError> {
        match self.flows.write().await.remove(&id) {
            Some(live) => {
                tracing::info!(
                    flow_id = %id,
                    completed = live.flow.is_completed(),
                    "Flow discarded"
                );
                Ok(())
            }
            None => Err(FlowError::UnknownFlow { id }),
        }
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<FlowSnapshot, FlowError> {
        self.flows
            .read()
            .await
            .get(&id)
            .map(|live| live.flow.snapshot())
            .ok_or(FlowError::UnknownFlow { id })
    }

    /// Drop every flow idle for at least the configured TTL.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut flows = self.flows.write().await;
        self.evict_expired(&mut flows, now)
    }

    /// Number of live flows.
    pub async fn count(&self) -> usize {
        self.flows.read().await.len()
    }

    pub async fn advance(&self, id: Uuid) -> Result<(Advance, FlowSnapshot), FlowError> {
        self.with_flow(id, |flow| {
            let outcome = flow.advance()?;
            if outcome == Advance::Completed {
                tracing::info!(flow_id = %id, "Flow completed");
            }
            Ok(outcome)
        })
        .await
    }

    pub async fn retreat(&self, id: Uuid) -> Result<(Retreat, FlowSnapshot), FlowError> {
        self.with_flow(id, |flow| Ok(flow.retreat())).await
    }

    pub async fn jump_to(&self, id: Uuid, index: i64) -> Result<FlowSnapshot, FlowError> {
        self.with_flow(id, |flow| flow.jump_to(index))
            .await
            .map(|(_, snapshot)| snapshot)
    }

    pub async fn mark_valid(&self, id: Uuid, step: &str) -> Result<FlowSnapshot, FlowError> {
        self.with_flow(id, |flow| flow.mark_valid(step))
            .await
            .map(|(_, snapshot)| snapshot)
    }

    pub async fn mark_invalid(
        &self,
        id: Uuid,
        step: &str,
        reason: String,
    ) -> Result<FlowSnapshot, FlowError> {
        self.with_flow(id, |flow| flow.mark_invalid(step, reason))
            .await
            .map(|(_, snapshot)| snapshot)
    }

    /// Store a field value and re-validate the current step against it.
    pub async fn submit_value(
        &self,
        id: Uuid,
        key: String,
        value: FieldValue,
    ) -> Result<(StepCheck, FlowSnapshot), FlowError> {
        self.with_flow(id, |flow| {
            flow.set_value(key, value)?;
            flow.validate_current()
        })
        .await
    }

    pub async fn reset(&self, id: Uuid) -> Result<FlowSnapshot, FlowError> {
        self.with_flow(id, |flow| {
            flow.reset();
            Ok(())
        })
        .await
        .map(|(_, snapshot)| snapshot)
    }

    /// Run `op` on one flow under the write lock and snapshot the result.
    async fn with_flow<T>(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut StepFlow) -> Result<T, FlowError>,
    ) -> Result<(T, FlowSnapshot), FlowError> {
        let mut flows = self.flows.write().await;
        let live = flows.get_mut(&id).ok_or(FlowError::UnknownFlow { id })?;
        live.last_active = Instant::now();
        let value = op(&mut live.flow)?;
        Ok((value, live.flow.snapshot()))
    }

    /// Insert a flow after sweeping idle ones and making room under the cap.
    async fn admit(&self, flow: StepFlow) -> Uuid {
        let id = flow.id();
        let now = Instant::now();
        let mut flows = self.flows.write().await;

        self.evict_expired(&mut flows, now);
        while flows.len() >= self.limits.max_flows {
            let Some(oldest) = flows
                .iter()
                .min_by_key(|(_, live)| live.last_active)
                .map(|(id, _)| *id)
            else {
                break;
            };
            flows.remove(&oldest);
            tracing::info!(
                flow_id = %oldest,
                max_flows = self.limits.max_flows,
                "Flow evicted to make room"
            );
        }

        flows.insert(
            id,
            LiveFlow {
                flow,
                last_active: now,
            },
        );
        id
    }

    fn evict_expired(&self, flows: &mut HashMap<Uuid, LiveFlow>, now: Instant) -> usize {
        let before = flows.len();
        let ttl = self.limits.idle_ttl;
        flows.retain(|_, live| now.saturating_duration_since(live.last_active) < ttl);
        let evicted = before - flows.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = flows.len(), "Idle flows evicted");
        }
        evicted
    }
}
