//! REST endpoints for flows, field validation and score results.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::manager::FlowManager;
use super::presets::FlowKind;
use super::state::FieldValue;
use crate::config::{AppConfig, CrisisResource};
use crate::error::{FlowError, InputError};
use crate::score::{ScoreClassifier, ScoreResult};
use crate::validators::{
    OtpEntry, PasswordStrength, evaluate_password, format_phone_number, is_complete_code,
    is_complete_phone, passwords_match, phone_digits,
};

/// Shared state for flow routes.
#[derive(Clone)]
pub struct FlowRouteState {
    pub manager: Arc<FlowManager>,
    pub classifier: ScoreClassifier,
    pub country_code: String,
    pub crisis: CrisisResource,
}

impl FlowRouteState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            manager: Arc::new(FlowManager::with_limits(
                config.country_code.clone(),
                config.flows,
            )),
            classifier: ScoreClassifier::new(config.thresholds),
            country_code: config.country_code.clone(),
            crisis: config.crisis.clone(),
        }
    }
}

/// Build the flow REST routes.
pub fn flow_routes(state: FlowRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/flows", post(start_flow))
        .route("/api/flows/{id}", get(get_flow).delete(abandon_flow))
        .route("/api/flows/{id}/advance", post(advance))
        .route("/api/flows/{id}/retreat", post(retreat))
        .route("/api/flows/{id}/jump", post(jump))
        .route("/api/flows/{id}/reset", post(reset))
        .route("/api/flows/{id}/values/{key}", put(submit_value))
        .route("/api/flows/{id}/steps/{step}/valid", post(mark_valid))
        .route("/api/flows/{id}/steps/{step}/invalid", post(mark_invalid))
        .route("/api/validate/phone", post(validate_phone))
        .route("/api/validate/password", post(validate_password))
        .route("/api/validate/otp", post(validate_otp))
        .route("/api/otp/input", post(otp_input))
        .route("/api/otp/paste", post(otp_paste))
        .route("/api/score/{score}", get(score))
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// JSON error response for a refused flow operation or rejected input.
enum ApiError {
    Flow(FlowError),
    Input(InputError),
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        Self::Flow(err)
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self::Input(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, kind) = match &self {
            Self::Flow(err) => {
                let status = match err {
                    FlowError::UnknownFlow { .. } | FlowError::UnknownStep { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    FlowError::ValidationBlocked { .. } | FlowError::AlreadyCompleted => {
                        StatusCode::CONFLICT
                    }
                    FlowError::OutOfRangeIndex { .. } => StatusCode::BAD_REQUEST,
                    FlowError::EmptyFlow | FlowError::DuplicateStep { .. } => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                warn!(error = %err, kind = err.kind(), "Flow operation refused");
                (status, err.to_string(), err.kind())
            }
            Self::Input(err) => {
                warn!(error = %err, kind = err.kind(), "Input rejected");
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), err.kind())
            }
        };
        (
            status,
            Json(serde_json::json!({
                "error": message,
                "kind": kind,
            })),
        )
            .into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "solace-flows"
    }))
}

// ── Flows ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StartRequest {
    kind: FlowKind,
}

async fn start_flow(
    State(state): State<FlowRouteState>,
    Json(req): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.manager.start(req.kind).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_flow(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.manager.snapshot(id).await?))
}

async fn abandon_flow(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.manager.abandon(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn advance(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (outcome, flow) = state.manager.advance(id).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome, "flow": flow })))
}

async fn retreat(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (outcome, flow) = state.manager.retreat(id).await?;
    Ok(Json(serde_json::json!({ "outcome": outcome, "flow": flow })))
}

#[derive(Deserialize)]
struct JumpRequest {
    index: i64,
}

async fn jump(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
    Json(req): Json<JumpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.manager.jump_to(id, req.index).await?))
}

async fn reset(
    State(state): State<FlowRouteState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.manager.reset(id).await?))
}

#[derive(Deserialize)]
struct ValueRequest {
    value: FieldValue,
}

async fn submit_value(
    State(state): State<FlowRouteState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<ValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (check, flow) = state.manager.submit_value(id, key, req.value).await?;
    Ok(Json(serde_json::json!({ "check": check, "flow": flow })))
}

async fn mark_valid(
    State(state): State<FlowRouteState>,
    Path((id, step)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.manager.mark_valid(id, &step).await?))
}

#[derive(Deserialize)]
struct InvalidRequest {
    reason: String,
}

async fn mark_invalid(
    State(state): State<FlowRouteState>,
    Path((id, step)): Path<(Uuid, String)>,
    Json(req): Json<InvalidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.manager.mark_invalid(id, &step, req.reason).await?))
}

// ── Field validation ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PhoneRequest {
    raw: String,
}

#[derive(Serialize)]
struct PhoneResponse {
    formatted: String,
    digits: String,
    complete: bool,
}

async fn validate_phone(
    State(state): State<FlowRouteState>,
    Json(req): Json<PhoneRequest>,
) -> impl IntoResponse {
    let formatted = format_phone_number(&req.raw, &state.country_code);
    Json(PhoneResponse {
        digits: phone_digits(&formatted, &state.country_code),
        complete: is_complete_phone(&formatted, &state.country_code),
        formatted,
    })
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: String,
    #[serde(default)]
    confirmation: Option<String>,
}

#[derive(Serialize)]
struct PasswordResponse {
    strength: PasswordStrength,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<bool>,
}

async fn validate_password(Json(req): Json<PasswordRequest>) -> impl IntoResponse {
    Json(PasswordResponse {
        strength: evaluate_password(&req.password),
        matches: req
            .confirmation
            .as_deref()
            .map(|confirmation| passwords_match(&req.password, confirmation)),
    })
}

#[derive(Deserialize)]
struct OtpRequest {
    code: String,
}

async fn validate_otp(Json(req): Json<OtpRequest>) -> impl IntoResponse {
    Json(serde_json::json!({ "complete": is_complete_code(&req.code) }))
}

/// A keystroke into one OTP box. `entry` is the state last returned by the
/// server; a fresh entry is assumed when it is missing.
#[derive(Deserialize)]
struct OtpInputRequest {
    #[serde(default)]
    entry: OtpEntry,
    slot: usize,
    text: String,
}

#[derive(Deserialize)]
struct OtpPasteRequest {
    #[serde(default)]
    entry: OtpEntry,
    code: String,
}

#[derive(Serialize)]
struct OtpResponse {
    focus: usize,
    complete: bool,
    code: Option<String>,
    entry: OtpEntry,
}

impl From<OtpEntry> for OtpResponse {
    fn from(entry: OtpEntry) -> Self {
        Self {
            focus: entry.focus(),
            complete: entry.is_complete(),
            code: entry.code(),
            entry,
        }
    }
}

async fn otp_input(Json(req): Json<OtpInputRequest>) -> Result<Json<OtpResponse>, ApiError> {
    let mut entry = req.entry;
    entry.input(req.slot, &req.text)?;
    Ok(Json(entry.into()))
}

async fn otp_paste(Json(req): Json<OtpPasteRequest>) -> Result<Json<OtpResponse>, ApiError> {
    let mut entry = req.entry;
    entry.paste(&req.code)?;
    Ok(Json(entry.into()))
}

// ── Score ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ScoreResponse {
    result: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    crisis: Option<CrisisResource>,
}

async fn score(State(state): State<FlowRouteState>, Path(raw): Path<i32>) -> impl IntoResponse {
    let result = state.classifier.classify(raw);
    let crisis = result.escalate.then(|| state.crisis.clone());
    if crisis.is_some() {
        tracing::info!(score = result.raw_score, "Critical score, attaching crisis resource");
    }
    Json(ScoreResponse { result, crisis })
}
