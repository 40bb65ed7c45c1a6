//! REST API routes
//!
//! Chat endpoints:
//! - POST   /api/ai-chat/design-code          - Run one classification turn
//! - POST   /api/ai-chat                      - Ask a question about a case
//!
//! Catalog endpoints:
//! - GET    /api/design-codes                 - List categories
//! - GET    /api/design-codes/:category       - List divisions of a category
//! - GET    /api/design-codes/:category/:division - List sections of a division
//! - GET    /api/design-code/:code            - Describe a full code
//! - GET    /api/health                       - Health check

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::case_chat::{CaseChat, CaseChatErrorBody, CaseChatRequest, CaseChatResponse};
use crate::dialogue::{ClassifyRequest, ClassifyResponse, DialogueEngine, ResponseStatus, TurnGate};
use crate::taxonomy::{normalize_part, Category, CodeLevel, Division, Section};

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DialogueEngine>,
    pub case_chat: Arc<CaseChat>,
    pub gate: Arc<TurnGate<ClassifyResponse>>,
}

impl AppState {
    pub fn new(engine: DialogueEngine, case_chat: CaseChat) -> Self {
        Self {
            engine: Arc::new(engine),
            case_chat: Arc::new(case_chat),
            gate: Arc::new(TurnGate::default()),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub category_count: usize,
}

#[derive(Debug, Serialize)]
pub struct CodeDescription {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat
        .route("/api/ai-chat/design-code", post(classify))
        .route("/api/ai-chat", post(case_chat))
        // Catalog
        .route("/api/design-codes", get(list_categories))
        .route("/api/design-codes/:category", get(list_divisions))
        .route("/api/design-codes/:category/:division", get(list_sections))
        .route("/api/design-code/:code", get(describe_code))
        .route("/api/health", get(health_check))
        .with_state(state)
}

// ============================================================================
// Chat Handlers
// ============================================================================

/// POST /api/ai-chat/design-code - Run one classification turn
async fn classify(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> (StatusCode, Json<ClassifyResponse>) {
    info!(
        history = req.context.len(),
        has_conversation_id = req.conversation_id.is_some(),
        "Classification request"
    );
    let response = state.engine.handle_gated(&state.gate, &req).await;
    (classify_status(&response), Json(response))
}

fn classify_status(response: &ClassifyResponse) -> StatusCode {
    if response.status != ResponseStatus::Error {
        return StatusCode::OK;
    }
    match response.error_type.as_deref() {
        Some("invalid_request") => StatusCode::BAD_REQUEST,
        Some("service_timeout") => StatusCode::GATEWAY_TIMEOUT,
        Some("service_unavailable") => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/ai-chat - Ask a question about a case
async fn case_chat(
    State(state): State<AppState>,
    Json(req): Json<CaseChatRequest>,
) -> Result<Json<CaseChatResponse>, (StatusCode, Json<CaseChatErrorBody>)> {
    match state.case_chat.answer(&req).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(error = %e, "Case chat failed");
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err((status, Json(CaseChatErrorBody::from(&e))))
        }
    }
}

// ============================================================================
// Catalog Handlers
// ============================================================================

/// GET /api/design-codes - List categories
async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.engine.taxonomy().get_categories().to_vec())
}

/// GET /api/design-codes/:category - List divisions of a category
async fn list_divisions(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Division>>, ApiError> {
    let category = normalize_part(&category, CodeLevel::Category)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let taxonomy = state.engine.taxonomy();
    if !taxonomy.has_category(&category) {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Category {} not found", category),
        ));
    }
    Ok(Json(taxonomy.get_divisions(&category).to_vec()))
}

/// GET /api/design-codes/:category/:division - List sections of a division
async fn list_sections(
    State(state): State<AppState>,
    Path((category, division)): Path<(String, String)>,
) -> Result<Json<Vec<Section>>, ApiError> {
    let category = normalize_part(&category, CodeLevel::Category)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let division = normalize_part(&division, CodeLevel::Division)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let taxonomy = state.engine.taxonomy();
    if taxonomy.division(&category, &division).is_none() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Division {}.{} not found", category, division),
        ));
    }
    Ok(Json(taxonomy.get_sections(&category, &division).to_vec()))
}

/// GET /api/design-code/:code - Describe a full code
async fn describe_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Json<CodeDescription> {
    let description = state.engine.taxonomy().describe_code(&code);
    Json(CodeDescription { code, description })
}

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm = state.engine.llm();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: llm.provider_name().to_string(),
        model: llm.model_name().to_string(),
        category_count: state.engine.taxonomy().get_categories().len(),
    })
}
