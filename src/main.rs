use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

mod catalog;
mod config;
mod db;
mod error;
mod ledger;
mod protocol;
mod records;
mod shortfall;

use catalog::Catalog;
use config::ServerConfig;
use db::Database;
use error::TrackerError;
use protocol::{
    ActionResponse, ErrorResponse, ToggleQuestRequest, UpdateHaveRequest, UpdateLevelRequest,
};

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
struct AppState {
    db: Arc<Database>,
    /// Image stored for materials no requirement mentions
    fallback_image: Arc<str>,
}

impl AppState {
    async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let db = Database::new(&config.database_url, config.max_connections).await?;

        // Load static game data from TOML files and seed anything missing
        let mut catalog = Catalog::new();
        catalog
            .load_from_directory(&config.data_dir)
            .map_err(anyhow::Error::msg)?;
        if catalog.is_empty() {
            warn!("Catalog in {:?} is empty; nothing to seed", config.data_dir);
        }
        db.seed_catalog(&catalog, &config.fallback_image).await?;

        Ok(Self {
            db: Arc::new(db),
            fallback_image: Arc::from(config.fallback_image.as_str()),
        })
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn status_for(err: &TrackerError) -> StatusCode {
    match err {
        TrackerError::InvalidInput(_) | TrackerError::InsufficientResources(_) => {
            StatusCode::BAD_REQUEST
        }
        TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
        TrackerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing message; store failures are logged, not echoed
fn message_for(err: &TrackerError, operation: &str) -> String {
    match err {
        TrackerError::Database(e) => {
            error!("Database error in {}: {}", operation, e);
            "Internal error".to_string()
        }
        other => other.to_string(),
    }
}

/// Render a mutation outcome as `{success, error?, missing?, result?}`
fn action_response<T: Serialize>(outcome: Result<T, TrackerError>, operation: &str) -> Response {
    match outcome {
        Ok(result) => (StatusCode::OK, Json(ActionResponse::ok(result))).into_response(),
        Err(err) => {
            let status = status_for(&err);
            let message = message_for(&err, operation);
            if status != StatusCode::INTERNAL_SERVER_ERROR {
                warn!("{} rejected: {}", operation, message);
            }
            let missing = err.shortfalls().to_vec();
            (
                status,
                Json(ActionResponse::<T>::failed(message, missing)),
            )
                .into_response()
        }
    }
}

/// Decode a mutation body. Only JSON objects are accepted.
fn request_body<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, TrackerError> {
    let Json(body) = payload.map_err(|e| TrackerError::invalid(e.body_text()))?;
    if !body.is_object() {
        return Err(TrackerError::invalid("Request body must be a JSON object"));
    }
    serde_json::from_value(body)
        .map_err(|e| TrackerError::invalid(format!("Malformed request: {}", e)))
}

fn report_response<T: Serialize>(outcome: Result<T, TrackerError>, operation: &str) -> Response {
    match outcome {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => (
            status_for(&err),
            Json(ErrorResponse {
                error: message_for(&err, operation),
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// HTTP Handlers - Reports
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}

/// GET /api/modules - Module levels and what is left to max them all
async fn modules_overview(State(state): State<AppState>) -> Response {
    report_response(shortfall::report::module_overview(&state.db).await, "modules")
}

/// GET /api/items - Overall module shortfall only
async fn items_table(State(state): State<AppState>) -> Response {
    let items = shortfall::report::module_items(&state.db)
        .await
        .map(|items| serde_json::json!({ "items": items }));
    report_response(items, "items_table")
}

/// GET /api/next_level_items - Materials for one more level of each module
async fn next_level_items(State(state): State<AppState>) -> Response {
    report_response(shortfall::report::next_level_items(&state.db).await, "next_level_items")
}

/// GET /api/quests - Traders, quests and what open quests still need
async fn quests_data(State(state): State<AppState>) -> Response {
    report_response(shortfall::report::quest_overview(&state.db).await, "quests_data")
}

// ============================================================================
// HTTP Handlers - Mutations
// ============================================================================

/// POST /api/update_level - Raise or lower a module's level
async fn update_level(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let parsed = request_body::<UpdateLevelRequest>(payload).and_then(|req| req.parse());
    let outcome = match parsed {
        Ok((module, level)) => ledger::apply_level(&state.db, &module, level).await,
        Err(e) => Err(e),
    };
    action_response(outcome, "update_level")
}

/// POST /api/update_have - Set a material's stock directly
async fn update_have(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let parsed = request_body::<UpdateHaveRequest>(payload).and_then(|req| req.parse());
    let outcome = match parsed {
        Ok((item, have)) => {
            ledger::set_inventory_have(&state.db, &item, have, &state.fallback_image).await
        }
        Err(e) => Err(e),
    };
    action_response(outcome, "update_have")
}

/// POST /api/toggle_quest - Complete (paying its requirements) or reopen a quest
async fn toggle_quest(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let parsed = request_body::<ToggleQuestRequest>(payload).and_then(|req| req.parse());
    let outcome = match parsed {
        Ok((quest_id, completed)) => {
            ledger::set_quest_completed(&state.db, quest_id, completed).await
        }
        Err(e) => Err(e),
    };
    action_response(outcome, "toggle_quest")
}

// ============================================================================
// Router
// ============================================================================

fn app(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Reports
        .route("/api/modules", get(modules_overview))
        .route("/api/items", get(items_table))
        .route("/api/next_level_items", get(next_level_items))
        .route("/api/quests", get(quests_data))
        // Mutations
        .route("/api/update_level", post(update_level))
        .route("/api/update_have", post(update_have))
        .route("/api/toggle_quest", post(toggle_quest))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .init();

    let state = AppState::new(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Shelter tracker listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
