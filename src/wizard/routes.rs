//! WebSocket server + REST endpoints for the profile wizard.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::WizardError;

use super::fields::FieldValues;
use super::manager::{SubmitOutcome, WizardEvent, WizardManager};

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub manager: Arc<WizardManager>,
}

/// Build the Axum router with the wizard WebSocket and REST routes.
pub fn wizard_routes(manager: Arc<WizardManager>) -> Router {
    let state = WizardRouteState { manager };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/wizard/steps", get(list_steps))
        .route("/api/wizard/status", get(get_status))
        .route("/api/wizard/form", get(current_form))
        .route("/api/wizard/form/{step}", get(named_form))
        .route("/api/wizard/submit", post(submit))
        .route("/api/wizard/back", post(back))
        .route("/api/wizard/finish", post(finish))
        .route("/api/wizard/skip", post(skip))
        .route("/api/wizard/reset", post(reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({"error": message.to_string()})),
    )
        .into_response()
}

fn wizard_error_response(err: WizardError) -> Response {
    let status = match err {
        WizardError::UnknownStep(_) | WizardError::StepNotRegistered(_) => StatusCode::NOT_FOUND,
        WizardError::NotFinishable(_) | WizardError::AlreadyFinished => StatusCode::CONFLICT,
        WizardError::UnknownField { .. } | WizardError::InvalidRegistry(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    error_response(status, err)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "profile-wizard"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WizardRouteState>,
) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.manager))
}

async fn send_event(socket: &mut WebSocket, event: &WizardEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize wizard event");
            true
        }
    }
}

async fn send_sync(socket: &mut WebSocket, manager: &WizardManager) -> bool {
    let sync = WizardEvent::WizardSync {
        status: manager.status().await,
    };
    send_event(socket, &sync).await
}

/// Next event to forward, or a fresh sync when this receiver fell behind.
/// `None` once the channel is closed.
async fn next_outgoing(
    rx: &mut broadcast::Receiver<WizardEvent>,
    manager: &WizardManager,
) -> Option<WizardEvent> {
    match rx.recv().await {
        Ok(event) => Some(event),
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(missed = n, "WS client lagged behind broadcast");
            Some(WizardEvent::WizardSync {
                status: manager.status().await,
            })
        }
        Err(broadcast::error::RecvError::Closed) => {
            debug!("Broadcast channel closed");
            None
        }
    }
}

async fn handle_socket(mut socket: WebSocket, manager: Arc<WizardManager>) {
    info!("WebSocket client connected");

    // Subscribe before the initial sync so no event falls in between.
    let mut rx = manager.subscribe();

    if !send_sync(&mut socket, &manager).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            outgoing = next_outgoing(&mut rx, &manager) => {
                let Some(event) = outgoing else { break };
                if !send_event(&mut socket, &event).await {
                    debug!("Client disconnected during send");
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        debug!(text = %text.as_str(), "Ignoring client message; wizard actions use REST");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

// ── REST Endpoints ──────────────────────────────────────────────────────

async fn list_steps(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.steps().clone())
}

async fn get_status(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

async fn current_form(State(state): State<WizardRouteState>) -> Response {
    match state.manager.current_page().await {
        Ok(page) => Json(page).into_response(),
        Err(e) => wizard_error_response(e),
    }
}

async fn named_form(
    State(state): State<WizardRouteState>,
    Path(step): Path<String>,
) -> Response {
    match state.manager.page_for(&step).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => wizard_error_response(e),
    }
}

#[derive(Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    values: FieldValues,
}

async fn submit(
    State(state): State<WizardRouteState>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    match state.manager.submit(body.values).await {
        Ok(SubmitOutcome::Accepted(status)) => (StatusCode::OK, Json(status)).into_response(),
        Ok(SubmitOutcome::Rejected(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"errors": errors})),
        )
            .into_response(),
        Err(e) => wizard_error_response(e),
    }
}

async fn back(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.back().await)
}

async fn finish(State(state): State<WizardRouteState>) -> Response {
    match state.manager.finish().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => wizard_error_response(e),
    }
}

async fn skip(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.skip().await)
}

async fn reset(State(state): State<WizardRouteState>) -> impl IntoResponse {
    Json(state.manager.reset().await)
}
