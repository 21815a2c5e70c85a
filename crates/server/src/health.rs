use askdesk_core::config::AppConfig;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    search_endpoint: String,
    generation_endpoint: String,
    model_id: String,
}

impl HealthState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            search_endpoint: config.search_endpoint(),
            generation_endpoint: config.generation_endpoint(),
            model_id: config.generation.model_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub search: HealthCheck,
    pub generation: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Liveness plus the upstreams this process will call. Upstreams are not
/// contacted; `askdesk doctor` does that.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "askdesk-server runtime initialized".to_string(),
        },
        search: HealthCheck {
            status: "configured",
            detail: format!("index queries go to {}", state.search_endpoint),
        },
        generation: HealthCheck {
            status: "configured",
            detail: format!("model `{}` at {}", state.model_id, state.generation_endpoint),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
