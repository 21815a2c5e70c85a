use std::sync::Arc;

use askdesk_agent::{RunContext, SingleToolAgent};
use askdesk_core::config::DialogConfig;
use askdesk_core::errors::InterfaceError;
use askdesk_dialog::{
    default_dispatcher, DialogError, DialogEvent, EventContext, EventDispatcher, UtteranceService,
};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Answers utterances by running the agent once per question.
pub struct AgentUtteranceService {
    agent: Arc<SingleToolAgent>,
}

impl AgentUtteranceService {
    pub fn new(agent: Arc<SingleToolAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl UtteranceService for AgentUtteranceService {
    async fn answer(&self, utterance: &str, ctx: &EventContext) -> Result<String, InterfaceError> {
        let run_context = RunContext::new(ctx.correlation_id.clone());
        match self.agent.run_with_context(utterance, &run_context).await {
            Ok(outcome) => Ok(outcome.into_answer().into_string()),
            Err(error) => Err(error.into_interface(ctx.correlation_id.clone())),
        }
    }
}

#[derive(Clone)]
pub struct FulfillmentState {
    dispatcher: Arc<EventDispatcher>,
}

impl FulfillmentState {
    pub fn new(agent: Arc<SingleToolAgent>, dialog: DialogConfig) -> Self {
        let dispatcher = default_dispatcher(AgentUtteranceService::new(agent), dialog);
        Self { dispatcher: Arc::new(dispatcher) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(state: FulfillmentState) -> Router {
    Router::new().route("/dialog/fulfillment", post(fulfill)).with_state(state)
}

pub async fn fulfill(
    State(state): State<FulfillmentState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = correlation_id(&headers);
    let ctx = EventContext { correlation_id: correlation_id.clone() };

    let event = match DialogEvent::from_json(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(
                event_name = "server.fulfillment.invalid_event",
                correlation_id = %correlation_id,
                error = %error,
                "rejected dialog event"
            );
            return error_response(StatusCode::BAD_REQUEST, error.to_string(), correlation_id);
        }
    };

    match state.dispatcher.dispatch(&event, &ctx).await {
        Ok(response) => {
            info!(
                event_name = "server.fulfillment.responded",
                correlation_id = %correlation_id,
                invocation_source = event.invocation_source.as_str(),
                "dialog event answered"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(DialogError::InvalidEvent(message)) => {
            error_response(StatusCode::BAD_REQUEST, message, correlation_id)
        }
        Err(DialogError::Service(error)) => {
            warn!(
                event_name = "server.fulfillment.failed",
                correlation_id = %correlation_id,
                error = %error,
                "dialog event could not be answered"
            );
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                error.user_message().to_string(),
                correlation_id,
            )
        }
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()))
}

fn error_response(status: StatusCode, error: String, correlation_id: String) -> Response {
    (status, Json(ErrorBody { error, correlation_id })).into_response()
}
