use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use askdesk_core::config::DialogConfig;
use askdesk_core::errors::InterfaceError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::response::{answer_response, ActiveContext, DialogResponse, ResponseBuilder, INTENT_CONTEXT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum InvocationSource {
    DialogCodeHook,
    FulfillmentCodeHook,
    #[serde(other)]
    Unsupported,
}

impl InvocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DialogCodeHook => "DialogCodeHook",
            Self::FulfillmentCodeHook => "FulfillmentCodeHook",
            Self::Unsupported => "Unsupported",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundContext {
    pub name: String,
    #[serde(default)]
    pub context_attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub session_attributes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub intent: Option<Value>,
    #[serde(default)]
    pub active_contexts: Option<Vec<InboundContext>>,
}

impl SessionState {
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.session_attributes.clone().unwrap_or_default()
    }

    /// Attributes of the `intentContext` context the dialog manager sent back, if any.
    pub fn intent_context_attributes(&self) -> BTreeMap<String, String> {
        self.active_contexts
            .iter()
            .flatten()
            .find(|context| context.name == INTENT_CONTEXT)
            .map(|context| context.context_attributes.clone())
            .unwrap_or_default()
    }
}

/// Code hook invocation from the dialog manager.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEvent {
    #[serde(default)]
    pub input_transcript: String,
    pub invocation_source: InvocationSource,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_state: SessionState,
}

impl DialogEvent {
    pub fn from_json(raw: &[u8]) -> Result<Self, DialogError> {
        serde_json::from_slice(raw).map_err(|error| DialogError::InvalidEvent(error.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("invalid dialog event: {0}")]
    InvalidEvent(String),
    #[error(transparent)]
    Service(#[from] InterfaceError),
}

/// Produces the answer text for one utterance.
#[async_trait]
pub trait UtteranceService: Send + Sync {
    async fn answer(&self, utterance: &str, ctx: &EventContext) -> Result<String, InterfaceError>;
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn invocation_source(&self) -> InvocationSource;
    async fn handle(
        &self,
        event: &DialogEvent,
        ctx: &EventContext,
    ) -> Result<DialogResponse, DialogError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<InvocationSource, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.invocation_source(), Arc::new(handler));
    }

    /// Routes `event` to its handler. Sources nobody handles are delegated
    /// back to the dialog manager unchanged.
    pub async fn dispatch(
        &self,
        event: &DialogEvent,
        ctx: &EventContext,
    ) -> Result<DialogResponse, DialogError> {
        info!(
            event_name = "dialog.event.received",
            correlation_id = %ctx.correlation_id,
            invocation_source = event.invocation_source.as_str(),
            session_id = event.session_id.as_deref().unwrap_or(""),
            "dialog event received"
        );

        match self.handlers.get(&event.invocation_source) {
            Some(handler) => handler.handle(event, ctx).await,
            None => Ok(delegate_response(event, None)),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher answering code hooks with `service` and delegating fulfillment.
pub fn default_dispatcher<S>(service: S, dialog: DialogConfig) -> EventDispatcher
where
    S: UtteranceService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(DialogCodeHookHandler::new(service, dialog));
    dispatcher.register(FulfillmentHandler);
    dispatcher
}

pub struct DialogCodeHookHandler<S> {
    service: S,
    dialog: DialogConfig,
}

impl<S> DialogCodeHookHandler<S>
where
    S: UtteranceService,
{
    pub fn new(service: S, dialog: DialogConfig) -> Self {
        Self { service, dialog }
    }
}

#[async_trait]
impl<S> EventHandler for DialogCodeHookHandler<S>
where
    S: UtteranceService + 'static,
{
    fn invocation_source(&self) -> InvocationSource {
        InvocationSource::DialogCodeHook
    }

    async fn handle(
        &self,
        event: &DialogEvent,
        ctx: &EventContext,
    ) -> Result<DialogResponse, DialogError> {
        let attributes = event.session_state.attributes();
        let text = match self.service.answer(&event.input_transcript, ctx).await {
            Ok(answer) => answer,
            Err(failure) => {
                error!(
                    event_name = "dialog.answer.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %failure,
                    "answering failed, replying with a user-safe message"
                );
                failure.user_message().to_owned()
            }
        };

        Ok(answer_response(&text, attributes, &self.dialog))
    }
}

pub struct FulfillmentHandler;

#[async_trait]
impl EventHandler for FulfillmentHandler {
    fn invocation_source(&self) -> InvocationSource {
        InvocationSource::FulfillmentCodeHook
    }

    async fn handle(
        &self,
        event: &DialogEvent,
        _ctx: &EventContext,
    ) -> Result<DialogResponse, DialogError> {
        Ok(delegate_response(event, None))
    }
}

/// Hands control back to the dialog manager, keeping the intent context alive.
pub fn delegate_response(event: &DialogEvent, message: Option<&str>) -> DialogResponse {
    let state = &event.session_state;
    let mut builder = ResponseBuilder::delegate(state.attributes())
        .intent(state.intent.clone())
        .active_context(ActiveContext::intent_context(state.intent_context_attributes()));
    if let Some(message) = message {
        builder = builder.plain_text(message);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use askdesk_core::config::AppConfig;
    use askdesk_core::errors::{InterfaceError, PipelineError, Upstream};
    use async_trait::async_trait;
    use serde_json::json;

    use super::{
        default_dispatcher, DialogError, DialogEvent, EventContext, EventDispatcher,
        InvocationSource, UtteranceService,
    };
    use crate::response::DialogActionType;

    struct EchoService {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UtteranceService for EchoService {
        async fn answer(
            &self,
            utterance: &str,
            _ctx: &EventContext,
        ) -> Result<String, InterfaceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("answer to: {utterance}"))
        }
    }

    struct FailingService;

    #[async_trait]
    impl UtteranceService for FailingService {
        async fn answer(
            &self,
            _utterance: &str,
            ctx: &EventContext,
        ) -> Result<String, InterfaceError> {
            Err(PipelineError::unavailable(Upstream::Search, "connection refused to 10.0.0.7")
                .into_interface(ctx.correlation_id.clone()))
        }
    }

    fn event(value: serde_json::Value) -> DialogEvent {
        DialogEvent::from_json(value.to_string().as_bytes()).expect("valid event")
    }

    fn dispatcher_with_calls() -> (EventDispatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = EchoService { calls: calls.clone() };
        (default_dispatcher(service, AppConfig::default().dialog), calls)
    }

    #[test]
    fn parses_code_hook_events() {
        let parsed = event(json!({
            "inputTranscript": "What is your return policy?",
            "invocationSource": "DialogCodeHook",
            "sessionId": "s-1",
            "sessionState": {"sessionAttributes": {"k": "v"}, "intent": {"name": "FallbackIntent"}}
        }));

        assert_eq!(parsed.invocation_source, InvocationSource::DialogCodeHook);
        assert_eq!(parsed.session_state.attributes().get("k").map(String::as_str), Some("v"));
        assert_eq!(parsed.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn unknown_sources_and_null_attributes_are_tolerated() {
        let parsed = event(json!({
            "inputTranscript": "hi",
            "invocationSource": "SomethingNew",
            "sessionState": {"sessionAttributes": null}
        }));

        assert_eq!(parsed.invocation_source, InvocationSource::Unsupported);
        assert!(parsed.session_state.attributes().is_empty());
    }

    #[test]
    fn malformed_events_are_rejected() {
        let error = DialogEvent::from_json(b"{\"inputTranscript\": 3}").expect_err("invalid");
        assert!(matches!(error, DialogError::InvalidEvent(_)));
    }

    #[tokio::test]
    async fn dialog_code_hook_answers_with_elicit_intent() {
        let (dispatcher, calls) = dispatcher_with_calls();
        let request = event(json!({
            "inputTranscript": "How can I contact you?",
            "invocationSource": "DialogCodeHook",
            "sessionState": {"sessionAttributes": {"channel": "web"}}
        }));

        let response =
            dispatcher.dispatch(&request, &EventContext::default()).await.expect("dispatches");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.action(), DialogActionType::ElicitIntent);
        assert_eq!(response.plain_text(), Some("answer to: How can I contact you?"));
        assert_eq!(
            response.session_state.session_attributes.get("channel").map(String::as_str),
            Some("web")
        );
        assert_eq!(response.messages.len(), 2);
    }

    #[tokio::test]
    async fn fulfillment_is_delegated_without_answering() {
        let (dispatcher, calls) = dispatcher_with_calls();
        let request = event(json!({
            "inputTranscript": "",
            "invocationSource": "FulfillmentCodeHook",
            "sessionState": {
                "intent": {"name": "FallbackIntent"},
                "activeContexts": [{"name": "intentContext", "contextAttributes": {"topic": "returns"}}]
            }
        }));

        let response =
            dispatcher.dispatch(&request, &EventContext::default()).await.expect("dispatches");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.action(), DialogActionType::Delegate);
        let value = serde_json::to_value(&response).expect("serializes");
        assert_eq!(value["sessionState"]["intent"]["name"], "FallbackIntent");
        assert_eq!(
            value["sessionState"]["activeContexts"][0]["contextAttributes"]["topic"],
            "returns"
        );
    }

    #[tokio::test]
    async fn service_failures_become_user_safe_messages() {
        let dispatcher = default_dispatcher(FailingService, AppConfig::default().dialog);
        let request = event(json!({
            "inputTranscript": "What is your return policy?",
            "invocationSource": "DialogCodeHook",
            "sessionState": {}
        }));

        let response = dispatcher
            .dispatch(&request, &EventContext { correlation_id: "req-9".to_owned() })
            .await
            .expect("dispatches");

        let text = response.plain_text().unwrap_or_default();
        assert!(!text.is_empty());
        assert!(!text.contains("10.0.0.7"));
        assert_eq!(response.action(), DialogActionType::ElicitIntent);
    }

    #[tokio::test]
    async fn unhandled_sources_are_delegated() {
        let dispatcher = EventDispatcher::new();
        let request = event(json!({"invocationSource": "DialogCodeHook"}));

        let response =
            dispatcher.dispatch(&request, &EventContext::default()).await.expect("dispatches");

        assert_eq!(dispatcher.handler_count(), 0);
        assert_eq!(response.action(), DialogActionType::Delegate);
    }
}
