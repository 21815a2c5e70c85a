use std::collections::BTreeMap;

use askdesk_core::config::{DialogConfig, Suggestion};
use serde::Serialize;
use serde_json::Value;

pub const INTENT_CONTEXT: &str = "intentContext";
pub const INTENT_CONTEXT_TTL_SECS: u32 = 86_400;
pub const INTENT_CONTEXT_TURNS: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DialogActionType {
    ElicitIntent,
    Delegate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub kind: DialogActionType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeToLive {
    pub time_to_live_in_seconds: u32,
    pub turns_to_live: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContext {
    pub name: String,
    pub context_attributes: BTreeMap<String, String>,
    pub time_to_live: TimeToLive,
}

impl ActiveContext {
    pub fn intent_context(context_attributes: BTreeMap<String, String>) -> Self {
        Self {
            name: INTENT_CONTEXT.to_owned(),
            context_attributes,
            time_to_live: TimeToLive {
                time_to_live_in_seconds: INTENT_CONTEXT_TTL_SECS,
                turns_to_live: INTENT_CONTEXT_TURNS,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardButton {
    pub text: String,
    pub value: String,
}

impl From<&Suggestion> for CardButton {
    fn from(suggestion: &Suggestion) -> Self {
        Self { text: suggestion.text.clone(), value: suggestion.value.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageResponseCard {
    pub title: String,
    pub buttons: Vec<CardButton>,
}

impl ImageResponseCard {
    /// The suggestion card shown after every answer.
    pub fn suggestions(config: &DialogConfig) -> Self {
        Self {
            title: config.card_title.clone(),
            buttons: config.suggestions.iter().map(CardButton::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "contentType")]
pub enum Message {
    PlainText {
        content: String,
    },
    ImageResponseCard {
        #[serde(rename = "imageResponseCard")]
        card: ImageResponseCard,
    },
}

impl Message {
    pub fn plain(content: impl Into<String>) -> Self {
        Self::PlainText { content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSessionState {
    pub dialog_action: DialogAction,
    pub session_attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_contexts: Vec<ActiveContext>,
}

/// Envelope returned to the dialog manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: ResponseSessionState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl DialogResponse {
    pub fn action(&self) -> DialogActionType {
        self.session_state.dialog_action.kind
    }

    /// Text of the first plain-text message, if any.
    pub fn plain_text(&self) -> Option<&str> {
        self.messages.iter().find_map(|message| match message {
            Message::PlainText { content } => Some(content.as_str()),
            Message::ImageResponseCard { .. } => None,
        })
    }
}

pub struct ResponseBuilder {
    state: ResponseSessionState,
    messages: Vec<Message>,
}

impl ResponseBuilder {
    pub fn elicit_intent(session_attributes: BTreeMap<String, String>) -> Self {
        Self::with_action(DialogActionType::ElicitIntent, session_attributes)
    }

    pub fn delegate(session_attributes: BTreeMap<String, String>) -> Self {
        Self::with_action(DialogActionType::Delegate, session_attributes)
    }

    fn with_action(kind: DialogActionType, session_attributes: BTreeMap<String, String>) -> Self {
        Self {
            state: ResponseSessionState {
                dialog_action: DialogAction { kind },
                session_attributes,
                intent: None,
                active_contexts: Vec::new(),
            },
            messages: Vec::new(),
        }
    }

    pub fn intent(mut self, intent: Option<Value>) -> Self {
        self.state.intent = intent;
        self
    }

    pub fn active_context(mut self, context: ActiveContext) -> Self {
        self.state.active_contexts.push(context);
        self
    }

    pub fn plain_text(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::plain(content));
        self
    }

    pub fn card<F>(mut self, title: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut CardBuilder),
    {
        let mut builder = CardBuilder::default();
        build(&mut builder);
        self.messages.push(Message::ImageResponseCard {
            card: ImageResponseCard { title: title.into(), buttons: builder.buttons },
        });
        self
    }

    pub fn response_card(mut self, card: ImageResponseCard) -> Self {
        self.messages.push(Message::ImageResponseCard { card });
        self
    }

    pub fn build(self) -> DialogResponse {
        DialogResponse { session_state: self.state, messages: self.messages }
    }
}

#[derive(Default)]
pub struct CardBuilder {
    buttons: Vec<CardButton>,
}

impl CardBuilder {
    pub fn button(&mut self, text: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.buttons.push(CardButton { text: text.into(), value: value.into() });
        self
    }
}

/// Answer followed by the configured suggestion card.
pub fn answer_response(
    answer: &str,
    session_attributes: BTreeMap<String, String>,
    dialog: &DialogConfig,
) -> DialogResponse {
    ResponseBuilder::elicit_intent(session_attributes)
        .plain_text(answer)
        .response_card(ImageResponseCard::suggestions(dialog))
        .build()
}
