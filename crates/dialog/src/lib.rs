//! Dialog manager boundary.
//!
//! Turns code hook invocations into answers and shapes the replies the
//! dialog manager expects:
//! - **Events** (`events`) - event parsing, dispatch by invocation source
//! - **Responses** (`response`) - `ElicitIntent` and `Delegate` envelopes
//!
//! ```text
//! Code hook → EventDispatcher → DialogCodeHookHandler → UtteranceService
//!                  ↓
//!           DialogResponse ← answer + suggestion card
//! ```

pub mod events;
pub mod response;

pub use events::{
    default_dispatcher, delegate_response, DialogCodeHookHandler, DialogError, DialogEvent,
    EventContext, EventDispatcher, EventHandler, FulfillmentHandler, InvocationSource,
    SessionState, UtteranceService,
};
pub use response::{
    answer_response, DialogActionType, DialogResponse, ImageResponseCard, Message,
    ResponseBuilder,
};
