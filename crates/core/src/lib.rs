pub mod annotate;
pub mod config;
pub mod domain;
pub mod errors;
pub mod prompt;

pub use annotate::{ResultAnnotator, SOURCE_URI_ATTRIBUTE};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, Suggestion};
pub use domain::generation::{Answer, GenerationRequest, GenerationResponse};
pub use domain::question::{Question, MAX_QUESTION_CHARS};
pub use domain::search::{SearchQuery, SearchResultItem, SearchResultSet};
pub use errors::{InterfaceError, PipelineError, PipelineErrorKind, Upstream};
pub use prompt::{DecodingParameters, Prompt, PromptComposer};
