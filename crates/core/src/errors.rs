use std::fmt;

use thiserror::Error;

use crate::domain::generation::FALLBACK_ANSWER;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Upstream {
    Search,
    Generation,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineErrorKind {
    UpstreamUnavailable,
    MalformedResponse,
    InvalidQuery,
    Encoding,
}

impl PipelineErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::InvalidQuery => "invalid_query",
            Self::Encoding => "encoding",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{service} service unavailable: {message}")]
    UpstreamUnavailable { service: Upstream, message: String },
    #[error("malformed {service} response: {message}")]
    MalformedResponse { service: Upstream, message: String },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("prompt encoding failed: {0}")]
    Encoding(String),
}

impl PipelineError {
    pub fn unavailable(service: Upstream, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable { service, message: message.into() }
    }

    pub fn malformed(service: Upstream, message: impl Into<String>) -> Self {
        Self::MalformedResponse { service, message: message.into() }
    }

    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::UpstreamUnavailable { .. } => PipelineErrorKind::UpstreamUnavailable,
            Self::MalformedResponse { .. } => PipelineErrorKind::MalformedResponse,
            Self::InvalidQuery(_) => PipelineErrorKind::InvalidQuery,
            Self::Encoding(_) => PipelineErrorKind::Encoding,
        }
    }

    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            Self::UpstreamUnavailable { service, .. } | Self::MalformedResponse { service, .. } => {
                Some(*service)
            }
            Self::InvalidQuery(_) | Self::Encoding(_) => None,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "I could not understand that question. Please try rephrasing it.",
            Self::ServiceUnavailable { .. } => {
                "I am having trouble reaching my knowledge sources. Please try again shortly."
            }
            Self::Internal { .. } => FALLBACK_ANSWER,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<PipelineError> for InterfaceError {
    fn from(value: PipelineError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            PipelineError::InvalidQuery(_) => Self::BadRequest { message, correlation_id },
            PipelineError::UpstreamUnavailable { .. } | PipelineError::MalformedResponse { .. } => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            PipelineError::Encoding(_) => Self::Internal { message, correlation_id },
        }
    }
}
