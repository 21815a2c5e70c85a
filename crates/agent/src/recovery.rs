use askdesk_core::config::AssistantConfig;
use askdesk_core::domain::generation::Answer;
use askdesk_core::errors::{PipelineError, Upstream};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryDecision {
    Recover { reason_code: &'static str, answer: Answer },
    Propagate { reason_code: &'static str },
}

impl RecoveryDecision {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Recover { reason_code, .. } | Self::Propagate { reason_code } => reason_code,
        }
    }
}

/// Decides which pipeline failures the agent absorbs into the fallback answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub fallback_answer: Answer,
    pub recover_upstream_failures: bool,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self { fallback_answer: Answer::fallback(), recover_upstream_failures: false }
    }
}

impl RecoveryPolicy {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            fallback_answer: Answer::new(config.fallback_answer.clone())
                .unwrap_or_else(Answer::fallback),
            recover_upstream_failures: config.recover_upstream_failures,
        }
    }

    pub fn evaluate(&self, error: &PipelineError) -> RecoveryDecision {
        match error {
            PipelineError::InvalidQuery(_) => self.recover("invalid_query"),
            PipelineError::MalformedResponse { service: Upstream::Search, .. } => {
                self.recover("malformed_search_response")
            }
            PipelineError::MalformedResponse { service: Upstream::Generation, .. } => {
                self.recover("malformed_generation_response")
            }
            PipelineError::UpstreamUnavailable { .. } if self.recover_upstream_failures => {
                self.recover("upstream_unavailable")
            }
            PipelineError::UpstreamUnavailable { .. } => {
                RecoveryDecision::Propagate { reason_code: "upstream_unavailable" }
            }
            PipelineError::Encoding(_) => {
                RecoveryDecision::Propagate { reason_code: "prompt_encoding_failed" }
            }
        }
    }

    fn recover(&self, reason_code: &'static str) -> RecoveryDecision {
        RecoveryDecision::Recover { reason_code, answer: self.fallback_answer.clone() }
    }
}
