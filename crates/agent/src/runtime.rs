use std::sync::Arc;

use askdesk_core::annotate::ResultAnnotator;
use askdesk_core::config::AppConfig;
use askdesk_core::domain::generation::Answer;
use askdesk_core::errors::PipelineError;
use askdesk_core::prompt::PromptComposer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::llm::InvokeModelClient;
use crate::recovery::{RecoveryDecision, RecoveryPolicy};
use crate::search::IndexSearchClient;
use crate::tools::{CompanyFaqTool, Tool};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunContext {
    pub correlation_id: String,
}

impl RunContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }

    pub fn generate() -> Self {
        Self::new(format!("req-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(Answer),
    Recovered { answer: Answer, reason_code: &'static str, error: PipelineError },
}

impl RunOutcome {
    pub fn answer(&self) -> &Answer {
        match self {
            Self::Completed(answer) | Self::Recovered { answer, .. } => answer,
        }
    }

    pub fn into_answer(self) -> Answer {
        match self {
            Self::Completed(answer) | Self::Recovered { answer, .. } => answer,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Runs its one tool for every utterance. Holds no per-question state.
pub struct SingleToolAgent {
    tool: Box<dyn Tool>,
    recovery: RecoveryPolicy,
}

impl SingleToolAgent {
    pub fn new(tool: impl Tool + 'static, recovery: RecoveryPolicy) -> Self {
        Self { tool: Box::new(tool), recovery }
    }

    /// Wires the HTTP clients, annotator and composer described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let search = IndexSearchClient::from_config(config)?;
        let generation = InvokeModelClient::from_config(config)?;
        let tool = CompanyFaqTool::new(
            Arc::new(search),
            ResultAnnotator::default(),
            PromptComposer::from_config(config),
            Arc::new(generation),
        );
        Ok(Self::new(tool, RecoveryPolicy::from_config(&config.assistant)))
    }

    pub fn tool_name(&self) -> &'static str {
        self.tool.name()
    }

    pub fn tool_description(&self) -> &'static str {
        self.tool.description()
    }

    pub async fn run(&self, utterance: &str) -> Result<RunOutcome, PipelineError> {
        self.run_with_context(utterance, &RunContext::generate()).await
    }

    pub async fn run_with_context(
        &self,
        utterance: &str,
        context: &RunContext,
    ) -> Result<RunOutcome, PipelineError> {
        info!(
            event_name = "agent.run.started",
            correlation_id = %context.correlation_id,
            tool = self.tool.name(),
            "running tool"
        );

        let error = match self.tool.execute(utterance, context).await {
            Ok(answer) => {
                info!(
                    event_name = "agent.run.completed",
                    correlation_id = %context.correlation_id,
                    "tool completed"
                );
                return Ok(RunOutcome::Completed(answer));
            }
            Err(error) => error,
        };

        match self.recovery.evaluate(&error) {
            RecoveryDecision::Recover { reason_code, answer } => {
                warn!(
                    event_name = "agent.run.recovered",
                    correlation_id = %context.correlation_id,
                    reason_code,
                    error_kind = error.kind().as_str(),
                    error = %error,
                    "tool failed, answering with fallback"
                );
                Ok(RunOutcome::Recovered { answer, reason_code, error })
            }
            RecoveryDecision::Propagate { reason_code } => {
                error!(
                    event_name = "agent.run.failed",
                    correlation_id = %context.correlation_id,
                    reason_code,
                    error_kind = error.kind().as_str(),
                    error = %error,
                    "tool failed"
                );
                Err(error)
            }
        }
    }
}
