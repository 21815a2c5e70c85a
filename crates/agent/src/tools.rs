use std::sync::Arc;

use askdesk_core::annotate::ResultAnnotator;
use askdesk_core::domain::generation::Answer;
use askdesk_core::domain::question::Question;
use askdesk_core::errors::PipelineError;
use askdesk_core::prompt::PromptComposer;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::llm::GenerationClient;
use crate::runtime::RunContext;
use crate::search::SearchClient;

pub const COMPANY_FAQ_TOOL: &str = "CompanyFAQ";
pub const COMPANY_FAQ_DESCRIPTION: &str = "Use this tool to answer questions about the company.";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &str, context: &RunContext) -> Result<Answer, PipelineError>;
}

/// Retrieval-augmented answering over the company knowledge index.
pub struct CompanyFaqTool {
    search: Arc<dyn SearchClient>,
    annotator: ResultAnnotator,
    composer: PromptComposer,
    generation: Arc<dyn GenerationClient>,
}

impl CompanyFaqTool {
    pub fn new(
        search: Arc<dyn SearchClient>,
        annotator: ResultAnnotator,
        composer: PromptComposer,
        generation: Arc<dyn GenerationClient>,
    ) -> Self {
        Self { search, annotator, composer, generation }
    }
}

#[async_trait]
impl Tool for CompanyFaqTool {
    fn name(&self) -> &'static str {
        COMPANY_FAQ_TOOL
    }

    fn description(&self) -> &'static str {
        COMPANY_FAQ_DESCRIPTION
    }

    async fn execute(&self, input: &str, context: &RunContext) -> Result<Answer, PipelineError> {
        let question = Question::parse(input)?;

        let results = self.search.search(&question).await?;
        info!(
            event_name = "pipeline.search.results",
            correlation_id = %context.correlation_id,
            items = results.len(),
            "retrieved search results"
        );

        let annotated = self.annotator.annotate(&results);
        let prompt = self.composer.compose(&question, &annotated)?;
        debug!(
            event_name = "pipeline.prompt.composed",
            correlation_id = %context.correlation_id,
            context_bytes = prompt.context().len(),
            sources = annotated.source_uris().count(),
            "prompt composed"
        );

        let answer = self.generation.generate(&prompt).await?;
        info!(
            event_name = "pipeline.generation.answered",
            correlation_id = %context.correlation_id,
            answer_chars = answer.as_str().chars().count(),
            "model answered"
        );
        Ok(answer)
    }
}
