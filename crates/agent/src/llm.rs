use std::time::Duration;

use askdesk_core::config::AppConfig;
use askdesk_core::domain::generation::{Answer, GenerationResponse};
use askdesk_core::errors::{PipelineError, Upstream};
use askdesk_core::prompt::Prompt;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<Answer, PipelineError>;
}

/// Calls the hosted model's `invoke` route with a composed prompt.
#[derive(Clone)]
pub struct InvokeModelClient {
    client: Client,
    endpoint: String,
    model_id: String,
    api_key: Option<SecretString>,
}

impl InvokeModelClient {
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            api_key: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.generation.timeout_secs))
            .build()
            .map_err(|error| {
                PipelineError::unavailable(
                    Upstream::Generation,
                    format!("could not build http client: {error}"),
                )
            })?;

        Ok(Self {
            client,
            endpoint: config.generation_endpoint(),
            model_id: config.generation.model_id.clone(),
            api_key: config.generation.api_key.clone(),
        })
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint.trim_end_matches('/'), self.model_id)
    }
}

#[async_trait]
impl GenerationClient for InvokeModelClient {
    async fn generate(&self, prompt: &Prompt) -> Result<Answer, PipelineError> {
        let mut request = self
            .client
            .post(self.invoke_url())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(prompt.request());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            PipelineError::unavailable(Upstream::Generation, format!("invoke request failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::unavailable(
                Upstream::Generation,
                format!("invoke endpoint returned {status}"),
            ));
        }

        let body: GenerationResponse = response.json().await.map_err(|error| {
            PipelineError::malformed(
                Upstream::Generation,
                format!("failed to decode model response: {error}"),
            )
        })?;

        if let Some(usage) = body.usage {
            debug!(
                event_name = "pipeline.generation.usage",
                model_id = %self.model_id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = body.stop_reason.as_deref().unwrap_or("unknown"),
                "model invocation completed"
            );
        }

        extract_answer(&body)
    }
}

/// Returns exactly the text of the first content block.
pub fn extract_answer(response: &GenerationResponse) -> Result<Answer, PipelineError> {
    let first = response
        .content
        .as_deref()
        .and_then(|blocks| blocks.first())
        .ok_or_else(|| PipelineError::malformed(Upstream::Generation, "response has no content"))?;

    let text = first.text.as_deref().ok_or_else(|| {
        PipelineError::malformed(Upstream::Generation, "first content block has no text")
    })?;

    Answer::new(text)
        .ok_or_else(|| PipelineError::malformed(Upstream::Generation, "model returned a blank answer"))
}
