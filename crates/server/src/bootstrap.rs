use std::sync::Arc;

use askdesk_agent::SingleToolAgent;
use askdesk_core::config::{AppConfig, ConfigError};
use askdesk_core::errors::PipelineError;
use axum::Router;
use thiserror::Error;
use tracing::info;

use crate::fulfillment::{self, FulfillmentState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub agent: Arc<SingleToolAgent>,
}

impl Application {
    pub fn router(&self) -> Router {
        fulfillment::router(FulfillmentState::new(self.agent.clone(), self.config.dialog.clone()))
            .merge(health::router(HealthState::from_config(&self.config)))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("agent construction failed: {0}")]
    Agent(#[from] PipelineError),
}

#[cfg(test)]
pub async fn bootstrap(
    options: askdesk_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let agent = SingleToolAgent::from_config(&config)?;
    info!(
        event_name = "system.bootstrap.agent_ready",
        correlation_id = "bootstrap",
        tool = agent.tool_name(),
        search_endpoint = %config.search_endpoint(),
        generation_endpoint = %config.generation_endpoint(),
        model_id = %config.generation.model_id,
        "agent wired"
    );

    Ok(Application { config, agent: Arc::new(agent) })
}

#[cfg(test)]
mod tests {
    use askdesk_core::config::{ConfigOverrides, LoadOptions};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap;

    fn missing_config() -> std::path::PathBuf {
        std::env::temp_dir().join("askdesk-bootstrap-test-missing.toml")
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_index() {
        let result = bootstrap(LoadOptions {
            config_path: Some(missing_config()),
            overrides: ConfigOverrides {
                search_index_id: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = match result {
            Ok(_) => String::new(),
            Err(error) => error.to_string(),
        };
        assert!(message.contains("search.index_id"));
    }

    #[tokio::test]
    async fn bootstrap_wires_agent_and_routes() {
        let app = bootstrap(LoadOptions {
            config_path: Some(missing_config()),
            overrides: ConfigOverrides {
                search_index_id: Some("idx-bootstrap".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with an index id");

        assert_eq!(app.agent.tool_name(), "CompanyFAQ");

        let response = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
