//! Retrieval against the enterprise search index.

use std::time::Duration;

use askdesk_core::config::AppConfig;
use askdesk_core::domain::question::Question;
use askdesk_core::domain::search::{SearchQuery, SearchResultSet};
use askdesk_core::errors::{PipelineError, Upstream};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

pub const QUERY_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
pub const QUERY_TARGET: &str = "AWSKendraFrontendService.Query";
pub const TARGET_HEADER: &str = "X-Amz-Target";

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetches the first page of results for `question`.
    async fn search(&self, question: &Question) -> Result<SearchResultSet, PipelineError>;
}

#[derive(Clone)]
pub struct IndexSearchClient {
    client: Client,
    endpoint: String,
    index_id: String,
    page_size: u32,
    api_key: Option<SecretString>,
}

impl IndexSearchClient {
    pub fn new(endpoint: impl Into<String>, index_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            index_id: index_id.into(),
            page_size,
            api_key: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.search.timeout_secs))
            .build()
            .map_err(|error| {
                PipelineError::unavailable(
                    Upstream::Search,
                    format!("could not build http client: {error}"),
                )
            })?;

        Ok(Self {
            client,
            endpoint: config.search_endpoint(),
            index_id: config.search.index_id.clone(),
            page_size: config.search.page_size,
            api_key: config.search.api_key.clone(),
        })
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SearchClient for IndexSearchClient {
    async fn search(&self, question: &Question) -> Result<SearchResultSet, PipelineError> {
        let query = SearchQuery::first_page(&self.index_id, question.as_str(), self.page_size);
        let body =
            serde_json::to_vec(&query).map_err(|error| PipelineError::Encoding(error.to_string()))?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, QUERY_CONTENT_TYPE)
            .header(ACCEPT, QUERY_CONTENT_TYPE)
            .header(TARGET_HEADER, QUERY_TARGET)
            .body(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            PipelineError::unavailable(Upstream::Search, format!("query request failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::unavailable(
                Upstream::Search,
                format!("query endpoint returned {status}"),
            ));
        }

        let mut results: SearchResultSet = response.json().await.map_err(|error| {
            PipelineError::malformed(
                Upstream::Search,
                format!("failed to decode result set: {error}"),
            )
        })?;

        let limit = self.page_size as usize;
        if results.len() > limit {
            warn!(
                event_name = "pipeline.search.surplus_dropped",
                returned = results.len(),
                page_size = limit,
                "index returned more items than requested"
            );
            results.result_items.truncate(limit);
        }

        debug!(event_name = "pipeline.search.completed", items = results.len(), "search completed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use askdesk_core::domain::question::Question;
    use askdesk_core::errors::{PipelineErrorKind, Upstream};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use super::{IndexSearchClient, SearchClient};

    #[derive(Clone, Debug, Default)]
    struct Captured {
        headers: Vec<(String, String)>,
        body: Option<Value>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn header(captured: &Captured, name: &str) -> Option<String> {
        captured
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    async fn capturing_stub(reply: Value) -> (String, Arc<Mutex<Captured>>) {
        let captured = Arc::new(Mutex::new(Captured::default()));
        let sink = captured.clone();
        let router = Router::new().route(
            "/",
            post(move |headers: HeaderMap, body: String| {
                let sink = sink.clone();
                let reply = reply.clone();
                async move {
                    let headers = headers
                        .iter()
                        .map(|(key, value)| {
                            (key.to_string(), value.to_str().unwrap_or_default().to_owned())
                        })
                        .collect();
                    let body = serde_json::from_str(&body).ok();
                    *sink.lock().expect("capture lock") = Captured { headers, body };
                    Json(reply)
                }
            }),
        );
        (serve(router).await, captured)
    }

    #[tokio::test]
    async fn sends_the_query_contract() {
        let (endpoint, captured) = capturing_stub(json!({"QueryId": "q-1", "ResultItems": []})).await;
        let client = IndexSearchClient::new(endpoint, "idx-1", 5)
            .with_api_key(SecretString::from("token-1".to_owned()));
        let question = Question::parse("What is your return policy?").expect("valid question");

        let results = client.search(&question).await.expect("search succeeds");

        assert!(results.is_empty());
        let captured = captured.lock().expect("capture lock").clone();
        assert_eq!(
            captured.body,
            Some(json!({
                "IndexId": "idx-1",
                "QueryText": "What is your return policy?",
                "PageNumber": 1,
                "PageSize": 5
            }))
        );
        assert_eq!(header(&captured, "content-type").as_deref(), Some("application/x-amz-json-1.1"));
        assert_eq!(
            header(&captured, "x-amz-target").as_deref(),
            Some("AWSKendraFrontendService.Query")
        );
        assert_eq!(header(&captured, "authorization").as_deref(), Some("Bearer token-1"));
    }

    #[tokio::test]
    async fn surplus_items_are_dropped() {
        let items: Vec<Value> = (0..8).map(|index| json!({"Id": format!("r-{index}")})).collect();
        let (endpoint, _) = capturing_stub(json!({"ResultItems": items})).await;
        let client = IndexSearchClient::new(endpoint, "idx-1", 5);
        let question = Question::parse("How can I contact you?").expect("valid question");

        let results = client.search(&question).await.expect("search succeeds");

        assert_eq!(results.len(), 5);
        assert_eq!(results.result_items[4].metadata["Id"], "r-4");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_unavailable() {
        let router = Router::new().route(
            "/",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "throttled") }),
        );
        let client = IndexSearchClient::new(serve(router).await, "idx-1", 5);
        let question = Question::parse("What is your return policy?").expect("valid question");

        let error = client.search(&question).await.expect_err("search fails");

        assert_eq!(error.kind(), PipelineErrorKind::UpstreamUnavailable);
        assert_eq!(error.upstream(), Some(Upstream::Search));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let router = Router::new().route("/", post(|| async { Json(json!({"ResultItems": 42})) }));
        let client = IndexSearchClient::new(serve(router).await, "idx-1", 5);
        let question = Question::parse("What is your return policy?").expect("valid question");

        let error = client.search(&question).await.expect_err("search fails");

        assert_eq!(error.kind(), PipelineErrorKind::MalformedResponse);
        assert_eq!(error.upstream(), Some(Upstream::Search));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        drop(listener);
        let client = IndexSearchClient::new(format!("http://{address}"), "idx-1", 5);
        let question = Question::parse("What is your return policy?").expect("valid question");

        let error = client.search(&question).await.expect_err("search fails");

        assert_eq!(error.kind(), PipelineErrorKind::UpstreamUnavailable);
    }
}
