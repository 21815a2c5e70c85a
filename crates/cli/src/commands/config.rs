use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use askdesk_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.push(format!("- search endpoint (resolved) = {}", config.search_endpoint()));
    lines.push(format!("- generation endpoint (resolved) = {}", config.generation_endpoint()));

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let suggestions = config
        .dialog
        .suggestions
        .iter()
        .map(|suggestion| suggestion.text.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        Field::new("region", config.region.clone(), &["ASKDESK_REGION", "AWS_REGION"]),
        Field::new(
            "search.index_id",
            config.search.index_id.clone(),
            &["ASKDESK_SEARCH_INDEX_ID", "KENDRA_INDEX_ID"],
        ),
        Field::new(
            "search.endpoint",
            config.search.endpoint.as_deref().unwrap_or("<derived>"),
            &["ASKDESK_SEARCH_ENDPOINT"],
        ),
        Field::new(
            "search.page_size",
            config.search.page_size.to_string(),
            &["ASKDESK_SEARCH_PAGE_SIZE"],
        ),
        Field::new(
            "search.timeout_secs",
            config.search.timeout_secs.to_string(),
            &["ASKDESK_SEARCH_TIMEOUT_SECS"],
        ),
        Field::new(
            "search.api_key",
            redact_secret(config.search.api_key.as_ref()),
            &["ASKDESK_SEARCH_API_KEY"],
        ),
        Field::new(
            "generation.model_id",
            config.generation.model_id.clone(),
            &["ASKDESK_GENERATION_MODEL_ID"],
        ),
        Field::new(
            "generation.endpoint",
            config.generation.endpoint.as_deref().unwrap_or("<derived>"),
            &["ASKDESK_GENERATION_ENDPOINT"],
        ),
        Field::new("generation.protocol_version", config.generation.protocol_version.clone(), &[]),
        Field::new(
            "generation.temperature",
            config.generation.temperature.to_string(),
            &["ASKDESK_GENERATION_TEMPERATURE"],
        ),
        Field::new(
            "generation.max_tokens",
            config.generation.max_tokens.to_string(),
            &["ASKDESK_GENERATION_MAX_TOKENS"],
        ),
        Field::new(
            "generation.timeout_secs",
            config.generation.timeout_secs.to_string(),
            &["ASKDESK_GENERATION_TIMEOUT_SECS"],
        ),
        Field::new(
            "generation.api_key",
            redact_secret(config.generation.api_key.as_ref()),
            &["ASKDESK_GENERATION_API_KEY"],
        ),
        Field::new(
            "assistant.company_name",
            config.assistant.company_name.clone(),
            &["ASKDESK_ASSISTANT_COMPANY_NAME"],
        ),
        Field::new(
            "assistant.fallback_answer",
            config.assistant.fallback_answer.clone(),
            &["ASKDESK_ASSISTANT_FALLBACK_ANSWER"],
        ),
        Field::new(
            "assistant.recover_upstream_failures",
            config.assistant.recover_upstream_failures.to_string(),
            &["ASKDESK_ASSISTANT_RECOVER_UPSTREAM_FAILURES"],
        ),
        Field::new(
            "dialog.card_title",
            config.dialog.card_title.clone(),
            &["ASKDESK_DIALOG_CARD_TITLE"],
        ),
        Field::new("dialog.suggestions", suggestions, &[]),
        Field::new(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["ASKDESK_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["ASKDESK_SERVER_PORT"]),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["ASKDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.clone(),
            &["ASKDESK_LOGGING_LEVEL", "ASKDESK_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ASKDESK_LOGGING_FORMAT", "ASKDESK_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("askdesk.toml"), PathBuf::from("config/askdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> &'static str {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>",
        Some(_) => "<empty>",
        None => "<unset>",
    }
}
