use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::generation::FALLBACK_ANSWER;
use crate::prompt::{DEFAULT_MAX_TOKENS, DEFAULT_PROTOCOL_VERSION, DEFAULT_TEMPERATURE};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub region: String,
    pub search: SearchConfig,
    pub generation: GenerationConfig,
    pub assistant: AssistantConfig,
    pub dialog: DialogConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub index_id: String,
    pub endpoint: Option<String>,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub model_id: String,
    pub endpoint: Option<String>,
    pub protocol_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub company_name: String,
    pub fallback_answer: String,
    pub recover_upstream_failures: bool,
}

#[derive(Clone, Debug)]
pub struct DialogConfig {
    pub card_title: String,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub value: String,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: text.into(), value: value.into() }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub region: Option<String>,
    pub search_index_id: Option<String>,
    pub search_endpoint: Option<String>,
    pub generation_model_id: Option<String>,
    pub generation_endpoint: Option<String>,
    pub company_name: Option<String>,
    pub recover_upstream_failures: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            search: SearchConfig {
                index_id: String::new(),
                endpoint: None,
                page_size: DEFAULT_PAGE_SIZE,
                timeout_secs: 10,
                api_key: None,
            },
            generation: GenerationConfig {
                model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
                endpoint: None,
                protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: DEFAULT_MAX_TOKENS,
                timeout_secs: 60,
                api_key: None,
            },
            assistant: AssistantConfig {
                company_name: "AnyCompany".to_string(),
                fallback_answer: FALLBACK_ANSWER.to_string(),
                recover_upstream_failures: false,
            },
            dialog: DialogConfig {
                card_title: "How can I help you?".to_string(),
                suggestions: vec![
                    Suggestion::new("Return Policy", "What is your return policy?"),
                    Suggestion::new("Smart Devices", "Which smart devices Company integrates with?"),
                    Suggestion::new("Contact Information", "How can I contact you?"),
                ],
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("askdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Index query endpoint, derived from the region unless set explicitly.
    pub fn search_endpoint(&self) -> String {
        match &self.search.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://kendra.{}.amazonaws.com", self.region),
        }
    }

    /// Model runtime endpoint, derived from the region unless set explicitly.
    pub fn generation_endpoint(&self) -> String {
        match &self.generation.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(region) = patch.region {
            self.region = region;
        }

        if let Some(search) = patch.search {
            if let Some(index_id) = search.index_id {
                self.search.index_id = index_id;
            }
            if let Some(endpoint) = search.endpoint {
                self.search.endpoint = Some(endpoint);
            }
            if let Some(page_size) = search.page_size {
                self.search.page_size = page_size;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
            if let Some(search_api_key_value) = search.api_key {
                self.search.api_key = Some(secret_value(search_api_key_value));
            }
        }

        if let Some(generation) = patch.generation {
            if let Some(model_id) = generation.model_id {
                self.generation.model_id = model_id;
            }
            if let Some(endpoint) = generation.endpoint {
                self.generation.endpoint = Some(endpoint);
            }
            if let Some(protocol_version) = generation.protocol_version {
                self.generation.protocol_version = protocol_version;
            }
            if let Some(temperature) = generation.temperature {
                self.generation.temperature = temperature;
            }
            if let Some(max_tokens) = generation.max_tokens {
                self.generation.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = generation.timeout_secs {
                self.generation.timeout_secs = timeout_secs;
            }
            if let Some(generation_api_key_value) = generation.api_key {
                self.generation.api_key = Some(secret_value(generation_api_key_value));
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(company_name) = assistant.company_name {
                self.assistant.company_name = company_name;
            }
            if let Some(fallback_answer) = assistant.fallback_answer {
                self.assistant.fallback_answer = fallback_answer;
            }
            if let Some(recover) = assistant.recover_upstream_failures {
                self.assistant.recover_upstream_failures = recover;
            }
        }

        if let Some(dialog) = patch.dialog {
            if let Some(card_title) = dialog.card_title {
                self.dialog.card_title = card_title;
            }
            if let Some(suggestions) = dialog.suggestions {
                self.dialog.suggestions = suggestions;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let region = read_env("ASKDESK_REGION").or_else(|| read_env("AWS_REGION"));
        if let Some(value) = region {
            self.region = value;
        }

        let index_id =
            read_env("ASKDESK_SEARCH_INDEX_ID").or_else(|| read_env("KENDRA_INDEX_ID"));
        if let Some(value) = index_id {
            self.search.index_id = value;
        }
        if let Some(value) = read_env("ASKDESK_SEARCH_ENDPOINT") {
            self.search.endpoint = Some(value);
        }
        if let Some(value) = read_env("ASKDESK_SEARCH_PAGE_SIZE") {
            self.search.page_size = parse_u32("ASKDESK_SEARCH_PAGE_SIZE", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_SEARCH_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_u64("ASKDESK_SEARCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_SEARCH_API_KEY") {
            self.search.api_key = Some(secret_value(value));
        }

        if let Some(value) = read_env("ASKDESK_GENERATION_MODEL_ID") {
            self.generation.model_id = value;
        }
        if let Some(value) = read_env("ASKDESK_GENERATION_ENDPOINT") {
            self.generation.endpoint = Some(value);
        }
        if let Some(value) = read_env("ASKDESK_GENERATION_TEMPERATURE") {
            self.generation.temperature = parse_f32("ASKDESK_GENERATION_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_GENERATION_MAX_TOKENS") {
            self.generation.max_tokens = parse_u32("ASKDESK_GENERATION_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_GENERATION_TIMEOUT_SECS") {
            self.generation.timeout_secs = parse_u64("ASKDESK_GENERATION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_GENERATION_API_KEY") {
            self.generation.api_key = Some(secret_value(value));
        }

        if let Some(value) = read_env("ASKDESK_ASSISTANT_COMPANY_NAME") {
            self.assistant.company_name = value;
        }
        if let Some(value) = read_env("ASKDESK_ASSISTANT_FALLBACK_ANSWER") {
            self.assistant.fallback_answer = value;
        }
        if let Some(value) = read_env("ASKDESK_ASSISTANT_RECOVER_UPSTREAM_FAILURES") {
            self.assistant.recover_upstream_failures =
                parse_bool("ASKDESK_ASSISTANT_RECOVER_UPSTREAM_FAILURES", &value)?;
        }

        if let Some(value) = read_env("ASKDESK_DIALOG_CARD_TITLE") {
            self.dialog.card_title = value;
        }

        if let Some(value) = read_env("ASKDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ASKDESK_SERVER_PORT") {
            self.server.port = parse_u16("ASKDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ASKDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ASKDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("ASKDESK_LOGGING_LEVEL").or_else(|| read_env("ASKDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ASKDESK_LOGGING_FORMAT").or_else(|| read_env("ASKDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(region) = overrides.region {
            self.region = region;
        }
        if let Some(index_id) = overrides.search_index_id {
            self.search.index_id = index_id;
        }
        if let Some(endpoint) = overrides.search_endpoint {
            self.search.endpoint = Some(endpoint);
        }
        if let Some(model_id) = overrides.generation_model_id {
            self.generation.model_id = model_id;
        }
        if let Some(endpoint) = overrides.generation_endpoint {
            self.generation.endpoint = Some(endpoint);
        }
        if let Some(company_name) = overrides.company_name {
            self.assistant.company_name = company_name;
        }
        if let Some(recover) = overrides.recover_upstream_failures {
            self.assistant.recover_upstream_failures = recover;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Validation("region must not be empty".to_string()));
        }
        validate_search(&self.search)?;
        validate_generation(&self.generation)?;
        validate_assistant(&self.assistant)?;
        validate_dialog(&self.dialog)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("askdesk.toml"), PathBuf::from("config/askdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_endpoint(key: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    if let Some(endpoint) = endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_secret(key: &str, secret: Option<&SecretString>) -> Result<(), ConfigError> {
    if let Some(secret) = secret {
        if secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be blank when set")));
        }
    }
    Ok(())
}

fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
    if search.index_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search.index_id is required (set ASKDESK_SEARCH_INDEX_ID or KENDRA_INDEX_ID)"
                .to_string(),
        ));
    }

    if search.page_size == 0 || search.page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "search.page_size must be in range 1..={MAX_PAGE_SIZE}"
        )));
    }

    validate_endpoint("search.endpoint", search.endpoint.as_deref())?;
    validate_timeout("search.timeout_secs", search.timeout_secs)?;
    validate_secret("search.api_key", search.api_key.as_ref())
}

fn validate_generation(generation: &GenerationConfig) -> Result<(), ConfigError> {
    if generation.model_id.trim().is_empty() {
        return Err(ConfigError::Validation("generation.model_id must not be empty".to_string()));
    }

    if generation.protocol_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "generation.protocol_version must not be empty".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&generation.temperature) {
        return Err(ConfigError::Validation(
            "generation.temperature must be in range 0.0..=1.0".to_string(),
        ));
    }

    if generation.max_tokens == 0 || generation.max_tokens > 4096 {
        return Err(ConfigError::Validation(
            "generation.max_tokens must be in range 1..=4096".to_string(),
        ));
    }

    validate_endpoint("generation.endpoint", generation.endpoint.as_deref())?;
    validate_timeout("generation.timeout_secs", generation.timeout_secs)?;
    validate_secret("generation.api_key", generation.api_key.as_ref())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "assistant.company_name must not be empty".to_string(),
        ));
    }

    if assistant.fallback_answer.trim().is_empty() {
        return Err(ConfigError::Validation(
            "assistant.fallback_answer must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_dialog(dialog: &DialogConfig) -> Result<(), ConfigError> {
    if dialog.card_title.trim().is_empty() {
        return Err(ConfigError::Validation("dialog.card_title must not be empty".to_string()));
    }

    if dialog.suggestions.len() > MAX_SUGGESTIONS {
        return Err(ConfigError::Validation(format!(
            "dialog.suggestions supports at most {MAX_SUGGESTIONS} buttons"
        )));
    }

    let blank = dialog
        .suggestions
        .iter()
        .any(|suggestion| suggestion.text.trim().is_empty() || suggestion.value.trim().is_empty());
    if blank {
        return Err(ConfigError::Validation(
            "dialog.suggestions entries need a non-empty text and value".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    region: Option<String>,
    search: Option<SearchPatch>,
    generation: Option<GenerationPatch>,
    assistant: Option<AssistantPatch>,
    dialog: Option<DialogPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    index_id: Option<String>,
    endpoint: Option<String>,
    page_size: Option<u32>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationPatch {
    model_id: Option<String>,
    endpoint: Option<String>,
    protocol_version: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    company_name: Option<String>,
    fallback_answer: Option<String>,
    recover_upstream_failures: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DialogPatch {
    card_title: Option<String>,
    suggestions: Option<Vec<Suggestion>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ENV_VARS: &[&str] = &[
        "ASKDESK_REGION",
        "AWS_REGION",
        "ASKDESK_SEARCH_INDEX_ID",
        "KENDRA_INDEX_ID",
        "ASKDESK_SEARCH_ENDPOINT",
        "ASKDESK_SEARCH_PAGE_SIZE",
        "ASKDESK_SEARCH_TIMEOUT_SECS",
        "ASKDESK_SEARCH_API_KEY",
        "ASKDESK_GENERATION_MODEL_ID",
        "ASKDESK_GENERATION_ENDPOINT",
        "ASKDESK_GENERATION_TEMPERATURE",
        "ASKDESK_GENERATION_MAX_TOKENS",
        "ASKDESK_GENERATION_TIMEOUT_SECS",
        "ASKDESK_GENERATION_API_KEY",
        "ASKDESK_ASSISTANT_COMPANY_NAME",
        "ASKDESK_ASSISTANT_FALLBACK_ANSWER",
        "ASKDESK_ASSISTANT_RECOVER_UPSTREAM_FAILURES",
        "ASKDESK_DIALOG_CARD_TITLE",
        "ASKDESK_SERVER_BIND_ADDRESS",
        "ASKDESK_SERVER_PORT",
        "ASKDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ASKDESK_LOG_LEVEL",
        "ASKDESK_LOG_FORMAT",
        "ASKDESK_LOGGING_LEVEL",
        "ASKDESK_LOGGING_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("TEST_ASKDESK_INDEX", "idx-from-env");
        env::set_var("TEST_ASKDESK_TOKEN", "gateway-token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("askdesk.toml");
            fs::write(
                &path,
                r#"
[search]
index_id = "${TEST_ASKDESK_INDEX}"

[generation]
api_key = "${TEST_ASKDESK_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.search.index_id == "idx-from-env", "index id should be interpolated")?;
            ensure(
                config
                    .generation
                    .api_key
                    .as_ref()
                    .is_some_and(|key| key.expose_secret() == "gateway-token-from-env"),
                "generation api key should be interpolated",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ASKDESK_INDEX", "TEST_ASKDESK_TOKEN"]);
        result
    }

    #[test]
    fn legacy_environment_names_are_honoured() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("KENDRA_INDEX_ID", "idx-legacy");
        env::set_var("AWS_REGION", "eu-west-1");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.search.index_id == "idx-legacy", "KENDRA_INDEX_ID should be read")?;
            ensure(config.region == "eu-west-1", "AWS_REGION should be read")?;
            ensure(
                config.search_endpoint() == "https://kendra.eu-west-1.amazonaws.com",
                "search endpoint should follow the region",
            )?;
            ensure(
                config.generation_endpoint() == "https://bedrock-runtime.eu-west-1.amazonaws.com",
                "generation endpoint should follow the region",
            )?;
            Ok(())
        })();

        clear_vars(ENV_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-test");
        env::set_var("ASKDESK_LOG_LEVEL", "warn");
        env::set_var("ASKDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(ENV_VARS);
        result
    }

    #[test]
    fn env_overrides_cover_assistant_and_server_sections() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-test");
        env::set_var("ASKDESK_SEARCH_TIMEOUT_SECS", "7");
        env::set_var("ASKDESK_GENERATION_MAX_TOKENS", "512");
        env::set_var("ASKDESK_ASSISTANT_COMPANY_NAME", "Acme");
        env::set_var("ASKDESK_ASSISTANT_RECOVER_UPSTREAM_FAILURES", "true");
        env::set_var("ASKDESK_DIALOG_CARD_TITLE", "Anything else?");
        env::set_var("ASKDESK_SERVER_PORT", "9090");
        env::set_var("ASKDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", "3");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.search.timeout_secs == 7, "search timeout should come from env")?;
            ensure(config.generation.max_tokens == 512, "max tokens should come from env")?;
            ensure(config.assistant.company_name == "Acme", "company name should come from env")?;
            ensure(
                config.assistant.recover_upstream_failures,
                "upstream recovery flag should come from env",
            )?;
            ensure(config.dialog.card_title == "Anything else?", "card title should come from env")?;
            ensure(config.server.port == 9090, "server port should come from env")?;
            ensure(
                config.server.graceful_shutdown_secs == 3,
                "shutdown grace should come from env",
            )?;
            Ok(())
        })();

        clear_vars(ENV_VARS);
        ensure(env::var("ASKDESK_SERVER_PORT").is_err(), "server port should be cleared")?;
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-from-env");
        env::set_var("ASKDESK_GENERATION_MODEL_ID", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("askdesk.toml");
            fs::write(
                &path,
                r#"
region = "ap-southeast-2"

[search]
index_id = "idx-from-file"
endpoint = "http://localhost:9000/"

[generation]
model_id = "model-from-file"

[dialog]
card_title = "Pick a topic"
suggestions = [{ text = "Hours", value = "When are you open?" }]

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    generation_model_id: Some("model-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.region == "ap-southeast-2", "file region should beat the default")?;
            ensure(config.search.index_id == "idx-from-env", "env index id should beat the file")?;
            ensure(
                config.generation.model_id == "model-from-override",
                "override model id should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.search_endpoint() == "http://localhost:9000",
                "explicit endpoint should be used without a trailing slash",
            )?;
            ensure(config.dialog.card_title == "Pick a topic", "card title should come from file")?;
            ensure(config.dialog.suggestions.len() == 1, "suggestions should come from file")?;
            Ok(())
        })();

        clear_vars(ENV_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("search.index_id")
        );
        ensure(has_message, "validation failure should mention search.index_id")
    }

    #[test]
    fn out_of_range_decoding_parameters_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-test");
        env::set_var("ASKDESK_GENERATION_TEMPERATURE", "1.5");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("temperature above 1.0 should fail validation".to_string()),
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("generation.temperature"), "error should name the field")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(ENV_VARS);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-test");
        env::set_var("ASKDESK_SEARCH_PAGE_SIZE", "five");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("non-numeric page size should fail".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "ASKDESK_SEARCH_PAGE_SIZE", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(ENV_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENV_VARS);

        env::set_var("ASKDESK_SEARCH_INDEX_ID", "idx-test");
        env::set_var("ASKDESK_SEARCH_API_KEY", "search-secret-value");
        env::set_var("ASKDESK_GENERATION_API_KEY", "generation-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("search-secret-value"), "debug should not contain search key")?;
            ensure(
                !debug.contains("generation-secret-value"),
                "debug should not contain generation key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.search.page_size == 5, "default page size should be 5")?;
            Ok(())
        })();

        clear_vars(ENV_VARS);
        result
    }
}
