use askdesk_agent::{RunContext, RunOutcome, SingleToolAgent};
use askdesk_core::config::{AppConfig, LoadOptions};
use askdesk_core::errors::PipelineErrorKind;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct AskReport {
    command: &'static str,
    status: &'static str,
    correlation_id: String,
    answer: String,
    recovered: bool,
    reason_code: Option<&'static str>,
}

/// Runs one question through the full pipeline against the configured upstreams.
pub fn run(question: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2);
        }
    };

    let agent = match SingleToolAgent::from_config(&config) {
        Ok(agent) => agent,
        Err(error) => return CommandResult::failure("ask", "agent_setup", error.to_string(), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let context = RunContext::generate();
    let outcome = match runtime.block_on(agent.run_with_context(question, &context)) {
        Ok(outcome) => outcome,
        Err(error) => {
            let exit_code = match error.kind() {
                PipelineErrorKind::UpstreamUnavailable => 4,
                _ => 5,
            };
            return CommandResult::failure("ask", error.kind().as_str(), error.to_string(), exit_code);
        }
    };

    let reason_code = match &outcome {
        RunOutcome::Completed(_) => None,
        RunOutcome::Recovered { reason_code, .. } => Some(*reason_code),
    };
    let report = AskReport {
        command: "ask",
        status: "ok",
        correlation_id: context.correlation_id,
        recovered: outcome.is_recovered(),
        answer: outcome.into_answer().into_string(),
        reason_code,
    };

    if !json_output {
        return CommandResult { exit_code: 0, output: report.answer };
    }

    match serde_json::to_string(&report) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("ask", "serialization", error.to_string(), 5),
    }
}
