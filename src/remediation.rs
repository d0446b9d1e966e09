//! Remediation requests against the text-generation backend

use crate::lint::DiagnosticsReport;
use crate::llm::parse::parse_json_response;
use crate::llm::prompts::REMEDIATION_SYSTEM;
use crate::llm::TextGenerator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const NO_ERRORS_MESSAGE: &str = "No errors detected.";
pub const CONSENT_REQUIRED_MESSAGE: &str =
    "User consent required to detect and solve errors automatically.";

/// Outcome of one analysis, as shown to the user.
///
/// `suggested_solution` is only ever present together with `has_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationResult {
    pub has_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_solution: Option<String>,
}

impl RemediationResult {
    pub fn no_errors() -> Self {
        Self {
            has_errors: false,
            error_message: Some(NO_ERRORS_MESSAGE.to_string()),
            suggested_solution: None,
        }
    }

    pub fn consent_required() -> Self {
        Self {
            has_errors: false,
            error_message: Some(CONSENT_REQUIRED_MESSAGE.to_string()),
            suggested_solution: None,
        }
    }

    /// A confirmed problem with an optional full-file fix
    pub fn detected(error_message: impl Into<String>, suggested_solution: Option<String>) -> Self {
        Self {
            has_errors: true,
            error_message: Some(error_message.into()),
            suggested_solution,
        }
    }

    /// Terminal failure; the message is shown but no fix is offered
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            has_errors: false,
            error_message: Some(message.into()),
            suggested_solution: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Remediation request failed: {0}")]
    Transport(String),

    #[error("Remediation response could not be read: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Deserialize)]
struct RemediationPayload {
    #[serde(default, rename = "errorMessage", alias = "error_message")]
    error_message: Option<String>,
    #[serde(default, rename = "suggestedSolution", alias = "suggested_solution")]
    suggested_solution: Option<String>,
}

/// Sends code plus its diagnostics to the backend and reads back an
/// explanation and a suggested fix.
#[derive(Clone)]
pub struct RemediationRequester {
    generator: Arc<dyn TextGenerator>,
}

impl RemediationRequester {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Callers only invoke this with a non-empty report. Nothing is retried
    /// here; rate limiting is handled by the transport.
    pub async fn request_remediation(
        &self,
        code: &str,
        file_path: &str,
        report: &DiagnosticsReport,
    ) -> Result<RemediationResult, RequestError> {
        let user = build_user_prompt(code, file_path, report);
        let response = self
            .generator
            .complete(REMEDIATION_SYSTEM, &user, true)
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        if let Some(usage) = &response.usage {
            debug!(
                file = file_path,
                model = %response.model,
                total_tokens = usage.total_tokens,
                "remediation response received"
            );
        }

        interpret_response(&response.content)
    }
}

fn build_user_prompt(code: &str, file_path: &str, report: &DiagnosticsReport) -> String {
    format!(
        "FILE: {}\n\nLINTER FINDINGS ({}):\n{}\n\nCODE:\n```\n{}\n```",
        file_path,
        report.len(),
        report.to_transport_string(),
        code
    )
}

fn interpret_response(content: &str) -> Result<RemediationResult, RequestError> {
    let payload: RemediationPayload = parse_json_response(content, "remediation")
        .map_err(|e| RequestError::MalformedPayload(e.to_string()))?;

    let error_message = payload
        .error_message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    Ok(match error_message {
        Some(message) => {
            let solution = payload.suggested_solution.filter(|s| !s.trim().is_empty());
            RemediationResult::detected(message, solution)
        }
        None => RemediationResult::no_errors(),
    })
}
