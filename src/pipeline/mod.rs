//! Error-detection pipeline
//!
//! [`ErrorDetector`] runs one analysis: consent check, diagnostics
//! extraction, then (only for a non-empty report) a remediation request.
//! The [`gate`] module wraps it in a per-file debounce so editor events can
//! be fed in as they happen.

pub mod gate;

#[cfg(test)]
mod tests;

pub use gate::{spawn_gate, GateHandle, SettledAnalysis};

use crate::lint::{DiagnosticsExtractor, DiagnosticsReport, ExtractionError};
use crate::remediation::{RemediationRequester, RemediationResult, RequestError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One analysis target. Built per trigger and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub code: String,
    pub file_path: String,
    pub user_consent: bool,
}

impl AnalysisRequest {
    pub fn new(code: impl Into<String>, file_path: impl Into<String>, user_consent: bool) -> Self {
        Self {
            code: code.into(),
            file_path: file_path.into(),
            user_consent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Explicit "detect errors" action
    Manual,
    /// Buffer edit; subject to the quiet period
    CodeChange,
    Save,
}

impl Trigger {
    /// Whether this trigger waits for the quiet period before analysis starts
    pub fn is_debounced(&self) -> bool {
        matches!(self, Trigger::CodeChange)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Gathering,
    Analyzing,
    /// Held until the next trigger arrives
    Settled,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    AnalysisEngine(#[from] ExtractionError),

    #[error(transparent)]
    RemediationTransport(#[from] RequestError),

    #[error("Analysis task crashed unexpectedly: {0}")]
    Crashed(String),
}

/// Terminal state of one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    ConsentRequired,
    /// The linter reported nothing; the backend was not consulted
    NoErrors,
    /// The backend was consulted for a non-empty report
    Remediated {
        report: DiagnosticsReport,
        result: RemediationResult,
    },
    Failed(PipelineError),
}

impl AnalysisOutcome {
    /// The user-facing result carried by every terminal state
    pub fn result(&self) -> RemediationResult {
        match self {
            AnalysisOutcome::ConsentRequired => RemediationResult::consent_required(),
            AnalysisOutcome::NoErrors => RemediationResult::no_errors(),
            AnalysisOutcome::Remediated { result, .. } => result.clone(),
            AnalysisOutcome::Failed(err) => RemediationResult::failed(err.to_string()),
        }
    }

    pub fn report(&self) -> Option<&DiagnosticsReport> {
        match self {
            AnalysisOutcome::Remediated { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Runs the extractor and the requester for a single request
#[derive(Clone)]
pub struct ErrorDetector {
    extractor: DiagnosticsExtractor,
    requester: RemediationRequester,
}

impl ErrorDetector {
    pub fn new(extractor: DiagnosticsExtractor, requester: RemediationRequester) -> Self {
        Self {
            extractor,
            requester,
        }
    }

    /// Never fails: every failure is folded into [`AnalysisOutcome::Failed`].
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let file = request.file_path.as_str();
        if !request.user_consent {
            info!(file, "analysis skipped: no user consent");
            return AnalysisOutcome::ConsentRequired;
        }

        let report = match self
            .extractor
            .extract_async(request.code.clone(), request.file_path.clone())
            .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!(file, stage = "analysis_engine", error = %err, "diagnostics extraction failed");
                return AnalysisOutcome::Failed(err.into());
            }
        };

        if report.is_empty() {
            debug!(file, "no diagnostics; backend not consulted");
            return AnalysisOutcome::NoErrors;
        }

        debug!(file, findings = report.len(), "requesting remediation");
        match self
            .requester
            .request_remediation(&request.code, &request.file_path, &report)
            .await
        {
            Ok(result) => {
                info!(file, has_errors = result.has_errors, "remediation received");
                AnalysisOutcome::Remediated { report, result }
            }
            Err(err) => {
                warn!(file, stage = "remediation_transport", error = %err, "remediation request failed");
                AnalysisOutcome::Failed(err.into())
            }
        }
    }
}
