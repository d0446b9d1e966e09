//! Diagnostics extraction
//!
//! A [`LintEngine`] turns source text into ordered [`DiagnosticEntry`] values;
//! the [`DiagnosticsExtractor`] runs it with the fixed rule set and flattens
//! the findings into a [`DiagnosticsReport`] for the remediation backend.

mod engine;
mod parser;
mod rules;
mod scope;

pub use engine::TreeSitterEngine;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const RULE_NO_UNUSED_VARS: &str = "no-unused-vars";
pub const RULE_NO_CONSOLE: &str = "no-console";
pub const RULE_NO_DEBUGGER: &str = "no-debugger";
pub const RULE_NO_UNDEF: &str = "no-undef";

/// Every rule the built-in engine knows how to run
pub const SUPPORTED_RULES: [&str; 4] = [
    RULE_NO_UNUSED_VARS,
    RULE_NO_CONSOLE,
    RULE_NO_DEBUGGER,
    RULE_NO_UNDEF,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Warn,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Off => "off",
            Severity::Warn => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Script,
    Module,
    CommonJs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    pub ecma_version: u32,
    pub source_type: SourceType,
    pub jsx: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            ecma_version: 2021,
            source_type: SourceType::Module,
            jsx: true,
        }
    }
}

/// Predefined global sets, as in an ESLint `env` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environments {
    pub browser: bool,
    pub node: bool,
    pub es6: bool,
}

impl Default for Environments {
    fn default() -> Self {
        Self {
            browser: true,
            node: true,
            es6: true,
        }
    }
}

/// Rule and parser configuration handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    pub parser: ParserOptions,
    pub env: Environments,
    pub rules: BTreeMap<String, Severity>,
}

impl Default for LintConfig {
    /// The fixed configuration used for error detection: four rules at warn,
    /// modern module syntax with JSX.
    fn default() -> Self {
        let rules = SUPPORTED_RULES
            .iter()
            .map(|rule| (rule.to_string(), Severity::Warn))
            .collect();
        Self {
            parser: ParserOptions::default(),
            env: Environments::default(),
            rules,
        }
    }
}

impl LintConfig {
    /// Same parser and env settings with only the given rules enabled at warn.
    pub fn with_rules(rules: &[&str]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| (rule.to_string(), Severity::Warn))
                .collect(),
            ..Self::default()
        }
    }

    /// Severity configured for a rule; unlisted rules are off.
    pub fn severity(&self, rule: &str) -> Severity {
        self.rules.get(rule).copied().unwrap_or(Severity::Off)
    }
}

/// A single finding, positioned 1-based as editors display it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEntry {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub rule_id: Option<String>,
    pub severity: Severity,
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line {}, Col {}: {} ({})",
            self.line,
            self.column,
            self.message,
            self.rule_id.as_deref().unwrap_or("null")
        )
    }
}

/// Ordered findings for one file, in the order the engine emitted them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    entries: Vec<DiagnosticEntry>,
}

impl DiagnosticsReport {
    pub fn new(entries: Vec<DiagnosticEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Single-line transport form: entries joined with `"; "`
    pub fn to_transport_string(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Parsing error: {message} (line {line}, column {column})")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Code analysis failed: {0}")]
    Engine(String),
}

/// A static-analysis engine. Implementations must emit findings sorted by
/// source position and must not mutate anything but their own state.
pub trait LintEngine: Send + Sync {
    fn lint_text(
        &self,
        code: &str,
        file_path: &str,
        config: &LintConfig,
    ) -> Result<Vec<DiagnosticEntry>, ExtractionError>;
}

/// Runs an engine with a fixed configuration and produces reports
#[derive(Clone)]
pub struct DiagnosticsExtractor {
    engine: Arc<dyn LintEngine>,
    config: Arc<LintConfig>,
}

impl DiagnosticsExtractor {
    pub fn new(engine: Arc<dyn LintEngine>, config: LintConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }

    /// Extractor over the built-in engine with the default rule set
    pub fn builtin() -> Self {
        Self::new(Arc::new(TreeSitterEngine::new()), LintConfig::default())
    }

    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    pub fn extract(&self, code: &str, file_path: &str) -> Result<DiagnosticsReport, ExtractionError> {
        let entries = self.engine.lint_text(code, file_path, &self.config)?;
        Ok(DiagnosticsReport::new(entries))
    }

    /// Run the engine on the blocking pool so callers on the async runtime
    /// are not stalled by large files.
    pub async fn extract_async(
        &self,
        code: String,
        file_path: String,
    ) -> Result<DiagnosticsReport, ExtractionError> {
        let extractor = self.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&code, &file_path))
            .await
            .map_err(|e| ExtractionError::Engine(format!("analysis task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: usize, column: usize, message: &str, rule: Option<&str>) -> DiagnosticEntry {
        DiagnosticEntry {
            line,
            column,
            message: message.to_string(),
            rule_id: rule.map(str::to_string),
            severity: Severity::Warn,
        }
    }

    #[test]
    fn test_transport_string_joins_with_semicolons() {
        let report = DiagnosticsReport::new(vec![
            entry(1, 1, "Unexpected console statement.", Some(RULE_NO_CONSOLE)),
            entry(3, 5, "'x' is not defined.", Some(RULE_NO_UNDEF)),
        ]);
        assert_eq!(
            report.to_transport_string(),
            "Line 1, Col 1: Unexpected console statement. (no-console); Line 3, Col 5: 'x' is not defined. (no-undef)"
        );
    }

    #[test]
    fn test_empty_report_has_empty_transport_string() {
        let report = DiagnosticsReport::default();
        assert!(report.is_empty());
        assert_eq!(report.to_transport_string(), "");
    }

    #[test]
    fn test_entry_without_rule_renders_null() {
        assert_eq!(entry(2, 4, "oops", None).to_string(), "Line 2, Col 4: oops (null)");
    }

    #[test]
    fn test_default_config_enables_fixed_rules_at_warn() {
        let config = LintConfig::default();
        for rule in SUPPORTED_RULES {
            assert_eq!(config.severity(rule), Severity::Warn);
        }
        assert_eq!(config.parser.ecma_version, 2021);
        assert_eq!(config.parser.source_type, SourceType::Module);
        assert!(config.parser.jsx);
        assert_eq!(config.severity("eqeqeq"), Severity::Off);
    }

    struct ReversedEngine;

    impl LintEngine for ReversedEngine {
        fn lint_text(
            &self,
            _code: &str,
            _file_path: &str,
            _config: &LintConfig,
        ) -> Result<Vec<DiagnosticEntry>, ExtractionError> {
            Ok(vec![entry(9, 1, "late", None), entry(1, 1, "early", None)])
        }
    }

    #[test]
    fn test_extractor_keeps_engine_order() {
        let extractor = DiagnosticsExtractor::new(Arc::new(ReversedEngine), LintConfig::default());
        let report = extractor.extract("", "a.js").unwrap();
        assert_eq!(report.entries()[0].message, "late");
        assert_eq!(report.entries()[1].message, "early");
    }

    #[tokio::test]
    async fn test_extract_async_matches_sync() {
        let extractor = DiagnosticsExtractor::builtin();
        let code = "debugger;\n".to_string();
        let sync = extractor.extract(&code, "/src/a.js").unwrap();
        let async_report = extractor
            .extract_async(code, "/src/a.js".to_string())
            .await
            .unwrap();
        assert_eq!(sync, async_report);
        assert_eq!(sync.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_async_refuses_deep_nesting() {
        let n = 20_000;
        let code = format!("export const x = {}{};", "[".repeat(n), "]".repeat(n));
        let err = DiagnosticsExtractor::builtin()
            .extract_async(code, "/src/deep.js".to_string())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Code analysis failed: maximum nesting depth exceeded"
        );
    }
}
