//! Built-in lint engine backed by tree-sitter

use super::parser::parse_module;
use super::{rules, scope};
use super::{DiagnosticEntry, ExtractionError, LintConfig, LintEngine, SUPPORTED_RULES};
use tracing::debug;

/// Lints JavaScript/JSX for the fixed rule set without any external tooling
#[derive(Debug, Default, Clone)]
pub struct TreeSitterEngine;

impl TreeSitterEngine {
    pub fn new() -> Self {
        Self
    }
}

fn validate(config: &LintConfig) -> Result<(), ExtractionError> {
    if let Some(unknown) = config
        .rules
        .keys()
        .find(|rule| !SUPPORTED_RULES.contains(&rule.as_str()))
    {
        return Err(ExtractionError::Config(format!(
            "Definition for rule '{}' was not found.",
            unknown
        )));
    }

    let version = config.parser.ecma_version;
    let supported = matches!(version, 3 | 5 | 6..=16 | 2015..=2025);
    if !supported {
        return Err(ExtractionError::Config(format!(
            "Invalid ecmaVersion {}.",
            version
        )));
    }
    Ok(())
}

impl LintEngine for TreeSitterEngine {
    fn lint_text(
        &self,
        code: &str,
        file_path: &str,
        config: &LintConfig,
    ) -> Result<Vec<DiagnosticEntry>, ExtractionError> {
        validate(config)?;
        let tree = parse_module(code, &config.parser)?;
        let analysis = scope::analyze(&tree, code);
        let diagnostics = rules::evaluate(&analysis, config);
        debug!(
            file = file_path,
            findings = diagnostics.len(),
            scopes = analysis.scopes.len(),
            "lint finished"
        );
        Ok(diagnostics)
    }
}
