//! Rendering settled analyses for the user and applying fixes

use crate::pipeline::{AnalysisOutcome, SettledAnalysis};
use crate::remediation::RemediationResult;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const TITLE_ERROR_DETECTED: &str = "Error Detected";
pub const TITLE_NO_ERRORS: &str = "No Errors";
pub const TITLE_ANALYSIS_FAILED: &str = "Analysis Failed";
pub const TITLE_CONSENT_REQUIRED: &str = "Consent Required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn for_outcome(outcome: &AnalysisOutcome) -> Self {
        let result = outcome.result();
        let description = result.error_message.clone().unwrap_or_default();
        let title = match outcome {
            AnalysisOutcome::ConsentRequired => TITLE_CONSENT_REQUIRED,
            AnalysisOutcome::Failed(_) => TITLE_ANALYSIS_FAILED,
            AnalysisOutcome::NoErrors => TITLE_NO_ERRORS,
            AnalysisOutcome::Remediated { .. } if result.has_errors => TITLE_ERROR_DETECTED,
            AnalysisOutcome::Remediated { .. } => TITLE_NO_ERRORS,
        };
        Self {
            title: title.to_string(),
            description,
        }
    }
}

/// Where user-facing notifications go (toasts, status bar, stderr)
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// The editing surface that owns the code buffer
pub trait EditorSurface: Send + Sync {
    fn replace_buffer(&self, file_path: &str, code: &str) -> anyhow::Result<()>;
}

struct Rendered {
    file_path: String,
    result: RemediationResult,
    completed_at: DateTime<Utc>,
}

/// Turns settled analyses into notifications and keeps the result on screen
pub struct PresentationAdapter {
    sink: Arc<dyn NotificationSink>,
    editor: Arc<dyn EditorSurface>,
    current: Option<Rendered>,
}

impl PresentationAdapter {
    pub fn new(sink: Arc<dyn NotificationSink>, editor: Arc<dyn EditorSurface>) -> Self {
        Self {
            sink,
            editor,
            current: None,
        }
    }

    /// Emit exactly one notification. The displayed result is replaced unless
    /// a later-completed analysis is already shown.
    pub fn render(&mut self, settled: &SettledAnalysis) {
        let notification = Notification::for_outcome(&settled.outcome);
        self.sink.notify(&notification);

        let stale = self
            .current
            .as_ref()
            .is_some_and(|shown| shown.completed_at > settled.completed_at);
        if stale {
            debug!(file = %settled.file_path, "older result not displayed");
            return;
        }
        self.current = Some(Rendered {
            file_path: settled.file_path.clone(),
            result: settled.outcome.result(),
            completed_at: settled.completed_at,
        });
    }

    pub fn current(&self) -> Option<&RemediationResult> {
        self.current.as_ref().map(|shown| &shown.result)
    }

    /// Replace the buffer with the suggested solution exactly as received.
    /// Returns `false` when there is nothing to apply.
    pub fn apply_fix(&self) -> anyhow::Result<bool> {
        let Some(shown) = &self.current else {
            return Ok(false);
        };
        let Some(solution) = shown.result.suggested_solution.as_deref() else {
            return Ok(false);
        };
        self.editor.replace_buffer(&shown.file_path, solution)?;
        info!(file = %shown.file_path, "applied suggested fix");
        Ok(true)
    }
}

/// Writes notifications to stderr
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.description.is_empty() {
            eprintln!("[{}]", notification.title);
        } else {
            eprintln!("[{}] {}", notification.title, notification.description);
        }
    }
}

/// Applies buffers straight to files on disk
pub struct FileEditor {
    root: Option<PathBuf>,
}

impl FileEditor {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve relative paths against `root`
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(file_path),
            None => PathBuf::from(file_path),
        }
    }
}

impl Default for FileEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSurface for FileEditor {
    fn replace_buffer(&self, file_path: &str, code: &str) -> anyhow::Result<()> {
        let path = self.resolve(file_path);
        let tmp = path.with_extension("codepilot.tmp");
        std::fs::write(&tmp, code)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::DiagnosticsReport;
    use crate::pipeline::{PipelineError, Trigger};
    use crate::remediation::RequestError;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }

    #[derive(Default)]
    struct RecordingEditor {
        buffers: Mutex<Vec<(String, String)>>,
    }

    impl EditorSurface for RecordingEditor {
        fn replace_buffer(&self, file_path: &str, code: &str) -> anyhow::Result<()> {
            self.buffers
                .lock()
                .unwrap()
                .push((file_path.to_string(), code.to_string()));
            Ok(())
        }
    }

    fn settled(outcome: AnalysisOutcome, completed_at: DateTime<Utc>) -> SettledAnalysis {
        SettledAnalysis {
            run_id: Uuid::new_v4(),
            file_path: "/src/a.js".to_string(),
            trigger: Trigger::Manual,
            outcome,
            completed_at,
        }
    }

    fn remediated(message: &str, solution: &str) -> AnalysisOutcome {
        AnalysisOutcome::Remediated {
            report: DiagnosticsReport::default(),
            result: RemediationResult::detected(message, Some(solution.to_string())),
        }
    }

    #[test]
    fn test_titles_per_outcome() {
        let failed = AnalysisOutcome::Failed(PipelineError::RemediationTransport(
            RequestError::Transport("timeout".to_string()),
        ));
        let cases = [
            (AnalysisOutcome::ConsentRequired, TITLE_CONSENT_REQUIRED),
            (AnalysisOutcome::NoErrors, TITLE_NO_ERRORS),
            (remediated("bad", "good"), TITLE_ERROR_DETECTED),
            (failed, TITLE_ANALYSIS_FAILED),
        ];
        for (outcome, title) in cases {
            assert_eq!(Notification::for_outcome(&outcome).title, title);
        }
    }

    #[test]
    fn test_render_emits_one_notification_each() {
        let sink = Arc::new(RecordingSink::default());
        let mut adapter = PresentationAdapter::new(sink.clone(), Arc::new(RecordingEditor::default()));
        adapter.render(&settled(AnalysisOutcome::NoErrors, Utc::now()));
        adapter.render(&settled(AnalysisOutcome::ConsentRequired, Utc::now()));

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].description, "No errors detected.");
    }

    #[test]
    fn test_later_completion_wins() {
        let sink = Arc::new(RecordingSink::default());
        let mut adapter = PresentationAdapter::new(sink, Arc::new(RecordingEditor::default()));
        let early = Utc::now();
        let late = early + chrono::Duration::seconds(5);

        adapter.render(&settled(remediated("newer", "b"), late));
        adapter.render(&settled(remediated("older", "a"), early));
        assert_eq!(adapter.current().unwrap().error_message.as_deref(), Some("newer"));
    }

    #[test]
    fn test_apply_fix_replaces_buffer_verbatim() {
        let editor = Arc::new(RecordingEditor::default());
        let mut adapter = PresentationAdapter::new(Arc::new(RecordingSink::default()), editor.clone());
        let solution = "export const x = 1;\n\n  // trailing\n";
        adapter.render(&settled(remediated("unused", solution), Utc::now()));

        assert!(adapter.apply_fix().unwrap());
        let buffers = editor.buffers.lock().unwrap();
        assert_eq!(buffers[0], ("/src/a.js".to_string(), solution.to_string()));
    }

    #[test]
    fn test_apply_fix_without_solution_is_noop() {
        let editor = Arc::new(RecordingEditor::default());
        let mut adapter = PresentationAdapter::new(Arc::new(RecordingSink::default()), editor.clone());
        assert!(!adapter.apply_fix().unwrap());

        adapter.render(&settled(AnalysisOutcome::NoErrors, Utc::now()));
        assert!(!adapter.apply_fix().unwrap());
        assert!(editor.buffers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_file_editor_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "console.log(1);").unwrap();
        let editor = FileEditor::rooted(dir.path());

        editor.replace_buffer("a.js", "export {};\n").unwrap();
        let written = std::fs::read_to_string(dir.path().join("a.js")).unwrap();
        assert_eq!(written, "export {};\n");
        assert!(!dir.path().join("a.codepilot.tmp").exists());
    }
}
