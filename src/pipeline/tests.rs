use super::*;
use crate::lint::{
    DiagnosticEntry, DiagnosticsExtractor, ExtractionError, LintConfig, LintEngine,
    TreeSitterEngine, RULE_NO_CONSOLE, RULE_NO_DEBUGGER, RULE_NO_UNDEF,
};
use crate::llm::{LlmResponse, TextGenerator};
use crate::remediation::RemediationResult;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const QUIET: Duration = Duration::from_millis(5000);

/// Deterministic backend that counts calls and remembers prompts
struct StubGenerator {
    reply: String,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(reply)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for StubGenerator {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        user: &'a str,
        _json_mode: bool,
    ) -> BoxFuture<'a, anyhow::Result<LlmResponse>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(user.to_string());
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: self.reply.clone(),
                usage: None,
                model: "stub".to_string(),
            })
        })
    }
}

/// Backend that panics mid-request whenever the prompt mentions "boom"
struct ExplodingGenerator;

impl TextGenerator for ExplodingGenerator {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        user: &'a str,
        _json_mode: bool,
    ) -> BoxFuture<'a, anyhow::Result<LlmResponse>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            if user.contains("boom") {
                panic!("backend exploded");
            }
            Ok(LlmResponse {
                content: FIX_REPLY.to_string(),
                usage: None,
                model: "stub".to_string(),
            })
        })
    }
}

/// Lint engine that panics on code mentioning "boom"
struct ExplodingEngine;

impl LintEngine for ExplodingEngine {
    fn lint_text(
        &self,
        code: &str,
        file_path: &str,
        config: &LintConfig,
    ) -> Result<Vec<DiagnosticEntry>, ExtractionError> {
        if code.contains("boom") {
            panic!("engine exploded");
        }
        TreeSitterEngine::new().lint_text(code, file_path, config)
    }
}

const FIX_REPLY: &str =
    r#"{"errorMessage": "Remove the console call", "suggestedSolution": "export {};\n"}"#;

fn detector_with(generator: Arc<StubGenerator>, config: LintConfig) -> ErrorDetector {
    let extractor = DiagnosticsExtractor::new(Arc::new(TreeSitterEngine::new()), config);
    ErrorDetector::new(extractor, RemediationRequester::new(generator))
}

fn detector(generator: Arc<StubGenerator>) -> ErrorDetector {
    detector_with(generator, LintConfig::default())
}

#[tokio::test]
async fn test_consent_denied_never_calls_backend() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let outcome = detector(generator.clone())
        .analyze(&AnalysisRequest::new("console.log(1);", "/src/a.js", false))
        .await;

    assert_eq!(outcome, AnalysisOutcome::ConsentRequired);
    assert_eq!(outcome.result(), RemediationResult::consent_required());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_greet_with_nothing_relevant_reports_no_errors() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let config = LintConfig::with_rules(&[RULE_NO_CONSOLE, RULE_NO_DEBUGGER, RULE_NO_UNDEF]);
    let code = r#"function greet(name) { if (name == "John") return "Hello, " + name; }"#;

    let outcome = detector_with(generator.clone(), config)
        .analyze(&AnalysisRequest::new(code, "/src/example.js", true))
        .await;

    assert_eq!(outcome, AnalysisOutcome::NoErrors);
    let result = outcome.result();
    assert!(!result.has_errors);
    assert_eq!(result.error_message.as_deref(), Some("No errors detected."));
    assert!(result.suggested_solution.is_none());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_console_call_reaches_backend_with_finding() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let outcome = detector(generator.clone())
        .analyze(&AnalysisRequest::new("console.log('hi');\n", "/src/a.js", true))
        .await;

    let report = outcome.report().expect("report for remediated outcome");
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries()[0].rule_id.as_deref(), Some("no-console"));

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Unexpected console statement. (no-console)"));

    let result = outcome.result();
    assert!(result.has_errors);
    assert_eq!(result.suggested_solution.as_deref(), Some("export {};\n"));
}

#[tokio::test]
async fn test_empty_backend_object_is_negative_result() {
    let generator = Arc::new(StubGenerator::new("{}"));
    let outcome = detector(generator.clone())
        .analyze(&AnalysisRequest::new("debugger;", "/src/a.js", true))
        .await;

    let result = outcome.result();
    assert!(!result.has_errors);
    assert!(result.suggested_solution.is_none());
    assert!(!matches!(outcome, AnalysisOutcome::Failed(_)));
}

#[tokio::test]
async fn test_identical_requests_give_identical_outcomes() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let detector = detector(generator);
    let request = AnalysisRequest::new("console.log(1);\ndebugger;\n", "/src/a.js", true);

    let first = detector.analyze(&request).await;
    let second = detector.analyze(&request).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_syntax_error_maps_to_engine_failure() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let outcome = detector(generator.clone())
        .analyze(&AnalysisRequest::new("function (", "/src/a.js", true))
        .await;

    assert!(matches!(
        outcome,
        AnalysisOutcome::Failed(PipelineError::AnalysisEngine(_))
    ));
    let result = outcome.result();
    assert!(!result.has_errors);
    assert!(result
        .error_message
        .as_deref()
        .is_some_and(|m| m.starts_with("Parsing error")));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_malformed_backend_reply_maps_to_transport_failure() {
    let generator = Arc::new(StubGenerator::new("I could not decide"));
    let outcome = detector(generator)
        .analyze(&AnalysisRequest::new("debugger;", "/src/a.js", true))
        .await;

    assert!(matches!(
        outcome,
        AnalysisOutcome::Failed(PipelineError::RemediationTransport(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_code_changes_run_one_analysis_with_last_code() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    for n in 1..=3 {
        let code = format!("console.log('edit {}');\n", n);
        gate.submit(Trigger::CodeChange, AnalysisRequest::new(code, "/src/a.js", true))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
    }

    let settled = outcomes.recv().await.unwrap();
    assert_eq!(settled.trigger, Trigger::CodeChange);
    assert!(settled.outcome.result().has_errors);

    drop(gate);
    assert!(outcomes.recv().await.is_none());
    assert_eq!(generator.calls(), 1);
    assert!(generator.prompts()[0].contains("edit 3"));
}

#[tokio::test(start_paused = true)]
async fn test_quiet_period_is_not_cut_short() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    let started = tokio::time::Instant::now();
    gate.submit(
        Trigger::CodeChange,
        AnalysisRequest::new("debugger;", "/src/a.js", true),
    )
    .unwrap();
    outcomes.recv().await.unwrap();
    assert!(started.elapsed() >= QUIET);
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_bypasses_and_cancels_timer() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    gate.submit(
        Trigger::CodeChange,
        AnalysisRequest::new("console.log('draft');", "/src/a.js", true),
    )
    .unwrap();
    let started = tokio::time::Instant::now();
    gate.submit(
        Trigger::Manual,
        AnalysisRequest::new("console.log('final');", "/src/a.js", true),
    )
    .unwrap();

    let settled = outcomes.recv().await.unwrap();
    assert_eq!(settled.trigger, Trigger::Manual);
    assert!(started.elapsed() < QUIET);

    drop(gate);
    assert!(outcomes.recv().await.is_none());
    assert_eq!(generator.calls(), 1);
    assert!(generator.prompts()[0].contains("final"));
}

#[tokio::test(start_paused = true)]
async fn test_trigger_during_analysis_waits_for_it() {
    let generator = Arc::new(StubGenerator::slow(FIX_REPLY, Duration::from_secs(10)));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    gate.submit(
        Trigger::Manual,
        AnalysisRequest::new("console.log('first');", "/src/a.js", true),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    for label in ["second", "third"] {
        let code = format!("console.log('{}');", label);
        gate.submit(Trigger::Save, AnalysisRequest::new(code, "/src/a.js", true))
            .unwrap();
    }

    let first = outcomes.recv().await.unwrap();
    let second = outcomes.recv().await.unwrap();
    assert!(first.completed_at <= second.completed_at);

    drop(gate);
    assert!(outcomes.recv().await.is_none());

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("first"));
    assert!(prompts[1].contains("third"));
    assert_eq!(generator.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_files_are_debounced_independently() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    for file in ["/src/a.js", "/src/b.js"] {
        gate.submit(
            Trigger::CodeChange,
            AnalysisRequest::new("debugger;", file, true),
        )
        .unwrap();
    }
    drop(gate);

    let mut files = Vec::new();
    while let Some(settled) = outcomes.recv().await {
        files.push(settled.file_path);
    }
    files.sort();
    assert_eq!(files, vec!["/src/a.js", "/src/b.js"]);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_consent_denied_through_gate() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator.clone()), QUIET);

    gate.submit(
        Trigger::Save,
        AnalysisRequest::new("console.log(1);", "/src/a.js", false),
    )
    .unwrap();
    let settled = outcomes.recv().await.unwrap();

    assert_eq!(settled.outcome, AnalysisOutcome::ConsentRequired);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_state_is_observable() {
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let (gate, mut outcomes) = spawn_gate(detector(generator), QUIET);
    let mut state = gate.subscribe();
    assert_eq!(gate.state(), PipelineState::Idle);

    gate.submit(
        Trigger::CodeChange,
        AnalysisRequest::new("debugger;", "/src/a.js", true),
    )
    .unwrap();
    state.changed().await.unwrap();
    assert_eq!(*state.borrow_and_update(), PipelineState::Gathering);

    outcomes.recv().await.unwrap();
    assert_eq!(gate.state(), PipelineState::Settled);
}

#[tokio::test(start_paused = true)]
async fn test_backend_panic_settles_as_crash_and_file_recovers() {
    let extractor = DiagnosticsExtractor::builtin();
    let requester = RemediationRequester::new(Arc::new(ExplodingGenerator));
    let (gate, mut outcomes) = spawn_gate(ErrorDetector::new(extractor, requester), QUIET);

    gate.submit(
        Trigger::Manual,
        AnalysisRequest::new("console.log('boom');", "/src/a.js", true),
    )
    .unwrap();
    let crashed = outcomes.recv().await.unwrap();
    assert_eq!(
        crashed.outcome,
        AnalysisOutcome::Failed(PipelineError::Crashed("backend exploded".to_string()))
    );

    gate.submit(
        Trigger::Manual,
        AnalysisRequest::new("console.log('fine');", "/src/a.js", true),
    )
    .unwrap();
    let recovered = outcomes.recv().await.unwrap();
    assert!(recovered.outcome.result().has_errors);

    drop(gate);
    assert!(outcomes.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_engine_panic_is_an_engine_failure_and_file_recovers() {
    let extractor = DiagnosticsExtractor::new(Arc::new(ExplodingEngine), LintConfig::default());
    let generator = Arc::new(StubGenerator::new(FIX_REPLY));
    let requester = RemediationRequester::new(generator.clone());
    let (gate, mut outcomes) = spawn_gate(ErrorDetector::new(extractor, requester), QUIET);

    gate.submit(Trigger::Save, AnalysisRequest::new("let boom;", "/src/a.js", true))
        .unwrap();
    let failed = outcomes.recv().await.unwrap();
    match failed.outcome {
        AnalysisOutcome::Failed(PipelineError::AnalysisEngine(ExtractionError::Engine(msg))) => {
            assert!(msg.starts_with("analysis task failed"), "{msg}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(generator.calls(), 0);

    gate.submit(Trigger::Save, AnalysisRequest::new("debugger;", "/src/a.js", true))
        .unwrap();
    let recovered = outcomes.recv().await.unwrap();
    assert!(recovered.outcome.result().has_errors);
    assert_eq!(generator.calls(), 1);
}
