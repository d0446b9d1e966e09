//! CodePilot command-line host
//!
//! Wires the library together: builds the backend client from config,
//! feeds file contents into the pipeline and renders outcomes on stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codepilot::assist;
use codepilot::config::Config;
use codepilot::lint::DiagnosticsExtractor;
use codepilot::llm::{LazyLlmClient, LlmClient, Provider, TextGenerator};
use codepilot::pipeline::{spawn_gate, AnalysisRequest, ErrorDetector, SettledAnalysis, Trigger};
use codepilot::presentation::{ConsoleNotifier, FileEditor, PresentationAdapter};
use codepilot::project::{analyze_project, lint_project};
use codepilot::remediation::RemediationRequester;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing_subscriber::EnvFilter;

/// How often `watch` checks the file for changes
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(
    name = "codepilot",
    about = "Lint-driven error detection and AI fixes for JavaScript",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lint a file and ask the backend to explain and fix what was found
    Detect(DetectArgs),
    /// Re-run detection whenever the file changes, after a quiet period
    Watch(WatchArgs),
    /// Print lint findings without contacting the backend
    Lint { file: PathBuf },
    /// Ask the assistant a question
    Chat {
        message: String,
        /// Include source files from this directory as context
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Generate a code snippet from a description
    Generate {
        prompt: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Review a long file for likely error locations
    Chunk {
        file: PathBuf,
        #[arg(long)]
        context: Option<String>,
    },
    /// List the source files the assistant would see
    Project {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Lint every JavaScript file found
        #[arg(long)]
        lint: bool,
    },
    /// Show or update the resolved configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct DetectArgs {
    file: PathBuf,
    /// Allow code to be analyzed and sent to the backend
    #[arg(long)]
    consent: bool,
    /// Write the suggested solution back to the file
    #[arg(long)]
    apply: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    file: PathBuf,
    #[arg(long)]
    consent: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Provider to store as the default (googleai, openai, groq, deepseek)
    #[arg(long)]
    provider: Option<String>,
    /// API key to store for the selected provider
    #[arg(long)]
    set_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Detect(args) => run_detect(&config, args).await,
        Commands::Watch(args) => run_watch(&config, args).await,
        Commands::Lint { file } => run_lint(&file).await,
        Commands::Chat { message, project } => run_chat(&config, &message, project).await,
        Commands::Generate { prompt, context } => {
            let client = LlmClient::from_config(&config)?;
            let snippet =
                assist::generate_code_snippet(&client, &prompt, context.as_deref()).await?;
            println!("{}", snippet);
            Ok(())
        }
        Commands::Chunk { file, context } => run_chunk(&config, &file, context).await,
        Commands::Project { dir, lint } => run_project(&config, &dir, lint),
        Commands::Config(args) => run_config(config, args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CODEPILOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// The backend client is only built once a report actually needs remediation
fn build_detector(config: &Config) -> ErrorDetector {
    let client: Arc<dyn TextGenerator> = Arc::new(LazyLlmClient::new(config.clone()));
    ErrorDetector::new(
        DiagnosticsExtractor::builtin(),
        RemediationRequester::new(client),
    )
}

fn print_settled(settled: &SettledAnalysis) {
    let result = settled.outcome.result();
    if let Some(report) = settled.outcome.report() {
        for entry in report.entries() {
            println!("  {}", entry);
        }
    }
    if let Some(solution) = &result.suggested_solution {
        println!("\nSuggested solution:\n{}", solution);
    }
}

async fn run_detect(config: &Config, args: DetectArgs) -> Result<()> {
    let code = read_source(&args.file)?;
    let file_path = args.file.to_string_lossy().into_owned();
    let detector = build_detector(config);

    let request = AnalysisRequest::new(code, file_path.clone(), args.consent);
    let outcome = detector.analyze(&request).await;
    let settled = SettledAnalysis {
        run_id: uuid::Uuid::new_v4(),
        file_path,
        trigger: Trigger::Manual,
        outcome,
        completed_at: chrono::Utc::now(),
    };

    let mut adapter = PresentationAdapter::new(Arc::new(ConsoleNotifier), Arc::new(FileEditor::new()));
    adapter.render(&settled);
    print_settled(&settled);

    if args.apply && adapter.apply_fix()? {
        eprintln!("Applied fix to {}", args.file.display());
    }
    Ok(())
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

async fn run_watch(config: &Config, args: WatchArgs) -> Result<()> {
    let detector = build_detector(config);
    let quiet_period = Duration::from_millis(config.debounce_ms);
    let (gate, mut outcomes) = spawn_gate(detector, quiet_period);
    let mut adapter = PresentationAdapter::new(Arc::new(ConsoleNotifier), Arc::new(FileEditor::new()));
    let file_path = args.file.to_string_lossy().into_owned();

    let code = read_source(&args.file)?;
    gate.submit(Trigger::Manual, AnalysisRequest::new(code, file_path.clone(), args.consent))?;
    let mut last_modified = modified_at(&args.file);
    eprintln!(
        "Watching {} (quiet period {} ms). Press Ctrl+C to stop.",
        args.file.display(),
        config.debounce_ms
    );

    let mut ticker = tokio::time::interval(WATCH_POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let modified = modified_at(&args.file);
                if modified.is_some() && modified != last_modified {
                    last_modified = modified;
                    match read_source(&args.file) {
                        Ok(code) => gate.submit(
                            Trigger::CodeChange,
                            AnalysisRequest::new(code, file_path.clone(), args.consent),
                        )?,
                        Err(e) => tracing::warn!(error = %e, "could not read watched file"),
                    }
                }
            }
            Some(settled) = outcomes.recv() => {
                adapter.render(&settled);
                print_settled(&settled);
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

async fn run_lint(file: &Path) -> Result<()> {
    let code = read_source(file)?;
    let extractor = DiagnosticsExtractor::builtin();
    let report = extractor
        .extract_async(code, file.to_string_lossy().into_owned())
        .await?;
    if report.is_empty() {
        println!("No problems found.");
    }
    for entry in report.entries() {
        println!("{}  {}", entry.severity.label(), entry);
    }
    Ok(())
}

async fn run_chat(config: &Config, message: &str, project: Option<PathBuf>) -> Result<()> {
    let client = LlmClient::from_config(config)?;
    let files = match project {
        Some(dir) => Some(analyze_project(&dir, config.max_file_bytes)?),
        None => None,
    };
    let answer = assist::chat(&client, message, files.as_deref()).await?;
    println!("{}", answer);
    Ok(())
}

async fn run_chunk(config: &Config, file: &Path, context: Option<String>) -> Result<()> {
    let code = read_source(file)?;
    let client = LlmClient::from_config(config)?;
    let locations = assist::analyze_long_code_chunk(&client, &code, context.as_deref()).await?;
    if locations.is_empty() {
        println!("No likely error locations found.");
    }
    for location in locations {
        println!("{}: {}", location.location, location.description);
    }
    Ok(())
}

fn run_project(config: &Config, dir: &Path, lint: bool) -> Result<()> {
    let files = analyze_project(dir, config.max_file_bytes)?;
    if !lint {
        for file in &files {
            println!("{}", file.path);
        }
        eprintln!("{} files", files.len());
        return Ok(());
    }

    let extractor = DiagnosticsExtractor::builtin();
    let mut total = 0;
    for result in lint_project(&files, &extractor) {
        match result.report {
            Ok(report) if report.is_empty() => {}
            Ok(report) => {
                total += report.len();
                println!("{}", result.path.display());
                for entry in report.entries() {
                    println!("  {}", entry);
                }
            }
            Err(e) => println!("{}\n  {}", result.path.display(), e),
        }
    }
    eprintln!("{} problems in {} files", total, files.len());
    Ok(())
}

fn run_config(mut config: Config, args: ConfigArgs) -> Result<()> {
    let mut changed = false;
    if let Some(name) = args.provider {
        let provider = Provider::parse_name(&name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown provider '{}'. Expected one of: {}",
                name,
                Provider::ALL.map(|p| p.name()).join(", ")
            )
        })?;
        config.provider = Some(provider);
        changed = true;
    }
    if let Some(key) = args.set_key {
        let provider = config.provider.unwrap_or_else(|| config.selected_provider());
        config.set_api_key(provider, &key);
        changed = true;
    }
    if changed {
        config.save()?;
        if let Some(path) = Config::config_path() {
            eprintln!("Saved {}", path.display());
        }
    }
    println!("{}", config.describe());
    Ok(())
}
