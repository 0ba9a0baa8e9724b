//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rivalscope_artifacts::{ExportFormat, export};
use rivalscope_core::{
    AiBackend, AnalysisOutcome, Pipeline, PipelineConfig, PipelineStage, ProgressReporter,
};
use rivalscope_shared::{
    AppConfig, Analysis, AnalysisRequest, RivalScopeError, init_config, load_config,
    resolve_api_key,
};
use serde::Serialize;
use tracing::{error, info};

/// Payload message for analyze failures that are not the caller's fault.
const ANALYZE_FAILED: &str = "Failed to analyze competitors";
/// Payload message for export failures that are not the caller's fault.
const EXPORT_FAILED: &str = "Export failed";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// RivalScope: AI-assisted competitor analysis.
#[derive(Parser)]
#[command(
    name = "rivalscope",
    version,
    about = "Analyze competitor websites and synthesize market insights.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze one or more competitor websites.
    Analyze {
        /// Competitor URLs, in the order results should appear.
        urls: Vec<String>,

        /// Analysis title (defaults to the configured title).
        #[arg(short, long)]
        title: Option<String>,

        /// Read a JSON request (`{"urls": [...], "title": ...}`) from a file.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the analysis JSON to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Maximum concurrent site fetches (overrides config).
        #[arg(long)]
        concurrency: Option<u32>,
    },

    /// Export a saved analysis as CSV or JSON.
    Export {
        /// Analysis JSON file produced by `analyze`.
        #[arg(long)]
        analysis: PathBuf,

        /// Export format: csv or json.
        #[arg(short, long)]
        format: String,

        /// Output file or directory. Prints to stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rivalscope=info",
        1 => "rivalscope=debug",
        _ => "rivalscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Analyze {
            urls,
            title,
            input,
            out,
            concurrency,
        } => cmd_analyze(urls, title, input.as_deref(), out.as_deref(), concurrency).await,
        Command::Export {
            analysis,
            format,
            out,
        } => cmd_export(&analysis, &format, out.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Error payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
}

/// Message shown to the caller: validation messages verbatim, anything else generic.
fn payload_message<'a>(err: &'a RivalScopeError, generic: &'a str) -> &'a str {
    match err {
        RivalScopeError::Validation { message } => message,
        _ => generic,
    }
}

/// The `{"error": ...}` body for `err`.
fn error_payload(err: &RivalScopeError, generic: &str) -> Result<String> {
    let payload = ErrorPayload {
        error: payload_message(err, generic),
    };
    Ok(serde_json::to_string(&payload)?)
}

/// Print `{"error": ...}` to stdout and signal failure.
fn emit_error(err: &RivalScopeError, generic: &str) -> Result<ExitCode> {
    if !err.is_validation() {
        error!(error = %err, "command failed");
    }
    println!("{}", error_payload(err, generic)?);
    Ok(ExitCode::FAILURE)
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

/// Merge the JSON request file (if any) with the positional URLs and title flag.
fn build_request(
    urls: Vec<String>,
    title: Option<String>,
    input: Option<&Path>,
) -> rivalscope_shared::Result<AnalysisRequest> {
    let mut request = match input {
        Some(path) => {
            let body =
                std::fs::read_to_string(path).map_err(|e| RivalScopeError::io(path, e))?;
            serde_json::from_str::<AnalysisRequest>(&body)
                .map_err(|e| RivalScopeError::validation(format!("Invalid request body: {e}")))?
        }
        None => AnalysisRequest::default(),
    };

    request.urls.extend(urls);
    if title.is_some() {
        request.title = title;
    }
    Ok(request)
}

async fn cmd_analyze(
    urls: Vec<String>,
    title: Option<String>,
    input: Option<&Path>,
    out: Option<&Path>,
    concurrency: Option<u32>,
) -> Result<ExitCode> {
    let request = match build_request(urls, title, input) {
        Ok(request) => request,
        Err(e) => return emit_error(&e, ANALYZE_FAILED),
    };

    let reporter = CliProgress::new();
    let result = run_analysis(&request, load_config(), concurrency, &reporter).await;
    reporter.spinner.finish_and_clear();

    let written = result.and_then(|analysis| {
        let json = serde_json::to_string_pretty(&analysis)
            .map_err(|e| RivalScopeError::Export(format!("failed to serialize analysis: {e}")))?;
        match out {
            Some(path) => {
                write_file(path, &json)?;
                eprintln!("  Analysis written to {}", path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    });

    match written {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => emit_error(&e, ANALYZE_FAILED),
    }
}

/// Build the pipeline from `config` and run it over `request`.
async fn run_analysis(
    request: &AnalysisRequest,
    config: rivalscope_shared::Result<AppConfig>,
    concurrency: Option<u32>,
    progress: &dyn ProgressReporter,
) -> rivalscope_shared::Result<Analysis> {
    let config = config?;
    let availability = resolve_api_key(&config);
    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(n) = concurrency {
        pipeline_config.fetch.concurrency = n;
    }
    let backend = AiBackend::from_availability(
        &availability,
        &config.openai,
        pipeline_config.ai_timeout,
    )?;
    let pipeline = Pipeline::new(pipeline_config, backend)?;

    info!(
        urls = request.urls.len(),
        ai = availability.is_configured(),
        "analyzing competitors"
    );

    pipeline.run(request, progress).await
}

fn write_file(path: &Path, body: &str) -> rivalscope_shared::Result<()> {
    std::fs::write(path, body).map_err(|e| RivalScopeError::io(path, e))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, stage: PipelineStage) {
        self.spinner.set_message(stage.to_string());
    }

    fn done(&self, analysis: &Analysis, outcome: AnalysisOutcome) {
        self.spinner.finish_and_clear();
        match outcome {
            AnalysisOutcome::Live => eprintln!(
                "  Analyzed {} competitor(s): {}",
                analysis.competitors.len(),
                analysis.title
            ),
            AnalysisOutcome::Demo(reason) => {
                eprintln!("  Showing demo analysis ({})", reason.marker())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

fn cmd_export(analysis_path: &Path, format: &str, out: Option<&Path>) -> Result<ExitCode> {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(e) => return emit_error(&e, EXPORT_FAILED),
    };

    let analysis = match read_analysis(analysis_path) {
        Ok(analysis) => analysis,
        Err(e) => return emit_error(&e, EXPORT_FAILED),
    };

    let output = match export(&analysis, format) {
        Ok(output) => output,
        Err(e) => return emit_error(&e, EXPORT_FAILED),
    };

    match out {
        Some(path) => {
            let target = export_target(path, &output.filename);
            if let Err(e) = write_file(&target, &output.body) {
                return emit_error(&e, EXPORT_FAILED);
            }
            eprintln!("  {} export written to {}", output.content_type, target.display());
        }
        None => println!("{}", output.body),
    }

    Ok(ExitCode::SUCCESS)
}

/// `path` itself, or `path/<filename>` when `path` is a directory.
///
/// Path separators in the title-derived filename are replaced so it stays one component.
fn export_target(path: &Path, filename: &str) -> PathBuf {
    if path.is_dir() {
        path.join(filename.replace(['/', '\\'], "_"))
    } else {
        path.to_path_buf()
    }
}

fn read_analysis(path: &Path) -> rivalscope_shared::Result<Analysis> {
    let body = std::fs::read_to_string(path).map_err(|e| RivalScopeError::io(path, e))?;
    serde_json::from_str(&body)
        .map_err(|e| RivalScopeError::parse(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show() -> Result<ExitCode> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let key_state = if resolve_api_key(&config).is_configured() {
        "set"
    } else {
        "not set (analyses will use demo data)"
    };
    println!("# {}: {key_state}", config.openai.api_key_env);
    Ok(ExitCode::SUCCESS)
}
