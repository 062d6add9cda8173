//! CLI binary for payslip-ocr.
//!
//! `serve` runs the HTTP API; `extract` runs the pipeline once on a local
//! file and prints JSON. Both map flags onto `ExtractionConfig`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use payslip_ocr::{
    router, AppState, ExtractionConfig, ExtractionProgressCallback, PayslipExtractor, ProcessorId,
    ProgressCallback,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────

/// Prints one line per page to stderr during `extract`.
struct CliProgressCallback {
    started: Instant,
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting payslip fields from {total_pages} pages…"))
        );
    }

    fn on_page_complete(&self, page_num: usize, total: usize, fields_found: usize) {
        eprintln!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{fields_found} fields")),
        );
    }

    fn on_extraction_complete(&self, total_pages: usize, pages_with_fields: usize) {
        eprintln!(
            "{} {}/{} pages with fields  {}",
            green("✔"),
            bold(&pages_with_fields.to_string()),
            total_pages,
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64())),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 8080
  payslip-ocr serve --port 8080

  # One-shot extraction, one record per page
  payslip-ocr extract payslips.pdf

  # Let an LLM segment multi-page payslips
  PAYSLIP_LLM_PROVIDER=openai payslip-ocr extract --structured payslips.pdf

  # Upload to a running server
  curl -F file=@payslips.pdf http://localhost:8080/api/ocr

ENVIRONMENT VARIABLES:
  DOCAI_PROJECT_ID        Google Cloud project that owns the processor
  DOCAI_LOCATION          Processor region (us, eu)
  DOCAI_PROCESSOR_ID      Payslip processor ID
  DOCAI_ACCESS_TOKEN      OAuth2 bearer token (gcloud auth print-access-token)
  DOCAI_ENDPOINT          Override the Document AI endpoint
  PAYSLIP_LLM_PROVIDER    LLM provider for structuring (openai, anthropic, gemini, ollama)
  PAYSLIP_LLM_MODEL       LLM model ID (default: gpt-4.1-nano)
  OPENAI_API_KEY, …       Read by the chosen LLM provider
  RUST_LOG                Overrides --verbose / --quiet

A .env file in the working directory is loaded before flags are parsed.
"#;

/// Extract payslip fields from scanned PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "payslip-ocr",
    version,
    about = "Extract payslip fields from scanned PDFs via Document AI or an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Google Cloud project ID of the Document AI processor.
    #[arg(long, global = true, env = "DOCAI_PROJECT_ID", default_value = "")]
    project_id: String,

    /// Document AI processor location.
    #[arg(long, global = true, env = "DOCAI_LOCATION", default_value = payslip_ocr::config::DEFAULT_LOCATION)]
    location: String,

    /// Document AI payslip processor ID.
    #[arg(long, global = true, env = "DOCAI_PROCESSOR_ID", default_value = "")]
    processor_id: String,

    /// OAuth2 bearer token for Document AI.
    #[arg(long, global = true, env = "DOCAI_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Override the Document AI endpoint (e.g. a proxy or emulator).
    #[arg(long, global = true, env = "DOCAI_ENDPOINT")]
    endpoint: Option<String>,

    /// LLM provider for the structuring path: openai, anthropic, gemini, ollama.
    #[arg(long, global = true, env = "PAYSLIP_LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// LLM model ID for the structuring path.
    #[arg(long, global = true, env = "PAYSLIP_LLM_MODEL")]
    llm_model: Option<String>,

    /// Retries per Document AI call.
    #[arg(long, global = true, env = "PAYSLIP_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Document AI request timeout in seconds.
    #[arg(long, global = true, env = "PAYSLIP_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAYSLIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAYSLIP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Extract from a local PDF and print JSON to stdout.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "PAYSLIP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PAYSLIP_PORT", default_value_t = 8080)]
    port: u16,

    /// Maximum upload size in megabytes.
    #[arg(long, env = "PAYSLIP_MAX_UPLOAD_MB", default_value_t = 25,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file.
    input: PathBuf,

    /// Segment the whole document with the LLM instead of one record per page.
    #[arg(long)]
    structured: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(ref args) => serve(&cli, args).await,
        Command::Extract(ref args) => extract(&cli, args).await,
    }
}

async fn serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let config = build_config(cli, None)?;
    let extractor =
        PayslipExtractor::from_config(config).context("Failed to initialise extractor")?;
    if !extractor.has_structurer() {
        info!("POST /api/ocr/structured will return 500 until an LLM provider is configured");
    }

    let max_upload_bytes = usize::try_from(args.max_upload_mb * 1024 * 1024)
        .context("Upload limit does not fit in memory on this platform")?;
    let state = AppState::new(extractor).with_max_upload_bytes(max_upload_bytes);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn extract(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {:?}", args.input))?;

    let progress: Option<ProgressCallback> = if cli.quiet || args.structured {
        None
    } else {
        Some(Arc::new(CliProgressCallback {
            started: Instant::now(),
        }))
    };
    let config = build_config(cli, progress)?;
    let extractor =
        PayslipExtractor::from_config(config).context("Failed to initialise extractor")?;

    let json = if args.structured {
        let result = extractor
            .extract_structured(&bytes)
            .await
            .context("Structured extraction failed")?;
        serde_json::to_string_pretty(&result).context("Failed to serialise output")?
    } else {
        let records = extractor
            .extract_pages(&bytes)
            .await
            .context("Extraction failed")?;
        serde_json::to_string_pretty(&records).context("Failed to serialise output")?
    };

    println!("{json}");
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .processor(ProcessorId::new(
            cli.project_id.as_str(),
            cli.location.as_str(),
            cli.processor_id.as_str(),
        ))
        .max_retries(cli.max_retries);

    if let Some(ref token) = cli.access_token {
        builder = builder.access_token(token.as_str());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.as_str());
    }
    if let Some(secs) = cli.request_timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(ref provider) = cli.llm_provider {
        builder = builder.llm_provider_name(provider.as_str());
    }
    if let Some(ref model) = cli.llm_model {
        builder = builder.llm_model(model.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
