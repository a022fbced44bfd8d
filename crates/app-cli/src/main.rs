use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use digest_domain::Credentials;
use digest_error::{DigestError, ErrorResponse};
use digest_hf::{HfConfig, HfSummaryModel, DEFAULT_API_BASE, DEFAULT_MODEL};
use digest_imap::{ImapConfig, ImapTransport, IMAP_TLS_PORT};
use digest_pipeline::batch::DEFAULT_WORKERS;
use digest_pipeline::format::{format_summaries, format_summary};
use digest_pipeline::{DigestRequest, DigestService, Format};
use digest_vision::{ChromeRenderer, TesseractOcr, DEFAULT_TOOL_TIMEOUT};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "inbox-digest")]
#[command(about = "Summarize and prioritize the newest messages in an IMAP inbox")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the newest messages and print a prioritized digest
    Fetch {
        #[arg(long, env = "DIGEST_EMAIL")]
        email: String,

        #[arg(long, env = "DIGEST_APP_PASSWORD", hide_env_values = true)]
        password: String,

        /// Maximum number of messages to fetch
        #[arg(short = 'n', long, env = "DIGEST_MAX_EMAILS", default_value_t = 10)]
        count: usize,

        #[arg(short, long)]
        unread_only: bool,

        /// Keep only summaries whose sender contains this text
        #[arg(short, long)]
        sender: Option<String>,

        #[arg(short, long, env = "DIGEST_WORKERS", default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// compact, expanded or full (JSON)
        #[arg(short, long, default_value = "compact")]
        format: String,
    },
    /// OCR an image file and summarize the recognized text
    Image {
        path: PathBuf,

        #[arg(short, long, default_value = "compact")]
        format: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "inbox_digest=info,digest_pipeline=info,digest_imap=info",
                )
            }),
        )
        .compact()
        .init();
}

fn load_imap_config() -> Result<ImapConfig, String> {
    let host = env::var("DIGEST_IMAP_HOST").ok().filter(|h| !h.trim().is_empty());
    let port = match env::var("DIGEST_IMAP_PORT") {
        Ok(p) => p
            .trim()
            .parse()
            .map_err(|e| format!("invalid DIGEST_IMAP_PORT: {e}"))?,
        Err(_) => IMAP_TLS_PORT,
    };
    Ok(ImapConfig { host, port })
}

fn load_hf_config() -> HfConfig {
    HfConfig {
        base: env::var("HF_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        model: env::var("HF_SUMMARY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        token: env::var("HF_API_TOKEN").ok().filter(|t| !t.is_empty()),
    }
}

/// Seconds; unset or blank keeps the default.
fn parse_tool_timeout(value: Option<&str>) -> Result<Duration, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_TOOL_TIMEOUT),
        Some(v) => match v.parse::<u64>() {
            Ok(0) => Err("DIGEST_TOOL_TIMEOUT must be at least 1 second".to_string()),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(format!("invalid DIGEST_TOOL_TIMEOUT: {e}")),
        },
    }
}

fn load_vision_tools() -> Result<(ChromeRenderer, TesseractOcr), String> {
    let chrome = env::var("DIGEST_CHROME_BIN").unwrap_or_else(|_| "chromium".to_string());
    let tesseract = env::var("DIGEST_TESSERACT_BIN").unwrap_or_else(|_| "tesseract".to_string());
    let timeout = parse_tool_timeout(env::var("DIGEST_TOOL_TIMEOUT").ok().as_deref())?;
    Ok((
        ChromeRenderer::new(chrome).with_timeout(timeout),
        TesseractOcr::new(tesseract).with_timeout(timeout),
    ))
}

fn build_service(workers: usize) -> Result<DigestService, DigestError> {
    let imap = load_imap_config().map_err(DigestError::invalid_input)?;
    let (renderer, ocr) = load_vision_tools().map_err(DigestError::invalid_input)?;
    Ok(DigestService::new(
        Arc::new(ImapTransport::new(imap)),
        Arc::new(renderer),
        Arc::new(ocr),
        Arc::new(HfSummaryModel::new(load_hf_config())),
        workers,
    ))
}

async fn run(cli: Cli) -> Result<String, DigestError> {
    match cli.command {
        Command::Fetch {
            email,
            password,
            count,
            unread_only,
            sender,
            workers,
            format,
        } => {
            let service = build_service(workers)?;
            let request = DigestRequest {
                credentials: Credentials::new(email, password),
                max_count: count,
                unread_only,
                sender_filter: sender,
            };
            info!(count, unread_only, workers, "building digest");
            let summaries = service.fetch_and_summarize(&request).await?;
            Ok(format_summaries(
                &summaries,
                Format::parse(Some(format.as_str())),
            ))
        }
        Command::Image { path, format } => {
            let service = build_service(1)?;
            let summary = service.summarize_image(&path).await?;
            Ok(format_summary(&summary, Format::parse(Some(format.as_str()))))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error!(%e, "digest failed");
            eprintln!("{}", ErrorResponse::from(&e).to_compact());
            std::process::exit(1);
        }
    }
}
