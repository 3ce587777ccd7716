//! CLI entry point for the metamaster tool.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use metamaster_core::{
    ChibisafeTransfer, ExtractOutcome, ExtractorRegistry, SauceNaoOracle, ShimmieGateway, Worker,
    build_default_extractor_registry, configure_http_timeouts,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Service credentials usually live in .env next to the binary's working directory
    dotenvy::dotenv().ok();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    configure_http_timeouts(args.connect_timeout_secs, args.read_timeout_secs);

    let registry = build_default_extractor_registry(&args.extractor_credentials());

    if let Some(url) = &args.extract {
        return run_extract(&registry, url).await;
    }

    let config = args.run_config()?;
    info!("Metamaster starting");

    let endpoint = required(args.shimmie_endpoint.as_deref(), "SHIMMIE_ENDPOINT")?;
    let login = required(args.shimmie_login.as_deref(), "SHIMMIE_LOGIN")?;
    let password = required(args.shimmie_password.as_deref(), "SHIMMIE_PASSWORD")?;
    let api_key = required(args.saucenao_api_key.as_deref(), "SAUCENAO_API_KEY")?;

    let catalog = ShimmieGateway::new(endpoint, login, password)?;
    let oracle = SauceNaoOracle::new(api_key)?;

    let upload = config.upload;
    let mut worker = Worker::new(Arc::new(catalog), Arc::new(oracle), registry, config);
    if upload {
        let upload_url = required(args.chibisafe_upload_url.as_deref(), "CHIBISAFE_UPLOAD_URL")?;
        let upload_key = required(args.chibisafe_api_key.as_deref(), "CHIBISAFE_API_KEY")?;
        worker = worker.with_transfer(Arc::new(ChibisafeTransfer::new(upload_url, upload_key)?));
    }

    let summary = match worker.run().await {
        Ok(summary) => summary,
        Err(err) if err.is_fatal() => {
            return Err(err).context("Cannot start processing: catalog login was rejected");
        }
        Err(err) => {
            let service = err.stage();
            return Err(err).with_context(|| format!("Cannot start processing: {service} unavailable"));
        }
    };

    Ok(if summary.cause.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn required<'a>(value: Option<&'a str>, variable: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!(
            "{variable} is not set\n  Suggestion: Export {variable} or add it to .env in the working directory"
        ),
    }
}

async fn run_extract(registry: &ExtractorRegistry, url: &str) -> Result<ExitCode> {
    let Some(extractor) = registry.find_for_url(url) else {
        bail!("No extractor supports {url}\n  Supported sites: danbooru, yande.re, gelbooru, konachan");
    };
    info!(extractor = extractor.name(), "Extracting metadata");

    match extractor.fetch_metadata(url).await? {
        ExtractOutcome::Found(metadata) => {
            println!("[Tags] {}", metadata.tags.join(" "));
            println!("[Source] {}", metadata.source);
            println!("[Rating] {}", metadata.rating);
            Ok(ExitCode::SUCCESS)
        }
        ExtractOutcome::Absent => bail!("No metadata found for {url}"),
    }
}
