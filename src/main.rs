use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod date;
mod error;
mod fetch;
mod utils;

use cli::Cli;
use fetch::{Fetcher, ReqwestClient};
use utils::Progress;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "paperdl=debug" } else { "paperdl=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let job = cli
        .resolve(Local::now().date_naive())
        .context("Invalid arguments")?;
    info!(
        "downloading {} edition(s): {} to {}",
        job.range.len(),
        job.range.start(),
        job.range.end()
    );
    if let Some(proxy) = &job.proxy {
        info!("using proxy {proxy}");
    }

    let client = ReqwestClient::new(job.proxy.as_ref(), job.timeout)
        .context("Failed to build HTTP client")?;
    let fetcher = Fetcher::new(client, job.config).with_progress(Progress::new(job.show_progress));
    let report = fetcher.run_batch(&job.range).await;

    info!(
        "done: {} saved, {} skipped, {} failed of {}",
        report.saved.len(),
        report.skipped.len(),
        report.failed.len(),
        report.total()
    );
    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }
    for (date, err) in &report.failed {
        warn!("{date} not downloaded: {err}");
    }
    Ok(ExitCode::FAILURE)
}
