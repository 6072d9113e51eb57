//! # Feed Harvest
//!
//! Downloads the videos of a short-video feed.
//!
//! ## Usage
//!
//! ```sh
//! feed_harvest --site douyin -f https://www.douyin.com/user/<id> -s ./videos -n 50
//! ```
//!
//! The run ends after every item has either been saved or recorded as failed.
//! Item failures do not change the exit status; they are printed at the end and
//! written to the JSON run report.

use clap::Parser;
use feed_harvest::download::{FetchSettings, HttpFetcher};
use feed_harvest::render::{HttpPageSource, RenderedPageSource};
use feed_harvest::report::{default_report_path, write_report};
use feed_harvest::utils::ensure_writable_dir;
use feed_harvest::{PipelineConfig, RunReport, SiteAdapter, SiteProfile, harvest};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Renderer};

/// Bound on a single page fetch by the HTTP renderer.
const PAGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("feed_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Site profile & run configuration ----
    let profile = match &args.profile {
        Some(path) => SiteProfile::from_yaml_file(path)?,
        None => args.site.profile(),
    };
    let site = profile.compile()?;
    info!(site = %site.name(), "Loaded site profile");

    let config = build_config(&args, &profile)?;
    info!(
        feed_url = %config.feed_url,
        save_dir = %config.save_dir.display(),
        max_items = ?config.max_items,
        workers = config.worker_count,
        "Run configuration"
    );

    if let Err(e) = ensure_writable_dir(&config.save_dir).await {
        error!(
            path = %config.save_dir.display(),
            error = %e,
            "Save directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| default_report_path(&config.save_dir));

    // ---- Crawl & download ----
    let report = match args.renderer {
        Renderer::Http => {
            let source = HttpPageSource::new(PAGE_REQUEST_TIMEOUT)?;
            execute(&source, &site, &config, &report_path).await?
        }
        Renderer::Chrome => run_with_chrome(&args, &site, &config, &report_path).await?,
    };

    print_summary(&report);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        downloaded = report.success_count(),
        failed = report.errors.len(),
        "Execution complete"
    );
    Ok(())
}

/// Merge CLI overrides into the profile defaults and validate the result.
fn build_config(args: &Cli, profile: &SiteProfile) -> Result<PipelineConfig, Box<dyn Error>> {
    let mut config = PipelineConfig::from_profile(&args.feed_url, &args.save_dir, profile)?;
    config.max_items = args.max_items;
    if let Some(workers) = args.workers {
        config.worker_count = usize::from(workers);
    }
    if let Some(ms) = args.feed_timeout_ms {
        config.feed_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.item_timeout_ms {
        config.item_timeout = Duration::from_millis(ms);
    }
    if let Some(bytes) = args.max_body_bytes {
        config.max_body_bytes = bytes;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "browser")]
async fn run_with_chrome(
    args: &Cli,
    site: &SiteAdapter,
    config: &PipelineConfig,
    report_path: &Path,
) -> Result<RunReport, Box<dyn Error>> {
    use feed_harvest::render::ChromePageSource;

    let source = ChromePageSource::launch(!args.headful, PAGE_REQUEST_TIMEOUT).await?;
    let result = execute(&source, site, config, report_path).await;
    source.shutdown().await;
    result
}

#[cfg(not(feature = "browser"))]
async fn run_with_chrome(
    _args: &Cli,
    _site: &SiteAdapter,
    _config: &PipelineConfig,
    _report_path: &Path,
) -> Result<RunReport, Box<dyn Error>> {
    Err("the chrome renderer needs a build with `--features browser`".into())
}

/// Run the pipeline over `source` and write the report.
#[instrument(level = "info", skip_all, fields(site = %site.name()))]
async fn execute<S: RenderedPageSource>(
    source: &S,
    site: &SiteAdapter,
    config: &PipelineConfig,
    report_path: &Path,
) -> Result<RunReport, Box<dyn Error>> {
    let fetcher = HttpFetcher::new(FetchSettings {
        max_body_bytes: config.max_body_bytes,
        ..FetchSettings::default()
    })?;

    let report = harvest(source, site, &fetcher, config).await?;

    if let Err(e) = write_report(&report, site.name(), config.feed_url.as_str(), report_path).await
    {
        warn!(path = %report_path.display(), error = %e, "Failed to write run report");
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    println!(
        "\n{} of {} items downloaded{}",
        report.success_count(),
        report.attempted,
        if report.feed_complete {
            ""
        } else {
            " (feed scroll timed out; list may be incomplete)"
        }
    );
    if report.errors.is_empty() {
        return;
    }
    println!("\n------- Unresolved items ({}) -------", report.errors.len());
    for failure in report.errors.entries() {
        println!("{}  [{}] {}", failure.item_ref, failure.kind, failure.reason);
    }
}
