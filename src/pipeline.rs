//! The download pipeline.
//!
//! Items are processed by a fixed number of concurrent units. Each unit owns
//! one item end to end: open the detail page, wait for the player, classify the
//! media URL, fetch, write. A unit never fails the run; its outcome (file or
//! error) flows back to the collecting loop, which is the only writer of the
//! [`ErrorLog`](crate::models::ErrorLog).

use crate::config::PipelineConfig;
use crate::download::{MediaFetcher, save_media};
use crate::error::{ItemError, RenderError};
use crate::feed;
use crate::models::{FeedItem, MediaSource, RunReport};
use crate::render::RenderedPageSource;
use crate::resolver;
use crate::sites::SiteAdapter;
use crate::utils::{disambiguated_stem, file_stem};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, instrument, warn};

/// Resolves and downloads feed items with bounded concurrency.
pub struct DownloadPipeline<'a, S, F> {
    source: &'a S,
    site: &'a SiteAdapter,
    fetcher: &'a F,
    config: &'a PipelineConfig,
    /// File stems written so far in this run.
    claimed_stems: Mutex<HashSet<String>>,
}

impl<'a, S, F> DownloadPipeline<'a, S, F>
where
    S: RenderedPageSource,
    F: MediaFetcher,
{
    pub fn new(
        source: &'a S,
        site: &'a SiteAdapter,
        fetcher: &'a F,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            source,
            site,
            fetcher,
            config,
            claimed_stems: Mutex::new(HashSet::new()),
        }
    }

    /// Process every item and return once all of them finished.
    ///
    /// At most `config.worker_count` items are in flight at any time. Items
    /// complete in no particular order.
    ///
    /// # Arguments
    ///
    /// * `items` - Feed items in page order; the position becomes the item
    ///   index used for fallback file names
    ///
    /// # Returns
    ///
    /// A [`RunReport`] with one saved path per downloaded item and one
    /// [`ErrorLog`](crate::models::ErrorLog) entry per failed item. Errors and
    /// panics inside a unit are recorded there and never cut the run short.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let pipeline = DownloadPipeline::new(&source, &site, &fetcher, &config);
    /// let report = pipeline.run(listing.items).await;
    /// println!("{} of {} saved", report.success_count(), report.attempted);
    /// ```
    #[instrument(level = "info", skip_all, fields(items = items.len(), workers = self.config.worker_count))]
    pub async fn run(&self, items: Vec<FeedItem>) -> RunReport {
        let mut report = RunReport {
            attempted: items.len(),
            ..RunReport::default()
        };
        let mut remaining = items.len();
        info!(total = remaining, "Starting downloads");

        let mut outcomes = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                let result = AssertUnwindSafe(self.process(index, &item))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(ItemError::Panicked(panic_message(&*panic))));
                (item, result)
            })
            .buffer_unordered(self.config.worker_count.max(1));

        while let Some((item, result)) = outcomes.next().await {
            remaining -= 1;
            match result {
                Ok(path) => {
                    info!(item = %item.source_href, path = %path.display(), remaining, "Item downloaded");
                    report.downloaded.push(path);
                }
                Err(e) => {
                    warn!(item = %item.source_href, error = %e, kind = %e.kind(), remaining, "Item failed");
                    report.errors.record(item.source_href, &e);
                }
            }
        }

        info!(
            attempted = report.attempted,
            downloaded = report.success_count(),
            failed = report.errors.len(),
            "Downloads finished"
        );
        report
    }

    /// One unit of work: resolve, classify, fetch, save.
    async fn process(&self, index: usize, item: &FeedItem) -> Result<PathBuf, ItemError> {
        let media =
            resolver::resolve(self.source, self.site, &item.source_href, self.config).await?;

        let url = match MediaSource::classify(&media.media_url) {
            MediaSource::Downloadable(url) => url,
            MediaSource::Unsupported(media_url) => {
                warn!(item = %item.source_href, %media_url, "Media source cannot be fetched directly");
                return Err(ItemError::UnsupportedSource { media_url });
            }
        };

        let bytes = self.fetcher.fetch(&url).await?;
        let stem = self.claim_stem(file_stem(&media.title, &item.source_href, index), item, index);
        save_media(&self.config.save_dir, &stem, &bytes).await
    }

    /// Reserve a file stem for this run. A stem already written by another
    /// item gets the item's URL segment appended, so no download replaces
    /// another from the same run.
    fn claim_stem(&self, stem: String, item: &FeedItem, index: usize) -> String {
        let mut claimed = self
            .claimed_stems
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if claimed.insert(stem.clone()) {
            return stem;
        }

        let mut alternative = disambiguated_stem(&stem, &item.source_href, index);
        if claimed.contains(&alternative) {
            alternative = disambiguated_stem(&alternative, "", index);
        }
        warn!(item = %item.source_href, %stem, %alternative, "File name already used in this run");
        claimed.insert(alternative.clone());
        alternative
    }
}

/// Discover the feed, then download every item.
///
/// # Arguments
///
/// * `source` - Renders both the feed and the detail pages
/// * `site` - Compiled selectors of the target site
/// * `fetcher` - Downloads the media bodies
/// * `config` - Save directory, limits, pool size and timings
///
/// # Returns
///
/// The run report, with `feed_complete` telling whether the end of the feed
/// was reached before the feed timeout.
///
/// # Errors
///
/// Returns the [`RenderError`] when the feed page itself cannot be opened or
/// snapshotted. Item failures never surface here; they end up in the report.
#[instrument(level = "info", skip_all, fields(site = %site.name()))]
pub async fn harvest<S, F>(
    source: &S,
    site: &SiteAdapter,
    fetcher: &F,
    config: &PipelineConfig,
) -> Result<RunReport, RenderError>
where
    S: RenderedPageSource,
    F: MediaFetcher,
{
    let listing = match feed::discover(source, site, config).await {
        Ok(listing) => listing,
        Err(e) => {
            error!(error = %e, "Feed discovery failed");
            return Err(e);
        }
    };

    let pipeline = DownloadPipeline::new(source, site, fetcher, config);
    let mut report = pipeline.run(listing.items).await;
    report.feed_complete = listing.complete;
    Ok(report)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
