//! Feed discovery.
//!
//! Opens the user feed, keeps scrolling until the site's end-of-feed marker
//! shows up (or the feed timeout runs out), then reads the detail-page link of
//! every card in page order.

use crate::config::PipelineConfig;
use crate::error::RenderError;
use crate::models::{FeedItem, FeedListing};
use crate::poller::{Advance, poll_until};
use crate::render::RenderedPageSource;
use crate::sites::SiteAdapter;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, instrument, warn};

/// Crawl the feed and return its items, cut to `config.max_items`.
///
/// # Arguments
///
/// * `source` - Renders the feed page and scrolls it on request
/// * `site` - Supplies the card selector and the end-of-feed marker
/// * `config` - Supplies `feed_url`, `max_items`, `feed_wait` and `feed_timeout`
///
/// # Returns
///
/// The items in page order, duplicates kept. A timeout is not an error:
/// whatever has loaded by then is returned with `complete = false`.
///
/// # Errors
///
/// Returns the [`RenderError`] of a page source that fails to open or
/// snapshot the feed. The page is closed before returning on every path,
/// panics included.
///
/// # Examples
///
/// ```ignore
/// let listing = discover(&source, &site, &config).await?;
/// if !listing.complete {
///     println!("partial feed: {} items", listing.items.len());
/// }
/// ```
#[instrument(level = "info", skip_all, fields(feed_url = %config.feed_url, site = %site.name()))]
pub async fn discover<S: RenderedPageSource>(
    source: &S,
    site: &SiteAdapter,
    config: &PipelineConfig,
) -> Result<FeedListing, RenderError> {
    let page = source.open(config.feed_url.as_str()).await?;
    let listing = AssertUnwindSafe(scroll_and_collect(source, &page, site, config))
        .catch_unwind()
        .await;
    source.close(page).await;
    listing.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

async fn scroll_and_collect<S: RenderedPageSource>(
    source: &S,
    page: &S::Handle,
    site: &SiteAdapter,
    config: &PipelineConfig,
) -> Result<FeedListing, RenderError> {
    let outcome = poll_until(
        source,
        page,
        |dom| site.is_feed_exhausted(dom),
        Advance::TriggerMore,
        config.feed_wait.sample(),
        config.feed_timeout,
    )
    .await?;

    let complete = outcome.is_ready();
    if !complete {
        warn!(
            timeout_ms = config.feed_timeout.as_millis() as u64,
            "End of feed not reached before timeout; using what has loaded"
        );
    }

    let dom = outcome.into_snapshot();
    let mut items = Vec::new();
    for href in site.feed_links(&dom) {
        match config.feed_url.join(&href) {
            Ok(resolved) => items.push(FeedItem::new(resolved)),
            Err(e) => debug!(%href, error = %e, "Skipping unresolvable feed link"),
        }
    }

    let discovered = items.len();
    if let Some(max) = config.max_items {
        items.truncate(max);
    }

    info!(discovered, kept = items.len(), complete, "Discovered feed items");
    debug!(items = ?items, "Feed items");
    Ok(FeedListing {
        items,
        discovered,
        complete,
    })
}
