//! Data models for feed items, resolved media and run results.
//!
//! - [`FeedItem`]: one detail-page link discovered on the feed
//! - [`FeedListing`]: everything discovery found, plus whether it saw the end
//! - [`ResolvedMedia`]: title and media URL read from a rendered detail page
//! - [`MediaSource`]: whether a media URL can be fetched with plain HTTP
//! - [`ErrorLog`] / [`RunReport`]: what happened to every item

use crate::error::{FailureKind, ItemError};
use serde::Serialize;
use std::path::PathBuf;
use url::Url;

/// A detail-page link discovered on the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    /// Absolute URL of the item's detail page.
    pub source_href: String,
}

impl FeedItem {
    pub fn new(source_href: impl Into<String>) -> Self {
        Self {
            source_href: source_href.into(),
        }
    }
}

/// Result of crawling a feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedListing {
    /// Items in page order, already cut to `max_items`.
    pub items: Vec<FeedItem>,
    /// How many items the page held before truncation.
    pub discovered: usize,
    /// `true` if the end-of-feed marker was seen; `false` means the scroll
    /// timed out and `items` may be a prefix of the feed.
    pub complete: bool,
}

/// Title and media URL of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub title: String,
    /// Protocol-relative URL, or something unfetchable such as `blob:`.
    pub media_url: String,
}

/// Whether a resolved media URL can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Protocol-relative link, upgraded to `https:`.
    Downloadable(Url),
    /// Anything else (`blob:` object references and the like).
    Unsupported(String),
}

impl MediaSource {
    pub fn classify(media_url: &str) -> Self {
        if let Some(rest) = media_url.strip_prefix("//") {
            if let Ok(url) = Url::parse(&format!("https://{rest}")) {
                return MediaSource::Downloadable(url);
            }
        }
        MediaSource::Unsupported(media_url.to_string())
    }
}

/// One item that could not be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// The item's detail-page URL.
    pub item_ref: String,
    pub reason: String,
    pub kind: FailureKind,
}

/// Append-only record of item failures.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: Vec<ItemFailure>,
}

impl ErrorLog {
    pub fn record(&mut self, item_ref: impl Into<String>, error: &ItemError) {
        self.entries.push(ItemFailure {
            item_ref: item_ref.into(),
            reason: error.to_string(),
            kind: error.kind(),
        });
    }

    pub fn entries(&self) -> &[ItemFailure] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Items handed to the pool.
    pub attempted: usize,
    /// Files written, in completion order.
    pub downloaded: Vec<PathBuf>,
    pub errors: ErrorLog,
    /// Whether feed discovery saw the end of the feed.
    pub feed_complete: bool,
}

impl RunReport {
    pub fn success_count(&self) -> usize {
        self.downloaded.len()
    }
}
