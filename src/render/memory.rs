//! In-memory page source.
//!
//! Serves pre-captured HTML "frames" per URL: the n-th snapshot of an open
//! page returns the n-th frame, and the last frame repeats once the script
//! runs out. Used to replay captured sessions and to drive the pipeline in
//! tests without a browser.

use super::RenderedPageSource;
use crate::dom::DomSnapshot;
use crate::error::RenderError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Scripted page source keyed by URL.
#[derive(Debug, Default)]
pub struct MemoryPageSource {
    pages: HashMap<String, Vec<String>>,
    unreachable: HashSet<String>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    snapshots: AtomicUsize,
    triggers: AtomicUsize,
}

/// A page opened by [`MemoryPageSource`].
#[derive(Debug)]
pub struct MemoryPage {
    url: String,
    next_frame: AtomicUsize,
}

impl MemoryPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `frames` for `url`, one per snapshot.
    pub fn with_page<I, F>(mut self, url: impl Into<String>, frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.pages
            .insert(url.into(), frames.into_iter().map(Into::into).collect());
        self
    }

    /// Make `open(url)` fail as if the page could not be loaded.
    pub fn with_unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn triggers(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }
}

impl RenderedPageSource for MemoryPageSource {
    type Handle = MemoryPage;

    async fn open(&self, url: &str) -> Result<MemoryPage, RenderError> {
        if self.unreachable.contains(url) || !self.pages.contains_key(url) {
            return Err(RenderError::Browser(format!("cannot load {url}")));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryPage {
            url: url.to_string(),
            next_frame: AtomicUsize::new(0),
        })
    }

    async fn snapshot(&self, page: &MemoryPage) -> Result<DomSnapshot, RenderError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        let frames = self
            .pages
            .get(&page.url)
            .ok_or_else(|| RenderError::Browser(format!("page {} vanished", page.url)))?;
        let index = page.next_frame.fetch_add(1, Ordering::SeqCst);
        let frame = frames
            .get(index)
            .or_else(|| frames.last())
            .map(String::as_str)
            .unwrap_or_default();
        Ok(DomSnapshot::parse(frame))
    }

    async fn trigger_more(&self, _page: &MemoryPage) -> Result<(), RenderError> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, page: MemoryPage) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        debug!(url = %page.url, "Closed page");
    }
}

/// Wraps a [`MemoryPageSource`] whose snapshots panic, the way a renderer
/// bug or a scraper parse failure would. Opening and closing go through to
/// the inner source, so its counters show whether pages were released.
#[cfg(test)]
pub(crate) struct CrashingPageSource(MemoryPageSource);

#[cfg(test)]
impl CrashingPageSource {
    pub(crate) fn new(inner: MemoryPageSource) -> Self {
        Self(inner)
    }

    pub(crate) fn inner(&self) -> &MemoryPageSource {
        &self.0
    }
}

#[cfg(test)]
impl RenderedPageSource for CrashingPageSource {
    type Handle = MemoryPage;

    async fn open(&self, url: &str) -> Result<MemoryPage, RenderError> {
        self.0.open(url).await
    }

    async fn snapshot(&self, page: &MemoryPage) -> Result<DomSnapshot, RenderError> {
        panic!("renderer crashed on {}", page.url);
    }

    async fn trigger_more(&self, page: &MemoryPage) -> Result<(), RenderError> {
        self.0.trigger_more(page).await
    }

    async fn close(&self, page: MemoryPage) {
        self.0.close(page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_advance_then_repeat() {
        let source = MemoryPageSource::new().with_page("https://x/feed", ["<p>1</p>", "<p>2</p>"]);
        let page = source.open("https://x/feed").await.unwrap();
        let texts: Vec<bool> = vec![
            source.snapshot(&page).await.unwrap().contains_text("1"),
            source.snapshot(&page).await.unwrap().contains_text("2"),
            source.snapshot(&page).await.unwrap().contains_text("2"),
        ];
        assert_eq!(texts, vec![true, true, true]);
        source.close(page).await;
        assert_eq!((source.opened(), source.closed(), source.snapshots()), (1, 1, 3));
    }

    #[tokio::test]
    async fn test_unknown_and_unreachable_urls_fail_to_open() {
        let source = MemoryPageSource::new()
            .with_page("https://x/a", ["<p></p>"])
            .with_unreachable("https://x/a");
        assert!(source.open("https://x/a").await.is_err());
        assert!(source.open("https://x/b").await.is_err());
        assert_eq!(source.opened(), 0);
    }
}
