//! Rendering collaborators.
//!
//! The pipeline never drives a browser directly. It opens a page through a
//! [`RenderedPageSource`], takes [`DomSnapshot`]s of whatever has rendered so
//! far, nudges lazy-loading feeds with [`RenderedPageSource::trigger_more`],
//! and closes the page when done.
//!
//! # Adapters
//!
//! | Adapter | Module | Executes scripts |
//! |---------|--------|------------------|
//! | [`HttpPageSource`] | [`http`] | no, re-fetches the page on every snapshot |
//! | `ChromePageSource` | `chrome` (feature `browser`) | yes, headless Chromium |
//! | [`MemoryPageSource`] | [`memory`] | no, serves captured page frames |
//!
//! # Page lifetime
//!
//! Every `open` must be paired with a `close`, including on timeout and error
//! paths. Callers keep the page handle private to one unit of work.

#[cfg(feature = "browser")]
pub mod chrome;
pub mod http;
pub mod memory;

use crate::dom::DomSnapshot;
use crate::error::RenderError;

#[cfg(feature = "browser")]
pub use chrome::ChromePageSource;
pub use http::HttpPageSource;
pub use memory::MemoryPageSource;

/// Something that can load a URL and report the page's current DOM.
pub trait RenderedPageSource {
    /// An open page.
    type Handle;

    /// Start loading `url` and return a handle to the page.
    async fn open(&self, url: &str) -> Result<Self::Handle, RenderError>;

    /// The page as it looks right now, possibly still loading.
    async fn snapshot(&self, page: &Self::Handle) -> Result<DomSnapshot, RenderError>;

    /// Ask the page to load more content (scroll to the end).
    async fn trigger_more(&self, page: &Self::Handle) -> Result<(), RenderError>;

    /// Release the page. Never fails; problems are logged.
    async fn close(&self, page: Self::Handle);
}
