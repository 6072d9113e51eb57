//! # Feed Harvest
//!
//! Crawl a user's feed on a short-video platform, wait for each video's
//! detail page to finish client-side rendering, and download the media file.
//!
//! ## Architecture
//!
//! 1. **Discovery** ([`feed`]): open the feed, scroll until the end marker
//!    appears or the feed timeout runs out, collect detail-page links
//! 2. **Resolution** ([`resolver`]): per item, poll the detail page until the
//!    player exposes a media source; read title and source
//! 3. **Download** ([`pipeline`], [`download`]): a bounded pool of concurrent
//!    units fetches protocol-relative sources and writes `<title>.mp4`;
//!    everything else is recorded as a failure
//!
//! Waiting is always done by [`poller::poll_until`]; pages come from a
//! [`render::RenderedPageSource`]; site markup is described by a
//! [`sites::SiteProfile`].

pub mod config;
pub mod dom;
pub mod download;
pub mod error;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod poller;
pub mod render;
pub mod report;
pub mod resolver;
pub mod sites;
pub mod utils;

pub use config::{PipelineConfig, WaitRange};
pub use dom::DomSnapshot;
pub use download::{FetchSettings, HttpFetcher, MediaFetcher};
pub use error::{ConfigError, FailureKind, ItemError, RenderError};
pub use models::{ErrorLog, FeedItem, FeedListing, ItemFailure, MediaSource, ResolvedMedia, RunReport};
pub use pipeline::{DownloadPipeline, harvest};
pub use poller::{Advance, PollOutcome, poll_until};
pub use render::RenderedPageSource;
pub use sites::{Site, SiteAdapter, SiteProfile};
