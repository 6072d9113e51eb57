//! Command-line interface definitions.
//!
//! Every option can also come from the environment where noted. Timing and
//! pool-size options override the selected site profile's defaults.

use feed_harvest::sites::Site;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How pages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Renderer {
    /// Plain HTTP fetches, no script execution.
    Http,
    /// Headless Chromium (requires the `browser` feature).
    Chrome,
}

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # First 50 videos of a Douyin user, three at a time
/// feed_harvest --site douyin --feed-url https://www.douyin.com/user/MS4w... \
///     --save-dir ./videos --max-items 50 --renderer chrome
///
/// # A custom layout described in YAML
/// feed_harvest --profile ./mysite.yaml --feed-url https://example.com/u/1 -s ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Built-in site profile
    #[arg(long, value_enum, default_value_t = Site::Douyin, conflicts_with = "profile")]
    pub site: Site,

    /// YAML site profile, instead of a built-in one
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// The user feed page to crawl
    #[arg(short, long, env = "FEED_URL")]
    pub feed_url: String,

    /// Directory downloaded videos are written into
    #[arg(short, long, env = "SAVE_DIR")]
    pub save_dir: PathBuf,

    /// Download only the first N feed items (all when omitted)
    #[arg(short = 'n', long)]
    pub max_items: Option<usize>,

    /// Items processed concurrently (defaults to the site profile)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Upper bound on feed scrolling, in milliseconds
    #[arg(long)]
    pub feed_timeout_ms: Option<u64>,

    /// Upper bound on waiting for one item's player, in milliseconds
    #[arg(long)]
    pub item_timeout_ms: Option<u64>,

    /// Largest accepted media file, in bytes
    #[arg(long)]
    pub max_body_bytes: Option<u64>,

    /// Page renderer
    #[arg(long, value_enum, default_value_t = Renderer::Http)]
    pub renderer: Renderer,

    /// Show the browser window (chrome renderer only)
    #[arg(long)]
    pub headful: bool,

    /// Where to write the JSON run report (defaults to the save directory)
    #[arg(long)]
    pub report: Option<PathBuf>,
}
