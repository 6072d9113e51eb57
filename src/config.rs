//! Run configuration.
//!
//! A [`PipelineConfig`] is assembled once in `main` from the CLI and the
//! selected site profile, validated, and then shared read-only by discovery
//! and every download unit.

use crate::error::ConfigError;
use crate::sites::SiteProfile;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Responses larger than this are refused by the media fetcher.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 100 * 1024 * 1024;

/// Inclusive range a poll interval is drawn from.
///
/// Polling on a fixed beat is easy to fingerprint, so every poll picks its own
/// interval from this range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl WaitRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A degenerate range that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draw one interval uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng().random_range(self.min_ms..=self.max_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::WaitRange {
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

/// Everything a run needs, fixed before the first page is opened.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The user feed page to crawl.
    pub feed_url: Url,
    /// Directory media files are written into.
    pub save_dir: PathBuf,
    /// Keep only the first `n` feed items; `None` keeps all of them.
    pub max_items: Option<usize>,
    /// Number of items processed concurrently.
    pub worker_count: usize,
    /// Poll interval while scrolling the feed.
    pub feed_wait: WaitRange,
    /// Poll interval while waiting for an item's player.
    pub item_wait: WaitRange,
    /// Upper bound on feed scrolling.
    pub feed_timeout: Duration,
    /// Upper bound on waiting for one item's player.
    pub item_timeout: Duration,
    /// Largest media body accepted.
    pub max_body_bytes: u64,
}

impl PipelineConfig {
    /// Build a config for `feed_url` using the site profile's defaults.
    pub fn from_profile(
        feed_url: &str,
        save_dir: impl Into<PathBuf>,
        profile: &SiteProfile,
    ) -> Result<Self, ConfigError> {
        let feed_url = Url::parse(feed_url).map_err(|source| ConfigError::FeedUrl {
            url: feed_url.to_string(),
            source,
        })?;
        Ok(Self {
            feed_url,
            save_dir: save_dir.into(),
            max_items: None,
            worker_count: profile.worker_count,
            feed_wait: profile.feed_wait,
            item_wait: profile.item_wait,
            feed_timeout: Duration::from_millis(profile.feed_timeout_ms),
            item_timeout: Duration::from_millis(profile.item_timeout_ms),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.feed_wait.validate()?;
        self.item_wait.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::Site;

    #[test]
    fn test_wait_range_sample_stays_in_bounds() {
        let range = WaitRange::new(3_000, 5_000);
        for _ in 0..200 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(3_000) && d <= Duration::from_millis(5_000));
        }
        assert_eq!(WaitRange::fixed(7).sample(), Duration::from_millis(7));
    }

    #[test]
    fn test_inverted_wait_range_is_rejected() {
        assert!(WaitRange::new(10, 5).validate().is_err());
        assert!(WaitRange::new(5, 5).validate().is_ok());
    }

    #[test]
    fn test_from_profile_copies_site_defaults() {
        let profile = Site::Ixigua.profile();
        let config =
            PipelineConfig::from_profile("https://www.ixigua.com/home/1/", "/tmp/out", &profile)
                .unwrap();
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.feed_timeout, Duration::from_secs(30));
        assert_eq!(config.item_timeout, Duration::from_secs(50));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.max_items.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let profile = Site::Douyin.profile();
        let mut config =
            PipelineConfig::from_profile("https://www.douyin.com/user/x", "/tmp/out", &profile)
                .unwrap();
        config.worker_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_bad_feed_url_is_rejected() {
        let profile = Site::Douyin.profile();
        let err = PipelineConfig::from_profile("not a url", "/tmp/out", &profile).unwrap_err();
        assert!(matches!(err, ConfigError::FeedUrl { .. }));
    }
}
