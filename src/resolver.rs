//! Item resolution: detail page in, title and media URL out.

use crate::config::PipelineConfig;
use crate::error::ItemError;
use crate::models::ResolvedMedia;
use crate::poller::{Advance, PollOutcome, poll_until};
use crate::render::RenderedPageSource;
use crate::sites::SiteAdapter;
use crate::utils::truncate_for_log;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, instrument, warn};

/// Open `item_url` and wait for its player to expose a media source.
///
/// Detail pages load by themselves, so the page is only watched, never
/// scrolled. Whether the media URL can actually be downloaded is left to the
/// caller.
///
/// # Arguments
///
/// * `source` - Renders the detail page
/// * `site` - Supplies the media, source and title selectors
/// * `item_url` - Absolute URL of the detail page
/// * `config` - Supplies `item_wait` and `item_timeout`
///
/// # Returns
///
/// The cleaned title and the raw media URL (`//cdn...`, `blob:...`, ...).
///
/// # Errors
///
/// * [`ItemError::RenderTimeout`] - the player did not show up within
///   `config.item_timeout`
/// * [`ItemError::Collaborator`] - the page could not be opened or snapshotted
///
/// The page is closed before returning on every path. A panic while polling
/// is re-raised after the page has been closed.
#[instrument(level = "info", skip_all, fields(%item_url))]
pub async fn resolve<S: RenderedPageSource>(
    source: &S,
    site: &SiteAdapter,
    item_url: &str,
    config: &PipelineConfig,
) -> Result<ResolvedMedia, ItemError> {
    let page = source.open(item_url).await?;
    let resolved = AssertUnwindSafe(wait_for_media(source, &page, site, config))
        .catch_unwind()
        .await;
    source.close(page).await;
    resolved.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

async fn wait_for_media<S: RenderedPageSource>(
    source: &S,
    page: &S::Handle,
    site: &SiteAdapter,
    config: &PipelineConfig,
) -> Result<ResolvedMedia, ItemError> {
    let outcome = poll_until(
        source,
        page,
        |dom| site.is_detail_ready(dom),
        Advance::Stay,
        config.item_wait.sample(),
        config.item_timeout,
    )
    .await?;

    let timed_out = || ItemError::RenderTimeout {
        waited_ms: config.item_timeout.as_millis() as u64,
    };

    let dom = match outcome {
        PollOutcome::Ready(dom) => dom,
        PollOutcome::TimedOut(dom) => {
            warn!("Media element never appeared");
            debug!(page = %truncate_for_log(dom.source(), 300), "Last snapshot");
            return Err(timed_out());
        }
    };

    let Some(media_url) = site.media_source(&dom) else {
        return Err(timed_out());
    };
    let title = site.title(&dom);
    info!(%title, %media_url, "Resolved media");
    Ok(ResolvedMedia { title, media_url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitRange;
    use crate::render::MemoryPageSource;
    use crate::render::memory::CrashingPageSource;
    use crate::sites::Site;
    use std::time::Duration;

    const ITEM: &str = "https://www.douyin.com/video/42";

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::from_profile(
            "https://www.douyin.com/user/abc",
            "/tmp/unused",
            &Site::Douyin.profile(),
        )
        .unwrap();
        config.item_wait = WaitRange::fixed(500);
        config.item_timeout = Duration::from_secs(5);
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_picks_last_source() {
        let detail = r#"<div class="z8_VexPf">Sunset
over | the bay</div>
            <video><source src="//cdn.example.com/first.mp4"><source src="//cdn.example.com/last.mp4"></video>"#;
        let source = MemoryPageSource::new().with_page(ITEM, ["<div>spinner</div>", detail]);
        let site = Site::Douyin.profile().compile().unwrap();

        let media = resolve(&source, &site, ITEM, &config()).await.unwrap();

        assert_eq!(media.media_url, "//cdn.example.com/last.mp4");
        assert_eq!(media.title, "Sunsetover  the bay");
        assert_eq!(source.snapshots(), 2);
        assert_eq!(source.triggers(), 0);
        assert_eq!(source.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_returns_unsupported_urls_unclassified() {
        let detail = r#"<video><source src="blob:https://www.douyin.com/9a"></video>"#;
        let source = MemoryPageSource::new().with_page(ITEM, [detail]);
        let site = Site::Douyin.profile().compile().unwrap();

        let media = resolve(&source, &site, ITEM, &config()).await.unwrap();
        assert_eq!(media.media_url, "blob:https://www.douyin.com/9a");
        assert_eq!(media.title, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_times_out_and_closes_page() {
        let source = MemoryPageSource::new().with_page(ITEM, ["<div>spinner</div>"]);
        let site = Site::Douyin.profile().compile().unwrap();

        let err = resolve(&source, &site, ITEM, &config()).await.unwrap_err();

        assert!(matches!(err, ItemError::RenderTimeout { waited_ms: 5_000 }));
        assert_eq!(source.snapshots(), 10);
        assert_eq!((source.opened(), source.closed()), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_closes_page_when_renderer_panics() {
        let source = CrashingPageSource::new(MemoryPageSource::new().with_page(ITEM, ["<video>"]));
        let site = Site::Douyin.profile().compile().unwrap();

        let outcome = AssertUnwindSafe(resolve(&source, &site, ITEM, &config()))
            .catch_unwind()
            .await;

        assert!(outcome.is_err());
        assert_eq!((source.inner().opened(), source.inner().closed()), (1, 1));
    }

    #[tokio::test]
    async fn test_resolve_reports_collaborator_failure() {
        let source = MemoryPageSource::new().with_unreachable(ITEM);
        let site = Site::Douyin.profile().compile().unwrap();

        let err = resolve(&source, &site, ITEM, &config()).await.unwrap_err();
        assert!(matches!(err, ItemError::Collaborator(_)));
    }
}
