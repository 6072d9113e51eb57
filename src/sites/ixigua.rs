//! Ixigua "hotsoon" user feed.
//!
//! Feed cards are `div.VerticalFeedCard` with site-relative links. The player
//! lives in `#player_default` and its `<video>` carries the source directly.
//! The title is the `<h1>` of the first `.videoTitle` block; later blocks
//! belong to recommendations.

use super::SiteProfile;
use crate::config::WaitRange;

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "ixigua".to_string(),
        feed_item_selector: "div.VerticalFeedCard".to_string(),
        end_marker: "已经到底部，没有更多内容了".to_string(),
        media_container_id: Some("player_default".to_string()),
        media_selector: "video".to_string(),
        source_selector: None,
        title_selector: "h1".to_string(),
        title_scope_selector: Some(".videoTitle".to_string()),
        worker_count: 5,
        feed_wait: WaitRange::new(3_000, 5_000),
        item_wait: WaitRange::new(5_000, 10_000),
        feed_timeout_ms: 30_000,
        item_timeout_ms: 50_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSnapshot;

    #[test]
    fn test_ixigua_player_src() {
        let adapter = profile().compile().unwrap();
        let dom = DomSnapshot::parse(
            r#"<div class="videoTitle"><h1>Street food
tour</h1></div>
               <div class="videoTitle"><h1>Up next</h1></div>
               <video src="//elsewhere/ad.mp4"></video>
               <div id="player_default"><div><video src="//v9.ixigua.com/x.mp4"></video></div></div>"#,
        );
        assert_eq!(
            adapter.media_source(&dom).as_deref(),
            Some("//v9.ixigua.com/x.mp4")
        );
        assert_eq!(adapter.title(&dom), "Street foodtour");
    }

    #[test]
    fn test_ixigua_waits_for_player_container() {
        let adapter = profile().compile().unwrap();
        let dom = DomSnapshot::parse(r#"<video src="//elsewhere/ad.mp4"></video>"#);
        assert!(!adapter.is_detail_ready(&dom));
    }
}
