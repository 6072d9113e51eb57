//! Douyin user feed.
//!
//! Feed cards are `<li>` items linking to `//www.douyin.com/video/<id>`. The
//! detail page's `<video>` lists several `<source>` children; the last one is
//! the final resolved variant. Some items only ever expose a `blob:` source
//! and cannot be downloaded directly.

use super::SiteProfile;
use crate::config::WaitRange;

pub fn profile() -> SiteProfile {
    SiteProfile {
        name: "douyin".to_string(),
        feed_item_selector: "li.ECMy_Zdt".to_string(),
        end_marker: "暂时没有更多了".to_string(),
        media_container_id: None,
        media_selector: "video".to_string(),
        source_selector: Some("source".to_string()),
        title_selector: ".z8_VexPf".to_string(),
        title_scope_selector: None,
        worker_count: 3,
        feed_wait: WaitRange::new(3_000, 5_000),
        item_wait: WaitRange::new(5_000, 10_000),
        feed_timeout_ms: 10_000,
        item_timeout_ms: 50_000,
    }
}
