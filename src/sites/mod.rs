//! Per-site page layouts.
//!
//! Every supported platform renders the same kind of pages (a scrolling feed
//! of cards, a detail page with a video player) with different markup. The
//! differences live in a [`SiteProfile`]; the pipeline only ever talks to the
//! compiled [`SiteAdapter`].
//!
//! # Supported Sites
//!
//! | Site | Module | Media source |
//! |------|--------|--------------|
//! | Douyin | [`douyin`] | last `<source>` child of the `<video>` |
//! | Ixigua | [`ixigua`] | `src` of the video inside `#player_default` |
//!
//! Other layouts can be described in YAML and loaded with
//! [`SiteProfile::from_yaml_file`].

pub mod douyin;
pub mod ixigua;

use crate::config::WaitRange;
use crate::dom::{DomSnapshot, descendants_by_tag, element_text};
use crate::error::ConfigError;
use crate::utils::clean_title;
use clap::ValueEnum;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// Built-in site profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Site {
    Douyin,
    Ixigua,
}

impl Site {
    pub fn profile(self) -> SiteProfile {
        match self {
            Site::Douyin => douyin::profile(),
            Site::Ixigua => ixigua::profile(),
        }
    }
}

/// Selectors and timing for one site, as written in a profile file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// CSS selector for one feed card. The card's first `a[href]` (or the
    /// card itself, if it is a link) points at the detail page.
    pub feed_item_selector: String,
    /// Text that appears in the page once the feed has nothing more to load.
    pub end_marker: String,
    /// When set, the media element is searched only inside this element.
    #[serde(default)]
    pub media_container_id: Option<String>,
    /// CSS selector for the media element.
    #[serde(default = "default_media_selector")]
    pub media_selector: String,
    /// Child elements carrying alternative sources; the last one wins.
    /// Without it the media element's own `src` is used.
    #[serde(default)]
    pub source_selector: Option<String>,
    /// CSS selector for the title text of a detail page. Every match is
    /// joined with a space.
    pub title_selector: String,
    /// When set, the title is read only inside the first element matching
    /// this selector.
    #[serde(default)]
    pub title_scope_selector: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_feed_wait")]
    pub feed_wait: WaitRange,
    #[serde(default = "default_item_wait")]
    pub item_wait: WaitRange,
    #[serde(default = "default_feed_timeout_ms")]
    pub feed_timeout_ms: u64,
    #[serde(default = "default_item_timeout_ms")]
    pub item_timeout_ms: u64,
}

fn default_media_selector() -> String {
    "video".to_string()
}

fn default_worker_count() -> usize {
    3
}

fn default_feed_wait() -> WaitRange {
    WaitRange::new(3_000, 5_000)
}

fn default_item_wait() -> WaitRange {
    WaitRange::new(5_000, 10_000)
}

fn default_feed_timeout_ms() -> u64 {
    10_000
}

fn default_item_timeout_ms() -> u64 {
    50_000
}

impl SiteProfile {
    /// Load a profile from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ProfileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| ConfigError::ProfileParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Compile every selector, failing on the first invalid one.
    pub fn compile(&self) -> Result<SiteAdapter, ConfigError> {
        let compile = |css: &str| {
            Selector::parse(css).map_err(|_| ConfigError::Selector {
                profile: self.name.clone(),
                selector: css.to_string(),
            })
        };
        Ok(SiteAdapter {
            feed_item: compile(&self.feed_item_selector)?,
            media: compile(&self.media_selector)?,
            source: self.source_selector.as_deref().map(compile).transpose()?,
            title: compile(&self.title_selector)?,
            title_scope: self.title_scope_selector.as_deref().map(compile).transpose()?,
            profile: self.clone(),
        })
    }
}

/// A site profile with its selectors compiled, ready to query snapshots.
#[derive(Debug)]
pub struct SiteAdapter {
    profile: SiteProfile,
    feed_item: Selector,
    media: Selector,
    source: Option<Selector>,
    title: Selector,
    title_scope: Option<Selector>,
}

impl SiteAdapter {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Whether the feed reports that nothing more will load.
    pub fn is_feed_exhausted(&self, dom: &DomSnapshot) -> bool {
        dom.contains_text(&self.profile.end_marker)
    }

    /// Detail-page links of every feed card, in page order, as written in the
    /// markup (not yet resolved against the feed URL).
    pub fn feed_links(&self, dom: &DomSnapshot) -> Vec<String> {
        dom.select(&self.feed_item)
            .into_iter()
            .filter_map(card_link)
            .collect()
    }

    /// Whether the detail page has a media element with a usable source.
    pub fn is_detail_ready(&self, dom: &DomSnapshot) -> bool {
        self.media_source(dom).is_some()
    }

    /// The media source of a detail page, if one has rendered yet.
    pub fn media_source(&self, dom: &DomSnapshot) -> Option<String> {
        let media = self.media_element(dom)?;

        let from_children = self.source.as_ref().and_then(|selector| {
            media
                .select(selector)
                .last()
                .and_then(|el| el.value().attr("src"))
        });
        let src = from_children.or_else(|| media.value().attr("src"))?.trim();

        if src.is_empty() {
            None
        } else {
            Some(src.to_string())
        }
    }

    /// Title text of a detail page, with line breaks and pipes removed.
    pub fn title(&self, dom: &DomSnapshot) -> String {
        let regions: Vec<ElementRef<'_>> = match &self.title_scope {
            Some(scope) => dom
                .select(scope)
                .into_iter()
                .next()
                .map(|first| first.select(&self.title).collect())
                .unwrap_or_default(),
            None => dom.select(&self.title),
        };
        let raw = regions
            .into_iter()
            .map(element_text)
            .collect::<Vec<_>>()
            .join(" ");
        let title = clean_title(&raw);
        debug!(site = %self.profile.name, %title, "Extracted title");
        title
    }

    fn media_element<'a>(&self, dom: &'a DomSnapshot) -> Option<ElementRef<'a>> {
        match self.profile.media_container_id.as_deref() {
            Some(id) => dom.element_by_id(id)?.select(&self.media).next(),
            None => dom.select(&self.media).into_iter().next(),
        }
    }
}

fn card_link(card: ElementRef<'_>) -> Option<String> {
    descendants_by_tag(card, "a")
        .into_iter()
        .find_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_profile() -> SiteProfile {
        SiteProfile::from_yaml_str(
            r#"
name: example
feed_item_selector: "div.card"
end_marker: "the end"
source_selector: "source"
title_selector: "h1.title"
feed_timeout_ms: 2000
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_yaml_profile_applies_defaults() {
        let profile = custom_profile();
        assert_eq!(profile.name, "example");
        assert_eq!(profile.media_selector, "video");
        assert_eq!(profile.media_container_id, None);
        assert_eq!(profile.worker_count, 3);
        assert_eq!(profile.feed_timeout_ms, 2_000);
        assert_eq!(profile.item_timeout_ms, 50_000);
        assert_eq!(profile.item_wait, WaitRange::new(5_000, 10_000));
    }

    #[test]
    fn test_bundled_yaml_matches_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("profiles/douyin.yaml");
        let profile = SiteProfile::from_yaml_file(&path).unwrap();
        assert_eq!(profile, Site::Douyin.profile());
    }

    #[test]
    fn test_missing_profile_file() {
        let err = SiteProfile::from_yaml_file("/nonexistent/profile.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileRead { .. }));
    }

    #[test]
    fn test_builtin_profiles_compile() {
        for site in [Site::Douyin, Site::Ixigua] {
            assert!(site.profile().compile().is_ok(), "{site:?}");
        }
    }

    #[test]
    fn test_invalid_selector_fails_compile() {
        let mut profile = custom_profile();
        profile.title_selector = "h1[".to_string();
        let err = profile.compile().unwrap_err();
        assert!(matches!(err, ConfigError::Selector { ref selector, .. } if selector == "h1["));
    }

    #[test]
    fn test_feed_links_keep_page_order() {
        let adapter = custom_profile().compile().unwrap();
        let dom = DomSnapshot::parse(
            r#"<div class="card"><span><a href="/v/9">x</a></span></div>
               <div class="card"><a href="">empty</a></div>
               <div class="card"><a href="/v/3">y</a><a href="/v/4">z</a></div>
               <div class="card"><a href="/v/9">repeat</a></div>"#,
        );
        assert_eq!(adapter.feed_links(&dom), vec!["/v/9", "/v/3", "/v/9"]);
    }

    #[test]
    fn test_media_source_prefers_last_child_source() {
        let adapter = custom_profile().compile().unwrap();
        let dom = DomSnapshot::parse(
            r#"<video src="//own.mp4"><source src="//first.mp4"><source src="//last.mp4"></video>"#,
        );
        assert_eq!(adapter.media_source(&dom).as_deref(), Some("//last.mp4"));
        assert!(adapter.is_detail_ready(&dom));
    }

    #[test]
    fn test_media_source_falls_back_to_own_src() {
        let adapter = custom_profile().compile().unwrap();
        let dom = DomSnapshot::parse(r#"<video src="blob:https://x/1"></video>"#);
        assert_eq!(adapter.media_source(&dom).as_deref(), Some("blob:https://x/1"));
    }

    #[test]
    fn test_empty_video_is_not_ready() {
        let adapter = custom_profile().compile().unwrap();
        let dom = DomSnapshot::parse(r#"<video><source src=" "></video>"#);
        assert!(!adapter.is_detail_ready(&dom));
        let dom = DomSnapshot::parse("<div>loading</div>");
        assert!(!adapter.is_detail_ready(&dom));
    }

    #[test]
    fn test_title_scope_uses_first_container_only() {
        let mut profile = custom_profile();
        profile.title_scope_selector = Some(".videoTitle".to_string());
        profile.title_selector = "h1".to_string();
        let adapter = profile.compile().unwrap();
        let dom = DomSnapshot::parse(
            r#"<div class="videoTitle"><h1>Main</h1><h1>cut</h1></div>
               <div class="videoTitle"><h1>Recommended next</h1></div>"#,
        );
        assert_eq!(adapter.title(&dom), "Main cut");

        let dom = DomSnapshot::parse("<h1>Outside any scope</h1>");
        assert_eq!(adapter.title(&dom), "");
    }

    #[test]
    fn test_title_strips_breaks_and_pipes() {
        let adapter = custom_profile().compile().unwrap();
        let dom = DomSnapshot::parse("<h1 class=\"title\">Cats | dogs\r\nand more</h1>");
        assert_eq!(adapter.title(&dom), "Cats  dogsand more");
    }
}
