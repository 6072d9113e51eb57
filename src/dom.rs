//! Immutable parsed-HTML snapshots of a rendered page.
//!
//! A [`DomSnapshot`] is taken every time a poller re-inspects a page. It keeps
//! the raw source next to the parsed document because some readiness checks
//! (the "no more items" marker at the bottom of a feed) are plain substring
//! tests on the page source.

use scraper::{ElementRef, Html, Selector};

/// A parsed view of a page at one point in time.
pub struct DomSnapshot {
    source: String,
    document: Html,
}

impl DomSnapshot {
    /// Parse a full HTML document.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let document = Html::parse_document(&source);
        Self { source, document }
    }

    /// The raw HTML this snapshot was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substring search over the raw source, text and markup alike.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.source.contains(needle)
    }

    /// All elements matching a compiled CSS selector, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.document.select(selector).collect()
    }

    /// All elements with the given tag name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<ElementRef<'_>> {
        descendants_by_tag(self.document.root_element(), tag)
    }

    /// All elements carrying `class` among their classes.
    pub fn elements_by_class(&self, class: &str) -> Vec<ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().classes().any(|c| c == class))
            .collect()
    }

    /// The first element whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))
    }
}

impl std::fmt::Debug for DomSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomSnapshot")
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Descendants of `element` (itself included) with the given tag name.
pub fn descendants_by_tag<'a>(element: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case(tag))
        .collect()
}

/// Whitespace-joined text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
