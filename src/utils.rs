//! Helpers for titles, file names, log output and the save directory.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static TITLE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\n\r|\r|\n|\|").unwrap());

/// Remove line breaks (every variant) and pipe characters from a title.
///
/// Titles end up in file names, so this drops the characters that most often
/// break paths or log lines. [`file_stem`] does the filesystem-specific part.
pub fn clean_title(raw: &str) -> String {
    TITLE_NOISE.replace_all(raw, "").trim().to_string()
}

/// Extension of saved media files, without the dot.
pub const MEDIA_EXTENSION: &str = "mp4";

/// Longest stem that still fits a 255-byte file name once `.mp4` is appended.
pub const MAX_STEM_BYTES: usize = 255 - MEDIA_EXTENSION.len() - 1;

/// Choose a file stem for a downloaded item.
///
/// # Arguments
///
/// * `title` - The cleaned title read from the detail page
/// * `item_url` - The detail-page URL, used when the title is empty
/// * `index` - Position of the item in the feed, the last resort
///
/// # Returns
///
/// The sanitized title; failing that, the last path segment of `item_url`;
/// failing that, `item-<index>`. The result is cut on a char boundary to at
/// most [`MAX_STEM_BYTES`] bytes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(file_stem("my/clip: part?1", "https://x/v/1", 0), "myclip part1");
/// assert_eq!(file_stem("", "https://www.douyin.com/video/7412", 4), "7412");
/// assert_eq!(file_stem("", "not a url", 9), "item-9");
/// ```
pub fn file_stem(title: &str, item_url: &str, index: usize) -> String {
    let from_title = fit_stem(&sanitize_filename::sanitize(title), "");
    if !from_title.is_empty() {
        return from_title;
    }

    let from_url = url_segment(item_url)
        .map(|segment| fit_stem(&segment, ""))
        .unwrap_or_default();
    if !from_url.is_empty() {
        return from_url;
    }

    format!("item-{index}")
}

/// A variant of `stem` for an item whose stem is already taken in this run.
///
/// Appends the item URL's last path segment, or the item index when the URL
/// has none, shortening `stem` so the whole still fits [`MAX_STEM_BYTES`].
pub fn disambiguated_stem(stem: &str, item_url: &str, index: usize) -> String {
    let suffix = url_segment(item_url).unwrap_or_else(|| format!("item-{index}"));
    fit_stem(stem, &format!("-{suffix}"))
}

/// Last non-empty path segment of `url`, sanitized for use in a file name.
fn url_segment(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .path_segments()?
        .rfind(|s| !s.is_empty())
        .map(sanitize_filename::sanitize)
        .filter(|s| !s.is_empty())
}

/// `base` followed by `suffix`, with `base` cut short (on a char boundary)
/// so the result is at most [`MAX_STEM_BYTES`] long.
fn fit_stem(base: &str, suffix: &str) -> String {
    let base = base.trim();
    let mut cut = MAX_STEM_BYTES.saturating_sub(suffix.len()).min(base.len());
    while !base.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut stem = base[..cut].trim_end().to_string();
    stem.push_str(suffix);
    stem
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Save directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_variants() {
        assert_eq!(clean_title("a\r\nb\n\rc\rd\ne"), "abcde");
        assert_eq!(clean_title("  left | right  "), "left  right");
        assert_eq!(clean_title("|||"), "");
    }

    #[test]
    fn test_file_stem_uses_sanitized_title() {
        assert_eq!(file_stem("my/clip: part?1", "https://x/v/1", 0), "myclip part1");
    }

    #[test]
    fn test_file_stem_falls_back_to_url_then_index() {
        assert_eq!(file_stem("", "https://www.douyin.com/video/7412/", 4), "7412");
        assert_eq!(file_stem("///", "https://www.douyin.com/", 4), "item-4");
        assert_eq!(file_stem("", "not a url", 9), "item-9");
    }

    #[test]
    fn test_file_stem_leaves_room_for_extension() {
        let title = "长".repeat(90);
        let stem = file_stem(&title, "https://www.douyin.com/video/1", 0);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert_eq!(stem, "长".repeat(83));
        assert!(format!("{stem}.{MEDIA_EXTENSION}").len() <= 255);
    }

    #[test]
    fn test_disambiguated_stem_appends_url_segment() {
        assert_eq!(
            disambiguated_stem("clip", "https://www.douyin.com/video/7412", 3),
            "clip-7412"
        );
        assert_eq!(disambiguated_stem("clip", "not a url", 3), "clip-item-3");

        let long = disambiguated_stem(&"长".repeat(90), "https://www.douyin.com/video/7412", 3);
        assert!(long.len() <= MAX_STEM_BYTES);
        assert!(long.ends_with("-7412"));
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let result = truncate_for_log("暂时没有", 4);
        assert_eq!(result, "暂…(+9 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
