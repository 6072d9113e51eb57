//! Run report output.
//!
//! After every run a JSON summary is written next to the downloads (or to an
//! explicit path) so failed items can be retried or inspected later:
//!
//! ```text
//! save_dir/
//! ├── <title>.mp4
//! └── harvest-report-2025-05-06T14-03-11.json
//! ```

use crate::models::{ErrorLog, RunReport};
use chrono::Local;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    site: &'a str,
    feed_url: &'a str,
    finished_at: String,
    feed_complete: bool,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    downloaded: &'a [PathBuf],
    errors: &'a ErrorLog,
}

/// Default report location inside `save_dir`, stamped with local time.
pub fn default_report_path(save_dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
    save_dir.join(format!("harvest-report-{stamp}.json"))
}

/// Serialize `report` as pretty JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(
    report: &RunReport,
    site: &str,
    feed_url: &str,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let file = ReportFile {
        site,
        feed_url,
        finished_at: Local::now().to_rfc3339(),
        feed_complete: report.feed_complete,
        attempted: report.attempted,
        succeeded: report.success_count(),
        failed: report.errors.len(),
        downloaded: &report.downloaded,
        errors: &report.errors,
    };
    let json = serde_json::to_string_pretty(&file)?;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(error = %e, "Failed to create report directory");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote run report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;

    #[tokio::test]
    async fn test_write_report_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = RunReport {
            attempted: 2,
            feed_complete: true,
            ..RunReport::default()
        };
        report.downloaded.push(dir.path().join("a.mp4"));
        report.errors.record(
            "https://www.douyin.com/video/2",
            &ItemError::UnsupportedSource {
                media_url: "blob:x".into(),
            },
        );

        let path = dir.path().join("reports/run.json");
        write_report(&report, "douyin", "https://www.douyin.com/user/abc", &path)
            .await
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["site"], "douyin");
        assert_eq!(value["succeeded"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["feed_complete"], true);
        assert_eq!(value["errors"][0]["item_ref"], "https://www.douyin.com/video/2");
        assert_eq!(value["errors"][0]["kind"], "unsupported_source");
        assert_eq!(value["errors"][0]["reason"], "unresolvable source");
    }

    #[test]
    fn test_default_report_path_is_inside_save_dir() {
        let path = default_report_path(Path::new("/data/videos"));
        assert!(path.starts_with("/data/videos"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("harvest-report-") && name.ends_with(".json"));
    }
}
