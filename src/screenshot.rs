//! Screenshot capture, artifact naming and retention cleanup.
//!
//! Files land in the configured screenshots directory as
//! `<class>_<test>_<timestamp>.png` (a `FAILURE` tag is inserted for
//! failure captures), with names sanitized to `[a-zA-Z0-9._-]`.

use crate::HarnessError;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Replace every character outside `[a-zA-Z0-9._-]` with `_`. Idempotent.
pub fn sanitize_file_name(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

fn screenshot_file_name(
    class_name: &str,
    test_name: &str,
    tag: Option<&str>,
    at: DateTime<Local>,
) -> String {
    let timestamp = at.format(FILE_TIMESTAMP_FORMAT);
    let raw = match tag {
        Some(tag) => format!("{class_name}_{test_name}_{tag}_{timestamp}.png"),
        None => format!("{class_name}_{test_name}_{timestamp}.png"),
    };
    sanitize_file_name(&raw)
}

/// Capture a full-page PNG of the current page state.
pub async fn capture_screenshot(
    page: &Page,
    dir: &Path,
    class_name: &str,
    test_name: &str,
) -> Result<PathBuf, HarnessError> {
    capture(page, dir, class_name, test_name, None).await
}

/// Capture a full-page PNG tagged as a failure artifact.
pub async fn capture_failure_screenshot(
    page: &Page,
    dir: &Path,
    class_name: &str,
    test_name: &str,
) -> Result<PathBuf, HarnessError> {
    capture(page, dir, class_name, test_name, Some("FAILURE")).await
}

async fn capture(
    page: &Page,
    dir: &Path,
    class_name: &str,
    test_name: &str,
    tag: Option<&str>,
) -> Result<PathBuf, HarnessError> {
    tokio::fs::create_dir_all(dir).await?;

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .build();
    let data = page
        .screenshot(params)
        .await
        .map_err(|e| HarnessError::CaptureFailed(e.to_string()))?;

    let path = dir.join(screenshot_file_name(class_name, test_name, tag, Local::now()));
    tokio::fs::write(&path, &data).await?;

    info!("Screenshot captured: {}", path.display());
    Ok(path)
}

/// Delete `.png` files in `dir` strictly older than `days_to_keep` days.
/// Per-file errors are logged and skipped. Returns the number deleted.
pub fn cleanup_old_screenshots(dir: &Path, days_to_keep: u64) -> usize {
    let cutoff = SystemTime::now() - Duration::from_secs(days_to_keep * 24 * 60 * 60);
    cleanup_older_than(dir, cutoff)
}

fn cleanup_older_than(dir: &Path, cutoff: SystemTime) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping screenshot cleanup, cannot list {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_png = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if !path.is_file() || !is_png {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cannot read mtime of {}: {}", path.display(), e);
                continue;
            }
        };

        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted old screenshot: {}", path.display());
                    deleted += 1;
                }
                Err(e) => warn!("Could not delete old screenshot {}: {}", path.display(), e),
            }
        }
    }

    deleted
}

/// Rewrite a screenshot path for embedding in the HTML report. The report
/// directory sits one level below the working directory, so workspace-local
/// artifact paths gain a `../` prefix and use forward slashes. Absolute paths
/// are relativized against the working directory first; a path outside the
/// workspace degrades to its bare file name.
pub fn report_relative_path(screenshot: &Path) -> String {
    if screenshot.is_relative() {
        return format!("../{}", forward_slashed(screenshot));
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(relative) = screenshot.strip_prefix(&cwd) {
            return format!("../{}", forward_slashed(relative));
        }
    }

    screenshot
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn forward_slashed(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// All `.png` files directly in `dir`, sorted by file name. A missing or
/// unreadable directory lists as empty.
pub fn list_screenshots(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list screenshot directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut screenshots: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("png"))
                    .unwrap_or(false)
        })
        .collect();
    screenshots.sort();
    screenshots
}

/// Screenshots whose file name contains `needle` (a class or test name).
pub fn list_screenshots_matching(dir: &Path, needle: &str) -> Vec<PathBuf> {
    list_screenshots(dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().contains(needle))
                .unwrap_or(false)
        })
        .collect()
}

/// Screenshots captured today, recognized by the date half of the
/// file-name timestamp.
pub fn list_todays_screenshots(dir: &Path) -> Vec<PathBuf> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    list_screenshots_matching(dir, &today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;

    #[test]
    fn sanitize_restricts_to_allowed_set() {
        let out = sanitize_file_name("Test:Name*1");
        assert_eq!(out, "Test_Name_1");
        assert!(out
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_file_name("Login Test/case?.png");
        assert_eq!(sanitize_file_name(&once), once);
    }

    #[test]
    fn sanitize_keeps_clean_names_untouched() {
        assert_eq!(
            sanitize_file_name("LoginTest_login_test_2024-01-01.png"),
            "LoginTest_login_test_2024-01-01.png"
        );
    }

    #[test]
    fn file_names_embed_class_test_and_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            screenshot_file_name("LoginTest", "login_test", None, at),
            "LoginTest_login_test_2024-01-01_12-00-00.png"
        );
        assert_eq!(
            screenshot_file_name("LoginTest", "login test", Some("FAILURE"), at),
            "LoginTest_login_test_FAILURE_2024-01-01_12-00-00.png"
        );
    }

    #[test]
    fn cleanup_deletes_only_strictly_older_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("Old_case_2024.png");
        let fresh = dir.path().join("Fresh_case_2024.png");
        let other = dir.path().join("notes.txt");
        File::create(&old).unwrap();
        File::create(&fresh).unwrap();
        File::create(&other).unwrap();

        let eight_days = Duration::from_secs(8 * 24 * 60 * 60);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(SystemTime::now() - eight_days)
            .unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(7 * 24 * 60 * 60);
        let deleted = cleanup_older_than(dir.path(), cutoff);

        assert_eq!(deleted, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn cleanup_on_missing_directory_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        assert_eq!(cleanup_old_screenshots(&missing, 7), 0);
    }

    #[test]
    fn report_paths_are_relative_with_forward_slashes() {
        let path = Path::new("test-output/screenshots/LoginTest_login_test.png");
        assert_eq!(
            report_relative_path(path),
            "../test-output/screenshots/LoginTest_login_test.png"
        );
    }

    #[test]
    fn report_path_relativizes_absolute_workspace_paths() {
        let inside = std::env::current_dir()
            .unwrap()
            .join("test-output/screenshots/LoginTest_login_test.png");
        assert_eq!(
            report_relative_path(&inside),
            "../test-output/screenshots/LoginTest_login_test.png"
        );
    }

    #[test]
    fn report_path_outside_the_workspace_degrades_to_the_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("LoginTest_login_test.png");
        assert_eq!(report_relative_path(&outside), "LoginTest_login_test.png");
    }

    #[test]
    fn listing_returns_sorted_png_files_only() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("B_case.png")).unwrap();
        File::create(dir.path().join("A_case.png")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let listed = list_screenshots(dir.path());
        assert_eq!(
            listed,
            vec![dir.path().join("A_case.png"), dir.path().join("B_case.png")]
        );
    }

    #[test]
    fn listing_a_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_screenshots(&dir.path().join("never-created")).is_empty());
    }

    #[test]
    fn listing_filters_by_class_or_method_substring() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("LoginTest_login_test_2024-01-01_12-00-00.png")).unwrap();
        File::create(dir.path().join("DashboardTest_widgets_2024-01-01_12-00-00.png")).unwrap();

        let by_class = list_screenshots_matching(dir.path(), "LoginTest");
        assert_eq!(by_class.len(), 1);
        assert!(by_class[0].to_string_lossy().contains("LoginTest"));

        let by_method = list_screenshots_matching(dir.path(), "widgets");
        assert_eq!(by_method.len(), 1);
        assert!(by_method[0].to_string_lossy().contains("DashboardTest"));
    }

    #[test]
    fn todays_listing_matches_the_date_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let today = Local::now().format("%Y-%m-%d");
        File::create(dir.path().join(format!("LoginTest_case_{today}_12-00-00.png"))).unwrap();
        File::create(dir.path().join("LoginTest_case_2020-01-01_12-00-00.png")).unwrap();

        let todays = list_todays_screenshots(dir.path());
        assert_eq!(todays.len(), 1);
        assert!(todays[0].to_string_lossy().contains(&today.to_string()));
    }
}
