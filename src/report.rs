//! Test execution records, screenshot correlation and HTML report rendering.

use crate::screenshot::report_relative_path;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Terminal status of a test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    FailWithinPercentage,
}

impl TestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Skip => "SKIP",
            TestStatus::FailWithinPercentage => "FAIL_WITHIN_PERCENTAGE",
        }
    }

    fn css_class(&self) -> &'static str {
        match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail | TestStatus::FailWithinPercentage => "fail",
            TestStatus::Skip => "skip",
        }
    }
}

/// Composite test identity: owning class plus test method. Keying records by
/// both halves keeps two classes sharing a method name apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestId {
    pub class_name: String,
    pub test_name: String,
}

impl TestId {
    pub fn new(class_name: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            test_name: test_name.into(),
        }
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.class_name, self.test_name)
    }
}

/// One test invocation, created at test start and completed by the recorder
/// as the test terminates. Held for the whole run so the final report can be
/// rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionRecord {
    pub id: TestId,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    pub duration: Option<Duration>,
    /// None while the test is still running.
    pub status: Option<TestStatus>,
    /// Step log in insertion order, each entry timestamped at log time.
    pub steps: Vec<String>,
    pub error_message: Option<String>,
    /// Best-matching screenshot artifact, if correlation found one.
    pub screenshot: Option<PathBuf>,
}

impl TestExecutionRecord {
    pub fn new(id: TestId, started_at: DateTime<Local>) -> Self {
        Self {
            id,
            started_at,
            ended_at: None,
            duration: None,
            status: None,
            steps: Vec::new(),
            error_message: None,
            screenshot: None,
        }
    }
}

/// Find the screenshot file most likely produced by the given test.
///
/// Tier 1: filename contains both the class name and the test name, newest
/// modification time wins. Tier 2: test name alone (independent components
/// name their artifacts slightly differently). No match is not an error, and
/// neither is a directory that cannot be listed.
pub fn find_screenshot_for(dir: &Path, class_name: &str, test_name: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list screenshot directory {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut candidates: Vec<(PathBuf, String, SystemTime)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !name.to_lowercase().ends_with(".png") {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cannot read mtime of {}: {}", path.display(), e);
                continue;
            }
        };
        candidates.push((path, name, modified));
    }

    let newest = |matching: &dyn Fn(&str) -> bool| {
        candidates
            .iter()
            .filter(|(_, name, _)| matching(name))
            .max_by_key(|(_, _, modified)| *modified)
            .map(|(path, _, _)| path.clone())
    };

    if let Some(path) = newest(&|name| name.contains(class_name) && name.contains(test_name)) {
        debug!("Correlated screenshot for {}.{}: {}", class_name, test_name, path.display());
        return Some(path);
    }

    if let Some(path) = newest(&|name| name.contains(test_name)) {
        debug!(
            "Correlated screenshot for {} by test name only: {}",
            test_name,
            path.display()
        );
        return Some(path);
    }

    debug!("No screenshot found for {}.{}", class_name, test_name);
    None
}

/// Aggregate counts over all records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub fn summarize(records: &[TestExecutionRecord]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        match record.status {
            Some(TestStatus::Pass) => summary.passed += 1,
            Some(TestStatus::Fail) => summary.failed += 1,
            Some(TestStatus::Skip) => summary.skipped += 1,
            _ => {}
        }
    }
    summary
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const REPORT_STYLE: &str = "\
        body { font-family: Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }\n\
        .header { background-color: #2c3e50; color: white; padding: 20px; border-radius: 5px; margin-bottom: 20px; }\n\
        .summary { background-color: white; padding: 20px; border-radius: 5px; margin-bottom: 20px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }\n\
        .test-case { background-color: white; margin-bottom: 15px; border-radius: 5px; overflow: hidden; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }\n\
        .test-header { padding: 15px; cursor: pointer; font-weight: bold; }\n\
        .test-header.pass { background-color: #d4edda; color: #155724; border-left: 4px solid #28a745; }\n\
        .test-header.fail { background-color: #f8d7da; color: #721c24; border-left: 4px solid #dc3545; }\n\
        .test-header.skip { background-color: #fff3cd; color: #856404; border-left: 4px solid #ffc107; }\n\
        .test-content { padding: 15px; display: none; }\n\
        .test-steps { background-color: #f8f9fa; padding: 10px; border-radius: 3px; margin: 10px 0; }\n\
        .test-step { margin: 5px 0; padding: 5px; background-color: white; border-left: 3px solid #007bff; }\n\
        .screenshot { margin: 10px 0; }\n\
        .screenshot img { max-width: 100%; border: 1px solid #ddd; border-radius: 3px; }\n\
        .error-message { background-color: #f8d7da; color: #721c24; padding: 10px; border-radius: 3px; margin: 10px 0; }\n\
        .stats { display: flex; justify-content: space-around; text-align: center; }\n\
        .stat { flex: 1; padding: 10px; }\n\
        .stat.total { background-color: #e2e3e5; color: #383d41; }\n\
        .stat.pass { background-color: #d4edda; color: #155724; }\n\
        .stat.fail { background-color: #f8d7da; color: #721c24; }\n\
        .stat.skip { background-color: #fff3cd; color: #856404; }\n";

const REPORT_SCRIPT: &str = "\
        function toggleTest(element) {\n\
            const content = element.nextElementSibling;\n\
            if (content.style.display === 'none' || content.style.display === '') {\n\
                content.style.display = 'block';\n\
            } else {\n\
                content.style.display = 'none';\n\
            }\n\
        }\n";

/// Render the whole run as one self-contained HTML document.
pub fn render_report(
    records: &[TestExecutionRecord],
    run_id: Uuid,
    generated_at: DateTime<Local>,
) -> String {
    let summary = summarize(records);

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>Enhanced Test Report</title>\n");
    html.push_str("    <style>\n");
    html.push_str(REPORT_STYLE);
    html.push_str("    </style>\n</head>\n<body>\n");

    html.push_str("    <div class=\"header\">\n        <h1>Enhanced Test Report</h1>\n");
    html.push_str(&format!(
        "        <p>Generated on: {}</p>\n        <p>Run id: {}</p>\n    </div>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S"),
        run_id
    ));

    html.push_str("    <div class=\"summary\">\n        <h2>Test Summary</h2>\n");
    html.push_str("        <div class=\"stats\">\n");
    for (class, count, label) in [
        ("total", summary.total, "Total"),
        ("pass", summary.passed, "Passed"),
        ("fail", summary.failed, "Failed"),
        ("skip", summary.skipped, "Skipped"),
    ] {
        html.push_str(&format!(
            "            <div class=\"stat {class}\">\n                <h3>{count}</h3>\n                <p>{label}</p>\n            </div>\n"
        ));
    }
    html.push_str("        </div>\n    </div>\n");

    html.push_str("    <h2>Test Details</h2>\n");
    for record in records {
        html.push_str(&render_record(record));
    }

    html.push_str("    <script>\n");
    html.push_str(REPORT_SCRIPT);
    html.push_str("    </script>\n</body>\n</html>");
    html
}

fn render_record(record: &TestExecutionRecord) -> String {
    let status_class = record
        .status
        .map(|s| s.css_class())
        .unwrap_or("skip");
    let status_label = record.status.map(|s| s.label()).unwrap_or("UNKNOWN");
    let duration_ms = record
        .duration
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut html = String::new();
    html.push_str("    <div class=\"test-case\">\n");
    html.push_str(&format!(
        "        <div class=\"test-header {status_class}\" onclick=\"toggleTest(this)\">\n            <strong>{}</strong> - {status_label} ({duration_ms}ms)\n        </div>\n",
        escape_html(&record.id.test_name)
    ));
    html.push_str("        <div class=\"test-content\">\n");
    html.push_str(&format!(
        "            <p><strong>Class:</strong> {}</p>\n",
        escape_html(&record.id.class_name)
    ));
    html.push_str(&format!(
        "            <p><strong>Method:</strong> {}</p>\n",
        escape_html(&record.id.test_name)
    ));
    html.push_str(&format!(
        "            <p><strong>Start Time:</strong> {}</p>\n",
        record.started_at.format("%H:%M:%S%.3f")
    ));
    if let Some(ended_at) = record.ended_at {
        html.push_str(&format!(
            "            <p><strong>End Time:</strong> {}</p>\n",
            ended_at.format("%H:%M:%S%.3f")
        ));
    }
    html.push_str(&format!(
        "            <p><strong>Duration:</strong> {duration_ms}ms</p>\n"
    ));

    if let Some(error) = &record.error_message {
        html.push_str(&format!(
            "            <div class=\"error-message\">\n                <strong>Error:</strong> {}\n            </div>\n",
            escape_html(error)
        ));
    }

    if !record.steps.is_empty() {
        html.push_str("            <div class=\"test-steps\">\n                <h4>Test Steps:</h4>\n");
        for step in &record.steps {
            html.push_str(&format!(
                "                <div class=\"test-step\">{}</div>\n",
                escape_html(step)
            ));
        }
        html.push_str("            </div>\n");
    }

    if let Some(screenshot) = &record.screenshot {
        html.push_str(&format!(
            "            <div class=\"screenshot\">\n                <h4>Screenshot:</h4>\n                <img src=\"{}\" alt=\"Test Screenshot\">\n            </div>\n",
            escape_html(&report_relative_path(screenshot))
        ));
    }

    html.push_str("        </div>\n    </div>\n");
    html
}

/// Write the rendered report under `report_dir`, stamped so repeated runs
/// never overwrite each other. Best-effort: failures are logged, never
/// propagated.
pub fn write_report(
    report_dir: &Path,
    records: &[TestExecutionRecord],
    run_id: Uuid,
) -> Option<PathBuf> {
    let generated_at = Local::now();
    let html = render_report(records, run_id, generated_at);
    let file_name = format!(
        "enhanced-test-report_{}.html",
        generated_at.format("%Y%m%d_%H%M%S")
    );

    if let Err(e) = std::fs::create_dir_all(report_dir) {
        error!("Failed to create report directory {}: {}", report_dir.display(), e);
        return None;
    }

    let path = report_dir.join(file_name);
    match std::fs::write(&path, html) {
        Ok(()) => {
            info!("Enhanced test report generated: {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Failed to write report {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn record(class: &str, test: &str, status: TestStatus) -> TestExecutionRecord {
        let mut record = TestExecutionRecord::new(TestId::new(class, test), Local::now());
        record.status = Some(status);
        record.duration = Some(Duration::from_millis(1200));
        record.ended_at = Some(Local::now());
        record
    }

    #[test]
    fn correlation_with_no_files_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(find_screenshot_for(dir.path(), "LoginTest", "login_test"), None);
    }

    #[test]
    fn correlation_on_unreadable_directory_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(find_screenshot_for(&missing, "LoginTest", "login_test"), None);
    }

    #[test]
    fn correlation_picks_newest_of_full_matches() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("LoginTest_login_test_2024-01-01_10-00-00.png");
        let newer = dir.path().join("LoginTest_login_test_2024-01-01_12-00-00.png");
        File::create(&older).unwrap();
        File::create(&newer).unwrap();
        File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        assert_eq!(
            find_screenshot_for(dir.path(), "LoginTest", "login_test"),
            Some(newer)
        );
    }

    #[test]
    fn correlation_falls_back_to_test_name_alone() {
        let dir = tempfile::tempdir().unwrap();
        let by_test_only = dir.path().join("step_login_test_capture.png");
        File::create(&by_test_only).unwrap();
        File::create(dir.path().join("OtherTest_other_case.png")).unwrap();

        assert_eq!(
            find_screenshot_for(dir.path(), "LoginTest", "login_test"),
            Some(by_test_only)
        );
    }

    #[test]
    fn correlation_ignores_non_png_files() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("LoginTest_login_test.txt")).unwrap();
        assert_eq!(find_screenshot_for(dir.path(), "LoginTest", "login_test"), None);
    }

    #[test]
    fn summary_counts_by_terminal_status() {
        let records = vec![
            record("LoginTest", "valid_login", TestStatus::Pass),
            record("LoginTest", "invalid_login", TestStatus::Fail),
            record("DashboardTest", "widgets", TestStatus::Skip),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn report_renders_one_section_per_record() {
        let mut fail = record("LoginTest", "invalid_login", TestStatus::Fail);
        fail.error_message = Some("expected dashboard title".to_string());
        fail.screenshot =
            Some(PathBuf::from("test-output/screenshots/LoginTest_invalid_login.png"));
        fail.steps = vec!["[10:00:00.000] Entered username".to_string()];

        let records = vec![
            record("LoginTest", "valid_login", TestStatus::Pass),
            fail,
            record("DashboardTest", "widgets", TestStatus::Skip),
        ];

        let html = render_report(&records, Uuid::new_v4(), Local::now());
        assert_eq!(html.matches("class=\"test-case\"").count(), 3);
        assert!(html.contains("<h3>1</h3>"));
        assert!(html.contains("class=\"stat total\""));
        assert!(html.contains("<h3>3</h3>"));
        assert!(html.contains("<p>Total</p>"));
        assert!(html.contains("expected dashboard title"));
        assert!(html.contains("src=\"../test-output/screenshots/LoginTest_invalid_login.png\""));
        assert!(html.contains("Entered username"));
        assert!(html.contains("toggleTest"));
    }

    #[test]
    fn report_escapes_interpolated_text() {
        let mut rec = record("LoginTest", "valid_login", TestStatus::Fail);
        rec.error_message = Some("<script>alert(1)</script>".to_string());
        let html = render_report(&[rec], Uuid::new_v4(), Local::now());
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn write_report_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("LoginTest", "valid_login", TestStatus::Pass)];
        let path = write_report(dir.path(), &records, Uuid::new_v4()).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("enhanced-test-report_"));
        assert!(name.ends_with(".html"));

        // An unwritable destination degrades to None instead of failing.
        let file_as_dir = dir.path().join("occupied");
        File::create(&file_as_dir).unwrap();
        assert!(write_report(&file_as_dir, &records, Uuid::new_v4()).is_none());
    }
}
