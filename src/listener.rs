//! Suite recorder: lifecycle hooks, per-test step log and report generation.
//!
//! One recorder value is threaded explicitly through the suite; there is no
//! process-wide listener state. Tests run sequentially, so a single current
//! test context is enough.

use crate::report::{self, TestExecutionRecord, TestId, TestStatus};
use crate::HarnessConfig;
use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub struct SuiteRecorder {
    config: HarnessConfig,
    run_id: Uuid,
    records: HashMap<TestId, TestExecutionRecord>,
    /// Test ids in start order, for stable report rendering.
    order: Vec<TestId>,
    current: Option<TestId>,
    steps: Vec<String>,
}

impl SuiteRecorder {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            records: HashMap::new(),
            order: Vec::new(),
            current: None,
            steps: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn on_suite_start(&mut self) {
        info!("=== Test suite started (run {}) ===", self.run_id);
    }

    /// Begin a test. At most one record exists per test id; restarting an id
    /// replaces its previous record.
    pub fn on_test_start(&mut self, class_name: &str, test_name: &str) {
        let id = TestId::new(class_name, test_name);
        info!("=== Test started: {} ===", id);

        self.steps.clear();
        if self.records.remove(&id).is_some() {
            warn!("Test {} restarted, replacing its previous record", id);
            self.order.retain(|existing| existing != &id);
        }
        self.order.push(id.clone());
        self.records
            .insert(id.clone(), TestExecutionRecord::new(id.clone(), Local::now()));
        self.current = Some(id);
    }

    /// Append a timestamped step to the current test's log. Steps are never
    /// removed or reordered.
    pub fn log_step(&mut self, step: &str) {
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        self.steps.push(format!("[{timestamp}] {step}"));
        info!("Test step: {}", step);
    }

    pub fn on_test_passed(&mut self) {
        if let Some(id) = self.finish_test(TestStatus::Pass, None) {
            info!("=== Test passed: {} ===", id);
        }
    }

    /// Record the failure, then look for the screenshot the failing test
    /// left behind.
    pub fn on_test_failed(&mut self, error: &str) {
        if let Some(id) = self.finish_test(TestStatus::Fail, Some(error)) {
            info!("=== Test failed: {} ({}) ===", id, error);
            self.correlate_screenshot(&id);
        }
    }

    /// Partial failures keep their screenshots too.
    pub fn on_test_failed_within_percentage(&mut self, error: &str) {
        if let Some(id) = self.finish_test(TestStatus::FailWithinPercentage, Some(error)) {
            warn!("=== Test failed within success percentage: {} ===", id);
            self.correlate_screenshot(&id);
        }
    }

    pub fn on_test_skipped(&mut self) {
        if let Some(id) = self.finish_test(TestStatus::Skip, None) {
            warn!("=== Test skipped: {} ===", id);
        }
    }

    /// Generate the HTML report. Best-effort: a write failure is logged and
    /// the suite result is unaffected.
    pub fn on_suite_finish(&mut self) -> Option<PathBuf> {
        info!("=== Test suite finished, generating report ===");
        let records = self.records_in_order();
        report::write_report(Path::new(&self.config.report_dir), &records, self.run_id)
    }

    pub fn records_in_order(&self) -> Vec<TestExecutionRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    pub fn record(&self, class_name: &str, test_name: &str) -> Option<&TestExecutionRecord> {
        self.records.get(&TestId::new(class_name, test_name))
    }

    fn finish_test(&mut self, status: TestStatus, error: Option<&str>) -> Option<TestId> {
        let id = match self.current.take() {
            Some(id) => id,
            None => {
                warn!("Test terminated without a running test context");
                return None;
            }
        };

        let record = self.records.get_mut(&id)?;
        let ended_at = Local::now();
        record.status = Some(status);
        record.ended_at = Some(ended_at);
        record.duration = (ended_at - record.started_at).to_std().ok();
        record.steps = std::mem::take(&mut self.steps);
        record.error_message = error.map(str::to_string);
        Some(id)
    }

    fn correlate_screenshot(&mut self, id: &TestId) {
        let dir = Path::new(&self.config.screenshots_dir);
        let found = report::find_screenshot_for(dir, &id.class_name, &id.test_name);
        if let Some(record) = self.records.get_mut(id) {
            match &found {
                Some(path) => info!("Screenshot attached to {}: {}", id, path.display()),
                None => warn!("No screenshot found for {}", id),
            }
            record.screenshot = found;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn recorder_with_dirs(dir: &Path) -> SuiteRecorder {
        SuiteRecorder::new(HarnessConfig {
            screenshots_dir: dir.join("shots").display().to_string(),
            report_dir: dir.join("reports").display().to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn pass_lifecycle_keeps_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_suite_start();
        recorder.on_test_start("LoginTest", "login_with_valid_credentials");
        recorder.log_step("Opened login page");
        recorder.log_step("Entered credentials");
        recorder.log_step("Clicked login");
        recorder.on_test_passed();

        let record = recorder
            .record("LoginTest", "login_with_valid_credentials")
            .unwrap();
        assert_eq!(record.status, Some(TestStatus::Pass));
        assert_eq!(record.steps.len(), 3);
        assert!(record.steps[0].contains("Opened login page"));
        assert!(record.steps[2].contains("Clicked login"));
        assert!(record.error_message.is_none());
        assert!(record.duration.is_some());
    }

    #[test]
    fn failure_attaches_most_recent_matching_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());
        let shots = dir.path().join("shots");
        std::fs::create_dir_all(&shots).unwrap();
        let artifact = shots.join("LoginTest_login_test_2024-01-01_12-00-00.png");
        File::create(&artifact).unwrap();

        recorder.on_test_start("LoginTest", "login_test");
        recorder.log_step("Clicked login");
        recorder.on_test_failed("expected dashboard title");

        let record = recorder.record("LoginTest", "login_test").unwrap();
        assert_eq!(record.status, Some(TestStatus::Fail));
        assert_eq!(record.error_message.as_deref(), Some("expected dashboard title"));
        assert_eq!(record.screenshot.as_deref(), Some(artifact.as_path()));
    }

    #[test]
    fn within_percentage_failure_attaches_its_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());
        let shots = dir.path().join("shots");
        std::fs::create_dir_all(&shots).unwrap();
        let artifact = shots.join("LoginTest_flaky_case_FAILURE_2024-01-01_12-00-00.png");
        File::create(&artifact).unwrap();

        recorder.on_test_start("LoginTest", "flaky_case");
        recorder.on_test_failed_within_percentage("intermittent widget");

        let record = recorder.record("LoginTest", "flaky_case").unwrap();
        assert_eq!(record.status, Some(TestStatus::FailWithinPercentage));
        assert_eq!(record.screenshot.as_deref(), Some(artifact.as_path()));
    }

    #[test]
    fn failure_without_screenshot_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_test_start("LoginTest", "login_test");
        recorder.on_test_failed("boom");

        let record = recorder.record("LoginTest", "login_test").unwrap();
        assert!(record.screenshot.is_none());
    }

    #[test]
    fn one_record_per_test_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_test_start("LoginTest", "login_test");
        recorder.on_test_skipped();
        recorder.on_test_start("LoginTest", "login_test");
        recorder.on_test_passed();

        let records = recorder.records_in_order();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Some(TestStatus::Pass));
    }

    #[test]
    fn same_test_name_in_two_classes_stays_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_test_start("LoginTest", "smoke");
        recorder.on_test_passed();
        recorder.on_test_start("DashboardTest", "smoke");
        recorder.on_test_failed("widget missing");

        let records = recorder.records_in_order();
        assert_eq!(records.len(), 2);
        assert_eq!(
            recorder.record("LoginTest", "smoke").unwrap().status,
            Some(TestStatus::Pass)
        );
        assert_eq!(
            recorder.record("DashboardTest", "smoke").unwrap().status,
            Some(TestStatus::Fail)
        );
    }

    #[test]
    fn steps_reset_between_tests() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_test_start("LoginTest", "first");
        recorder.log_step("only in first");
        recorder.on_test_passed();

        recorder.on_test_start("LoginTest", "second");
        recorder.log_step("only in second");
        recorder.on_test_passed();

        let second = recorder.record("LoginTest", "second").unwrap();
        assert_eq!(second.steps.len(), 1);
        assert!(second.steps[0].contains("only in second"));
    }

    #[test]
    fn suite_finish_writes_a_stamped_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = recorder_with_dirs(dir.path());

        recorder.on_suite_start();
        recorder.on_test_start("LoginTest", "login_test");
        recorder.on_test_passed();
        let path = recorder.on_suite_finish().unwrap();

        assert!(path.exists());
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("login_test"));
    }
}
