//! Configuration management: the harness config (serde) and the flat
//! properties resource holding application and credential settings.

use crate::HarnessError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Harness-level configuration for the test run
///
/// Controls where artifacts land, how long element waits poll, and how the
/// browser window is sized. Loadable from a JSON file via the CLI `--config`
/// flag.
///
/// # Examples
///
/// ```rust
/// use ui_harness::HarnessConfig;
///
/// // Use default configuration
/// let config = HarnessConfig::default();
///
/// // Create custom configuration
/// let config = HarnessConfig {
///     retention_days: 14,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
    /// Directory screenshots are written to (default: test-output/screenshots)
    pub screenshots_dir: String,

    /// Directory the HTML report is written to (default: enhanced-reports)
    pub report_dir: String,

    /// Screenshots older than this many days are retired by the cleanup
    /// sweep (default: 7)
    pub retention_days: u64,

    /// Browser viewport configuration
    pub viewport: Viewport,

    /// Maximum time an element wait polls before failing (default: 20 seconds)
    pub element_timeout: Duration,

    /// Page load timeout delegated to navigation (default: 30 seconds)
    pub page_load_timeout: Duration,

    /// Interval between element wait polls (default: 250 milliseconds)
    pub poll_interval: Duration,

    /// Run the browser headless (default: true)
    pub headless: bool,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            screenshots_dir: "test-output/screenshots".to_string(),
            report_dir: "enhanced-reports".to_string(),
            retention_days: 7,
            viewport: Viewport::default(),
            element_timeout: Duration::from_secs(20),
            page_load_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            headless: true,
            chrome_path: None,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(HarnessError::InvalidProperty {
                key: "viewport".to_string(),
                value: format!("{}x{}", self.viewport.width, self.viewport.height),
            });
        }
        if self.element_timeout.is_zero() || self.page_load_timeout.is_zero() {
            return Err(HarnessError::InvalidProperty {
                key: "timeouts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(HarnessError::InvalidProperty {
                key: "poll_interval".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Browser viewport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1920)
    pub width: u32,

    /// Viewport height in pixels (default: 1080)
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Flat key-value settings loaded from a `.properties` resource
///
/// Holds the application-facing configuration: base URL, expected page
/// titles, test credentials and the default browser. Loading fails fast when
/// the resource is missing; individual keys are either required (`require`)
/// or fall back to caller-supplied defaults.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| HarnessError::ConfigNotFound(path.display().to_string()))?;
        Ok(Self::parse(&content))
    }

    /// Parse properties text: `key=value` or `key: value` lines, `#` and `!`
    /// comments, surrounding whitespace trimmed.
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = line
                .find('=')
                .into_iter()
                .chain(line.find(':'))
                .min();
            if let Some(idx) = split {
                let key = line[..idx].trim();
                let value = line[idx + 1..].trim();
                if !key.is_empty() {
                    values.insert(key.to_string(), value.to_string());
                }
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, HarnessError> {
        self.get(key)
            .ok_or_else(|| HarnessError::MissingProperty(key.to_string()))
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str) -> Result<i64, HarnessError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| HarnessError::InvalidProperty {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, HarnessError> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| HarnessError::InvalidProperty {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(default)
    }

    // Convenience getters for recognized keys

    pub fn base_url(&self) -> Result<&str, HarnessError> {
        self.require("app.base.url")
    }

    pub fn login_title(&self) -> Result<&str, HarnessError> {
        self.require("app.login.title")
    }

    pub fn dashboard_title(&self) -> Result<&str, HarnessError> {
        self.require("app.dashboard.title")
    }

    pub fn username(&self) -> Result<&str, HarnessError> {
        self.require("test.username")
    }

    pub fn password(&self) -> Result<&str, HarnessError> {
        self.require("test.password")
    }

    pub fn default_browser(&self) -> &str {
        self.get_or("browser.default", "chrome")
    }
}
