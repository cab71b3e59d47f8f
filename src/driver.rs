//! Driver factory: turns a browser identifier into a ready-to-use
//! chromiumoxide client with sane defaults.

use crate::{HarnessConfig, HarnessError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Browsers the harness knows how to drive. Only Chromium-based browsers are
/// reachable over the DevTools protocol; anything else is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Chromium,
}

impl FromStr for BrowserKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Ok(BrowserKind::Chrome),
            "chromium" => Ok(BrowserKind::Chromium),
            other => Err(HarnessError::UnsupportedBrowser(other.to_string())),
        }
    }
}

/// Chrome command-line arguments for a headless test run
pub fn chrome_args(config: &HarnessConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-notifications".to_string(),
        "--disable-popup-blocking".to_string(),
        "--no-first-run".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
    ];

    if config.headless {
        args.push("--headless".to_string());
    }

    args
}

fn browser_config(config: &HarnessConfig) -> Result<BrowserConfig, HarnessError> {
    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(HarnessError::BrowserLaunchFailed)
}

/// An owned browser client plus the background task that pumps its DevTools
/// protocol connection. One driver is alive per test context at a time.
pub struct Driver {
    browser: Browser,
    handler: tokio::task::JoinHandle<()>,
    config: HarnessConfig,
}

impl Driver {
    /// Launch a browser of the given kind configured from the harness config.
    pub async fn launch(kind: BrowserKind, config: &HarnessConfig) -> Result<Self, HarnessError> {
        info!("Launching {:?} (headless: {})", kind, config.headless);

        let (browser, mut handler) = Browser::launch(browser_config(config)?)
            .await
            .map_err(|e| HarnessError::BrowserLaunchFailed(e.to_string()))?;

        // The handler implements Stream and must be polled for the browser
        // connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
            debug!("CDP handler stream ended");
        });

        Ok(Self {
            browser,
            handler: handler_task,
            config: config.clone(),
        })
    }

    /// Open a new page at `url`. The URL is validated before navigation.
    pub async fn open(&self, url: &str) -> Result<Page, HarnessError> {
        let parsed =
            url::Url::parse(url).map_err(|_| HarnessError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https" | "file" | "about") {
            return Err(HarnessError::InvalidUrl(url.to_string()));
        }

        info!("Opening {}", url);
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;

        Ok(page)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Close the browser and stop the protocol pump.
    pub async fn quit(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Error closing browser: {}", e);
        }
        self.handler.abort();
        info!("Browser closed");
    }
}
