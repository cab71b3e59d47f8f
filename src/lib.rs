//! # UI Harness
//!
//! A browser UI test harness built on Chrome DevTools automation. It drives
//! a small page-object suite against a configured web application, captures
//! full-page screenshots on failure, correlates them back to the failing
//! test, and renders a self-contained HTML report per run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ui_harness::{BrowserKind, Driver, HarnessConfig, PageContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::default();
//!     let driver = Driver::launch(BrowserKind::Chrome, &config).await?;
//!     let page = driver.open("https://example.com").await?;
//!     let ctx = PageContext::new(page, &config);
//!     println!("Title: {}", ctx.title().await?);
//!     driver.quit().await;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! ui-harness run --properties config.properties --browser chrome
//! ui-harness cleanup --days 7
//! ui-harness list --today --class LoginTest
//! ui-harness validate --config harness.json
//! ```

/// Harness configuration and application settings (properties files)
pub mod config;

/// Error types shared across the harness
pub mod error;

/// Browser lifecycle: launch, navigation entry point, shutdown
pub mod driver;

/// Locators, element interaction and wait primitives
pub mod page;

/// Page objects for the application under test
pub mod pages;

/// Screenshot capture, naming and retention cleanup
pub mod screenshot;

/// Test execution records and HTML report rendering
pub mod report;

/// Suite recorder: test lifecycle hooks and step logging
pub mod listener;

/// Command-line interface implementation
pub mod cli;


pub use cli::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use listener::*;
pub use page::*;
pub use pages::*;
pub use report::*;
pub use screenshot::*;
