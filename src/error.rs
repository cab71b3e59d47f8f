use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HarnessError {
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Missing required property: {0}")]
    MissingProperty(String),

    #[error("Invalid value for property {key}: {value}")]
    InvalidProperty { key: String, value: String },

    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {0:?} waiting for condition")]
    WaitTimeout(Duration),

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl HarnessError {
    /// Failures that abort the run immediately. Everything else is either
    /// a test failure or degrades to a logged warning.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::ConfigNotFound(_)
                | HarnessError::MissingProperty(_)
                | HarnessError::UnsupportedBrowser(_)
                | HarnessError::BrowserLaunchFailed(_)
        )
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::SerializationError(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for HarnessError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        HarnessError::PageError(err.to_string())
    }
}
