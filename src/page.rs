//! Element locators and the base page primitives every page object builds on.
//!
//! All lookups resolve either through a CSS query (`id`/`name`/`css`
//! strategies) or through a `document.evaluate` call for XPath. Waits poll
//! the page at the configured interval until the element condition holds or
//! the element timeout elapses.

use crate::{HarnessConfig, HarnessError};
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use std::time::{Duration, Instant};
use tracing::debug;

/// A strategy for finding an on-screen element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Name(String),
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// CSS query equivalent, when the strategy has one.
    pub fn css_query(&self) -> Option<String> {
        match self {
            Locator::Id(v) => Some(format!("[id='{v}']")),
            Locator::Name(v) => Some(format!("[name='{v}']")),
            Locator::Css(v) => Some(v.clone()),
            Locator::XPath(_) => None,
        }
    }

    /// JavaScript expression resolving to the element or null.
    fn js_lookup(&self) -> String {
        match self.css_query() {
            Some(query) => format!("document.querySelector({})", js_string(&query)),
            None => {
                let Locator::XPath(xpath) = self else {
                    unreachable!("only xpath locators lack a css query");
                };
                format!(
                    "document.evaluate({}, document, null, \
                     XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                    js_string(xpath)
                )
            }
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={v}"),
            Locator::Name(v) => write!(f, "name={v}"),
            Locator::Css(v) => write!(f, "css={v}"),
            Locator::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}

/// Quote a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

/// Low-level interaction primitives shared by all page objects.
///
/// Owns the page handle, the wait budget and the poll interval; page objects
/// express their actions in terms of these primitives.
pub struct PageContext {
    page: Page,
    element_timeout: Duration,
    load_timeout: Duration,
    poll_interval: Duration,
}

impl PageContext {
    pub fn new(page: Page, config: &HarnessConfig) -> Self {
        Self {
            page,
            element_timeout: config.element_timeout,
            load_timeout: config.page_load_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<(), HarnessError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;

        match tokio::time::timeout(self.load_timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HarnessError::PageError(e.to_string())),
            Err(_) => Err(HarnessError::WaitTimeout(self.load_timeout)),
        }
    }

    pub async fn title(&self) -> Result<String, HarnessError> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    pub async fn current_url(&self) -> Result<String, HarnessError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    /// Wait until the element is present and visible.
    pub async fn wait_visible(&self, locator: &Locator) -> Result<(), HarnessError> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return false; \
             return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length); }})()",
            locator.js_lookup()
        );
        self.wait_until(&expr, || {
            HarnessError::ElementNotFound(locator.to_string())
        })
        .await
    }

    /// Wait for the page title to match `expected` exactly.
    pub async fn wait_for_title(&self, expected: &str) -> Result<(), HarnessError> {
        let deadline = Instant::now() + self.element_timeout;
        loop {
            if self.title().await? == expected {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("Title never became {:?}", expected);
                return Err(HarnessError::WaitTimeout(self.element_timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Wait for the element, then click it.
    pub async fn click(&self, locator: &Locator) -> Result<(), HarnessError> {
        self.wait_visible(locator).await?;

        match locator.css_query() {
            Some(query) => {
                let element = self.find(&query, locator).await?;
                element
                    .click()
                    .await
                    .map_err(|e| HarnessError::PageError(e.to_string()))?;
            }
            None => {
                let expr = format!(
                    "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
                    locator.js_lookup()
                );
                if !self.eval_bool(&expr).await? {
                    return Err(HarnessError::ElementNotFound(locator.to_string()));
                }
            }
        }

        debug!("Clicked {}", locator);
        Ok(())
    }

    /// Wait for the element, clear its current value, then type `text`.
    pub async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), HarnessError> {
        self.wait_visible(locator).await?;

        match locator.css_query() {
            Some(query) => {
                let clear = format!(
                    "(() => {{ const el = {}; if (el) el.value = ''; }})()",
                    locator.js_lookup()
                );
                self.page
                    .evaluate(clear)
                    .await
                    .map_err(|e| HarnessError::PageError(e.to_string()))?;

                let element = self.find(&query, locator).await?;
                element
                    .click()
                    .await
                    .map_err(|e| HarnessError::PageError(e.to_string()))?;
                element
                    .type_str(text)
                    .await
                    .map_err(|e| HarnessError::PageError(e.to_string()))?;
            }
            None => {
                let expr = format!(
                    "(() => {{ const el = {}; if (!el) return false; el.focus(); \
                     el.value = {}; \
                     el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                     el.dispatchEvent(new Event('change', {{bubbles: true}})); \
                     return true; }})()",
                    locator.js_lookup(),
                    js_string(text)
                );
                if !self.eval_bool(&expr).await? {
                    return Err(HarnessError::ElementNotFound(locator.to_string()));
                }
            }
        }

        debug!("Typed {} characters into {}", text.len(), locator);
        Ok(())
    }

    /// Wait for the element and return its visible text.
    pub async fn text_of(&self, locator: &Locator) -> Result<String, HarnessError> {
        self.wait_visible(locator).await?;

        let expr = format!(
            "(() => {{ const el = {}; return el ? (el.innerText ?? el.textContent ?? '') : null; }})()",
            locator.js_lookup()
        );
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;

        result
            .into_value::<Option<String>>()
            .map_err(|e| HarnessError::PageError(e.to_string()))?
            .ok_or_else(|| HarnessError::ElementNotFound(locator.to_string()))
    }

    /// Whether the element becomes visible within the wait budget. Absent or
    /// hidden elements report `false`, never an error.
    pub async fn is_displayed(&self, locator: &Locator) -> bool {
        self.wait_visible(locator).await.is_ok()
    }

    async fn find(&self, query: &str, locator: &Locator) -> Result<Element, HarnessError> {
        self.page
            .find_element(query)
            .await
            .map_err(|_| HarnessError::ElementNotFound(locator.to_string()))
    }

    async fn eval_bool(&self, expr: &str) -> Result<bool, HarnessError> {
        let result = self
            .page
            .evaluate(expr.to_string())
            .await
            .map_err(|e| HarnessError::PageError(e.to_string()))?;
        result
            .into_value::<bool>()
            .map_err(|e| HarnessError::PageError(e.to_string()))
    }

    async fn wait_until<F>(&self, expr: &str, on_timeout: F) -> Result<(), HarnessError>
    where
        F: Fn() -> HarnessError,
    {
        let deadline = Instant::now() + self.element_timeout;
        loop {
            if self.eval_bool(expr).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("Wait expired: {}", on_timeout());
                return Err(HarnessError::WaitTimeout(self.element_timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Implemented by every page object: a human-readable name for step logs and
/// a load check built from the page's own locators.
#[async_trait]
pub trait PageObject {
    fn name(&self) -> &str;

    async fn is_loaded(&self) -> Result<bool, HarnessError>;
}
