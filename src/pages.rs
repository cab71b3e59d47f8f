//! Page objects: one per logical screen, each exposing high-level actions
//! built from the [`PageContext`] primitives. All element lookups use static
//! locators except the dynamic menu-item xpath on the dashboard.

use crate::config::Settings;
use crate::page::{Locator, PageContext, PageObject};
use crate::HarnessError;
use async_trait::async_trait;

mod login_locators {
    use crate::page::Locator;

    pub fn username_field() -> Locator {
        Locator::id("userName")
    }

    pub fn password_field() -> Locator {
        Locator::name("password")
    }

    pub fn login_button() -> Locator {
        Locator::xpath("//*[@type='submit']")
    }

    pub fn login_form() -> Locator {
        Locator::css("form[action*='LoginAction']")
    }

    pub fn error_message() -> Locator {
        Locator::css(".error-message")
    }
}

/// The login screen.
pub struct LoginPage<'a> {
    ctx: &'a PageContext,
    login_title: String,
    dashboard_title: String,
}

impl<'a> LoginPage<'a> {
    pub fn new(ctx: &'a PageContext, settings: &Settings) -> Result<Self, HarnessError> {
        Ok(Self {
            ctx,
            login_title: settings.login_title()?.to_string(),
            dashboard_title: settings.dashboard_title()?.to_string(),
        })
    }

    pub async fn wait_until_loaded(&self) -> Result<(), HarnessError> {
        self.ctx.wait_for_title(&self.login_title).await
    }

    pub async fn enter_username(&self, username: &str) -> Result<(), HarnessError> {
        self.ctx
            .type_text(&login_locators::username_field(), username)
            .await
    }

    pub async fn enter_password(&self, password: &str) -> Result<(), HarnessError> {
        self.ctx
            .type_text(&login_locators::password_field(), password)
            .await
    }

    pub async fn click_login(&self) -> Result<(), HarnessError> {
        self.ctx.click(&login_locators::login_button()).await
    }

    /// The full login flow: wait for the page, fill credentials, submit and
    /// wait for the dashboard title.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), HarnessError> {
        self.wait_until_loaded().await?;
        self.enter_username(username).await?;
        self.enter_password(password).await?;
        self.click_login().await?;
        self.ctx.wait_for_title(&self.dashboard_title).await
    }

    pub async fn is_displayed(&self) -> bool {
        self.ctx.is_displayed(&login_locators::username_field()).await
            && self.ctx.is_displayed(&login_locators::password_field()).await
    }

    pub async fn error_message(&self) -> Result<String, HarnessError> {
        self.ctx.text_of(&login_locators::error_message()).await
    }
}

#[async_trait]
impl PageObject for LoginPage<'_> {
    fn name(&self) -> &str {
        "LoginPage"
    }

    async fn is_loaded(&self) -> Result<bool, HarnessError> {
        Ok(self.ctx.title().await? == self.login_title
            && self.ctx.is_displayed(&login_locators::login_form()).await)
    }
}

mod dashboard_locators {
    use crate::page::Locator;

    pub fn header() -> Locator {
        Locator::css(".dashboard-container")
    }

    pub fn user_menu() -> Locator {
        Locator::css(".user-profile-dropdown")
    }

    pub fn logout_link() -> Locator {
        Locator::xpath("//a[normalize-space(text())='Logout']")
    }

    pub fn menu_item(text: &str) -> Locator {
        Locator::xpath(format!(
            "//div[contains(@class,'menu-item') and contains(text(),'{text}')]"
        ))
    }
}

/// The dashboard shown after a successful login.
pub struct DashboardPage<'a> {
    ctx: &'a PageContext,
    dashboard_title: String,
}

impl<'a> DashboardPage<'a> {
    pub fn new(ctx: &'a PageContext, settings: &Settings) -> Result<Self, HarnessError> {
        Ok(Self {
            ctx,
            dashboard_title: settings.dashboard_title()?.to_string(),
        })
    }

    pub async fn wait_until_loaded(&self) -> Result<(), HarnessError> {
        self.ctx.wait_for_title(&self.dashboard_title).await
    }

    pub async fn is_header_displayed(&self) -> bool {
        self.ctx.is_displayed(&dashboard_locators::header()).await
    }

    /// Open a side-menu section by its visible text.
    pub async fn open_section(&self, text: &str) -> Result<(), HarnessError> {
        self.ctx.click(&dashboard_locators::menu_item(text)).await
    }

    pub async fn log_out(&self) -> Result<(), HarnessError> {
        self.ctx.click(&dashboard_locators::user_menu()).await?;
        self.ctx.click(&dashboard_locators::logout_link()).await
    }
}

#[async_trait]
impl PageObject for DashboardPage<'_> {
    fn name(&self) -> &str {
        "DashboardPage"
    }

    async fn is_loaded(&self) -> Result<bool, HarnessError> {
        Ok(self.ctx.title().await?.contains(&self.dashboard_title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_locators_use_the_expected_strategies() {
        assert_eq!(login_locators::username_field(), Locator::id("userName"));
        assert_eq!(login_locators::password_field(), Locator::name("password"));
        assert_eq!(
            login_locators::login_button(),
            Locator::xpath("//*[@type='submit']")
        );
    }

    #[test]
    fn dynamic_menu_locator_embeds_the_text() {
        let locator = dashboard_locators::menu_item("Reports");
        match locator {
            Locator::XPath(xpath) => assert!(xpath.contains("'Reports'")),
            other => panic!("expected an xpath locator, got {other:?}"),
        }
    }

    #[test]
    fn pages_require_title_settings() {
        // Settings without the title keys must fail page construction before
        // any browser work happens.
        let settings = Settings::parse("app.base.url=https://example.com\n");
        assert!(settings.login_title().is_err());
        assert!(settings.dashboard_title().is_err());
    }
}
