use crate::actions::{BrowserActions, BrowserLauncher};
use crate::element::ElementInfo;
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::stream::StreamExt;
use loginhook_core::{BrowserSettings, SessionCookie, StorageEntry};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Elements considered when locating login controls. The listing script and
/// the element lookup must use the same selector so indices line up.
const INTERACTIVE_SELECTOR: &str = "input, button, [role=\"button\"]";

const LIST_ELEMENTS_JS: &str = r#"
(() => Array.from(document.querySelectorAll('input, button, [role="button"]')).map((el, index) => {
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const type = (el.getAttribute('type') || (el.getAttribute('role') === 'button' ? 'button' : '')).toLowerCase();
    return {
        index,
        tag: el.tagName.toLowerCase(),
        type,
        name: el.getAttribute('name'),
        id: el.id || null,
        visible: type !== 'hidden'
            && style.display !== 'none'
            && style.visibility !== 'hidden'
            && rect.width > 0
            && rect.height > 0,
    };
}))()
"#;

const READY_STATE_JS: &str = "document.readyState";

const STORAGE_JS: &str = r#"
(() => {
    const out = [];
    for (const name of ['localStorage', 'sessionStorage']) {
        try {
            const store = window[name];
            for (let i = 0; i < store.length; i++) {
                const key = store.key(i);
                out.push({ key, value: store.getItem(key) || '' });
            }
        } catch (e) {}
    }
    return out;
})()
"#;

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; }";

/// Headless Chromium session used for one login transaction.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser with default settings
    pub async fn new() -> Result<Self> {
        Self::launch(&BrowserSettings::default()).await
    }

    /// Launch a browser and open a blank page
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.window_width, settings.window_height)
            .request_timeout(settings.navigation_timeout());
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        tracing::debug!("Browser launched (headless: {})", settings.headless);

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            poll_interval: settings.poll_interval(),
            navigation_timeout: settings.navigation_timeout(),
        })
    }

    async fn element_at(&self, element: &ElementInfo) -> Result<Element> {
        self.page
            .find_elements(INTERACTIVE_SELECTOR)
            .await?
            .into_iter()
            .nth(element.index)
            .ok_or_else(|| BrowserError::ElementNotFound(element.label()))
    }

    async fn document_complete(&self) -> Result<bool> {
        let state: String = self
            .page
            .evaluate(READY_STATE_JS)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(state == "complete")
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {url}")))?
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await?
            .ok_or_else(|| BrowserError::NavigationError("page has no URL".to_string()))
    }

    async fn interactive_elements(&self) -> Result<Vec<ElementInfo>> {
        self.page
            .evaluate(LIST_ELEMENTS_JS)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn fill(&self, element: &ElementInfo, value: &str) -> Result<()> {
        let handle = self.element_at(element).await?;
        handle.call_js_fn(CLEAR_VALUE_JS, false).await?;
        handle.click().await?;
        handle.type_str(value).await?;
        Ok(())
    }

    async fn click(&self, element: &ElementInfo) -> Result<()> {
        tracing::debug!("Clicking {}", element.label());
        self.element_at(element).await?.click().await?;
        Ok(())
    }

    async fn wait_for_settle(&self, timeout: Duration) -> Result<()> {
        let settle = async {
            self.page.wait_for_navigation().await?;
            while !self.document_complete().await? {
                tokio::time::sleep(self.poll_interval).await;
            }
            Ok::<(), BrowserError>(())
        };

        tokio::time::timeout(timeout, settle)
            .await
            .map_err(|_| BrowserError::Timeout(format!("page did not settle within {timeout:?}")))?
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let page_url = self.current_url().await.ok();

        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| session_cookie(c.name, c.value, c.domain, c.path, page_url.as_deref()))
            .collect())
    }

    async fn storage_entries(&self) -> Result<Vec<StorageEntry>> {
        self.page
            .evaluate(STORAGE_JS)
            .await?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await?;
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        tracing::debug!("Browser closed");
        Ok(())
    }
}

/// Convert a CDP cookie for the engine session.
///
/// Host-only cookies can come back without a domain; they belong to the host
/// of the page they were read on.
fn session_cookie(
    name: String,
    value: String,
    domain: String,
    path: String,
    page_url: Option<&str>,
) -> SessionCookie {
    let domain = if domain.is_empty() {
        page_url
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    } else {
        domain
    };
    let path = if path.is_empty() { "/".to_string() } else { path };

    SessionCookie::new(name, value, domain).with_path(path)
}

/// Launches a [`BrowserEngine`] per login transaction.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserActions>> {
        let engine = BrowserEngine::launch(&self.settings).await?;
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_script_uses_lookup_selector() {
        // Element indices are only valid if both sides query the same set
        assert!(LIST_ELEMENTS_JS.contains(INTERACTIVE_SELECTOR));
    }

    #[test]
    fn test_launcher_carries_settings() {
        let settings = BrowserSettings {
            headless: false,
            ..BrowserSettings::default()
        };
        let launcher = ChromiumLauncher::new(settings);
        assert!(!launcher.settings.headless);
    }

    #[test]
    fn test_host_only_cookie_takes_page_host() {
        let cookie = session_cookie(
            "sid".to_string(),
            "abc".to_string(),
            String::new(),
            String::new(),
            Some("https://shop.example:8443/account"),
        );
        assert_eq!(cookie, SessionCookie::new("sid", "abc", "shop.example"));
    }

    #[test]
    fn test_cookie_keeps_reported_domain_and_path() {
        let cookie = session_cookie(
            "cart".to_string(),
            "7".to_string(),
            ".shop.example".to_string(),
            "/cart".to_string(),
            Some("https://www.shop.example/"),
        );
        assert_eq!(cookie.domain, ".shop.example");
        assert_eq!(cookie.path, "/cart");
    }

    #[test]
    fn test_cookie_without_page_url() {
        let cookie = session_cookie(
            "sid".to_string(),
            "abc".to_string(),
            String::new(),
            "/".to_string(),
            Some("about:blank"),
        );
        assert_eq!(cookie.domain, "");
    }
}
