//! In-memory stand-ins for the browser and the scanning engine.
//!
//! [`MockBrowser`] serves scripted pages and records every navigation, fill
//! and click so tests can assert the order in which credentials were
//! entered. [`RecordingEngine`] keeps whatever the hook writes into it.

use crate::engine::{EngineError, NavigationInterceptor, SessionSink};
use crate::exclusion::ExclusionFilter;
use async_trait::async_trait;
use loginhook_browser::{BrowserActions, BrowserError, BrowserLauncher, ElementInfo};
use loginhook_core::{SessionCookie, SiteRoot, StorageEntry};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A recorded browser interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Navigate(String),
    Fill { field: String, value: String },
    Click(String),
    Close,
}

impl BrowserCall {
    pub fn fill(field: &str, value: &str) -> Self {
        Self::Fill {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum ClickEffect {
    Navigate(String),
    Replace(Vec<ElementInfo>),
}

#[derive(Debug, Default)]
struct BrowserState {
    pages: HashMap<String, Vec<ElementInfo>>,
    effects: HashMap<(String, String), ClickEffect>,
    current_url: String,
    elements: Vec<ElementInfo>,
    calls: Vec<BrowserCall>,
    cookies: Vec<SessionCookie>,
    storage: Vec<StorageEntry>,
    // per url: what is listed before the page finishes rendering, and for how many listings
    placeholders: HashMap<String, (Vec<ElementInfo>, usize)>,
    // per url: how many page reads fail after the page loads
    unstable: HashMap<String, usize>,
    pending_placeholder: Option<(Vec<ElementInfo>, usize)>,
    pending_failures: usize,
    never_settles: bool,
    closed: bool,
}

/// Scripted browser. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        let state = BrowserState {
            current_url: "about:blank".to_string(),
            ..BrowserState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Serve `elements` when `url` is loaded.
    #[must_use]
    pub fn with_page(self, url: &str, elements: Vec<ElementInfo>) -> Self {
        self.lock().pages.insert(url.to_string(), elements);
        self
    }

    /// Clicking `label` while on `from` loads `to`.
    #[must_use]
    pub fn on_click(self, from: &str, label: &str, to: &str) -> Self {
        self.lock().effects.insert(
            (from.to_string(), label.to_string()),
            ClickEffect::Navigate(to.to_string()),
        );
        self
    }

    /// Clicking `label` while on `url` swaps the page content without navigating.
    #[must_use]
    pub fn on_click_replace(self, url: &str, label: &str, elements: Vec<ElementInfo>) -> Self {
        self.lock().effects.insert(
            (url.to_string(), label.to_string()),
            ClickEffect::Replace(elements),
        );
        self
    }

    #[must_use]
    pub fn with_cookie(self, cookie: SessionCookie) -> Self {
        self.lock().cookies.push(cookie);
        self
    }

    #[must_use]
    pub fn with_storage(self, key: &str, value: &str) -> Self {
        self.lock().storage.push(StorageEntry {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// After `url` loads, the first `listings` element listings return
    /// `placeholder` instead of the page's real controls.
    #[must_use]
    pub fn with_late_render(self, url: &str, placeholder: Vec<ElementInfo>, listings: usize) -> Self {
        self.lock()
            .placeholders
            .insert(url.to_string(), (placeholder, listings));
        self
    }

    /// After `url` loads, the next `reads` URL or element reads fail as if
    /// the execution context were being torn down.
    #[must_use]
    pub fn with_unstable_reads(self, url: &str, reads: usize) -> Self {
        self.lock().unstable.insert(url.to_string(), reads);
        self
    }

    /// Every settle wait times out.
    #[must_use]
    pub fn never_settles(self) -> Self {
        self.lock().never_settles = true;
        self
    }

    /// Navigations, fills and clicks in the order they happened.
    pub fn calls(&self) -> Vec<BrowserCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| !matches!(call, BrowserCall::Close))
            .cloned()
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl BrowserState {
    fn load(&mut self, url: &str) {
        self.current_url = url.to_string();
        self.elements = self.pages.get(url).cloned().unwrap_or_default();
        self.pending_placeholder = self.placeholders.get(url).cloned();
        self.pending_failures = self.unstable.get(url).copied().unwrap_or(0);
    }

    fn check_readable(&mut self) -> Result<(), BrowserError> {
        if self.pending_failures == 0 {
            return Ok(());
        }
        self.pending_failures -= 1;
        Err(BrowserError::Script(
            "Execution context was destroyed".to_string(),
        ))
    }

    fn listing(&mut self) -> Vec<ElementInfo> {
        match self.pending_placeholder.as_mut() {
            Some((placeholder, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                placeholder.clone()
            }
            _ => self.elements.clone(),
        }
    }

    fn find(&self, element: &ElementInfo) -> Result<(), BrowserError> {
        if self
            .elements
            .iter()
            .any(|e| e == element || e.same_control(element))
        {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(format!(
                "{} is not on {}",
                element.label(),
                self.current_url
            )))
        }
    }
}

#[async_trait]
impl BrowserActions for MockBrowser {
    async fn navigate(&self, url: &str) -> loginhook_browser::Result<()> {
        let mut state = self.lock();
        state.calls.push(BrowserCall::Navigate(url.to_string()));
        state.load(url);
        Ok(())
    }

    async fn current_url(&self) -> loginhook_browser::Result<String> {
        let mut state = self.lock();
        state.check_readable()?;
        Ok(state.current_url.clone())
    }

    async fn interactive_elements(&self) -> loginhook_browser::Result<Vec<ElementInfo>> {
        let mut state = self.lock();
        state.check_readable()?;
        Ok(state.listing())
    }

    async fn fill(&self, element: &ElementInfo, value: &str) -> loginhook_browser::Result<()> {
        let mut state = self.lock();
        state.calls.push(BrowserCall::fill(&element.label(), value));
        state.find(element)
    }

    async fn click(&self, element: &ElementInfo) -> loginhook_browser::Result<()> {
        let mut state = self.lock();
        let label = element.label();
        state.calls.push(BrowserCall::Click(label.clone()));
        state.find(element)?;

        let effect = state.effects.get(&(state.current_url.clone(), label)).cloned();
        match effect {
            Some(ClickEffect::Navigate(to)) => state.load(&to),
            Some(ClickEffect::Replace(elements)) => state.elements = elements,
            None => {}
        }
        Ok(())
    }

    async fn wait_for_settle(&self, timeout: Duration) -> loginhook_browser::Result<()> {
        if self.lock().never_settles {
            return Err(BrowserError::Timeout(format!(
                "page did not settle within {timeout:?}"
            )));
        }
        Ok(())
    }

    async fn cookies(&self) -> loginhook_browser::Result<Vec<SessionCookie>> {
        Ok(self.lock().cookies.clone())
    }

    async fn storage_entries(&self) -> loginhook_browser::Result<Vec<StorageEntry>> {
        Ok(self.lock().storage.clone())
    }

    async fn close(&self) -> loginhook_browser::Result<()> {
        let mut state = self.lock();
        state.calls.push(BrowserCall::Close);
        state.closed = true;
        Ok(())
    }
}

/// Hands out clones of one [`MockBrowser`] and counts launches.
#[derive(Debug, Clone)]
pub struct MockLauncher {
    browser: MockBrowser,
    launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn browser(&self) -> &MockBrowser {
        &self.browser
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> loginhook_browser::Result<Box<dyn BrowserActions>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.browser.clone()))
    }
}

#[derive(Debug, Default)]
struct EngineState {
    cookies: Vec<SessionCookie>,
    headers: Vec<(String, String)>,
    sessions_opened: usize,
    registrations: usize,
    filter: Option<Arc<ExclusionFilter>>,
    rejected_cookies: HashSet<String>,
    reject_sessions: bool,
    reject_registrations: bool,
}

/// Engine that stores sessions and filters in memory.
///
/// Cookies are keyed by name, domain and path; writing the same key again
/// replaces the value. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    state: Arc<Mutex<EngineState>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any cookie named `name`.
    #[must_use]
    pub fn reject_cookie(self, name: &str) -> Self {
        self.lock().rejected_cookies.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn reject_sessions(self) -> Self {
        self.lock().reject_sessions = true;
        self
    }

    #[must_use]
    pub fn reject_registrations(self) -> Self {
        self.lock().reject_registrations = true;
        self
    }

    pub fn accept_registrations(&self) {
        self.lock().reject_registrations = false;
    }

    pub fn cookies(&self) -> Vec<SessionCookie> {
        self.lock().cookies.clone()
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.lock().headers.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions_opened
    }

    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    pub fn registered_filter(&self) -> Option<Arc<ExclusionFilter>> {
        self.lock().filter.clone()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionSink for RecordingEngine {
    async fn open_session(&self, site: &SiteRoot) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.reject_sessions {
            return Err(EngineError::Rejected(format!("no session for {site}")));
        }
        state.sessions_opened += 1;
        Ok(())
    }

    async fn set_cookie(&self, _site: &SiteRoot, cookie: &SessionCookie) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.rejected_cookies.contains(&cookie.name) {
            return Err(EngineError::Rejected(format!("cookie {}", cookie.name)));
        }

        let existing = state.cookies.iter_mut().find(|c| {
            c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path
        });
        match existing {
            Some(slot) => slot.value.clone_from(&cookie.value),
            None => state.cookies.push(cookie.clone()),
        }
        Ok(())
    }

    async fn set_header(&self, _site: &SiteRoot, name: &str, value: &str) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        state.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }
}

#[async_trait]
impl NavigationInterceptor for RecordingEngine {
    async fn register(
        &self,
        site: &SiteRoot,
        filter: Arc<ExclusionFilter>,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        if state.reject_registrations {
            return Err(EngineError::Rejected(format!("no interceptor for {site}")));
        }
        state.registrations += 1;
        state.filter = Some(filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok, block_on};

    #[test]
    fn test_click_effects_follow_current_page() {
        let browser = MockBrowser::new()
            .with_page("https://a/", vec![ElementInfo::button(0, "next")])
            .with_page("https://a/2", vec![ElementInfo::button(0, "done")])
            .on_click("https://a/", "next", "https://a/2")
            .on_click_replace("https://a/2", "done", vec![]);

        block_on(async {
            assert_ok!(browser.navigate("https://a/").await);
            assert_ok!(browser.click(&ElementInfo::button(0, "next")).await);
            assert_eq!(assert_ok!(browser.current_url().await), "https://a/2");

            // controls from the previous page are gone
            assert_err!(browser.click(&ElementInfo::button(0, "next")).await);
            assert_ok!(browser.click(&ElementInfo::button(0, "done")).await);
            assert!(assert_ok!(browser.interactive_elements().await).is_empty());
        });
    }

    #[test]
    fn test_late_render_and_unstable_reads() {
        let browser = MockBrowser::new()
            .with_page("https://a/", vec![ElementInfo::button(0, "real")])
            .with_late_render("https://a/", vec![ElementInfo::button(0, "spinner")], 1)
            .with_unstable_reads("https://a/", 2);

        block_on(async {
            assert_ok!(browser.navigate("https://a/").await);
            assert_err!(browser.current_url().await);
            assert_err!(browser.interactive_elements().await);
            assert_eq!(
                assert_ok!(browser.interactive_elements().await),
                vec![ElementInfo::button(0, "spinner")]
            );
            assert_eq!(
                assert_ok!(browser.interactive_elements().await),
                vec![ElementInfo::button(0, "real")]
            );
        });
    }

    #[test]
    fn test_close_is_not_listed_in_calls() {
        let browser = MockBrowser::new();
        block_on(async {
            assert_ok!(browser.close().await);
        });
        assert!(browser.is_closed());
        assert!(browser.calls().is_empty());
    }
}
