use crate::element::ElementInfo;
use crate::error::Result;
use loginhook_core::{SessionCookie, StorageEntry};
use std::time::Duration;

/// Page capabilities needed to drive a login form.
///
/// Elements are addressed by the [`ElementInfo`] records returned from
/// [`BrowserActions::interactive_elements`]; a record must not be used after
/// the page has navigated.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL of the page currently loaded
    async fn current_url(&self) -> Result<String>;

    /// List input, button and button-like elements in document order
    async fn interactive_elements(&self) -> Result<Vec<ElementInfo>>;

    /// Clear an input and type a value into it
    async fn fill(&self, element: &ElementInfo, value: &str) -> Result<()>;

    /// Activate an element
    async fn click(&self, element: &ElementInfo) -> Result<()>;

    /// Wait for pending navigation to finish and the document to be complete.
    ///
    /// Fails with [`crate::BrowserError::Timeout`] once `timeout` elapses.
    async fn wait_for_settle(&self, timeout: Duration) -> Result<()>;

    /// Every cookie in the browser's jar
    async fn cookies(&self) -> Result<Vec<SessionCookie>>;

    /// Entries of `localStorage` and `sessionStorage` for the current origin
    async fn storage_entries(&self) -> Result<Vec<StorageEntry>>;

    /// Tear the browser down
    async fn close(&self) -> Result<()>;
}

/// Starts a fresh browser session per login transaction.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserActions>>;
}
