//! Entry point called from the scanning engine's lifecycle.
//!
//! Orchestration order: configuration is validated when the [`ScanSession`]
//! is built; [`HookAdapter::on_scan_start`] then submits credentials,
//! bridges the session, and registers the exclusion filter. A session hands
//! off at most once. Calling the hook again after success does nothing.

use crate::bridge::bridge;
use crate::engine::{NavigationInterceptor, SessionSink};
use crate::error::HookError;
use crate::exclusion::ExclusionFilter;
use crate::signals::SuccessSignals;
use crate::submitter::{CredentialSubmitter, SubmitTimings};
use loginhook_browser::{BrowserActions, BrowserLauncher};
use loginhook_core::{AuthConfig, ConfigResult, SiteRoot};
use std::sync::Arc;

/// Result of a completed handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffSummary {
    /// URL the browser ended up on after login
    pub final_url: String,
    /// Success signal that confirmed the login
    pub confirmed_by: &'static str,
    /// Cookies written into the engine session
    pub cookies_transferred: usize,
    /// Cookies the engine refused
    pub failed_cookies: Vec<String>,
    /// Whether a bearer token from web storage was forwarded
    pub bearer_forwarded: bool,
}

#[derive(Debug, Clone)]
enum SessionState {
    Pending,
    // Session written into the engine, filter not yet registered
    Bridged(HandoffSummary),
    Ready(HandoffSummary),
}

/// Authentication state of one scan run.
///
/// Every piece of per-scan state lives here rather than in globals, so
/// independent scans can share a process.
#[derive(Debug)]
pub struct ScanSession {
    site: SiteRoot,
    config: AuthConfig,
    filter: Arc<ExclusionFilter>,
    state: SessionState,
}

impl ScanSession {
    /// Create a session for a scan target.
    ///
    /// The target is reset to its site root, and the exclusion patterns are
    /// compiled here, before any browser work.
    pub fn new(target: &str, config: AuthConfig) -> ConfigResult<Self> {
        let site = SiteRoot::from_target(target)?;
        let filter = Arc::new(ExclusionFilter::from_config(&config)?);
        Ok(Self {
            site,
            config,
            filter,
            state: SessionState::Pending,
        })
    }

    /// Parse `auth.*` parameters and create a session for a scan target.
    pub fn from_params<I, K, V>(target: &str, params: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::new(target, AuthConfig::from_params(params)?)
    }

    /// Root URL the scan covers.
    #[must_use]
    pub fn site(&self) -> &SiteRoot {
        &self.site
    }

    /// Login configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Exclusion filter shared with the engine.
    #[must_use]
    pub fn exclusion_filter(&self) -> Arc<ExclusionFilter> {
        Arc::clone(&self.filter)
    }

    /// Whether the crawler may visit `url`.
    #[must_use]
    pub fn should_visit(&self, url: &str) -> bool {
        self.filter.should_visit(url)
    }

    /// Handoff details once the session has been bridged.
    #[must_use]
    pub fn handoff(&self) -> Option<&HandoffSummary> {
        match &self.state {
            SessionState::Pending => None,
            SessionState::Bridged(summary) | SessionState::Ready(summary) => Some(summary),
        }
    }

    /// Whether login, bridging and filter registration have all completed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }
}

/// Orchestrates login, session bridging and exclusion registration.
pub struct HookAdapter {
    launcher: Arc<dyn BrowserLauncher>,
    sink: Arc<dyn SessionSink>,
    interceptor: Arc<dyn NavigationInterceptor>,
    signals: SuccessSignals,
    timings: SubmitTimings,
}

impl HookAdapter {
    /// Create a hook with the default success signals and timings.
    #[must_use]
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        sink: Arc<dyn SessionSink>,
        interceptor: Arc<dyn NavigationInterceptor>,
    ) -> Self {
        Self {
            launcher,
            sink,
            interceptor,
            signals: SuccessSignals::default(),
            timings: SubmitTimings::default(),
        }
    }

    /// Set the wait bounds of the login transaction.
    #[must_use]
    pub fn with_timings(mut self, timings: SubmitTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replace the success signals.
    #[must_use]
    pub fn with_signals(mut self, signals: SuccessSignals) -> Self {
        self.signals = signals;
        self
    }

    /// Authenticate the scan session. A no-op once it has succeeded.
    ///
    /// A failed login is returned to the caller and not retried; whether the
    /// scan continues unauthenticated is the engine's decision.
    pub async fn on_scan_start(
        &self,
        session: &mut ScanSession,
    ) -> Result<HandoffSummary, HookError> {
        let summary = match &session.state {
            SessionState::Ready(summary) => {
                tracing::debug!("Session for {} already authenticated", session.site);
                return Ok(summary.clone());
            }
            // Bridged earlier but registration failed; only retry registration
            SessionState::Bridged(summary) => summary.clone(),
            SessionState::Pending => {
                let summary = self.login_and_bridge(session).await.map_err(|e| {
                    tracing::error!("Authenticated setup for {} failed: {}", session.site, e);
                    e
                })?;
                session.state = SessionState::Bridged(summary.clone());
                summary
            }
        };

        self.interceptor
            .register(&session.site, session.exclusion_filter())
            .await?;
        tracing::info!(
            "Authenticated session ready for {} ({} cookies, {} exclusion patterns)",
            session.site,
            summary.cookies_transferred,
            session.filter.patterns().len()
        );

        session.state = SessionState::Ready(summary.clone());
        Ok(summary)
    }

    async fn login_and_bridge(&self, session: &ScanSession) -> Result<HandoffSummary, HookError> {
        let browser = self.launcher.launch().await?;
        let outcome = self.transaction(browser.as_ref(), session).await;

        // The browser is not reused after handoff
        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
        outcome
    }

    async fn transaction(
        &self,
        browser: &dyn BrowserActions,
        session: &ScanSession,
    ) -> Result<HandoffSummary, HookError> {
        let submitter = CredentialSubmitter::new(&session.config, &self.signals, self.timings);
        let submitted = submitter.submit(browser).await?;
        let bridged = bridge(browser, self.sink.as_ref(), &session.site).await?;

        Ok(HandoffSummary {
            final_url: submitted.final_url,
            confirmed_by: submitted.confirmed_by,
            cookies_transferred: bridged.cookies_transferred,
            failed_cookies: bridged.failed_cookies,
            bearer_forwarded: bridged.bearer_forwarded,
        })
    }
}
