//! Credential submission through a live browser session.
//!
//! The transaction is a linear sequence of bounded waits:
//!
//! 1. navigate to the login URL and let the page settle
//! 2. resolve the login controls for the page. Without a configured first
//!    submit control, a page that still shows no password field when the
//!    settle timeout runs out is taken as the first of two steps
//! 3. two-step: fill the username, activate the first submit control, let
//!    the page settle, resolve again and fill the password
//! 4. single-step: fill username and password together
//! 5. activate the submit control and let the page settle
//! 6. poll the [`SuccessSignals`] until one fires or the settle timeout ends
//!
//! Page reads are polled until they succeed; actions are never retried.
//! Every wait is bounded by [`SubmitTimings`].

use crate::error::SubmissionError;
use crate::fields::{FieldResolver, FieldSet, LoginStep};
use crate::locator;
use crate::signals::{PageState, SuccessSignals};
use loginhook_browser::{BrowserActions, ElementInfo};
use loginhook_core::{AuthConfig, BrowserSettings};
use std::time::Duration;
use tokio::time::Instant;

/// Bounds on the waits of one login transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTimings {
    /// Upper bound for each settle wait, field resolution and confirmation
    pub settle_timeout: Duration,
    /// Delay between page-state polls
    pub poll_interval: Duration,
}

impl Default for SubmitTimings {
    fn default() -> Self {
        Self::from(&BrowserSettings::default())
    }
}

impl From<&BrowserSettings> for SubmitTimings {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            settle_timeout: settings.settle_timeout(),
            poll_interval: settings.poll_interval(),
        }
    }
}

/// Outcome of a confirmed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// URL the browser ended up on
    pub final_url: String,
    /// Name of the success signal that confirmed the login
    pub confirmed_by: &'static str,
    /// Whether the login went through a separate username page
    pub two_step: bool,
}

/// Drives a browser through the login form.
#[derive(Debug)]
pub struct CredentialSubmitter<'a> {
    config: &'a AuthConfig,
    resolver: FieldResolver<'a>,
    signals: &'a SuccessSignals,
    timings: SubmitTimings,
}

impl<'a> CredentialSubmitter<'a> {
    /// Create a submitter for the given configuration.
    #[must_use]
    pub fn new(config: &'a AuthConfig, signals: &'a SuccessSignals, timings: SubmitTimings) -> Self {
        Self {
            config,
            resolver: FieldResolver::new(config),
            signals,
            timings,
        }
    }

    /// Run the login transaction to completion.
    pub async fn submit(
        &self,
        browser: &dyn BrowserActions,
    ) -> Result<SubmissionResult, SubmissionError> {
        let login_url = self.config.login_url().as_str();
        tracing::debug!("Opening login page {}", login_url);
        browser.navigate(login_url).await?;
        self.settle(browser, "login page load").await?;

        let (step, fields) = self.resolve_login_page(browser).await?;
        let two_step = step == LoginStep::Username;

        let password_field = if two_step {
            self.submit_two_step(browser, fields).await?
        } else {
            self.submit_single_step(browser, fields).await?
        };

        self.settle(browser, "post-submit navigation").await?;
        let (final_url, confirmed_by) = self.confirm(browser, &password_field).await?;

        tracing::info!("Login confirmed by {} at {}", confirmed_by, final_url);
        Ok(SubmissionResult {
            final_url,
            confirmed_by,
            two_step,
        })
    }

    // A configured first submit control means two steps. Otherwise the page
    // is polled for a complete single-step form, and only once the deadline
    // passes without one is a username-only page taken as the first of two.
    async fn resolve_login_page(
        &self,
        browser: &dyn BrowserActions,
    ) -> Result<(LoginStep, FieldSet), SubmissionError> {
        if self.config.is_two_step() {
            let fields = self.resolve(browser, LoginStep::Username).await?;
            return Ok((LoginStep::Username, fields));
        }

        let deadline = Instant::now() + self.timings.settle_timeout;
        loop {
            let Some(elements) = self.poll_elements(browser, deadline).await? else {
                continue;
            };
            let err = match self.resolver.resolve(LoginStep::Single, &elements) {
                Ok(fields) => return Ok((LoginStep::Single, fields)),
                Err(e) => e,
            };

            if Instant::now() >= deadline {
                if self.config.auto_discovery() && locator::looks_like_first_step(&elements) {
                    if let Ok(fields) = self.resolver.resolve(LoginStep::Username, &elements) {
                        tracing::debug!("No password field on login page, treating as two-step login");
                        return Ok((LoginStep::Username, fields));
                    }
                }
                return Err(err);
            }
            tokio::time::sleep(self.timings.poll_interval).await;
        }
    }

    async fn submit_single_step(
        &self,
        browser: &dyn BrowserActions,
        fields: FieldSet,
    ) -> Result<ElementInfo, SubmissionError> {
        let (username, password, submit) = (
            required(fields.username)?,
            required(fields.password)?,
            required(fields.submit)?,
        );

        tracing::debug!(
            "Filling {} / {}, submitting via {}",
            username.label(),
            password.label(),
            submit.label()
        );
        browser.fill(&username, self.config.username()).await?;
        browser.fill(&password, self.config.password()).await?;
        browser.click(&submit).await?;
        Ok(password)
    }

    async fn submit_two_step(
        &self,
        browser: &dyn BrowserActions,
        first: FieldSet,
    ) -> Result<ElementInfo, SubmissionError> {
        let (username, next) = (required(first.username)?, required(first.first_submit)?);

        tracing::debug!("Filling {}, advancing via {}", username.label(), next.label());
        browser.fill(&username, self.config.username()).await?;
        browser.click(&next).await?;
        self.settle(browser, "username step").await?;

        // The page changed; earlier element records are stale from here on
        let second = self.resolve(browser, LoginStep::Password).await?;
        let (password, submit) = (required(second.password)?, required(second.submit)?);

        tracing::debug!("Filling {}, submitting via {}", password.label(), submit.label());
        browser.fill(&password, self.config.password()).await?;
        browser.click(&submit).await?;
        Ok(password)
    }

    // Script-rendered forms may appear after the load event, so resolution is
    // retried until it succeeds or the settle timeout runs out.
    async fn resolve(
        &self,
        browser: &dyn BrowserActions,
        step: LoginStep,
    ) -> Result<FieldSet, SubmissionError> {
        let deadline = Instant::now() + self.timings.settle_timeout;
        loop {
            let Some(elements) = self.poll_elements(browser, deadline).await? else {
                continue;
            };
            match self.resolver.resolve(step, &elements) {
                Ok(fields) => return Ok(fields),
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(_) => tokio::time::sleep(self.timings.poll_interval).await,
            }
        }
    }

    // A listing can fail while a navigation is still committing. Before the
    // deadline that counts as a miss: wait one poll interval and report `None`.
    async fn poll_elements(
        &self,
        browser: &dyn BrowserActions,
        deadline: Instant,
    ) -> Result<Option<Vec<ElementInfo>>, SubmissionError> {
        match browser.interactive_elements().await {
            Ok(elements) => Ok(Some(elements)),
            Err(e) if Instant::now() < deadline => {
                tracing::debug!("Element listing failed, retrying: {}", e);
                tokio::time::sleep(self.timings.poll_interval).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn settle(&self, browser: &dyn BrowserActions, what: &str) -> Result<(), SubmissionError> {
        browser
            .wait_for_settle(self.timings.settle_timeout)
            .await
            .map_err(|e| match SubmissionError::from(e) {
                SubmissionError::Failed { reason, detail } => SubmissionError::Failed {
                    reason,
                    detail: format!("{what}: {detail}"),
                },
                other => other,
            })
    }

    async fn confirm(
        &self,
        browser: &dyn BrowserActions,
        password_field: &ElementInfo,
    ) -> Result<(String, &'static str), SubmissionError> {
        let deadline = Instant::now() + self.timings.settle_timeout;
        loop {
            let current_url = match browser.current_url().await {
                Ok(url) => url,
                Err(e) if Instant::now() < deadline => {
                    tracing::debug!("Reading page URL failed, retrying: {}", e);
                    tokio::time::sleep(self.timings.poll_interval).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(elements) = self.poll_elements(browser, deadline).await? else {
                continue;
            };
            let page = PageState {
                login_url: self.config.login_url(),
                current_url: &current_url,
                elements: &elements,
                password_field: Some(password_field),
            };

            if let Some(signal) = self.signals.first_match(&page) {
                return Ok((current_url, signal));
            }
            if Instant::now() >= deadline {
                return Err(SubmissionError::login_not_confirmed(format!(
                    "still on {current_url} with the password field present after {:?}",
                    self.timings.settle_timeout
                )));
            }
            tokio::time::sleep(self.timings.poll_interval).await;
        }
    }
}

// `resolve` has already checked the roles for the step.
fn required(element: Option<ElementInfo>) -> Result<ElementInfo, SubmissionError> {
    element.ok_or_else(|| SubmissionError::fields_not_found("control vanished during resolution"))
}
