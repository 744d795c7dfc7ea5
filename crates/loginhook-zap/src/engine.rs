//! [`SessionSink`] and [`NavigationInterceptor`] backed by a running ZAP.
//!
//! ZAP keys HTTP sessions by `host:port` and session tokens by cookie name,
//! so a cookie's domain and path are not forwarded. Exclusions become
//! context exclusions, which ZAP matches against the whole URL.

use crate::client::ZapClient;
use crate::error::{Result, ZapError};
use async_trait::async_trait;
use loginhook_auth::{EngineError, ExclusionFilter, NavigationInterceptor, SessionSink};
use loginhook_core::{SessionCookie, SiteRoot, ZapSettings};
use std::sync::{Arc, RwLock};

const HEADER_RULE_PREFIX: &str = "loginhook";

/// ZAP-backed scanning engine.
#[derive(Debug)]
pub struct ZapEngine {
    client: ZapClient,
    session_name: String,
    context_name: String,
    filter: RwLock<Option<Arc<ExclusionFilter>>>,
}

impl ZapEngine {
    /// Connect to the ZAP instance described by `settings`.
    pub fn new(settings: &ZapSettings) -> Result<Self> {
        Ok(Self::with_client(
            ZapClient::new(settings)?,
            &settings.session_name,
            &settings.context_name,
        ))
    }

    /// Use an existing client.
    #[must_use]
    pub fn with_client(client: ZapClient, session_name: &str, context_name: &str) -> Self {
        Self {
            client,
            session_name: session_name.to_string(),
            context_name: context_name.to_string(),
            filter: RwLock::new(None),
        }
    }

    /// The underlying API client.
    #[must_use]
    pub fn client(&self) -> &ZapClient {
        &self.client
    }

    /// Filter registered for the running scan, if any.
    #[must_use]
    pub fn exclusion_filter(&self) -> Option<Arc<ExclusionFilter>> {
        self.filter.read().ok().and_then(|guard| guard.clone())
    }

    /// Whether the crawler may visit `url`. Everything is allowed until a
    /// filter has been registered.
    #[must_use]
    pub fn should_visit(&self, url: &str) -> bool {
        self.exclusion_filter()
            .map_or(true, |filter| filter.should_visit(url))
    }

    async fn create_session(&self, site: &str) -> Result<()> {
        let params = [("site", site), ("session", self.session_name.as_str())];
        match self.client.action("httpSessions", "createEmptySession", &params).await {
            Err(e) if e.is_already_exists() => {
                tracing::debug!("ZAP session {} already exists for {}", self.session_name, site);
            }
            other => other?,
        }
        self.client
            .action("httpSessions", "setActiveSession", &params)
            .await
    }

    async fn create_context(&self) -> Result<()> {
        match self
            .client
            .action_value("context", "newContext", &[("contextName", self.context_name.as_str())])
            .await
        {
            Ok(body) => {
                tracing::debug!("Created ZAP context {}: {}", self.context_name, body);
                Ok(())
            }
            Err(e) if e.is_already_exists() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn context_action(&self, name: &str, regex: &str) -> Result<()> {
        self.client
            .action(
                "context",
                name,
                &[("contextName", self.context_name.as_str()), ("regex", regex)],
            )
            .await
    }
}

/// Turn an unanchored exclusion pattern into one ZAP can match against the
/// whole URL.
#[must_use]
pub fn context_exclusion(pattern: &str) -> String {
    format!(".*(?:{pattern}).*")
}

/// Regex covering every URL under `site`.
#[must_use]
pub fn context_inclusion(site: &SiteRoot) -> String {
    format!("{}.*", regex::escape(site.as_str()))
}

#[async_trait]
impl SessionSink for ZapEngine {
    async fn open_session(&self, site: &SiteRoot) -> std::result::Result<(), EngineError> {
        let site = site.host_port();
        self.create_session(&site).await?;
        tracing::info!("Active ZAP session for {} is {}", site, self.session_name);
        Ok(())
    }

    async fn set_cookie(
        &self,
        site: &SiteRoot,
        cookie: &SessionCookie,
    ) -> std::result::Result<(), EngineError> {
        let site = site.host_port();
        match self
            .client
            .action(
                "httpSessions",
                "addSessionToken",
                &[("site", site.as_str()), ("sessionToken", cookie.name.as_str())],
            )
            .await
        {
            Err(e) if !e.is_already_exists() => return Err(e.into()),
            _ => {}
        }

        self.client
            .action(
                "httpSessions",
                "setSessionTokenValue",
                &[
                    ("site", site.as_str()),
                    ("session", self.session_name.as_str()),
                    ("sessionToken", cookie.name.as_str()),
                    ("tokenValue", cookie.value.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn set_header(
        &self,
        site: &SiteRoot,
        name: &str,
        value: &str,
    ) -> std::result::Result<(), EngineError> {
        let description = format!("{HEADER_RULE_PREFIX} {name} {}", site.host_port());
        // A rule left over from an earlier run would otherwise block the new one
        if let Err(e) = self
            .client
            .action("replacer", "removeRule", &[("description", description.as_str())])
            .await
        {
            tracing::debug!("No previous replacer rule {}: {}", description, e);
        }

        let url_pattern = context_inclusion(site);
        self.client
            .action(
                "replacer",
                "addRule",
                &[
                    ("description", description.as_str()),
                    ("enabled", "true"),
                    ("matchType", "REQ_HEADER"),
                    ("matchRegex", "false"),
                    ("matchString", name),
                    ("replacement", value),
                    ("url", url_pattern.as_str()),
                ],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NavigationInterceptor for ZapEngine {
    async fn register(
        &self,
        site: &SiteRoot,
        filter: Arc<ExclusionFilter>,
    ) -> std::result::Result<(), EngineError> {
        self.create_context().await?;
        self.context_action("includeInContext", &context_inclusion(site))
            .await?;
        for pattern in filter.patterns() {
            self.context_action("excludeFromContext", &context_exclusion(pattern))
                .await?;
        }
        self.client
            .action(
                "context",
                "setContextInScope",
                &[("contextName", self.context_name.as_str()), ("booleanInScope", "true")],
            )
            .await?;

        tracing::info!(
            "Registered {} exclusions in ZAP context {}",
            filter.patterns().len(),
            self.context_name
        );
        *self
            .filter
            .write()
            .map_err(|_| ZapError::UnexpectedResponse("filter lock poisoned".to_string()))? =
            Some(filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_context_exclusion_matches_whole_url() {
        let wrapped = Regex::new(&format!("^{}$", context_exclusion("/logout"))).expect("valid");
        assert!(wrapped.is_match("https://site/app/logout?next=/"));
        assert!(!wrapped.is_match("https://site/app/profile"));
    }

    #[test]
    fn test_context_inclusion_escapes_root() {
        let site = SiteRoot::from_target("https://shop.example:8443/a/b").expect("valid");
        assert_eq!(context_inclusion(&site), r"https://shop\.example:8443/.*");
    }

    #[test]
    fn test_should_visit_before_registration() {
        let engine = ZapEngine::new(&ZapSettings::default()).expect("valid settings");
        assert!(engine.exclusion_filter().is_none());
        assert!(engine.should_visit("https://site/logout"));
    }
}
