//! Scanning-engine collaborators.
//!
//! The hook writes the authenticated session into the engine once through a
//! [`SessionSink`], and hands the exclusion filter to the engine's
//! [`NavigationInterceptor`] for the rest of the scan.

use crate::exclusion::ExclusionFilter;
use async_trait::async_trait;
use loginhook_core::{SessionCookie, SiteRoot};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by the scanning engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine understood the request and refused it
    #[error("engine rejected request: {0}")]
    Rejected(String),

    /// The engine could not be reached
    #[error("engine unreachable: {0}")]
    Transport(String),
}

/// The engine's HTTP session for a site.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Prepare an empty session for `site` and make it the active one.
    async fn open_session(&self, site: &SiteRoot) -> Result<(), EngineError> {
        let _ = site;
        Ok(())
    }

    /// Write a cookie, replacing any cookie of the same name already present.
    async fn set_cookie(&self, site: &SiteRoot, cookie: &SessionCookie) -> Result<(), EngineError>;

    /// Add a header to every request the engine sends to `site`.
    async fn set_header(&self, site: &SiteRoot, name: &str, value: &str)
        -> Result<(), EngineError>;
}

/// The engine's hook for vetoing navigations during the crawl.
#[async_trait]
pub trait NavigationInterceptor: Send + Sync {
    /// Install `filter` for every URL the engine is about to visit under `site`.
    async fn register(
        &self,
        site: &SiteRoot,
        filter: Arc<ExclusionFilter>,
    ) -> Result<(), EngineError>;
}
