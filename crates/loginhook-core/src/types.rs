//! Shared types used across the login hook.
//!
//! This module defines the small newtypes and value records passed between
//! the browser driver, the login state machine and the scanning engine.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Identifier of a form control, matched against its `name` or `id` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef(String);

impl FieldRef {
    /// Create a new `FieldRef`.
    ///
    /// # Errors
    /// Returns error if the identifier is empty or contains whitespace.
    pub fn new(id: impl Into<String>) -> ConfigResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "field identifier".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "field identifier".to_string(),
                reason: format!("'{id}' contains whitespace"),
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an element with the given `name` / `id` attributes is the one referenced.
    #[must_use]
    pub fn matches(&self, name: Option<&str>, id: Option<&str>) -> bool {
        name == Some(self.0.as_str()) || id == Some(self.0.as_str())
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheme + host (+ non-default port) root of a scan target, e.g. `https://example.com/`.
///
/// Scan targets are reset to their root so the whole host is crawled under the
/// authenticated session, whatever path the target was given with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteRoot {
    url: Url,
}

impl SiteRoot {
    /// Derive the site root from a scan target URL.
    ///
    /// # Errors
    /// Returns error if the target is not an absolute http(s) URL with a host.
    pub fn from_target(target: &str) -> ConfigResult<Self> {
        let parsed = Url::parse(target).map_err(|e| ConfigError::InvalidValue {
            field: "target".to_string(),
            reason: format!("'{target}' is not a valid URL: {e}"),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "target".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let host = parsed.host_str().ok_or_else(|| ConfigError::InvalidValue {
            field: "target".to_string(),
            reason: "no host in URL".to_string(),
        })?;

        let root = match parsed.port() {
            Some(port) => format!("{}://{host}:{port}/", parsed.scheme()),
            None => format!("{}://{host}/", parsed.scheme()),
        };

        let url = Url::parse(&root).map_err(|e| ConfigError::InvalidValue {
            field: "target".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { url })
    }

    /// The root URL, always ending in `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host name without port.
    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// `host:port` with the scheme's default port filled in, as HTTP-session APIs key sites.
    #[must_use]
    pub fn host_port(&self) -> String {
        let port = self.url.port_or_known_default().unwrap_or(80);
        format!("{}:{port}", self.host())
    }
}

impl fmt::Display for SiteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// A cookie as carried across from the browser into the engine session.
///
/// Only name, value, domain and path survive the transfer. `HttpOnly`,
/// `Secure` and `SameSite` are not reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain the cookie is scoped to
    pub domain: String,
    /// Path the cookie is scoped to
    pub path: String,
}

impl SessionCookie {
    /// Create a cookie with path `/`.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
        }
    }

    /// Set the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// A `localStorage` or `sessionStorage` entry visible to page scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    /// Storage key
    pub key: String,
    /// Stored value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ref_valid() {
        let field = FieldRef::new(" username ").expect("valid field ref");
        assert_eq!(field.as_str(), "username");
        assert!(field.matches(Some("username"), None));
        assert!(field.matches(None, Some("username")));
        assert!(!field.matches(Some("user"), Some("login")));
    }

    #[test]
    fn test_field_ref_invalid() {
        assert!(FieldRef::new("").is_err());
        assert!(FieldRef::new("   ").is_err());
        assert!(FieldRef::new("user name").is_err());
    }

    #[test]
    fn test_site_root_strips_path() {
        let root = SiteRoot::from_target("https://example.com/app/login?next=/").expect("root");
        assert_eq!(root.as_str(), "https://example.com/");
        assert_eq!(root.host(), "example.com");
        assert_eq!(root.host_port(), "example.com:443");
    }

    #[test]
    fn test_site_root_keeps_explicit_port() {
        let root = SiteRoot::from_target("http://localhost:8081/a/b").expect("root");
        assert_eq!(root.as_str(), "http://localhost:8081/");
        assert_eq!(root.host_port(), "localhost:8081");
    }

    #[test]
    fn test_site_root_rejects_non_http() {
        assert!(SiteRoot::from_target("ftp://example.com/").is_err());
        assert!(SiteRoot::from_target("not-a-url").is_err());
    }

    #[test]
    fn test_session_cookie_defaults_path() {
        let cookie = SessionCookie::new("sid", "abc", "example.com");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.with_path("/app").path, "/app");
    }
}
