//! Transplanting the browser's authenticated session into the engine.
//!
//! Cookies are copied as plain name/value/domain/path records. `HttpOnly`,
//! `Secure` and `SameSite` are not carried over, so an engine that reports
//! on cookie flags will see them missing on the bridged session. Those
//! findings are artefacts of the transfer.
//!
//! A cookie the engine refuses is logged and skipped; the rest still go
//! through. A partially authenticated session is preferable to none.

use crate::engine::SessionSink;
use crate::error::BridgeError;
use loginhook_browser::BrowserActions;
use loginhook_core::{SiteRoot, StorageEntry};
use regex::Regex;
use std::sync::OnceLock;

/// What was copied into the engine session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeResult {
    /// Cookies written to the engine session
    pub cookies_transferred: usize,
    /// Names of cookies the engine refused
    pub failed_cookies: Vec<String>,
    /// Whether a script-visible token was forwarded as a bearer header
    pub bearer_forwarded: bool,
}

impl BridgeResult {
    /// Whether some cookies could not be transferred.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed_cookies.is_empty()
    }
}

/// Copy the browser's cookies (and a bearer token from web storage, if one
/// is present) into the engine session for `site`.
///
/// Fails only if the engine session cannot be opened or the cookie jar
/// cannot be read. Individual cookie failures are reported in the result.
pub async fn bridge(
    browser: &dyn BrowserActions,
    sink: &dyn SessionSink,
    site: &SiteRoot,
) -> Result<BridgeResult, BridgeError> {
    sink.open_session(site).await?;

    let cookies = browser.cookies().await?;
    tracing::debug!("Bridging {} cookies into engine session for {}", cookies.len(), site);

    let mut result = BridgeResult::default();
    for cookie in &cookies {
        match sink.set_cookie(site, cookie).await {
            Ok(()) => result.cookies_transferred += 1,
            Err(e) => {
                tracing::warn!(
                    "Skipping cookie {} ({}{}): {}",
                    cookie.name,
                    cookie.domain,
                    cookie.path,
                    e
                );
                result.failed_cookies.push(cookie.name.clone());
            }
        }
    }

    match browser.storage_entries().await {
        Ok(entries) => {
            if let Some(token) = find_bearer_token(&entries) {
                match sink
                    .set_header(site, "Authorization", &format!("Bearer {token}"))
                    .await
                {
                    Ok(()) => result.bearer_forwarded = true,
                    Err(e) => tracing::warn!("Could not forward storage token: {}", e),
                }
            }
        }
        Err(e) => tracing::warn!("Could not read web storage: {}", e),
    }

    if result.is_partial() {
        tracing::warn!(
            "Session bridged partially: {} of {} cookies transferred",
            result.cookies_transferred,
            cookies.len()
        );
    }
    Ok(result)
}

/// Pick the first storage entry that holds an auth token.
///
/// A plain value is accepted only when it is JWT-shaped and stored under a
/// token-like key (`token`, `jwt`, `bearer`). A JSON object stored under an
/// auth or session key is searched for the usual token members, and those
/// members are taken as they are.
#[must_use]
pub fn find_bearer_token(entries: &[StorageEntry]) -> Option<String> {
    entries.iter().find_map(|entry| {
        let value = entry.value.trim();
        if value.starts_with('{') {
            if token_keys().object.is_match(&entry.key) {
                token_member(value)
            } else {
                None
            }
        } else if token_keys().plain.is_match(&entry.key) {
            jwt_shaped(value.trim_matches('"'))
        } else {
            None
        }
    })
}

struct TokenKeys {
    plain: Regex,
    object: Regex,
    jwt: Regex,
}

fn token_keys() -> &'static TokenKeys {
    static KEYS: OnceLock<TokenKeys> = OnceLock::new();
    KEYS.get_or_init(|| TokenKeys {
        plain: Regex::new(r"(?i)(token|jwt|bearer)").expect("valid regex"),
        object: Regex::new(r"(?i)(token|jwt|bearer|auth|session)").expect("valid regex"),
        jwt: Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$").expect("valid regex"),
    })
}

fn jwt_shaped(value: &str) -> Option<String> {
    token_keys().jwt.is_match(value).then(|| value.to_string())
}

fn token_member(value: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(value).ok()?;
    ["access_token", "accessToken", "id_token", "idToken", "token"]
        .iter()
        .filter_map(|member| json.get(member).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .find(|token| !token.is_empty() && !token.chars().any(char::is_whitespace))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, RecordingEngine};
    use loginhook_core::SessionCookie;

    fn site() -> SiteRoot {
        SiteRoot::from_target("https://d.example/").expect("valid site")
    }

    fn entry(key: &str, value: &str) -> StorageEntry {
        StorageEntry {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bridge_transfers_all_cookies() {
        let browser = MockBrowser::new()
            .with_cookie(SessionCookie::new("A", "1", "d.example"))
            .with_cookie(SessionCookie::new("B", "2", "d.example"));
        let engine = RecordingEngine::new();

        let result = bridge(&browser, &engine, &site()).await.expect("bridge");

        assert_eq!(result.cookies_transferred, 2);
        assert!(!result.is_partial());
        let triples: Vec<_> = engine
            .cookies()
            .into_iter()
            .map(|c| (c.name, c.value, c.domain))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("A".to_string(), "1".to_string(), "d.example".to_string()),
                ("B".to_string(), "2".to_string(), "d.example".to_string()),
            ]
        );
        assert_eq!(engine.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn test_bridge_empty_jar() {
        let browser = MockBrowser::new();
        let engine = RecordingEngine::new();

        let result = bridge(&browser, &engine, &site()).await.expect("bridge");
        assert_eq!(result.cookies_transferred, 0);
        assert!(engine.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_bridge_skips_rejected_cookie() {
        let browser = MockBrowser::new()
            .with_cookie(SessionCookie::new("A", "1", "d.example"))
            .with_cookie(SessionCookie::new("bad", "x", "d.example"))
            .with_cookie(SessionCookie::new("C", "3", "d.example"));
        let engine = RecordingEngine::new().reject_cookie("bad");

        let result = bridge(&browser, &engine, &site()).await.expect("bridge");
        assert_eq!(result.cookies_transferred, 2);
        assert_eq!(result.failed_cookies, vec!["bad".to_string()]);
        assert!(result.is_partial());
        assert_eq!(engine.cookies().len(), 2);
    }

    #[tokio::test]
    async fn test_bridge_overwrites_existing_cookie() {
        let engine = RecordingEngine::new();
        let stale = MockBrowser::new().with_cookie(SessionCookie::new("sid", "old", "d.example"));
        bridge(&stale, &engine, &site()).await.expect("bridge");

        let fresh = MockBrowser::new().with_cookie(SessionCookie::new("sid", "new", "d.example"));
        bridge(&fresh, &engine, &site()).await.expect("bridge");

        let cookies = engine.cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "new");
    }

    #[tokio::test]
    async fn test_bridge_forwards_storage_token() {
        let browser = MockBrowser::new()
            .with_storage("theme", "dark")
            .with_storage("auth_token", "eyJhbGciOi.payload.sig");
        let engine = RecordingEngine::new();

        let result = bridge(&browser, &engine, &site()).await.expect("bridge");
        assert!(result.bearer_forwarded);
        assert_eq!(
            engine.headers(),
            vec![(
                "Authorization".to_string(),
                "Bearer eyJhbGciOi.payload.sig".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_bridge_fails_when_session_cannot_open() {
        let browser = MockBrowser::new().with_cookie(SessionCookie::new("A", "1", "d.example"));
        let engine = RecordingEngine::new().reject_sessions();

        let err = bridge(&browser, &engine, &site()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Engine(_)));
        assert!(engine.cookies().is_empty());
    }

    #[test]
    fn test_find_bearer_token() {
        assert_eq!(find_bearer_token(&[]), None);
        assert_eq!(find_bearer_token(&[entry("theme", "dark")]), None);
        assert_eq!(find_bearer_token(&[entry("sessionActive", "true")]), None);
        assert_eq!(find_bearer_token(&[entry("authRedirect", "/dashboard")]), None);
        assert_eq!(find_bearer_token(&[entry("sessionTheme", "dark")]), None);
        // token-like key, but not a JWT
        assert_eq!(find_bearer_token(&[entry("csrfToken", "a1b2c3d4")]), None);
        assert_eq!(
            find_bearer_token(&[entry("jwt", "\"abc.def.ghi\"")]),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn test_find_bearer_token_skips_to_first_usable_entry() {
        let entries = [
            entry("authRedirect", "/dashboard"),
            entry("token", "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.sig_-"),
        ];
        assert_eq!(
            find_bearer_token(&entries),
            Some("eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.sig_-".to_string())
        );
    }

    #[tokio::test]
    async fn test_bridge_sends_no_header_for_plain_storage() {
        let browser = MockBrowser::new()
            .with_cookie(SessionCookie::new("sid", "1", "d.example"))
            .with_storage("authRedirect", "/dashboard")
            .with_storage("sessionTheme", "dark");
        let engine = RecordingEngine::new();

        let result = bridge(&browser, &engine, &site()).await.expect("bridge");
        assert!(!result.bearer_forwarded);
        assert!(engine.headers().is_empty());
    }

    #[test]
    fn test_find_bearer_token_in_json_value() {
        let entries = [entry(
            "oidc.user:https://idp:app",
            r#"{"profile":{},"access_token":"at-123","token_type":"Bearer"}"#,
        )];
        // key does not mention a token, so it is not considered
        assert_eq!(find_bearer_token(&entries), None);

        let entries = [entry(
            "auth",
            r#"{"profile":{},"access_token":"at-123","token_type":"Bearer"}"#,
        )];
        assert_eq!(find_bearer_token(&entries), Some("at-123".to_string()));
    }
}
