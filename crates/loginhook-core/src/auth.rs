//! Login configuration parsed from the hosting engine's `auth.*` parameters.
//!
//! | Option | Effect |
//! |---|---|
//! | `auth.auto` | Discover username/password/submit fields automatically |
//! | `auth.loginurl` | Required. URL of the login page |
//! | `auth.username`, `auth.password` | Required credentials |
//! | `auth.username_field`, `auth.password_field`, `auth.submit_field` | Explicit field name or id |
//! | `auth.first_submit_field` | Intermediate submit control of a two-step login |
//! | `auth.exclude` | Comma-separated regexes; matching URLs are never visited after login |
//!
//! Keys are also accepted with an underscore after `auth` (`auth_loginurl`), and
//! the older `auth.usernamefield` / `auth.passwordfield` / `auth.submitfield`
//! spellings are aliases.

use crate::error::{ConfigError, ConfigResult};
use crate::types::FieldRef;
use regex::Regex;
use std::fmt;
use url::Url;
use zeroize::Zeroizing;

/// Immutable login configuration for one scan run.
#[derive(Clone)]
pub struct AuthConfig {
    login_url: Url,
    username: String,
    password: Zeroizing<String>,
    auto_discovery: bool,
    username_field: Option<FieldRef>,
    password_field: Option<FieldRef>,
    submit_field: Option<FieldRef>,
    first_submit_field: Option<FieldRef>,
    exclude: Vec<String>,
}

#[derive(Default)]
struct RawParams {
    login_url: Option<String>,
    username: Option<String>,
    password: Option<Zeroizing<String>>,
    auto: Option<String>,
    username_field: Option<String>,
    password_field: Option<String>,
    submit_field: Option<String>,
    first_submit_field: Option<String>,
    exclude: Option<String>,
}

impl AuthConfig {
    /// Parse and validate configuration from key/value parameters.
    ///
    /// Keys outside the `auth` namespace are ignored silently; unknown `auth`
    /// keys are logged and ignored.
    ///
    /// # Errors
    /// Returns error if a required option is missing, the login URL is not an
    /// absolute http(s) URL, no field strategy is usable, or an exclusion
    /// pattern does not compile.
    pub fn from_params<I, K, V>(params: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawParams::default();

        for (key, value) in params {
            let key = key.as_ref().trim().trim_start_matches("--");
            let value = value.as_ref();
            let Some(option) = key
                .strip_prefix("auth.")
                .or_else(|| key.strip_prefix("auth_"))
            else {
                continue;
            };

            match option.to_ascii_lowercase().as_str() {
                "loginurl" | "login_url" => raw.login_url = Some(value.trim().to_string()),
                "username" => raw.username = Some(value.to_string()),
                "password" => raw.password = Some(Zeroizing::new(value.to_string())),
                "auto" => raw.auto = Some(value.trim().to_string()),
                "username_field" | "usernamefield" => {
                    raw.username_field = Some(value.to_string());
                }
                "password_field" | "passwordfield" => {
                    raw.password_field = Some(value.to_string());
                }
                "submit_field" | "submitfield" => raw.submit_field = Some(value.to_string()),
                "first_submit_field" | "firstsubmitfield" => {
                    raw.first_submit_field = Some(value.to_string());
                }
                "exclude" => raw.exclude = Some(value.to_string()),
                other => tracing::warn!("Ignoring unknown option auth.{}", other),
            }
        }

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawParams) -> ConfigResult<Self> {
        let login_url = raw.login_url.ok_or_else(|| missing("auth.loginurl"))?;
        let login_url = parse_login_url(&login_url)?;

        let username = raw
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| missing("auth.username"))?;
        let password = raw
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| missing("auth.password"))?;

        let auto_discovery = match raw.auto.as_deref() {
            None => false,
            Some(value) => parse_flag("auth.auto", value)?,
        };

        let username_field = optional_field(raw.username_field)?;
        let password_field = optional_field(raw.password_field)?;
        let submit_field = optional_field(raw.submit_field)?;
        let first_submit_field = optional_field(raw.first_submit_field)?;

        let explicit_complete =
            username_field.is_some() && password_field.is_some() && submit_field.is_some();
        if !auto_discovery && !explicit_complete {
            return Err(ConfigError::NoFieldStrategy);
        }

        let exclude = raw
            .exclude
            .as_deref()
            .map(split_patterns)
            .unwrap_or_default();
        for pattern in &exclude {
            validate_pattern(pattern)?;
        }

        Ok(Self {
            login_url,
            username,
            password,
            auto_discovery,
            username_field,
            password_field,
            submit_field,
            first_submit_field,
            exclude,
        })
    }

    /// URL of the login page.
    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Login user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether login fields may be discovered heuristically.
    #[must_use]
    pub fn auto_discovery(&self) -> bool {
        self.auto_discovery
    }

    /// Explicit username field identifier.
    #[must_use]
    pub fn username_field(&self) -> Option<&FieldRef> {
        self.username_field.as_ref()
    }

    /// Explicit password field identifier.
    #[must_use]
    pub fn password_field(&self) -> Option<&FieldRef> {
        self.password_field.as_ref()
    }

    /// Explicit submit control identifier.
    #[must_use]
    pub fn submit_field(&self) -> Option<&FieldRef> {
        self.submit_field.as_ref()
    }

    /// Intermediate submit control of a two-step login.
    #[must_use]
    pub fn first_submit_field(&self) -> Option<&FieldRef> {
        self.first_submit_field.as_ref()
    }

    /// Whether the login is configured as username-then-password across two pages.
    #[must_use]
    pub fn is_two_step(&self) -> bool {
        self.first_submit_field.is_some()
    }

    /// User-supplied exclusion patterns, already validated.
    #[must_use]
    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("login_url", &self.login_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auto_discovery", &self.auto_discovery)
            .field("username_field", &self.username_field)
            .field("password_field", &self.password_field)
            .field("submit_field", &self.submit_field)
            .field("first_submit_field", &self.first_submit_field)
            .field("exclude", &self.exclude)
            .finish()
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingOption {
        key: key.to_string(),
    }
}

fn parse_login_url(value: &str) -> ConfigResult<Url> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: "auth.loginurl".to_string(),
        reason: format!("'{value}' is not a valid URL: {e}"),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            field: "auth.loginurl".to_string(),
            reason: format!("'{value}' must be an absolute http(s) URL"),
        });
    }
    Ok(url)
}

fn parse_flag(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        // A bare `auth.auto` switch arrives with an empty value
        "" | "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn optional_field(value: Option<String>) -> ConfigResult<Option<FieldRef>> {
    match value {
        Some(v) if !v.trim().is_empty() => FieldRef::new(v).map(Some),
        _ => Ok(None),
    }
}

fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_pattern(pattern: &str) -> ConfigResult<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("auth.loginurl", "https://example.com/login"),
            ("auth.username", "alice"),
            ("auth.password", "s3cret"),
        ]
    }

    #[test]
    fn test_auto_discovery_config() {
        let mut params = base();
        params.push(("auth.auto", "true"));

        let config = AuthConfig::from_params(params).expect("valid config");
        assert!(config.auto_discovery());
        assert_eq!(config.login_url().as_str(), "https://example.com/login");
        assert_eq!(config.username(), "alice");
        assert_eq!(config.password(), "s3cret");
        assert!(!config.is_two_step());
        assert!(config.exclude_patterns().is_empty());
    }

    #[test]
    fn test_explicit_fields_config() {
        let mut params = base();
        params.extend([
            ("auth.username_field", "user"),
            ("auth.password_field", "pass"),
            ("auth.submit_field", "login-btn"),
        ]);

        let config = AuthConfig::from_params(params).expect("valid config");
        assert!(!config.auto_discovery());
        assert_eq!(config.username_field().map(FieldRef::as_str), Some("user"));
        assert_eq!(config.password_field().map(FieldRef::as_str), Some("pass"));
        assert_eq!(config.submit_field().map(FieldRef::as_str), Some("login-btn"));
    }

    #[test]
    fn test_legacy_key_spellings() {
        let params = vec![
            ("--auth_loginurl", "https://example.com/login"),
            ("auth_username", "alice"),
            ("auth_password", "s3cret"),
            ("auth.usernamefield", "user"),
            ("auth.passwordfield", "pass"),
            ("auth.submitfield", "go"),
        ];

        let config = AuthConfig::from_params(params).expect("valid config");
        assert_eq!(config.submit_field().map(FieldRef::as_str), Some("go"));
    }

    #[test]
    fn test_bare_auto_flag_means_true() {
        let mut params = base();
        params.push(("auth.auto", ""));
        assert!(AuthConfig::from_params(params)
            .expect("valid config")
            .auto_discovery());
    }

    #[test]
    fn test_invalid_auto_flag() {
        let mut params = base();
        params.push(("auth.auto", "maybe"));
        let err = AuthConfig::from_params(params).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_login_url() {
        let params = vec![
            ("auth.username", "alice"),
            ("auth.password", "s3cret"),
            ("auth.auto", "true"),
        ];
        let err = AuthConfig::from_params(params).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption { key } if key == "auth.loginurl"));
    }

    #[test]
    fn test_missing_password() {
        let params = vec![
            ("auth.loginurl", "https://example.com/login"),
            ("auth.username", "alice"),
            ("auth.auto", "true"),
        ];
        let err = AuthConfig::from_params(params).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption { key } if key == "auth.password"));
    }

    #[test]
    fn test_relative_login_url_rejected() {
        let params = vec![
            ("auth.loginurl", "/login"),
            ("auth.username", "alice"),
            ("auth.password", "s3cret"),
            ("auth.auto", "true"),
        ];
        assert!(AuthConfig::from_params(params).is_err());
    }

    #[test]
    fn test_incomplete_explicit_fields_without_auto_rejected() {
        let mut params = base();
        params.extend([("auth.username_field", "user"), ("auth.password_field", "pass")]);
        let err = AuthConfig::from_params(params).unwrap_err();
        assert!(matches!(err, ConfigError::NoFieldStrategy));
    }

    #[test]
    fn test_no_field_strategy_rejected() {
        let err = AuthConfig::from_params(base()).unwrap_err();
        assert!(matches!(err, ConfigError::NoFieldStrategy));
    }

    #[test]
    fn test_partial_fields_with_auto_accepted() {
        let mut params = base();
        params.extend([("auth.auto", "true"), ("auth.first_submit_field", "next")]);
        let config = AuthConfig::from_params(params).expect("valid config");
        assert!(config.is_two_step());
        assert!(config.username_field().is_none());
    }

    #[test]
    fn test_exclude_patterns_split_and_trimmed() {
        let mut params = base();
        params.extend([
            ("auth.auto", "true"),
            ("auth.exclude", ".*logout.*, .*signout.* ,,"),
        ]);
        let config = AuthConfig::from_params(params).expect("valid config");
        assert_eq!(config.exclude_patterns(), &[".*logout.*", ".*signout.*"]);
    }

    #[test]
    fn test_malformed_exclude_pattern_rejected() {
        let mut params = base();
        params.extend([("auth.auto", "true"), ("auth.exclude", "(unbalanced")]);
        let err = AuthConfig::from_params(params).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { pattern, .. } if pattern == "(unbalanced"));
    }

    #[test]
    fn test_unknown_and_foreign_keys_ignored() {
        let mut params = base();
        params.extend([
            ("auth.auto", "true"),
            ("auth.colour", "blue"),
            ("spider.maxduration", "5"),
        ]);
        assert!(AuthConfig::from_params(params).is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut params = base();
        params.push(("auth.auto", "true"));
        let config = AuthConfig::from_params(params).expect("valid config");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
