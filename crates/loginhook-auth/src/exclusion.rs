//! Navigation veto for URLs that would end the authenticated session.
//!
//! Patterns are compiled once and never change afterwards, so
//! [`ExclusionFilter::should_visit`] needs no locking and can be called from
//! every crawler worker at once.

use loginhook_core::{AuthConfig, ConfigError, ConfigResult};
use regex::{Regex, RegexSet};

/// Logout and sign-off path keywords, in several languages.
pub const DEFAULT_LOGOUT_PATTERN: &str = concat!(
    r"(?i)(log[-_ ]?out|log[-_ ]?off|sign[-_ ]?out|sign[-_ ]?off|end[-_]?session",
    r"|abmelden|ausloggen|d[eé]connexion|deconnecter|se[-_]?d[eé]connecter",
    r"|cerrar[-_]?sesi[oó]n|desconectar|uitloggen|afmelden|disconnetti",
    r"|wyloguj|odhl[aá]sit|logga[-_]?ut|kirjaudu[-_]?ulos",
    r"|выход|выйти|ログアウト|退出|注销|로그아웃)"
);

/// Compiled set of exclusion patterns.
///
/// A URL is blocked when any pattern matches anywhere in it.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    set: RegexSet,
    patterns: Vec<String>,
}

impl ExclusionFilter {
    /// Compile user patterns together with [`DEFAULT_LOGOUT_PATTERN`].
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPattern`] naming the first pattern that
    /// does not compile.
    pub fn new<I, S>(user_patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for pattern in user_patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            patterns.push(pattern.to_string());
        }
        patterns.push(DEFAULT_LOGOUT_PATTERN.to_string());

        let set = RegexSet::new(&patterns).map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns.join(","),
            reason: e.to_string(),
        })?;

        Ok(Self { set, patterns })
    }

    /// Build the filter from the configured `auth.exclude` patterns.
    pub fn from_config(config: &AuthConfig) -> ConfigResult<Self> {
        Self::new(config.exclude_patterns())
    }

    /// Whether the crawler may visit `url`.
    #[must_use]
    pub fn should_visit(&self, url: &str) -> bool {
        if self.set.is_match(url) {
            tracing::debug!("Excluding {} to protect the authenticated session", url);
            false
        } else {
            true
        }
    }

    /// Patterns matching `url`.
    #[must_use]
    pub fn matching_patterns(&self, url: &str) -> Vec<&str> {
        self.set
            .matches(url)
            .into_iter()
            .map(|i| self.patterns[i].as_str())
            .collect()
    }

    /// All patterns in evaluation order, the built-in default last.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
