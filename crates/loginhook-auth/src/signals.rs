//! Signals that a submitted login went through.
//!
//! Confirmation is a classification over the page state after submit. The
//! signals are evaluated in order and the first one that fires confirms the
//! login; any single signal is sufficient.
//!
//! The defaults are [`PasswordFieldGone`] and [`UrlChanged`]. Neither can
//! tell a successful login from a redirect to an error page that has no
//! password field; callers who need that distinction can push a stricter
//! signal in front with [`SuccessSignals::with_signal`] or start from
//! [`SuccessSignals::empty`].

use loginhook_browser::{ElementInfo, ElementKind};
use std::fmt;
use url::Url;

/// Page state observed after submitting credentials.
#[derive(Debug, Clone, Copy)]
pub struct PageState<'a> {
    /// Login URL from the configuration
    pub login_url: &'a Url,
    /// URL the browser is on now
    pub current_url: &'a str,
    /// Interactive elements of the current page
    pub elements: &'a [ElementInfo],
    /// The password input that was filled, as listed before submit
    pub password_field: Option<&'a ElementInfo>,
}

/// One heuristic for recognising a successful login.
pub trait SuccessSignal: Send + Sync {
    /// Short name used in logs and the handoff summary.
    fn name(&self) -> &'static str;

    /// Whether the page state indicates success.
    fn fires(&self, page: &PageState<'_>) -> bool;
}

/// The password input that was filled is no longer visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordFieldGone;

impl SuccessSignal for PasswordFieldGone {
    fn name(&self) -> &'static str {
        "password-field-gone"
    }

    fn fires(&self, page: &PageState<'_>) -> bool {
        let identifiable = page
            .password_field
            .filter(|p| p.name.is_some() || p.id.is_some());

        !page.elements.iter().any(|e| {
            e.visible
                && e.kind() == ElementKind::Password
                && identifiable.map_or(true, |p| e.same_control(p))
        })
    }
}

/// The browser is on a different URL than the login page.
///
/// Fragments and a trailing slash are ignored in the comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlChanged;

impl SuccessSignal for UrlChanged {
    fn name(&self) -> &'static str {
        "url-changed"
    }

    fn fires(&self, page: &PageState<'_>) -> bool {
        match Url::parse(page.current_url) {
            Ok(current) => normalize(&current) != normalize(page.login_url),
            Err(_) => page.current_url != page.login_url.as_str(),
        }
    }
}

fn normalize(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    let mut rendered = url.to_string();
    if rendered.ends_with('/') && url.query().is_none() {
        rendered.pop();
    }
    rendered
}

/// Ordered list of success signals.
pub struct SuccessSignals {
    signals: Vec<Box<dyn SuccessSignal>>,
}

impl SuccessSignals {
    /// No signals: nothing confirms a login until one is added.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// Append a signal, evaluated after the ones already present.
    #[must_use]
    pub fn with_signal(mut self, signal: impl SuccessSignal + 'static) -> Self {
        self.signals.push(Box::new(signal));
        self
    }

    /// Name of the first signal that fires, if any.
    #[must_use]
    pub fn first_match(&self, page: &PageState<'_>) -> Option<&'static str> {
        self.signals
            .iter()
            .find(|s| s.fires(page))
            .map(|s| s.name())
    }

    /// Number of signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether no signals are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl Default for SuccessSignals {
    fn default() -> Self {
        Self::empty()
            .with_signal(PasswordFieldGone)
            .with_signal(UrlChanged)
    }
}

impl fmt::Debug for SuccessSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.signals.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_url() -> Url {
        Url::parse("https://example.com/login").expect("valid url")
    }

    fn login_form() -> Vec<ElementInfo> {
        vec![
            ElementInfo::input(0, "text", "user"),
            ElementInfo::input(1, "password", "pass"),
            ElementInfo::button(2, "go"),
        ]
    }

    #[test]
    fn test_password_still_present_does_not_fire() {
        let url = login_url();
        let elements = login_form();
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/login",
            elements: &elements,
            password_field: Some(&elements[1]),
        };

        assert!(!PasswordFieldGone.fires(&page));
        assert!(!UrlChanged.fires(&page));
        assert_eq!(SuccessSignals::default().first_match(&page), None);
    }

    #[test]
    fn test_password_gone_fires() {
        let url = login_url();
        let before = login_form();
        let after = vec![ElementInfo::button(0, "logout")];
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/login",
            elements: &after,
            password_field: Some(&before[1]),
        };

        assert_eq!(
            SuccessSignals::default().first_match(&page),
            Some("password-field-gone")
        );
    }

    #[test]
    fn test_other_password_field_does_not_block() {
        let url = login_url();
        let before = login_form();
        // e.g. a change-password widget on the landing page
        let after = vec![ElementInfo::input(0, "password", "new-password")];
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/login",
            elements: &after,
            password_field: Some(&before[1]),
        };

        assert!(PasswordFieldGone.fires(&page));
    }

    #[test]
    fn test_anonymous_password_field_uses_any_password_input() {
        let url = login_url();
        let anonymous = ElementInfo::input(1, "password", "");
        let after = vec![ElementInfo::input(3, "password", "")];
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/login",
            elements: &after,
            password_field: Some(&anonymous),
        };

        assert!(!PasswordFieldGone.fires(&page));
    }

    #[test]
    fn test_url_changed_fires() {
        let url = login_url();
        let elements = login_form();
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/dashboard",
            elements: &elements,
            password_field: Some(&elements[1]),
        };

        assert_eq!(
            SuccessSignals::default().first_match(&page),
            Some("url-changed")
        );
    }

    #[test]
    fn test_url_changed_ignores_fragment_and_trailing_slash() {
        let url = login_url();
        for current in [
            "https://example.com/login#",
            "https://example.com/login/",
            "https://example.com/login#form",
        ] {
            let page = PageState {
                login_url: &url,
                current_url: current,
                elements: &[],
                password_field: None,
            };
            assert!(!UrlChanged.fires(&page), "{current} should match login URL");
        }
    }

    #[test]
    fn test_custom_signal_order() {
        struct Never;
        impl SuccessSignal for Never {
            fn name(&self) -> &'static str {
                "never"
            }
            fn fires(&self, _page: &PageState<'_>) -> bool {
                false
            }
        }

        let signals = SuccessSignals::empty().with_signal(Never).with_signal(UrlChanged);
        assert_eq!(signals.len(), 2);
        assert_eq!(format!("{signals:?}"), r#"["never", "url-changed"]"#);

        let url = login_url();
        let page = PageState {
            login_url: &url,
            current_url: "https://example.com/home",
            elements: &[],
            password_field: None,
        };
        assert_eq!(signals.first_match(&page), Some("url-changed"));
        assert_eq!(SuccessSignals::empty().first_match(&page), None);
    }
}
