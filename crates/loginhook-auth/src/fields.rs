//! Resolution of the login controls for one step of the login.
//!
//! Explicitly configured identifiers take precedence. When auto-discovery
//! is enabled, the [`locator`](crate::locator) fills every role that has no
//! identifier, and also stands in for an identifier that matches nothing on
//! the page.

use crate::error::SubmissionError;
use crate::locator;
use loginhook_browser::ElementInfo;
use loginhook_core::{AuthConfig, FieldRef};
use std::fmt;

/// Controls resolved on one specific rendered page.
///
/// Only valid for the page instance it was resolved against: after any
/// navigation the page must be listed and resolved again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    /// Username input
    pub username: Option<ElementInfo>,
    /// Password input
    pub password: Option<ElementInfo>,
    /// Final submit control
    pub submit: Option<ElementInfo>,
    /// Control that advances from the username page in a two-step login
    pub first_submit: Option<ElementInfo>,
}

impl FieldSet {
    fn or(self, fallback: Option<FieldSet>) -> FieldSet {
        let Some(fallback) = fallback else {
            return self;
        };
        FieldSet {
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            submit: self.submit.or(fallback.submit),
            first_submit: self.first_submit.or(fallback.first_submit),
        }
    }
}

/// Which page of the login is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Username, password and submit on one page
    Single,
    /// Username and an intermediate submit control
    Username,
    /// Password and the final submit control
    Password,
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("login page"),
            Self::Username => f.write_str("username page"),
            Self::Password => f.write_str("password page"),
        }
    }
}

/// Resolves a [`FieldSet`] for a login step from explicit identifiers and/or discovery.
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'a> {
    config: &'a AuthConfig,
}

impl<'a> FieldResolver<'a> {
    /// Create a resolver for the given configuration.
    #[must_use]
    pub fn new(config: &'a AuthConfig) -> Self {
        Self { config }
    }

    /// Resolve every control the step needs, or fail with `fields-not-found`.
    pub fn resolve(
        &self,
        step: LoginStep,
        elements: &[ElementInfo],
    ) -> Result<FieldSet, SubmissionError> {
        let explicit = FieldSet {
            username: find(elements, self.config.username_field()),
            password: find(elements, self.config.password_field()),
            submit: find(elements, self.config.submit_field()),
            first_submit: find(elements, self.config.first_submit_field()),
        };

        let discovered = if self.config.auto_discovery() {
            match step {
                LoginStep::Single | LoginStep::Password => locator::locate(elements).ok(),
                LoginStep::Username => locator::locate_first_step(elements).ok(),
            }
        } else {
            None
        };

        let fields = explicit.or(discovered);
        let missing = missing_roles(step, &fields);
        if missing.is_empty() {
            Ok(fields)
        } else {
            Err(SubmissionError::fields_not_found(format!(
                "no {} on {step}",
                missing.join(", ")
            )))
        }
    }
}

fn find(elements: &[ElementInfo], field: Option<&FieldRef>) -> Option<ElementInfo> {
    let field = field?;
    elements
        .iter()
        .filter(|e| field.matches(e.name.as_deref(), e.id.as_deref()))
        // visible matches first
        .min_by_key(|e| !e.visible)
        .cloned()
}

fn missing_roles(step: LoginStep, fields: &FieldSet) -> Vec<&'static str> {
    let required: Vec<(&'static str, bool)> = match step {
        LoginStep::Single => vec![
            ("username field", fields.username.is_some()),
            ("password field", fields.password.is_some()),
            ("submit control", fields.submit.is_some()),
        ],
        LoginStep::Username => vec![
            ("username field", fields.username.is_some()),
            ("first submit control", fields.first_submit.is_some()),
        ],
        LoginStep::Password => vec![
            ("password field", fields.password.is_some()),
            ("submit control", fields.submit.is_some()),
        ],
    };

    required
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(role, _)| role)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmissionFailure;

    fn config(extra: &[(&str, &str)]) -> AuthConfig {
        let mut params = vec![
            ("auth.loginurl", "https://example.com/login"),
            ("auth.username", "alice"),
            ("auth.password", "s3cret"),
        ];
        params.extend_from_slice(extra);
        AuthConfig::from_params(params).expect("valid config")
    }

    fn login_page() -> Vec<ElementInfo> {
        vec![
            ElementInfo::input(0, "text", "user"),
            ElementInfo::input(1, "password", "").with_id("pw"),
            ElementInfo::button(2, "go"),
        ]
    }

    #[test]
    fn test_explicit_fields_by_name_and_id() {
        let config = config(&[
            ("auth.username_field", "user"),
            ("auth.password_field", "pw"),
            ("auth.submit_field", "go"),
        ]);

        let fields = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &login_page())
            .expect("resolved");
        assert_eq!(fields.username.map(|e| e.index), Some(0));
        assert_eq!(fields.password.map(|e| e.index), Some(1));
        assert_eq!(fields.submit.map(|e| e.index), Some(2));
    }

    #[test]
    fn test_explicit_field_missing_without_auto() {
        let config = config(&[
            ("auth.username_field", "login"),
            ("auth.password_field", "pw"),
            ("auth.submit_field", "go"),
        ]);

        let err = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &login_page())
            .unwrap_err();
        assert_eq!(err.reason(), Some(SubmissionFailure::FieldsNotFound));
        assert!(err.to_string().contains("username field"));
    }

    #[test]
    fn test_discovery_fills_unconfigured_roles() {
        let config = config(&[("auth.auto", "true"), ("auth.submit_field", "go")]);

        let fields = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &login_page())
            .expect("resolved");
        assert_eq!(fields.username.map(|e| e.index), Some(0));
        assert_eq!(fields.password.map(|e| e.index), Some(1));
    }

    #[test]
    fn test_discovery_replaces_stale_identifier() {
        let config = config(&[
            ("auth.auto", "true"),
            ("auth.username_field", "renamed"),
            ("auth.password_field", "pw"),
            ("auth.submit_field", "go"),
        ]);

        let fields = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &login_page())
            .expect("resolved");
        assert_eq!(fields.username.map(|e| e.index), Some(0));
    }

    #[test]
    fn test_explicit_prefers_visible_duplicate() {
        let config = config(&[
            ("auth.username_field", "user"),
            ("auth.password_field", "pw"),
            ("auth.submit_field", "go"),
        ]);
        let mut page = vec![ElementInfo::input(0, "text", "user").hidden()];
        page.extend(login_page().into_iter().map(|mut e| {
            e.index += 1;
            e
        }));

        let fields = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &page)
            .expect("resolved");
        assert_eq!(fields.username.map(|e| e.index), Some(1));
    }

    #[test]
    fn test_auto_discovery_without_password_field() {
        let config = config(&[("auth.auto", "true")]);
        let page = vec![ElementInfo::input(0, "text", "q")];

        let err = FieldResolver::new(&config)
            .resolve(LoginStep::Single, &page)
            .unwrap_err();
        assert_eq!(err.reason(), Some(SubmissionFailure::FieldsNotFound));
    }

    #[test]
    fn test_username_step() {
        let config = config(&[("auth.auto", "true"), ("auth.first_submit_field", "next")]);
        let page = vec![
            ElementInfo::input(0, "email", "identifier"),
            ElementInfo::button(1, "help"),
            ElementInfo::button(2, "next"),
        ];

        let fields = FieldResolver::new(&config)
            .resolve(LoginStep::Username, &page)
            .expect("resolved");
        assert_eq!(fields.username.map(|e| e.index), Some(0));
        assert_eq!(fields.first_submit.map(|e| e.index), Some(2));
        assert!(fields.password.is_none());
    }

    #[test]
    fn test_password_step_needs_submit() {
        let config = config(&[("auth.auto", "true")]);
        let page = vec![ElementInfo::input(0, "password", "pass")];

        let err = FieldResolver::new(&config)
            .resolve(LoginStep::Password, &page)
            .unwrap_err();
        assert!(err.to_string().contains("submit control"));
    }
}
