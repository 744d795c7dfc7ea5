//! Heuristic discovery of login controls on a rendered page.
//!
//! Works purely on the page's interactive-element listing, in document
//! order, considering visible elements only:
//!
//! - the first password input anchors the form
//! - the username is the nearest text/email input before the password
//! - the submit control is the nearest button after the password, or the
//!   nearest one before it when nothing follows
//!
//! Two-step logins show the username on a page of its own. That page is
//! handled by [`locate_first_step`], and the password page that follows by
//! [`locate`] again.

use crate::fields::FieldSet;
use loginhook_browser::{ElementInfo, ElementKind};
use thiserror::Error;

/// The page has no form the locator can work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no login form found on page")]
pub struct NotFound;

/// Locate password, username and submit controls.
///
/// The username is absent from the result when nothing suitable precedes
/// the password field (the second page of a two-step login). The submit
/// control is absent when the page has no visible button at all.
pub fn locate(elements: &[ElementInfo]) -> Result<FieldSet, NotFound> {
    let visible: Vec<&ElementInfo> = elements.iter().filter(|e| e.visible).collect();

    let anchor = visible
        .iter()
        .position(|e| e.kind() == ElementKind::Password)
        .ok_or(NotFound)?;

    let (before, after) = visible.split_at(anchor);
    let password = after[0];
    let after = &after[1..];

    let username = before.iter().rev().find(|e| e.kind().accepts_username());
    let submit = nearest_button(before, after);

    Ok(FieldSet {
        username: username.map(|e| (*e).clone()),
        password: Some(password.clone()),
        submit: submit.cloned(),
        first_submit: None,
    })
}

/// Locate the username input and the control that advances to the password page.
///
/// Fails when the page already shows a password field, or has no visible
/// text/email input.
pub fn locate_first_step(elements: &[ElementInfo]) -> Result<FieldSet, NotFound> {
    let visible: Vec<&ElementInfo> = elements.iter().filter(|e| e.visible).collect();

    if visible.iter().any(|e| e.kind() == ElementKind::Password) {
        return Err(NotFound);
    }

    let anchor = visible
        .iter()
        .position(|e| e.kind().accepts_username())
        .ok_or(NotFound)?;

    let (before, after) = visible.split_at(anchor);
    let username = after[0];
    let next = nearest_button(before, &after[1..]);

    Ok(FieldSet {
        username: Some(username.clone()),
        password: None,
        submit: None,
        first_submit: next.cloned(),
    })
}

/// Whether the page looks like the first page of a two-step login.
#[must_use]
pub fn looks_like_first_step(elements: &[ElementInfo]) -> bool {
    locate_first_step(elements).is_ok_and(|fields| fields.first_submit.is_some())
}

// Prefer the first button after the anchor; otherwise the closest one before it.
fn nearest_button<'a>(
    before: &[&'a ElementInfo],
    after: &[&'a ElementInfo],
) -> Option<&'a ElementInfo> {
    after
        .iter()
        .find(|e| e.kind() == ElementKind::Button)
        .or_else(|| before.iter().rev().find(|e| e.kind() == ElementKind::Button))
        .copied()
}
