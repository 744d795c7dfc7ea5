//! Browser automation for interactive logins.
//!
//! Exposes the page capabilities the login state machine needs (navigate,
//! list interactive elements, fill, click, wait for settle, read cookies)
//! behind [`BrowserActions`], with a headless Chromium implementation.

pub mod actions;
pub mod element;
pub mod engine;
pub mod error;

pub use actions::{BrowserActions, BrowserLauncher};
pub use element::{ElementInfo, ElementKind};
pub use engine::{BrowserEngine, ChromiumLauncher};
pub use error::{BrowserError, Result};
