//! Loginhook Auth - authenticated-session setup for a proxying scanner.
//!
//! Given credentials and a login URL, this crate locates the login form,
//! submits the credentials through a real browser session, copies the
//! resulting session into the scanning engine, and installs a URL filter
//! that keeps the crawler away from logout endpoints.
//!
//! # Flow
//!
//! 1. [`ScanSession::new`] validates the configuration and compiles the
//!    exclusion patterns, before any browser is started
//! 2. [`HookAdapter::on_scan_start`] launches a browser and runs the
//!    [`CredentialSubmitter`], which resolves fields explicitly or through
//!    the [`locator`]
//! 3. [`bridge`] copies cookies (and a script-visible bearer token, if any)
//!    into the engine's [`SessionSink`]
//! 4. The [`ExclusionFilter`] is registered with the engine's
//!    [`NavigationInterceptor`]
//!
//! # Example
//!
//! ```rust,ignore
//! use loginhook_auth::{HookAdapter, ScanSession};
//! use loginhook_browser::ChromiumLauncher;
//! use std::sync::Arc;
//!
//! let mut session = ScanSession::from_params("https://example.com/app", params)?;
//! let hook = HookAdapter::new(Arc::new(ChromiumLauncher::default()), engine.clone(), engine);
//! let summary = hook.on_scan_start(&mut session).await?;
//! assert!(session.should_visit("https://example.com/profile"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod bridge;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod fields;
pub mod hook;
pub mod locator;
pub mod signals;
pub mod submitter;
#[allow(missing_docs)]
pub mod testing;

// Re-export commonly used types
pub use bridge::{bridge, BridgeResult};
pub use engine::{EngineError, NavigationInterceptor, SessionSink};
pub use error::{BridgeError, HookError, SubmissionError, SubmissionFailure};
pub use exclusion::ExclusionFilter;
pub use fields::{FieldResolver, FieldSet, LoginStep};
pub use hook::{HandoffSummary, HookAdapter, ScanSession};
pub use locator::NotFound;
pub use signals::{PageState, SuccessSignal, SuccessSignals};
pub use submitter::{CredentialSubmitter, SubmissionResult, SubmitTimings};
