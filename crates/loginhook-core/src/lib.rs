//! Loginhook Core - Foundation crate for the scanner login hook.
//!
//! This crate provides the configuration surface, shared value types and
//! error handling that the browser, auth and engine-adapter crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`auth`] - `AuthConfig`, parsed from the hosting engine's `auth.*` parameters
//! - [`config`] - TOML-based runtime settings with XDG paths
//! - [`types`] - Shared newtypes (`FieldRef`, `SiteRoot`, `SessionCookie`)
//!
//! # Example
//!
//! ```rust
//! use loginhook_core::AuthConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_params([
//!     ("auth.loginurl", "https://example.com/login"),
//!     ("auth.username", "alice"),
//!     ("auth.password", "hunter2"),
//!     ("auth.auto", "true"),
//! ])?;
//! assert!(config.auto_discovery());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod auth;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use auth::AuthConfig;
pub use config::{BrowserSettings, RuntimeConfig, ZapSettings};
pub use error::{ConfigError, ConfigResult};
pub use types::{FieldRef, SessionCookie, SiteRoot, StorageEntry};
