//! Loginhook ZAP - runs the login hook against a ZAP instance.
//!
//! [`ZapEngine`] writes the bridged session into a dedicated ZAP HTTP
//! session and turns the exclusion filter into context exclusions. The
//! `zap-auth-hook` binary wires it to a Chromium browser.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod engine;
pub mod error;

pub use client::ZapClient;
pub use engine::{context_exclusion, context_inclusion, ZapEngine};
pub use error::{Result, ZapError};
