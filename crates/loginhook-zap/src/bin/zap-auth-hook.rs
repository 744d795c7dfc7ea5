//! Authenticate a ZAP scan target through a real browser login.
//!
//! Usage: `zap-auth-hook <target-url> auth.loginurl=... auth.username=... [auth.key=value ...]`

use anyhow::{bail, Context, Result};
use loginhook_auth::{HookAdapter, ScanSession, SubmitTimings};
use loginhook_browser::ChromiumLauncher;
use loginhook_core::RuntimeConfig;
use loginhook_zap::ZapEngine;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: zap-auth-hook <target-url> auth.<option>=<value> ...";

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,loginhook=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn parse_args(args: &[String]) -> Result<(String, Vec<(String, String)>)> {
    let Some((target, rest)) = args.split_first() else {
        bail!("missing target URL\n{USAGE}");
    };

    let params = rest
        .iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            // a bare flag such as `auth.auto`
            None if arg.starts_with("auth") || arg.starts_with("--auth") => {
                Ok((arg.clone(), String::new()))
            }
            None => bail!("expected key=value, got {arg:?}\n{USAGE}"),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((target.clone(), params))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("Starting zap-auth-hook v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (target, params) = parse_args(&args)?;

    let config = RuntimeConfig::load_with_env().context("failed to load runtime configuration")?;
    config.validate()?;

    let mut session = ScanSession::from_params(&target, params).context("invalid auth options")?;

    let engine = Arc::new(ZapEngine::new(&config.zap)?);
    let version = engine
        .client()
        .version()
        .await
        .with_context(|| format!("ZAP API not reachable at {}", config.zap.api_url))?;
    info!("Connected to ZAP {}", version);

    let hook = HookAdapter::new(
        Arc::new(ChromiumLauncher::new(config.browser.clone())),
        engine.clone(),
        engine.clone(),
    )
    .with_timings(SubmitTimings::from(&config.browser));

    let summary = hook.on_scan_start(&mut session).await?;
    info!(
        "Authenticated {} via {} ({} cookies, bearer token: {})",
        session.site(),
        summary.confirmed_by,
        summary.cookies_transferred,
        if summary.bearer_forwarded { "yes" } else { "no" }
    );
    if !summary.failed_cookies.is_empty() {
        tracing::warn!("Cookies not transferred: {}", summary.failed_cookies.join(", "));
    }
    Ok(())
}
