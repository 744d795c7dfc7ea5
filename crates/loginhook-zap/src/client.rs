//! Thin client for the ZAP JSON API.
//!
//! Every call is a `GET {api}/JSON/{component}/{action|view}/{name}/` with
//! the parameters in the query string. Actions answer `{"Result":"OK"}`;
//! failures come back as a non-2xx status with `{"code", "message"}`.

use crate::error::{Result, ZapError};
use loginhook_core::ZapSettings;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

const API_KEY_HEADER: &str = "X-ZAP-API-Key";

#[derive(Debug, Deserialize)]
struct ApiFailure {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP client bound to one ZAP instance.
#[derive(Clone)]
pub struct ZapClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl fmt::Debug for ZapClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZapClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ZapClient {
    /// Create a client from the `[zap]` settings.
    ///
    /// # Errors
    /// Returns error if the URL does not parse or the HTTP client cannot be created.
    pub fn new(settings: &ZapSettings) -> Result<Self> {
        let mut base_url = Url::parse(&settings.api_url)
            .map_err(|e| ZapError::InvalidUrl(format!("{}: {e}", settings.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ZapError::InvalidUrl(settings.api_url.clone()));
        }
        // `join` drops the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ZapError::InvalidUrl(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    /// Run an API action and check that ZAP answered `OK`.
    pub async fn action(&self, component: &str, name: &str, params: &[(&str, &str)]) -> Result<()> {
        let body = self.call(component, "action", name, params).await?;
        match body.get("Result").and_then(Value::as_str) {
            Some("OK") => Ok(()),
            _ => Err(ZapError::UnexpectedResponse(body.to_string())),
        }
    }

    /// Run an API action that returns a value instead of `OK`.
    pub async fn action_value(
        &self,
        component: &str,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        self.call(component, "action", name, params).await
    }

    /// Query an API view.
    pub async fn view(&self, component: &str, name: &str, params: &[(&str, &str)]) -> Result<Value> {
        self.call(component, "view", name, params).await
    }

    /// ZAP version string, used as a reachability check.
    pub async fn version(&self) -> Result<String> {
        let body = self.view("core", "version", &[]).await?;
        body.get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ZapError::UnexpectedResponse(body.to_string()))
    }

    async fn call(
        &self,
        component: &str,
        kind: &str,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self
            .base_url
            .join(&format!("JSON/{component}/{kind}/{name}/"))
            .map_err(|e| ZapError::InvalidUrl(e.to_string()))?;
        tracing::debug!("ZAP {}/{}/{}", component, kind, name);

        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let failure: ApiFailure = serde_json::from_str(&text).unwrap_or(ApiFailure {
                code: String::new(),
                message: text,
            });
            return Err(ZapError::Api {
                status: status.as_u16(),
                code: failure.code,
                message: failure.message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ZapError::UnexpectedResponse(format!("{e}: {text}")))
    }
}
