//! Client runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the API client and
//! core services. Nothing in this crate reads process-wide environment variables during
//! request handling; binaries gather the raw values and hand them to
//! [`ClientConfig::from_env_values`].

use crate::constants::{DEFAULT_LINK_SCHEME, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{CoreError, CoreResult};
use crate::links::LinkParser;
use std::time::Duration;
use url::Url;

/// Client configuration resolved at startup.
#[derive(Clone)]
pub struct ClientConfig {
    api_base_url: Url,
    link_schemes: Vec<String>,
    request_timeout: Duration,
    api_token: Option<String>,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// The base URL must be an absolute `http` or `https` URL with a host.
    pub fn new(
        api_base_url: &str,
        link_schemes: Vec<String>,
        request_timeout: Duration,
        api_token: Option<String>,
    ) -> CoreResult<Self> {
        let raw = api_base_url.trim();
        let api_base_url = Url::parse(raw).map_err(|e| {
            CoreError::InvalidConfig(format!("invalid api base URL {raw:?}: {e}"))
        })?;
        let has_host = api_base_url.host_str().is_some_and(|h| !h.is_empty());
        if !matches!(api_base_url.scheme(), "http" | "https") || !has_host {
            return Err(CoreError::InvalidConfig(format!(
                "api base URL must be an http(s) URL with a host, got {raw:?}"
            )));
        }

        if request_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "request timeout must be greater than zero".into(),
            ));
        }

        let link_schemes = if link_schemes.iter().all(|s| s.trim().is_empty()) {
            vec![DEFAULT_LINK_SCHEME.to_string()]
        } else {
            link_schemes
        };

        Ok(Self {
            api_base_url,
            link_schemes,
            request_timeout,
            api_token: api_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    /// Build a config from raw environment values.
    ///
    /// `schemes` is a comma-separated list; `timeout_secs` must be a positive integer.
    /// Missing or blank values fall back to the defaults.
    pub fn from_env_values(
        api_base_url: Option<String>,
        schemes: Option<String>,
        timeout_secs: Option<String>,
        api_token: Option<String>,
    ) -> CoreResult<Self> {
        let api_base_url = api_base_url
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::InvalidConfig("api base URL is not set".into()))?;

        let link_schemes = schemes
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let timeout_secs = match timeout_secs.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => v.parse::<u64>().map_err(|e| {
                CoreError::InvalidConfig(format!("invalid request timeout {v:?}: {e}"))
            })?,
            _ => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Self::new(
            &api_base_url,
            link_schemes,
            Duration::from_secs(timeout_secs),
            api_token,
        )
    }

    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    pub fn link_schemes(&self) -> &[String] {
        &self.link_schemes
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn link_parser(&self) -> LinkParser {
        LinkParser::new(&self.link_schemes)
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("link_schemes", &self.link_schemes)
            .field("request_timeout", &self.request_timeout)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
