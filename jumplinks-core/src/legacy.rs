//! legacy.rs - Legacy domain fallback probe.
//!
//! When no rule matches, the request can be tried against the site's old
//! host. The probe issues a `HEAD` request without following redirects and
//! reports the status code; the resolver decides whether that status allows
//! a redirect.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use log::debug;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

use crate::errors::JumplinksError;

/// Network port for the legacy domain probe.
#[async_trait]
pub trait LegacyProbe: Send + Sync {
    /// Returns the HTTP status of a `HEAD` request to `url`.
    async fn probe(&self, url: &str) -> Result<u16, JumplinksError>;
}

/// Joins the legacy domain and the normalised request path.
pub fn legacy_url(domain: &str, request: &str) -> String {
    format!("{}/{}", domain.trim_end_matches('/'), request.trim_start_matches('/'))
}

/// `reqwest`-backed probe.
#[derive(Debug, Clone)]
pub struct HttpLegacyProbe {
    client: Client,
}

impl HttpLegacyProbe {
    pub fn new(timeout: Duration) -> Result<Self, JumplinksError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(concat!("jumplinks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JumplinksError::LegacyProbeFailure {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LegacyProbe for HttpLegacyProbe {
    async fn probe(&self, url: &str) -> Result<u16, JumplinksError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| JumplinksError::LegacyProbeFailure {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        debug!("Legacy probe for '{}' answered {}", url, status);
        Ok(status)
    }
}
