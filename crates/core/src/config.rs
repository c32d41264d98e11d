//! Client runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the API client and views.
//! Nothing below reads process-wide environment variables while a request is being handled.

use crate::constants::{AUDIT_EXPORT_PATH, DEFAULT_ANALYZE_TIMEOUT, DEFAULT_API_URL};
use crate::{ClientError, ClientResult};
use reqwest::Url;
use std::time::Duration;

/// Client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_url: Url,
    analyze_timeout: Duration,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` if `api_url` is not an absolute `http`/`https` URL
    /// or if `analyze_timeout` is zero.
    pub fn new(api_url: &str, analyze_timeout: Duration) -> ClientResult<Self> {
        let api_url = api_url.trim();
        if api_url.is_empty() {
            return Err(ClientError::InvalidConfig("api url cannot be empty".into()));
        }

        let parsed = Url::parse(api_url)
            .map_err(|e| ClientError::InvalidConfig(format!("api url {api_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "api url must use http or https, got {}",
                parsed.scheme()
            )));
        }

        if analyze_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "analyze timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            api_url: parsed,
            analyze_timeout,
        })
    }

    /// Build a configuration from optional raw environment values.
    ///
    /// Missing or blank values fall back to [`DEFAULT_API_URL`] and
    /// [`DEFAULT_ANALYZE_TIMEOUT`].
    pub fn from_env_values(
        api_url: Option<String>,
        analyze_timeout_secs: Option<String>,
    ) -> ClientResult<Self> {
        let api_url = api_url
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout = analyze_timeout_secs
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    ClientError::InvalidConfig(format!("analyze timeout {v:?}: {e}"))
                })
            })
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ANALYZE_TIMEOUT);

        Self::new(&api_url, timeout)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn analyze_timeout(&self) -> Duration {
        self.analyze_timeout
    }

    /// Resolve an endpoint below the base URL from path segments.
    ///
    /// Segments are percent-encoded, so identifiers containing `/` or `?` stay a single segment.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidConfig(format!("api url {} cannot be a base", self.api_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Static link to the audit export, opened by the user outside the client.
    pub fn audit_export_url(&self) -> ClientResult<Url> {
        self.endpoint(AUDIT_EXPORT_PATH)
    }
}
