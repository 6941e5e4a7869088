//! Controller API client.
//!
//! A thin async wrapper around `reqwest` for the automation controller's
//! REST API. It focuses on:
//!
//! - Resolving the base URL and OAuth token from `CONTROLLER_HOST` /
//!   `CONTROLLER_OAUTH_TOKEN`, falling back to the console settings file
//! - Validating the base URL (HTTPS unless the host is local)
//! - Building requests with a consistent User-Agent and JSON headers
//! - Decoding JSON responses and turning non-2xx statuses into errors
//!
//! Resource-specific calls (option lists, launch configuration, surveys,
//! schedules) live in [`resources`].

pub mod resources;

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use launchdeck_util::{ConsoleSettings, redact_sensitive};
use reqwest::{Client, Method, RequestBuilder, Response, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Environment variable holding the controller base URL.
pub const HOST_ENV: &str = "CONTROLLER_HOST";
/// Environment variable holding the OAuth bearer token.
pub const TOKEN_ENV: &str = "CONTROLLER_OAUTH_TOKEN";

/// Hostnames allowed over plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

#[derive(Debug, Clone)]
/// Configured HTTP client for one controller.
pub struct ControllerClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ControllerClient {
    /// Build a client from the environment, falling back to `settings`.
    ///
    /// Resolution order for each value: environment variable, then the
    /// settings file. A missing host is an error; a missing token is not,
    /// since some controllers allow anonymous reads.
    pub fn from_env(settings: &ConsoleSettings) -> Result<Self> {
        let base_url = env::var(HOST_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| settings.host.clone())
            .ok_or_else(|| anyhow!("{} is not set and no host is configured in settings", HOST_ENV))?;
        let token = env::var(TOKEN_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| settings.token.clone());
        Self::new(&base_url, token.as_deref())
    }

    /// Build a client for an explicit base URL and optional bearer token.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let mut default_headers = header::HeaderMap::new();
        if let Some(token) = token {
            let authorization = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .context("OAuth token contains characters not allowed in a header")?;
            default_headers.insert(header::AUTHORIZATION, authorization);
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("launchdeck/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a request for a method and API-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %redact_sensitive(&url), %method, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let response = self
            .request(Method::GET, path)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {}", path))?;
        decode(response, path).await
    }

    pub async fn options_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(Method::OPTIONS, path)
            .send()
            .await
            .with_context(|| format!("OPTIONS {}", path))?;
        decode(response, path).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", path))?;
        decode(response, path).await
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .request(Method::PATCH, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("PATCH {}", path))?;
        decode(response, path).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await.with_context(|| format!("read response body from {}", path))?;
    debug!(%status, path, bytes = body.len(), "received response");
    if !status.is_success() {
        bail!("{} returned {}: {}", path, status, redact_sensitive(truncate(&body, 400)));
    }
    serde_json::from_str(&body).with_context(|| format!("decode response from {}", path))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise the scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|e| anyhow!("Invalid {} URL '{}': {}", HOST_ENV, base, e))?;

    let host_name = parsed
        .host_str()
        .ok_or_else(|| anyhow!("{} must include a host", HOST_ENV))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        bail!(
            "{} must use https for non-localhost hosts; got '{}://'",
            HOST_ENV,
            parsed.scheme()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_may_use_http() {
        assert!(validate_base_url("http://localhost:8013").is_ok());
        assert!(validate_base_url("http://127.0.0.1").is_ok());
    }

    #[test]
    fn remote_hosts_require_https() {
        assert!(validate_base_url("https://controller.example.com").is_ok());
        let error = validate_base_url("http://controller.example.com").expect_err("plain http rejected");
        assert!(error.to_string().contains("must use https"));
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = ControllerClient::new("https://controller.example.com/", Some("token")).expect("client");
        assert_eq!(client.base_url, "https://controller.example.com");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
