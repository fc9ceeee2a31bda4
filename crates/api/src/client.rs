//! HTTP client shared by the bundled API implementations.
//!
//! [`HttpApiClient`] wraps a configured `reqwest::Client` with a validated
//! base URL, a consistent User-Agent, and JSON accept headers.

use std::{env, time::Duration};

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Method, RequestBuilder, header};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Hostnames allowed with any scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl HttpApiClient {
    /// Builds a client whose base URL comes from `base_env_var`, falling back to `default_base_url`.
    ///
    /// An optional bearer token is read from `token_env_var`.
    pub fn from_env(base_env_var: &str, default_base_url: &str, token_env_var: &str) -> Result<Self> {
        let base_url = env::var(base_env_var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_base_url.to_string());
        let token = env::var(token_env_var).ok().filter(|value| !value.trim().is_empty());
        Self::new(base_url.trim_end_matches('/'), token.as_deref())
    }

    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}")).context("invalid API token")?;
            default_headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: base_url.to_string(),
            http,
            user_agent: format!("automation-engine/0.1; {}", env::consts::OS),
        })
    }

    /// Builds a request for a path relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, %method, "building request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Sends a request and decodes a JSON body, failing on non-success status codes.
    pub async fn send_json(request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.context("send request")?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status}: {text}"));
        }
        debug!(status = status.as_u16(), body_len = text.len(), "response received");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).or(Ok(Value::String(text)))
    }
}

/// Validates a base URL.
///
/// Rules:
/// - `localhost` and loopback addresses: any http(s) scheme
/// - otherwise: the scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|error| anyhow!("invalid base URL '{}': {}", base, error))?;
    let host_name = parsed.host_str().ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("base URL must use http or https; got '{}://'", parsed.scheme()));
    }
    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }
    if parsed.scheme() != "https" {
        return Err(anyhow!(
            "base URL must use https for non-localhost hosts; got '{}://{}'",
            parsed.scheme(),
            host_name
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_accepts_plain_http() {
        assert!(validate_base_url("http://localhost:5000").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn remote_hosts_require_https() {
        assert!(validate_base_url("https://api.example.com").is_ok());
        let err = validate_base_url("http://api.example.com").unwrap_err();
        assert!(err.to_string().contains("https"), "{err}");
    }

    #[test]
    fn rejects_unparseable_and_non_http_urls() {
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("ftp://localhost").is_err());
    }

    #[test]
    fn request_joins_base_url_and_path() {
        let client = HttpApiClient::new("http://localhost:5000", None).expect("client");
        let request = client.request(Method::GET, "/data/users").build().expect("request");
        assert_eq!(request.url().as_str(), "http://localhost:5000/data/users");
        assert!(request.headers().contains_key(header::USER_AGENT));
    }
}
