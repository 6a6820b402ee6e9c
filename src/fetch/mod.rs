//! The download collaborator (§4.5 FETCH stage, §6 External Interfaces).
//!
//! Redirects are never followed automatically: the crawler treats a 3xx
//! response as its own `Redirect` outcome so the target gets pushed through
//! the frontier like any other discovered link, rather than silently
//! fetching somewhere the caller didn't ask for.

use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building http client: {0}")]
    Client(reqwest::Error),
    #[error("request to {url}: {source}")]
    Request { url: String, source: reqwest::Error },
}

/// The outcome of fetching one URL.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Populated only for 3xx responses, from the `Location` header.
    pub redirect_target: Option<String>,
}

impl Response {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Builds the crawler's shared [`reqwest::Client`]: redirects disabled, a
/// bounded per-request timeout, the configured identification string as the
/// `User-Agent`, and -- if `cache_server` names one -- a `reqwest::Proxy`
/// every request is routed through instead of hitting origins directly.
pub fn build_client(
    user_agent: &str,
    timeout: Duration,
    cache_server: Option<&str>,
) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout);

    if let Some(cache_server) = cache_server {
        let proxy = reqwest::Proxy::all(cache_server).map_err(FetchError::Client)?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(FetchError::Client)
}

/// Fetches `url`, returning the raw response without following redirects.
pub async fn fetch(client: &reqwest::Client, url: &Url) -> Result<Response, FetchError> {
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|source| FetchError::Request { url: url.to_string(), source })?;

    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let redirect_target = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let body = if redirect_target.is_none() {
        resp.bytes()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?
            .to_vec()
    } else {
        Vec::new()
    };

    Ok(Response { url: url.to_string(), status, content_type, body, redirect_target })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn is_redirect_classifies_3xx_only() {
        let mut r = Response { url: "https://a.edu".into(), status: 301, content_type: None, body: vec![], redirect_target: None };
        assert!(r.is_redirect());
        r.status = 200;
        assert!(!r.is_redirect());
        assert!(r.is_success());
    }

    #[test]
    fn build_client_accepts_a_user_agent() {
        let client = build_client("napcrawl/0.1", Duration::from_secs(10), None);
        assert!(client.is_ok());
    }

    #[test]
    fn build_client_accepts_a_cache_server_proxy() {
        let client = build_client("napcrawl/0.1", Duration::from_secs(10), Some("http://127.0.0.1:8080"));
        assert!(client.is_ok());
    }
}
