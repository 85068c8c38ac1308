use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::Settings;

pub fn http_client(settings: &Settings) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&settings.accept_language).context("invalid accept-language")?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&settings.user_agent).context("invalid user-agent")?,
    );
    if let Some(cookie) = settings.cookie.as_deref() {
        let mut value = HeaderValue::from_str(cookie).context("invalid cookie value")?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);
    }

    // gzip/deflate/brotli are negotiated and decoded by reqwest itself.
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .default_headers(headers)
        .build()
        .context("failed to build http client")
}

pub fn fetch_json(client: &Client, url: &str) -> Result<Value> {
    let body = fetch_body(client, url)?;
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty response from {url}"));
    }
    serde_json::from_str(trimmed).with_context(|| format!("invalid json from {url}"))
}

/// Like `fetch_json`, but a 404 or an empty body reads as `None`.
pub fn fetch_json_optional(client: &Client, url: &str) -> Result<Option<Value>> {
    let resp = client.get(url).send().context("request failed")?;
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let body = read_success_body(resp)?;
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .with_context(|| format!("invalid json from {url}"))
}

fn fetch_body(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().context("request failed")?;
    read_success_body(resp)
}

fn read_success_body(resp: reqwest::blocking::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body));
    }
    Ok(body)
}
