//! Arbitrary HTTP requests on the user's behalf.
//!
//! Targets are checked against a private-network denylist before any
//! connection is made, and again on every redirect hop. Transport
//! failures (timeout, refused connection) are returned as an
//! [`HttpExchange`] with `status = 0` rather than as an error, so the
//! reply can still describe what happened.

use super::params::{self, Params};
use super::{Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Host;

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "webclient",
    description: "Make HTTP requests to API endpoints and analyze responses. Supports GET, POST, PUT, DELETE methods with custom headers and payloads.",
    parameters: &[
        ("method", "HTTP method (GET, POST, PUT, DELETE, PATCH)"),
        ("url", "Target URL for the API request"),
        ("headers", "HTTP headers as JSON object"),
        ("body", "Request body for POST/PUT requests"),
        ("timeout", "Request timeout in milliseconds"),
    ],
};

const CLIENT_USER_AGENT: &str = "AlooChat-WebClient/1.0";
const MAX_TIMEOUT_MS: u64 = 60_000;
const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;
const ALLOWED_METHODS: [&str; 6] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD"];

pub const SECURITY_MESSAGE: &str =
    "Access to local/private networks is not allowed for security reasons";

/// Outcome of one request, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpExchange {
    /// `0` when no response was received.
    pub status: u16,
    pub status_text: String,
    pub data: Value,
    pub headers: BTreeMap<String, String>,
    /// Milliseconds.
    pub response_time: u64,
    pub error: Option<String>,
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl HttpExchange {
    fn failed(url: &Url, method: &Method, elapsed: u64, status_text: &str, error: String) -> Self {
        Self {
            status: 0,
            status_text: status_text.to_string(),
            data: Value::Null,
            headers: BTreeMap::new(),
            response_time: elapsed,
            error: Some(error),
            url: url.to_string(),
            method: method.to_string(),
            truncated: false,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WebClientSettings {
    /// Disables the denylist. Local development only.
    pub allow_private_networks: bool,
    pub default_timeout_ms: u64,
}

impl Default for WebClientSettings {
    fn default() -> Self {
        Self {
            allow_private_networks: false,
            default_timeout_ms: 10_000,
        }
    }
}

/// Whether `url` points at loopback, private or unspecified addresses.
///
/// Works on the parsed host, so `http://10.example.com` is allowed while
/// `http://[::1]/` is not. Hostnames are not resolved.
pub fn is_private_target(url: &Url) -> bool {
    match url.host() {
        None => true,
        Some(Host::Domain(domain)) => domain.to_ascii_lowercase().contains("localhost"),
        Some(Host::Ipv4(ip)) => {
            ip.is_loopback() || ip.is_private() || ip.is_unspecified() || ip.is_link_local()
        }
        Some(Host::Ipv6(ip)) => {
            ip.is_loopback()
                || ip.is_unspecified()
                || ip
                    .to_ipv4_mapped()
                    .map(|v4| v4.is_loopback() || v4.is_private() || v4.is_unspecified())
                    .unwrap_or(false)
        }
    }
}

fn parse_target(raw: &str) -> Result<Url, ToolError> {
    let invalid = || {
        ToolError::InvalidParams(
            "Invalid URL provided. Please ensure the URL is properly formatted (e.g., https://api.example.com/users)"
                .into(),
        )
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_method(params: &Params) -> Result<Method, ToolError> {
    let raw = params::string(params, "method")
        .unwrap_or_else(|| "GET".into())
        .to_ascii_uppercase();
    if !ALLOWED_METHODS.contains(&raw.as_str()) {
        return Err(ToolError::InvalidParams(format!(
            "Unsupported HTTP method '{}'",
            raw
        )));
    }
    Method::from_bytes(raw.as_bytes())
        .map_err(|_| ToolError::InvalidParams(format!("Unsupported HTTP method '{}'", raw)))
}

fn build_headers(params: &Params) -> Result<HeaderMap, ToolError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    for (name, value) in params::string_map(params, "headers") {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ToolError::InvalidParams(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|_| ToolError::InvalidParams(format!("Invalid value for header '{}'", name)))?;
        headers.insert(header, value);
    }
    Ok(headers)
}

/// Generic HTTP client tool with its own redirect-checking client.
pub struct WebClientTool {
    http: reqwest::Client,
    settings: WebClientSettings,
}

impl WebClientTool {
    pub fn new(settings: WebClientSettings) -> Result<Self, ToolError> {
        let allow_private = settings.allow_private_networks;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if !allow_private && is_private_target(attempt.url()) {
                attempt.error(SECURITY_MESSAGE)
            } else {
                attempt.follow()
            }
        });
        let http = reqwest::Client::builder().redirect(policy).build()?;
        Ok(Self { http, settings })
    }

    fn timeout(&self, params: &Params) -> Duration {
        let ms = params::integer(params, "timeout")
            .map(|t| t.clamp(1, MAX_TIMEOUT_MS as i64) as u64)
            .unwrap_or(self.settings.default_timeout_ms.clamp(1, MAX_TIMEOUT_MS));
        Duration::from_millis(ms)
    }

    async fn read_body(resp: &mut reqwest::Response) -> Result<(Vec<u8>, bool), reqwest::Error> {
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let room = MAX_BODY_BYTES - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                return Ok((body, true));
            }
            body.extend_from_slice(&chunk);
        }
        Ok((body, false))
    }

    fn classify(err: &reqwest::Error, timeout: Duration) -> (&'static str, String) {
        if err.is_timeout() {
            ("Timeout", format!("Request timed out after {}ms", timeout.as_millis()))
        } else if err.is_connect() {
            (
                "Network Error",
                "Network error - check if the server is reachable".to_string(),
            )
        } else if err.is_redirect() {
            ("Error", format!("Redirect refused: {}", err))
        } else {
            ("Error", err.to_string())
        }
    }
}

fn decode_body(bytes: &[u8], content_type: &str) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    if content_type.contains("json") {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return value;
        }
    }
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

#[async_trait]
impl Tool for WebClientTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        let raw_url = params::required_string(params, "url")?;
        let url = parse_target(&raw_url)?;
        if !self.settings.allow_private_networks && is_private_target(&url) {
            warn!("Blocked request to private target {}", url);
            return Err(ToolError::Security(SECURITY_MESSAGE.into()));
        }

        let method = parse_method(params)?;
        let mut headers = build_headers(params)?;
        let timeout = self.timeout(params);

        let mut request = self.http.request(method.clone(), url.clone()).timeout(timeout);
        if method != Method::GET && method != Method::HEAD {
            match params.get("body") {
                None | Some(Value::Null) => {}
                Some(Value::String(text)) => request = request.body(text.clone()),
                Some(other) => {
                    if !headers.contains_key(CONTENT_TYPE) {
                        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                    }
                    request = request.body(other.to_string());
                }
            }
        }
        let request = request.headers(headers);

        info!("{} {}", method, url);
        let started = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        let mut resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let (status_text, error) = Self::classify(&e, timeout);
                debug!("{} {} failed: {}", method, url, e);
                return Ok(ToolOutput::Webclient(HttpExchange::failed(
                    &url,
                    &method,
                    elapsed(started),
                    status_text,
                    error,
                )));
            }
        };

        let status = resp.status();
        let response_headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let content_type = response_headers
            .get(CONTENT_TYPE.as_str())
            .cloned()
            .unwrap_or_default();
        let final_url = resp.url().to_string();

        let (bytes, truncated) = match Self::read_body(&mut resp).await {
            Ok(read) => read,
            Err(e) => {
                let (status_text, error) = Self::classify(&e, timeout);
                return Ok(ToolOutput::Webclient(HttpExchange::failed(
                    &url,
                    &method,
                    elapsed(started),
                    status_text,
                    error,
                )));
            }
        };
        let response_time = elapsed(started);
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        let error = (!status.is_success())
            .then(|| format!("HTTP {}: {}", status.as_u16(), status_text));
        if truncated {
            debug!("Response body from {} truncated at {} bytes", url, MAX_BODY_BYTES);
        }

        Ok(ToolOutput::Webclient(HttpExchange {
            status: status.as_u16(),
            status_text,
            data: decode_body(&bytes, &content_type),
            headers: response_headers,
            response_time,
            error,
            url: final_url,
            method: method.to_string(),
            truncated,
        }))
    }
}
