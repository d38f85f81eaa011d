//! JSON-over-HTTP client shared by the REST and GraphQL adapters

use reqwest::{header::HeaderMap, Method, RequestBuilder};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info};

use super::AdapterError;

const USER_AGENT: &str = concat!("glue/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort human readable error from the response body
    pub fn error_message(&self) -> String {
        let from_body = match &self.body {
            Value::Object(map) => ["message", "error", "error_description"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .or_else(|| {
                    // GraphQL: {"errors": [{"message": ...}]}
                    map.get("errors")
                        .and_then(Value::as_array)
                        .and_then(|errors| errors.first())
                        .and_then(|e| e.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                }),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        from_body.unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        // system proxies never route to this machine
        let client = if is_loopback(&base_url) {
            reqwest::Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_default()
        } else {
            reqwest::Client::new()
        };
        Self {
            base_url,
            client,
            headers: HeaderMap::new(),
        }
    }

    /// Header sent with every request
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(name, reqwest::header::HeaderValue::from_static(value));
        self
    }

    pub fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}{}", base, path)
    }

    /// Request builder with the client's default headers and user agent
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.build_url(path))
            .headers(self.headers.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    /// Request to an absolute URL handed out by the service, without the
    /// default headers
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    /// Send a request and parse the body as JSON (or keep it as text)
    pub async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, AdapterError> {
        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let body_text = response.text().await?;
        let body: Value = if body_text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body_text).unwrap_or(Value::String(body_text))
        };

        info!(
            "{} -> {} ({}ms)",
            url,
            status,
            start.elapsed().as_millis()
        );
        debug!(body = %body, "Response body");

        Ok(ApiResponse { status, body })
    }

    /// Send and turn non-2xx responses into an error prefixed with `context`
    pub async fn send_checked(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<ApiResponse, AdapterError> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(AdapterError::Api(format!(
                "{}: {}",
                context,
                response.error_message()
            )))
        }
    }
}

fn is_loopback(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split('/').next().unwrap_or("");
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}
