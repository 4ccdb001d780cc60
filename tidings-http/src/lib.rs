//! Minimal HTTP client for probing and fetching links found in messages.
//!
//! - `HEAD` probes that hand back status + headers without touching the body
//! - `GET` of text bodies with a hard size cap (used for Open Graph pages)
//! - Per-request extra headers; one client-wide timeout
//! - Redacts sensitive query params and `Authorization` values in every log line
//! - Optional *raw* request/response logging via `TIDINGS_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), tidings_http::HttpError> {
//! let client = tidings_http::HttpClient::new()?;
//! let probe = client
//!     .head("https://example.com/", tidings_http::RequestOpts::default())
//!     .await?;
//! let _ = probe.headers.get(reqwest::header::CONTENT_TYPE);
//! # Ok(()) }
//! ```
//!
//! There are no retries: a failed request is reported once and the caller
//! decides what to do with it.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `TIDINGS_HTTP_RAW=1`.

use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use reqwest::StatusCode;
pub use reqwest::header;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "TIDINGS_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

/// Default cap on bodies read by [`HttpClient::get_text`].
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = concat!("tidings/", env!("CARGO_PKG_VERSION"));

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    if *method == Method::HEAD {
        parts.push("-I".to_string());
    }
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    let (host_path, query) = redact_query(url);
    let mut target = format!("{}://{}", url.scheme(), host_path);
    if !query.is_empty() {
        let q = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        target.push('?');
        target.push_str(&q);
    }
    parts.push(format!("'{}'", target.replace('\'', r"'\''")));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Request options & responses
// ==============================

/// Per-request extras on top of the client's defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    /// Sent in addition to the client's `User-Agent`.
    pub headers: Option<HeaderMap>,
}

/// Status line and headers of a `HEAD` probe.
///
/// `headers` is an [`http::HeaderMap`](reqwest::header::HeaderMap), so lookups
/// are case-insensitive whatever casing the server used on the wire.
#[derive(Clone, Debug)]
pub struct HeadResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl HeadResponse {
    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A successful `GET` whose body was decoded as (lossy) UTF-8.
#[derive(Clone, Debug)]
pub struct TextResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// URL after redirects.
    pub final_url: Url,
    pub body: String,
}

// ==============================
// Client
// ==============================

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    format!("r{:x}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: HeaderValue,
    pub default_timeout: Duration,
    pub max_body_bytes: usize,
}

impl HttpClient {
    /// Construct a client with the default user agent and a 5s connect timeout.
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use tidings_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(10));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        Self::with_settings(DEFAULT_USER_AGENT, Duration::from_secs(5))
    }

    /// Construct a client with an explicit user agent and connect timeout.
    pub fn with_settings(user_agent: &str, connect_timeout: Duration) -> Result<Self, HttpError> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| HttpError::Build(format!("invalid user agent {user_agent:?}: {e}")))?;
        let inner = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            user_agent,
            default_timeout: Duration::from_secs(10),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Override the default per-request timeout.
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use tidings_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override the body cap applied by [`HttpClient::get_text`].
    pub fn with_max_body_bytes(mut self, n: usize) -> Self {
        self.max_body_bytes = n;
        self
    }

    /// Issue a `HEAD` request. Any status is returned as-is; only transport
    /// failures are errors.
    pub async fn head(&self, url: &str, opts: RequestOpts) -> Result<HeadResponse, HttpError> {
        let (req_id, resp) = self.send(Method::HEAD, url, &opts).await?;
        let status = resp.status();
        let headers = resp.headers().clone();

        tracing::debug!(
            req_id=%req_id,
            %status,
            content_type=?headers.get(reqwest::header::CONTENT_TYPE),
            content_length=?headers.get(CONTENT_LENGTH),
            "http.response.headers"
        );
        if raw_enabled() {
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                headers=?redact_headers(&headers),
            );
        }

        Ok(HeadResponse { status, headers })
    }

    /// `GET` a text body. Non-success statuses and bodies larger than
    /// `max_body_bytes` are errors.
    pub async fn get_text(&self, url: &str, opts: RequestOpts) -> Result<TextResponse, HttpError> {
        let (req_id, mut resp) = self.send(Method::GET, url, &opts).await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let final_url = resp.url().clone();
        let limit = self.max_body_bytes;

        if content_len(&headers).is_some_and(|n| n > limit) {
            tracing::warn!(req_id=%req_id, %status, limit, "http.response.too_large");
            return Err(HttpError::TooLarge { limit });
        }

        let t0 = std::time::Instant::now();
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    if bytes.len() + chunk.len() > limit {
                        tracing::warn!(req_id=%req_id, %status, limit, "http.response.too_large");
                        return Err(HttpError::TooLarge { limit });
                    }
                    bytes.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        req_id=%req_id,
                        message=%err,
                        "http.network_error.body"
                    );
                    return Err(classify(err, self.default_timeout));
                }
            }
        }

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            body_len=bytes.len(),
            final_host=%final_url.host_str().unwrap_or("-"),
            "http.response.body"
        );

        if raw_enabled() {
            let truncated = bytes.len() > RAW_MAX_BODY;
            let shown = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                headers=?redact_headers(&headers),
                body=%String::from_utf8_lossy(shown),
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

        if !status.is_success() {
            let request_id = request_id_header(&headers).to_string();
            tracing::warn!(
                req_id=%req_id,
                %status,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message: snippet,
                request_id,
            });
        }

        Ok(TextResponse {
            status,
            headers,
            final_url,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Best-effort curl repro of what `send` puts on the wire.
    fn curl_for(&self, method: &Method, url: &Url, opts: &RequestOpts) -> String {
        let mut merged = HeaderMap::new();
        merged.insert(USER_AGENT, self.user_agent.clone());
        if let Some(h) = &opts.headers {
            for (k, v) in h.iter() {
                merged.append(k, v.clone());
            }
        }
        make_curl(method, url, &merged)
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send(
        &self,
        method: Method,
        raw_url: &str,
        opts: &RequestOpts,
    ) -> Result<(String, reqwest::Response), HttpError> {
        let url = Url::parse(raw_url).map_err(|e| HttpError::Url(format!("{raw_url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpError::Url(format!(
                "unsupported scheme `{}` in {}",
                url.scheme(),
                raw_url
            )));
        }

        let timeout = self.default_timeout;
        let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        let req_id = next_request_id();
        let (host_path, redacted_q) = redact_query(&url);
        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%host_path,
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );

        if raw_enabled() {
            let curl = self.curl_for(&method, &url, opts);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = std::time::Instant::now();
        match rb.send().await {
            Ok(resp) => {
                tracing::debug!(
                    req_id=%req_id,
                    status=%resp.status(),
                    duration_ms=t0.elapsed().as_millis() as u64,
                    "http.response.start"
                );
                Ok((req_id, resp))
            }
            Err(err) => {
                tracing::warn!(
                    req_id=%req_id,
                    method=%method,
                    host_path=%host_path,
                    message=%err,
                    "http.network_error.send"
                );
                Err(classify(err, timeout))
            }
        }
    }
}

// ==============================
// Helpers
// ==============================

fn classify(err: reqwest::Error, timeout: Duration) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(timeout)
    } else if err.is_builder() {
        HttpError::Build(err.to_string())
    } else {
        HttpError::Network(err.to_string())
    }
}

fn request_id_header(headers: &HeaderMap) -> &str {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "apikey"
            | "token"
            | "secret"
            | "client_secret"
            | "password"
            | "sig"
            | "signature"
    )
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    // Return "host + path" string and redacted query list for logging
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

fn content_len(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<usize>().ok())
}
