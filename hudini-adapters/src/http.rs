//! Vendor HTTP plumbing shared by every adapter: per-request deadlines,
//! transport error classification, and the status → [`PmsError`] mapping.

use hudini_core::{PmsError, PmsResult, SessionStore};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which timeout budget a request runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Point reads and writes
    Point,
    /// Property-wide listings and sync
    Bulk,
}

/// What a request was looking for, used to build `NotFound` errors
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub resource: &'static str,
    pub id: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(resource: &'static str, id: &'a str) -> Self {
        Self { resource, id }
    }
}

pub struct VendorHttp {
    provider: String,
    client: Client,
    timeout: Duration,
    bulk_timeout: Duration,
}

impl VendorHttp {
    pub fn new(provider: impl Into<String>, timeout: Duration, bulk_timeout: Duration) -> PmsResult<Self> {
        let provider = provider.into();
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(concat!("hudini/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PmsError::Configuration(format!("failed to build HTTP client for {}: {}", provider, e))
            })?;

        Ok(Self {
            provider,
            client,
            timeout,
            bulk_timeout,
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn timeout_for(&self, deadline: Deadline) -> Duration {
        match deadline {
            Deadline::Point => self.timeout,
            Deadline::Bulk => self.bulk_timeout,
        }
    }

    /// Start a request with the deadline already applied and JSON accepted.
    pub fn request(&self, method: Method, url: &str, deadline: Deadline) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout_for(deadline))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    pub async fn send(&self, request: RequestBuilder) -> PmsResult<Response> {
        request.send().await.map_err(|e| self.transport_error(e))
    }

    /// Send and decode a 2xx JSON body. Anything else goes through [`map_status`].
    /// A 401/403 also drops the session so the next call logs in again.
    pub async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: &SessionStore,
        target: Target<'_>,
    ) -> PmsResult<T> {
        let response = self.checked(request, session, target).await?;
        response.json::<T>().await.map_err(|e| self.transport_error(e))
    }

    /// Send and require a 2xx, discarding the body.
    pub async fn empty(
        &self,
        request: RequestBuilder,
        session: &SessionStore,
        target: Target<'_>,
    ) -> PmsResult<()> {
        self.checked(request, session, target).await.map(|_| ())
    }

    async fn checked(
        &self,
        request: RequestBuilder,
        session: &SessionStore,
        target: Target<'_>,
    ) -> PmsResult<Response> {
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = map_status(&self.provider, status, &body, target);
        if matches!(err, PmsError::SessionExpired(_)) {
            session.invalidate();
        }
        debug!(
            provider = %self.provider,
            status = %status,
            resource = target.resource,
            id = target.id,
            "vendor call failed"
        );
        Err(err)
    }

    pub fn transport_error(&self, err: reqwest::Error) -> PmsError {
        if err.is_timeout() {
            warn!(provider = %self.provider, error = %err, "vendor call timed out");
            PmsError::timeout(format!("{}: request timed out", self.provider))
        } else if err.is_decode() {
            PmsError::transport(format!("{}: unreadable response body: {}", self.provider, err))
        } else {
            warn!(provider = %self.provider, error = %err, "vendor call failed in transport");
            PmsError::transport(format!("{}: {}", self.provider, err))
        }
    }
}

/// Classify a non-2xx answer to a data call.
pub fn map_status(provider: &str, status: StatusCode, body: &str, target: Target<'_>) -> PmsError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PmsError::SessionExpired(provider.to_string()),
        StatusCode::NOT_FOUND => PmsError::not_found(target.resource, target.id),
        s if s.is_server_error() => PmsError::transport(format!(
            "{}: vendor answered {} without a definitive result",
            provider, s
        )),
        s => {
            let (code, message) = vendor_error(body);
            PmsError::VendorRejected {
                code: if code.is_empty() { format!("HTTP_{}", s.as_u16()) } else { code },
                message: if message.is_empty() { s.to_string() } else { message },
            }
        }
    }
}

/// Token endpoint refused us.
pub fn auth_failure(provider: &str, status: StatusCode, body: &str) -> PmsError {
    let (code, message) = vendor_error(body);
    let detail = match (code.is_empty(), message.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!(": {}", code),
        (true, false) => format!(": {}", message),
        (false, false) => format!(": {} {}", code, message),
    };
    PmsError::AuthenticationFailed {
        provider: provider.to_string(),
        reason: format!("token endpoint answered {}{}", status, detail),
    }
}

/// Pull `(error_code, message)` out of whatever error envelope the vendor used.
pub fn vendor_error(body: &str) -> (String, String) {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (String::new(), body.trim().chars().take(200).collect());
    };

    let pick = |keys: &[&str]| -> String {
        keys.iter()
            .find_map(|key| match json.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default()
    };

    let code = pick(&["error_code", "errorCode", "o:errorCode", "code", "error"]);
    let message = pick(&["message", "error_description", "detail", "title"]);
    (code, message)
}

/// Percent-encode one path segment (room numbers, ids).
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}
