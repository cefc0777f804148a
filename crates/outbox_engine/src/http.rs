//! Network call layer.
//!
//! Wraps one remote call and classifies its outcome three ways:
//! - 2xx with a JSON body: success
//! - non-2xx with a structured `{code, message}` body: API error
//! - anything else, including transport failures: the generic failure

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpCall, HttpClient, RawResponse};
use outbox_protocol::{Response, Status};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

// Anything between angle brackets counts as markup.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"<[^>]+>") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

/// Classified outcome of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// 2xx with a parseable body.
    Success,
    /// Structured server error.
    ApiError,
    /// Transport failure, timeout or unstructured body.
    GenericFailure,
}

impl CallOutcome {
    /// Classifies the result of `NetworkCallLayer::call`.
    pub fn of(result: &SyncResult<Value>) -> Self {
        match result {
            Ok(_) => CallOutcome::Success,
            Err(e) if e.is_generic_failure() => CallOutcome::GenericFailure,
            Err(_) => CallOutcome::ApiError,
        }
    }
}

/// Sends calls through an `HttpClient` and classifies what comes back.
pub struct NetworkCallLayer<C: HttpClient> {
    client: C,
    timeout: Option<Duration>,
}

impl<C: HttpClient> NetworkCallLayer<C> {
    /// Creates a call layer using the timeout from `config`.
    pub fn new(client: C, config: &SyncConfig) -> Self {
        Self {
            client,
            timeout: config.request_timeout,
        }
    }

    /// Performs the call and returns the parsed body or a classified error.
    pub async fn call(&self, call: HttpCall) -> SyncResult<Value> {
        let method = call.method;
        let url = call.url.clone();
        let send = self.client.send(call);

        let raw = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| SyncError::Timeout(limit))?,
            None => send.await,
        }
        .map_err(SyncError::Transport)?;

        debug!(%method, %url, status = raw.status, "remote call completed");
        classify(raw)
    }
}

/// Classifies a raw response.
pub fn classify(raw: RawResponse) -> SyncResult<Value> {
    if (200..300).contains(&raw.status) {
        return serde_json::from_str(&raw.body).map_err(|e| SyncError::MalformedBody(e.to_string()));
    }
    Err(classify_failure(raw.status, &raw.body))
}

/// Normalizes a classified result into the `Response` handed to handlers.
///
/// Never fails: every error becomes a failure response.
pub fn into_response(result: SyncResult<Value>) -> Response {
    match result {
        Ok(data) => Response::ok(data),
        Err(e) => e.to_response(),
    }
}

fn classify_failure(status: u16, body: &str) -> SyncError {
    if contains_markup(body) {
        return SyncError::OpaqueServer { status };
    }

    let parsed = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => return SyncError::OpaqueServer { status },
    };
    if !parsed.contains_key("code") && !parsed.contains_key("message") {
        return SyncError::OpaqueServer { status };
    }

    let nested_status = parsed
        .get("data")
        .and_then(|data| data.get("status"))
        .map(Status::from_value)
        .unwrap_or_default();

    SyncError::StructuredApi {
        status: nested_status,
        code: text_field(parsed.get("code")),
        message: text_field(parsed.get("message")),
    }
}

/// Returns true if `body` contains something shaped like an HTML tag.
fn contains_markup(body: &str) -> bool {
    MARKUP_RE.is_match(body)
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
