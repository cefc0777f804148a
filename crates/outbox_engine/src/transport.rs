//! Transport layer abstraction.
//!
//! The engine never talks to the network directly. An `HttpClient` performs
//! one call and reports the raw status and body, or a transport failure;
//! classification happens in the network call layer on top of it.

use outbox_protocol::Method;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One outgoing HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved url.
    pub url: String,
    /// Headers to send.
    pub headers: BTreeMap<String, String>,
    /// Encoded JSON body.
    pub body: Option<String>,
}

impl HttpCall {
    /// Creates a call without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Decodes the body back into JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// Raw status and body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl RawResponse {
    /// Creates a raw response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport (reqwest, hyper, a
/// loopback server in tests). An `Err` means no response was obtained at all.
pub trait HttpClient: Send + Sync + 'static {
    /// Sends one call.
    fn send(&self, call: HttpCall) -> impl Future<Output = Result<RawResponse, String>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn send(&self, call: HttpCall) -> impl Future<Output = Result<RawResponse, String>> + Send {
        (**self).send(call)
    }
}

/// A scripted reply for `MockHttpClient`.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this status and body.
    Respond(RawResponse),
    /// Fail at the transport level.
    Fail(String),
}

impl MockReply {
    fn into_result(self) -> Result<RawResponse, String> {
        match self {
            MockReply::Respond(raw) => Ok(raw),
            MockReply::Fail(message) => Err(message),
        }
    }
}

/// A mock HTTP client for testing.
///
/// Replies are consumed in order; once the script runs out, the fallback
/// reply (`200 {}` by default) is used. Every call is recorded.
#[derive(Debug)]
pub struct MockHttpClient {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<MockReply>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<Vec<HttpCall>>,
}

impl MockHttpClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(MockReply::Respond(RawResponse::new(200, "{}"))),
            latency: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.replies
            .lock()
            .push_back(MockReply::Respond(RawResponse::new(status, body)));
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .push_back(MockReply::Fail(message.into()));
    }

    /// Sets the reply used once the queue is empty.
    pub fn set_fallback(&self, reply: MockReply) {
        *self.fallback.lock() = reply;
    }

    /// Delays every reply.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Returns all calls made so far.
    pub fn calls(&self) -> Vec<HttpCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone())
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for MockHttpClient {
    fn send(&self, call: HttpCall) -> impl Future<Output = Result<RawResponse, String>> + Send {
        self.calls.lock().push(call);
        let reply = self.next_reply();
        let latency = *self.latency.lock();

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            reply.into_result()
        }
    }
}
