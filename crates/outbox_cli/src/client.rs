//! HTTP client backed by reqwest.

use outbox_engine::{HttpCall, HttpClient, RawResponse};
use outbox_protocol::Method;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;

/// Sends coordinator calls over the network.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with a fresh connection pool.
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, call: HttpCall) -> impl Future<Output = Result<RawResponse, String>> + Send {
        let client = self.client.clone();
        async move {
            let mut builder = client.request(to_reqwest(call.method), &call.url);
            for (name, value) in &call.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = call.body {
                let has_content_type = call
                    .headers
                    .keys()
                    .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
                if !has_content_type {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| e.to_string())?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| e.to_string())?;
            Ok(RawResponse::new(status, body))
        }
    }
}
