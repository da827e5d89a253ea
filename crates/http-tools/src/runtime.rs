//! Runtime for executing outbound tool requests.

use crate::request::OutboundRequest;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// Successful upstream answer.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Parsed JSON when the body is JSON, otherwise the body as a JSON string.
    pub body: Value,
}

/// Shared HTTP client for upstream calls.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    timeout: Option<Duration>,
}

impl UpstreamClient {
    /// `timeout` of `None` or zero disables the per-request timeout.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            client: Client::new(),
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Send `request` and return the upstream body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpToolsError::Transport`] if the request could not be sent (connection,
    /// timeout) and [`HttpToolsError::Http`] for non-2xx responses.
    pub async fn execute(&self, request: &OutboundRequest) -> Result<UpstreamResponse> {
        debug!(
            method = %request.method,
            url = %redact_url(&request.url),
            "upstream request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = body_to_value(&bytes);

        if status.is_success() {
            Ok(UpstreamResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            let status_code = status.as_u16();
            let reason = status.canonical_reason().unwrap_or("Unknown");
            Err(HttpToolsError::Http(format!(
                "API returned {status_code} {reason}: {body}",
            )))
        }
    }
}

fn body_to_value(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(bytes).into_owned()))
}

/// URL without credentials, query or fragment, for logs and error messages.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamSpec, RouteTemplate, ToolDescriptor};
    use crate::request::{UpstreamTarget, build_request};
    use crate::validation::validate_arguments;
    use evolution_test_support::StubUpstream;

    fn request_for(base: &str, route: RouteTemplate, args: Value) -> OutboundRequest {
        let tool = ToolDescriptor::local("t", "test", |_| String::new())
            .param(ParamSpec::string("number"))
            .param(ParamSpec::string("flag").in_query().optional());
        let args = validate_arguments(&tool, &args).expect("valid");
        let target = UpstreamTarget::new(Url::parse(base).expect("url"))
            .var("instance", "inst-1")
            .header("apikey", "k-123");
        build_request(&route, &tool.params, &args, &target).expect("request")
    }

    #[tokio::test]
    async fn execute_sends_headers_body_and_parses_json() {
        let stub = StubUpstream::start(json!({ "status": "sent" }))
            .await
            .expect("stub");
        let req = request_for(
            &stub.base_url(),
            RouteTemplate::post("/message/sendText/{instance}"),
            json!({ "number": "5511" }),
        );

        let resp = UpstreamClient::new(Some(Duration::from_secs(5)))
            .execute(&req)
            .await
            .expect("execute");

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({ "status": "sent" }));

        let seen = stub.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/message/sendText/inst-1");
        assert_eq!(seen[0].header("apikey"), Some("k-123"));
        assert_eq!(seen[0].json_body(), Some(json!({ "number": "5511" })));
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error() {
        let stub = StubUpstream::start_with_status(503, json!({ "error": "down" }))
            .await
            .expect("stub");
        let req = request_for(
            &stub.base_url(),
            RouteTemplate::post("/x/{instance}"),
            json!({ "number": "1" }),
        );

        let err = UpstreamClient::new(None).execute(&req).await.unwrap_err();
        let HttpToolsError::Http(msg) = &err else {
            panic!("expected http error, got {err:?}");
        };
        assert!(msg.contains("503"));
        assert!(msg.contains("down"));
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let port = evolution_test_support::pick_unused_port().expect("port");
        let req = request_for(
            &format!("http://127.0.0.1:{port}"),
            RouteTemplate::get("/x/{instance}"),
            json!({ "number": "1", "flag": "secret-query" }),
        );

        let err = UpstreamClient::new(Some(Duration::from_secs(2)))
            .execute(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpToolsError::Transport(_)));
        assert!(!err.to_string().contains("secret-query"));
    }

    #[test]
    fn zero_timeout_disables_timeout() {
        assert_eq!(UpstreamClient::new(Some(Duration::ZERO)).timeout(), None);
        assert_eq!(
            UpstreamClient::new(Some(Duration::from_secs(3))).timeout(),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn non_json_body_becomes_string() {
        assert_eq!(body_to_value(b"plain text"), json!("plain text"));
        assert_eq!(body_to_value(b"[1,2]"), json!([1, 2]));
        assert_eq!(body_to_value(b""), json!(""));
    }

    #[test]
    fn redact_url_drops_query_and_credentials() {
        let url = Url::parse("http://user:pw@host/a?token=x#f").expect("url");
        assert_eq!(redact_url(&url), "http://host/a");
    }
}
