//! HTTP transport tests against a mock server
//!
//! Covers SSE endpoint discovery, message framing, and that handshake
//! failures over HTTP surface as errors without leaving anything connected.

use armory_mcp::sse;
use armory_mcp::{McpError, McpServerConfig, RmcpSessionFactory, SessionFactory, StatefulClient};
use futures::{SinkExt, StreamExt};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn test_sse_discovers_endpoint_and_posts_messages() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: endpoint\ndata: /messages?session=abc\n\n",
        "event: message\ndata: not json\n\n",
        "event: message\n",
        "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/tools/list_changed\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(event_stream(body))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(query_param("session", "abc"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let (mut sink, mut stream) = sse::connect(
        reqwest::Client::new(),
        &format!("{}/sse", server.uri()),
        TIMEOUT,
        TIMEOUT,
    )
    .await
    .unwrap();

    // The malformed event is skipped; the notification comes through.
    let message = stream.next().await.unwrap();
    assert!(matches!(message, ServerJsonRpcMessage::Notification(_)));
    assert!(stream.next().await.is_none());

    let initialized: ClientJsonRpcMessage = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }))
    .unwrap();
    sink.send(initialized).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .find(|request| request.method.as_str() == "POST")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(sent["method"], "notifications/initialized");
}

#[tokio::test]
async fn test_sse_without_endpoint_event_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(event_stream("event: message\ndata: {}\n\n"))
        .mount(&server)
        .await;

    let err = sse::connect(
        reqwest::Client::new(),
        &format!("{}/sse", server.uri()),
        TIMEOUT,
        TIMEOUT,
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, McpError::TransportError(_)));
}

#[tokio::test]
async fn test_sse_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = sse::connect(
        reqwest::Client::new(),
        &format!("{}/sse", server.uri()),
        TIMEOUT,
        TIMEOUT,
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, McpError::TransportError(_)));
}

#[tokio::test]
async fn test_sse_handshake_failure_unwinds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .and(header("authorization", "Bearer token"))
        .respond_with(event_stream("event: endpoint\ndata: /messages\n\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = McpServerConfig::sse("legacy", format!("{}/sse", server.uri()))
        .header("Authorization", "Bearer token")
        .timeout_secs(5);
    let client = StatefulClient::new(config).unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, McpError::HandshakeFailed(_)));
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_streamable_http_handshake_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let factory = RmcpSessionFactory::new(
        McpServerConfig::streamable_http("remote", format!("{}/mcp", server.uri())).timeout_secs(5),
    )
    .unwrap();
    let err = factory.open().await.err().unwrap();
    assert!(err.is_retryable());
}
