//! Legacy HTTP+SSE client transport
//!
//! The server pushes JSON-RPC messages over one long-lived `GET` event
//! stream. Its first `endpoint` event names the URL the client must `POST`
//! its own messages to.

use crate::error::{McpError, McpResult};
use futures::{Sink, Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderValue};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use sse_stream::{Sse, SseStream};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const ENDPOINT_EVENT: &str = "endpoint";
const MESSAGE_EVENT: &str = "message";

/// Failure while posting a client message
#[derive(Debug, Error)]
pub enum SseTransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type SseSink = Pin<Box<dyn Sink<ClientJsonRpcMessage, Error = SseTransportError> + Send>>;
pub type SseReceiver = Pin<Box<dyn Stream<Item = ServerJsonRpcMessage> + Send>>;

type EventStream = Pin<Box<dyn Stream<Item = Result<Sse, sse_stream::Error>> + Send>>;

/// Open the event stream and wait for the message endpoint.
///
/// `timeout` bounds the initial request and the wait for the endpoint event.
/// Once connected, a gap longer than `read_timeout` between two events ends
/// the receive stream.
pub async fn connect(
    client: reqwest::Client,
    url: &str,
    timeout: Duration,
    read_timeout: Duration,
) -> McpResult<(SseSink, SseReceiver)> {
    let base = Url::parse(url)
        .map_err(|e| McpError::ConfigError(format!("invalid SSE url '{url}': {e}")))?;

    let response = tokio::time::timeout(
        timeout,
        client
            .get(base.clone())
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send(),
    )
    .await
    .map_err(|_| McpError::Timeout(timeout))?
    .and_then(|response| response.error_for_status())
    .map_err(|e| McpError::TransportError(format!("SSE connect to {base} failed: {e}")))?;

    let mut events: EventStream = Box::pin(SseStream::from_byte_stream(response.bytes_stream()));
    let endpoint = tokio::time::timeout(timeout, wait_for_endpoint(&mut events, &base))
        .await
        .map_err(|_| McpError::Timeout(timeout))??;
    debug!(url = %base, endpoint = %endpoint, "SSE message endpoint discovered");

    Ok((
        message_sink(client, endpoint, timeout),
        message_stream(events, read_timeout),
    ))
}

async fn wait_for_endpoint(events: &mut EventStream, base: &Url) -> McpResult<Url> {
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| McpError::TransportError(format!("SSE stream error: {e}")))?;
        if event.event.as_deref() != Some(ENDPOINT_EVENT) {
            continue;
        }
        let path = event.data.unwrap_or_default();
        return base.join(path.trim()).map_err(|e| {
            McpError::ProtocolError(format!("invalid endpoint '{}': {e}", path.trim()))
        });
    }
    Err(McpError::TransportError(
        "SSE stream closed before the endpoint event".to_string(),
    ))
}

fn message_sink(client: reqwest::Client, endpoint: Url, timeout: Duration) -> SseSink {
    Box::pin(futures::sink::unfold(
        (client, endpoint),
        move |(client, endpoint), message: ClientJsonRpcMessage| async move {
            client
                .post(endpoint.clone())
                .timeout(timeout)
                .json(&message)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, SseTransportError>((client, endpoint))
        },
    ))
}

fn message_stream(events: EventStream, read_timeout: Duration) -> SseReceiver {
    Box::pin(futures::stream::unfold(events, move |mut events| async move {
        loop {
            let event = match tokio::time::timeout(read_timeout, events.next()).await {
                Err(_) => {
                    warn!(timeout = ?read_timeout, "SSE read timed out, closing stream");
                    return None;
                }
                Ok(None) => return None,
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "SSE stream error, closing stream");
                    return None;
                }
                Ok(Some(Ok(event))) => event,
            };

            let is_message = matches!(event.event.as_deref(), None | Some(MESSAGE_EVENT));
            let Some(data) = event.data.filter(|_| is_message) else {
                continue;
            };
            match serde_json::from_str::<ServerJsonRpcMessage>(&data) {
                Ok(message) => return Some((message, events)),
                Err(e) => warn!(error = %e, "Skipping malformed SSE message"),
            }
        }
    }))
}
