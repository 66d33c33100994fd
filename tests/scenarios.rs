//! End-to-end scenarios across the whole workspace
//!
//! Each test drives the public facade the way an agent loop would: register,
//! list schemas, dispatch, and read the resulting chunks.

use armory::prelude::*;
use armory::{DEFAULT_GROUP, ExtensionSchema, McpError, StatefulClient, StatelessClient};
use armory_testing::{MockTool, ScriptedSessionFactory};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;

fn call(name: &str, input: serde_json::Value) -> ToolUse {
    ToolUse::from_json(name, input).unwrap()
}

fn args(value: serde_json::Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}

/// Scenario A: a preset argument is hidden from the schema and wins over the caller.
#[tokio::test]
async fn scenario_a_preset_arguments() {
    let toolkit = Toolkit::new();
    let search = FunctionTool::asynchronous(
        ToolSignature::new("search", "Search the web")
            .param(ParamSpec::string("query", "What to look for"))
            .param(ParamSpec::string("apiKey", "Search API key")),
        |args, _ctx| async move {
            Ok(ResponseChunk::text(format!(
                "results for {} using key {}",
                args["query"].as_str().unwrap_or_default(),
                args["apiKey"].as_str().unwrap_or_default()
            )))
        },
    );
    toolkit
        .register_with(ToolRegistration::new(search).preset("apiKey", json!("xxx")))
        .await
        .unwrap();

    let schemas = toolkit.list_schemas().await;
    assert_eq!(schemas.len(), 1);
    assert!(schemas[0].has_property("query"));
    assert!(!schemas[0].has_property("apiKey"));
    assert_eq!(schemas[0].parameters.required, vec!["query".to_string()]);

    let chunks = toolkit
        .call_tool_collect(call("search", json!({"query": "AgentScope"})), CancellationToken::new())
        .await
        .unwrap();
    assert!(chunks[0].text_content().contains("xxx"));

    // A caller-supplied value for the preset key is ignored.
    let chunks = toolkit
        .call_tool_collect(
            call("search", json!({"query": "AgentScope", "apiKey": "stolen"})),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(chunks[0].text_content().ends_with("using key xxx"));
}

/// Scenario B: group activation changes the listing without re-registration.
#[tokio::test]
async fn scenario_b_group_activation() {
    let toolkit = Toolkit::new();
    toolkit
        .create_group(
            "browser_use",
            "Drive a web browser",
            false,
            Some("Close tabs when done".into()),
        )
        .await
        .unwrap();
    toolkit
        .register_with(ToolRegistration::new(MockTool::new("navigate")).group("browser_use"))
        .await
        .unwrap();
    toolkit
        .register_with(ToolRegistration::new(MockTool::new("click")).group("browser_use"))
        .await
        .unwrap();
    toolkit.register(MockTool::new("execute_python_code")).await.unwrap();

    let schemas = toolkit.list_schemas().await;
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "execute_python_code");
    assert!(toolkit.contains("navigate").await);

    toolkit.set_active(&["browser_use"], true).await.unwrap();
    assert_eq!(toolkit.list_schemas().await.len(), 3);
    assert_eq!(toolkit.activated_notes().await, vec!["Close tabs when done".to_string()]);

    // The default group cannot be switched off.
    toolkit.set_active(&[DEFAULT_GROUP], false).await.unwrap();
    toolkit.set_active(&["browser_use"], false).await.unwrap();
    assert_eq!(toolkit.list_schemas().await.len(), 1);
}

/// Scenario C: cancellation merges into the last emitted chunk.
#[tokio::test]
async fn scenario_c_streaming_cancellation() {
    let first_sent = Arc::new(Notify::new());
    let signal = Arc::clone(&first_sent);
    let counter = FunctionTool::async_stream(
        ToolSignature::new("count", "Stream digits"),
        move |_args, _ctx| {
            let signal = Arc::clone(&signal);
            async_stream::stream! {
                yield Ok::<_, ToolError>(ResponseChunk::text("1234"));
                signal.notify_one();
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                yield Ok(ResponseChunk::text("5678"));
            }
        },
    );

    let toolkit = Toolkit::new();
    toolkit.register(counter).await.unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        first_sent.notified().await;
        canceller.cancel();
    });

    let chunks = toolkit
        .call_tool_collect(call("count", json!({})), cancel)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text_without_note(), "1234");
    assert!(chunks[0].is_interrupted);
    assert!(chunks[0].is_last);
}

/// Scenario D: a stateful client needs `connect` and then reuses its session.
#[tokio::test]
async fn scenario_d_stateful_session_reuse() {
    let factory = ScriptedSessionFactory::builder("browser")
        .tool("navigate", &["url"])
        .build();
    let client = StatefulClient::with_factory(Arc::new(factory.clone()));

    let err = client.get_callable("navigate", true).await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionState(_)));

    client.connect().await.unwrap();
    let navigate = client.get_callable("navigate", true).await.unwrap();
    navigate.call(args(json!({"url": "a"}))).await.unwrap();
    navigate.call(args(json!({"url": "b"}))).await.unwrap();

    assert_eq!(factory.handshake_count(), 1);
    let sessions: Vec<usize> = factory.calls().iter().map(|c| c.session).collect();
    assert_eq!(sessions, vec![1, 1]);
    client.close().await.unwrap();
}

/// Scenario E: a stateless callable handshakes per call and isolates failures.
#[tokio::test]
async fn scenario_e_stateless_isolation() {
    let factory = ScriptedSessionFactory::builder("search")
        .tool("search", &["query"])
        .fail_call(1)
        .build();
    let client = StatelessClient::with_factory(Arc::new(factory.clone()));
    let search = client.get_callable("search", true).await.unwrap();
    let before = factory.handshake_count();

    let first = search.call(args(json!({"query": "a"}))).await;
    let second = search.call(args(json!({"query": "b"}))).await;

    assert!(first.is_err());
    assert!(second.is_ok());
    assert_eq!(factory.handshake_count() - before, 2);
}

/// An extension adds parameters without touching the declared ones.
#[tokio::test]
async fn extension_schema_adds_fields() {
    let toolkit = Toolkit::new();
    let tool = FunctionTool::sync(
        ToolSignature::new("generate_response", "Answer the user")
            .param(ParamSpec::string("response", "The answer"))
            .accepts_extra(),
        |args| Ok(ResponseChunk::data(serde_json::Value::Object(args))),
    );
    toolkit.register(tool).await.unwrap();
    toolkit
        .set_extension(
            "generate_response",
            Some(ExtensionSchema::new().field(ParamSpec::integer("confidence", "0-100"))),
        )
        .await
        .unwrap();

    let schema = toolkit.list_schemas().await.remove(0);
    assert!(schema.has_property("response"));
    assert!(schema.has_property("confidence"));

    let mut stream = toolkit
        .call_tool(
            call("generate_response", json!({"response": "hi", "confidence": 90})),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let chunk = stream.next().await.unwrap().unwrap();
    assert!(matches!(&chunk.content[0], ContentBlock::Data { data } if data["confidence"] == 90));
}
