//! Dispatch Performance Benchmarks
//!
//! Measures the overhead the toolkit adds around a tool: schema listing over
//! registries of different sizes, single-chunk dispatch, and streaming
//! dispatch with the one-chunk lookahead.

use armory::prelude::*;
use armory::{ExtensionSchema, ToolSchema};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::time::Duration;
use tokio::runtime::Runtime;

fn echo_tool(name: &str) -> FunctionTool {
    FunctionTool::sync(
        ToolSignature::new(name, "Echo the query")
            .param(ParamSpec::string("query", "Text to echo"))
            .param(ParamSpec::string("api_key", "Credential"))
            .accepts_extra(),
        |args| Ok(ResponseChunk::text(args["query"].as_str().unwrap_or_default())),
    )
}

fn streaming_tool(chunks: usize) -> FunctionTool {
    FunctionTool::sync_stream(ToolSignature::new("stream", "Emit chunks"), move |_args| {
        (0..chunks).map(|i| Ok(ResponseChunk::text(i.to_string())))
    })
}

async fn toolkit_with(size: usize) -> Toolkit {
    let toolkit = Toolkit::new();
    for i in 0..size {
        toolkit
            .register_with(
                ToolRegistration::new(echo_tool(&format!("tool{i}")))
                    .preset("api_key", json!("secret"))
                    .extension(
                        ExtensionSchema::new().field(ParamSpec::integer("confidence", "0-100")),
                    ),
            )
            .await
            .expect("registration succeeds");
    }
    toolkit
}

/// Benchmark schema listing
fn bench_list_schemas(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("list_schemas");
    group.measurement_time(Duration::from_secs(5));

    for size in [3usize, 20, 100] {
        let toolkit = rt.block_on(toolkit_with(size));
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &toolkit, |b, toolkit| {
            b.to_async(&rt).iter(|| async {
                let schemas: Vec<ToolSchema> = toolkit.list_schemas().await;
                std::hint::black_box(schemas)
            })
        });
    }

    group.finish();
}

/// Benchmark a single-chunk call end to end
fn bench_call_tool(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let toolkit = rt.block_on(toolkit_with(20));
    let mut group = c.benchmark_group("call_tool");
    group.throughput(Throughput::Elements(1));

    group.bench_function("sync_single_chunk", |b| {
        b.to_async(&rt).iter(|| async {
            let call =
                ToolUse::from_json("tool7", json!({"query": "bench"})).expect("object input");
            let chunks = toolkit
                .call_tool_collect(call, CancellationToken::new())
                .await
                .expect("dispatch succeeds");
            std::hint::black_box(chunks)
        })
    });

    group.finish();
}

/// Benchmark streaming dispatch
fn bench_streaming(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("streaming");

    for chunks in [1usize, 10, 100] {
        let toolkit = Toolkit::new();
        rt.block_on(toolkit.register(streaming_tool(chunks)))
            .expect("registration succeeds");
        group.throughput(Throughput::Elements(chunks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunks), &toolkit, |b, toolkit| {
            b.to_async(&rt).iter(|| async {
                let call = ToolUse::new("stream", Arguments::new());
                let collected = toolkit
                    .call_tool_collect(call, CancellationToken::new())
                    .await
                    .expect("dispatch succeeds");
                std::hint::black_box(collected)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_list_schemas, bench_call_tool, bench_streaming);
criterion_main!(benches);
