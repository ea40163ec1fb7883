//! # Agent Telemetry Filtering Demo
//!
//! Simulates a few turns of an AI-agent session (chat completions, tool
//! executions, debug pings) and routes the resulting spans through two
//! independently filtered exporters:
//!
//! - a console exporter, for local visibility
//! - a JSON Lines file exporter, standing in for a telemetry backend
//!
//! Both are wrapped in a `FilteringSpanProcessor` sharing the same criteria,
//! so noisy `debug_ping` spans and sub-threshold tool calls never reach
//! either sink.
//!
//! ## Running
//!
//! ```bash
//! cargo run -p span_filter --bin agent_demo
//!
//! # With drop diagnostics
//! RUST_LOG=span_filter=trace cargo run -p span_filter --bin agent_demo
//! ```

use rand::Rng;
use span_filter::{
    AttributeValue, FilterCriteria, FilteringSpanProcessor, JsonLinesExporter, Span, SpanKind,
    SpanStatus, StdoutExporter, TracePipeline,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const TRACE_FILE: &str = "agent_traces.jsonl";
const TURNS: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Agent Telemetry Filtering Demo ===\n");

    // --- Filter Criteria ---
    // Drop internal debug pings entirely, and anything faster than 5ms
    // (attribute lookups, cache probes) that would only add noise.
    let criteria = FilterCriteria::new()
        .with_exclude_operations(["debug_ping"])
        .with_min_duration_ms(5);

    println!("Filter criteria:");
    println!("  exclude_operations: {:?}", criteria.exclude_operations);
    println!("  min_duration_ms:    {:?}", criteria.min_duration_ms);
    println!("  operation_key:      {}\n", criteria.operation_key);

    // --- Compose the Export Chain ---
    // Each sink gets its own filtering processor; the pipeline is built
    // once and never mutated afterwards.
    let console_processor = Arc::new(FilteringSpanProcessor::new(
        StdoutExporter::new(true),
        criteria.clone(),
    ));
    let file_exporter = Arc::new(JsonLinesExporter::new(TRACE_FILE));
    let file_processor = Arc::new(FilteringSpanProcessor::new(
        Arc::clone(&file_exporter),
        criteria,
    ));

    let pipeline = TracePipeline::builder()
        .with_shared_processor(console_processor.clone())
        .with_shared_processor(file_processor.clone())
        .build();

    println!(
        "Pipeline composed: {} filtered processors (console + {})\n",
        pipeline.processor_count(),
        TRACE_FILE
    );

    // --- Simulated Agent Session ---
    for turn in 1..=TURNS {
        println!("--- turn {} ---", turn);
        run_agent_turn(&pipeline, turn as u64).await?;
        println!();
    }

    // --- Flush and Shut Down ---
    pipeline.force_flush(Duration::from_secs(30)).await?;
    pipeline.shutdown().await?;

    println!("=== Export Summary ===");
    println!(
        "  {:<18} forwarded={} dropped={}",
        "console",
        console_processor.spans_forwarded(),
        console_processor.spans_dropped(),
    );
    println!(
        "  {:<18} forwarded={} dropped={}",
        TRACE_FILE,
        file_processor.spans_forwarded(),
        file_processor.spans_dropped(),
    );
    println!("\nForwarded spans appended to {}", file_exporter.path().display());

    Ok(())
}

/// One user turn: a root agent span, a chat completion, a tool execution,
/// and the debug pings the agent client emits between steps.
async fn run_agent_turn(
    pipeline: &TracePipeline,
    turn: u64,
) -> Result<(), span_filter::ExportError> {
    let trace_id: u128 = rand::thread_rng().gen();
    let mut next_span_id = turn << 8;
    let mut next_id = || {
        next_span_id += 1;
        next_span_id
    };

    let mut root = Span::new(
        trace_id,
        next_id(),
        0,
        "agent-run".to_string(),
        SpanKind::Client,
    );
    root.set_attribute(
        "gen_ai.operation.name".to_string(),
        AttributeValue::String("invoke_agent".to_string()),
    );
    root.set_attribute(
        "gen_ai.agent.name".to_string(),
        AttributeValue::String("time-assistant".to_string()),
    );
    pipeline.on_start(&root);
    let root_id = root.span_id;

    // Debug ping before the model call; the criteria drop these.
    emit_debug_ping(pipeline, trace_id, next_id(), root_id).await?;

    // Chat completion: ask the model what to do.
    let mut chat = Span::new(
        trace_id,
        next_id(),
        root_id,
        "chat-completion".to_string(),
        SpanKind::Client,
    );
    chat.set_attribute(
        "gen_ai.operation.name".to_string(),
        AttributeValue::String("chat".to_string()),
    );
    chat.set_attribute(
        "gen_ai.request.model".to_string(),
        AttributeValue::String("agent-large".to_string()),
    );
    pipeline.on_start(&chat);
    let chat_ms = rand::thread_rng().gen_range(30..120);
    tokio::time::sleep(Duration::from_millis(chat_ms)).await;
    chat.set_attribute(
        "gen_ai.usage.output_tokens".to_string(),
        AttributeValue::Int(rand::thread_rng().gen_range(20..200)),
    );
    chat.finish(SpanStatus::Ok);
    pipeline.on_end(chat).await?;

    // Tool execution: the model asked for the current time. Short calls
    // (under the 5ms floor) get filtered out.
    let timezone = ["UTC", "America/New_York", "Asia/Tokyo"]
        [rand::thread_rng().gen_range(0..3)];
    let mut tool = Span::new(
        trace_id,
        next_id(),
        root_id,
        "execute_tool get_current_time".to_string(),
        SpanKind::Internal,
    );
    tool.set_attribute(
        "gen_ai.operation.name".to_string(),
        AttributeValue::String("execute_tool".to_string()),
    );
    tool.set_attribute(
        "gen_ai.tool.name".to_string(),
        AttributeValue::String("get_current_time".to_string()),
    );
    tool.set_attribute(
        "tool.argument.timezone".to_string(),
        AttributeValue::String(timezone.to_string()),
    );
    pipeline.on_start(&tool);
    let tool_ms = rand::thread_rng().gen_range(1..15);
    tokio::time::sleep(Duration::from_millis(tool_ms)).await;
    tool.finish(SpanStatus::Ok);
    pipeline.on_end(tool).await?;

    // Another ping after the tool round-trip.
    emit_debug_ping(pipeline, trace_id, next_id(), root_id).await?;

    root.finish(SpanStatus::Ok);
    pipeline.on_end(root).await?;

    Ok(())
}

/// Heartbeat span the agent client emits between steps; always filtered.
async fn emit_debug_ping(
    pipeline: &TracePipeline,
    trace_id: u128,
    span_id: u64,
    parent_span_id: u64,
) -> Result<(), span_filter::ExportError> {
    let mut ping = Span::new(
        trace_id,
        span_id,
        parent_span_id,
        "debug_ping".to_string(),
        SpanKind::Internal,
    );
    ping.set_attribute(
        "gen_ai.operation.name".to_string(),
        AttributeValue::String("debug_ping".to_string()),
    );
    pipeline.on_start(&ping);
    ping.finish(SpanStatus::Ok);
    pipeline.on_end(ping).await
}
