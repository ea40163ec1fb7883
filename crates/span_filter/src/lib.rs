//! Criteria-Based Span Filtering
//!
//! Gates which completed trace spans reach a downstream exporter. The core
//! is [`FilteringSpanProcessor`]: a decorator around any [`SpanExporter`]
//! that evaluates a fixed set of optional predicates ([`FilterCriteria`])
//! against each finished span and either drops it or forwards it unmodified
//! as a single-element batch.
//!
//! Predicates cover name substrings, operation allow/deny lists (matched
//! against a configurable attribute key), a minimum-duration floor, and a
//! span-kind deny-list. Unset predicates never drop; configured predicates
//! combine with AND semantics in a deterministic order.
//!
//! The [`TracePipeline`] provides explicit, caller-owned registration:
//! compose the exporter chain once at startup and register the resulting
//! processors — filtering happens in-process, synchronously, best-effort,
//! after sampling has already taken place.
//!
//! # Example
//!
//! ```
//! use span_filter::{
//!     FilterCriteria, FilteringSpanProcessor, NullExporter, Span, SpanKind,
//!     SpanStatus, TracePipeline,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), span_filter::ExportError> {
//! let criteria = FilterCriteria::new()
//!     .with_exclude_operations(["debug_ping"])
//!     .with_min_duration_ms(10);
//!
//! let pipeline = TracePipeline::builder()
//!     .with_processor(FilteringSpanProcessor::new(NullExporter::new(), criteria))
//!     .build();
//!
//! let mut span = Span::new(1, 1, 0, "chat-completion".to_string(), SpanKind::Client);
//! span.finish(SpanStatus::Ok);
//! pipeline.on_end(span).await?;
//! pipeline.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod exporter;
pub mod filter;
pub mod pipeline;
pub mod processor;
pub mod span;

// Re-export main types
pub use exporter::{ExportError, JsonLinesExporter, NullExporter, SpanExporter, StdoutExporter};
pub use filter::{FilterCriteria, DEFAULT_OPERATION_KEY};
pub use pipeline::{TracePipeline, TracePipelineBuilder};
pub use processor::{FilteringSpanProcessor, SpanProcessor, SpanProcessorBoxed};
pub use span::{AttributeValue, Span, SpanBatch, SpanKind, SpanStatus};
