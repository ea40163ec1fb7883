//! Span Processors
//!
//! A [`SpanProcessor`] sits between the trace pipeline and an exporter: it
//! is notified when spans start and end, and owns the lifecycle of whatever
//! it forwards to. [`FilteringSpanProcessor`] is the interesting one — a
//! decorator that gates which completed spans reach its wrapped exporter
//! based on a fixed [`FilterCriteria`].
//!
//! Uses native async fn in traits; [`SpanProcessorBoxed`] is the
//! object-safe mirror for dynamic dispatch in the pipeline.

use crate::exporter::{ExportError, SpanExporter};
use crate::filter::FilterCriteria;
use crate::span::{Span, SpanBatch};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Trait for components observing the span lifecycle.
///
/// `on_end` is invoked inline on whatever task finishes the span, with no
/// queuing in between: implementations decide per span whether to forward
/// it downstream. `force_flush` and `shutdown` are idempotent.
pub trait SpanProcessor: Send + Sync {
    /// Called when a span starts. Default is a no-op.
    fn on_start(&self, _span: &Span) {}

    /// Called when a span ends.
    fn on_end(&self, span: Span) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Flushes downstream state, waiting at most `timeout`.
    fn force_flush(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Releases the processor and whatever it wraps. Idempotent.
    fn shutdown(&self) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Returns the processor name for debugging.
    fn name(&self) -> &str;
}

/// Object-safe version of [`SpanProcessor`] for dynamic dispatch.
///
/// This trait uses `Pin<Box<dyn Future>>` to allow `dyn SpanProcessorBoxed`.
pub trait SpanProcessorBoxed: Send + Sync {
    /// Called when a span starts.
    fn on_start(&self, span: &Span);

    /// Called when a span ends (boxed future for object safety).
    fn on_end_boxed(
        &self,
        span: Span,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>>;

    /// Flushes downstream state (boxed future for object safety).
    fn force_flush_boxed(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>>;

    /// Releases the processor (boxed future for object safety).
    fn shutdown_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>>;

    /// Returns the processor name for debugging.
    fn name(&self) -> &str;
}

/// Blanket implementation: any SpanProcessor can be used as SpanProcessorBoxed
impl<T: SpanProcessor> SpanProcessorBoxed for T {
    fn on_start(&self, span: &Span) {
        SpanProcessor::on_start(self, span);
    }

    fn on_end_boxed(
        &self,
        span: Span,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>> {
        Box::pin(self.on_end(span))
    }

    fn force_flush_boxed(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>> {
        Box::pin(self.force_flush(timeout))
    }

    fn shutdown_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>> {
        Box::pin(self.shutdown())
    }

    fn name(&self) -> &str {
        SpanProcessor::name(self)
    }
}

/// A processor wrapper that filters completed spans before export.
///
/// Evaluates its [`FilterCriteria`] against every finished span and either
/// drops it or forwards it, unmodified, to the wrapped exporter as a
/// single-element batch. Exactly zero or one export call happens per span.
/// Export failures propagate unchanged — this is a gate, not a resilience
/// layer.
///
/// The wrapped exporter can be shared: pass an `Arc<E>` and keep a clone
/// for inspection after the run.
///
/// # Example
///
/// ```ignore
/// let exporter = Arc::new(JsonLinesExporter::new("traces.jsonl"));
/// let criteria = FilterCriteria::new().with_exclude_operations(["debug_ping"]);
/// let processor = FilteringSpanProcessor::new(Arc::clone(&exporter), criteria);
/// ```
pub struct FilteringSpanProcessor<E: SpanExporter> {
    exporter: E,
    criteria: FilterCriteria,
    /// Metrics: spans forwarded to the wrapped exporter
    spans_forwarded: AtomicU64,
    /// Metrics: spans dropped by the criteria
    spans_dropped: AtomicU64,
}

impl<E: SpanExporter> FilteringSpanProcessor<E> {
    /// Creates a filtering processor in front of `exporter`.
    pub fn new(exporter: E, criteria: FilterCriteria) -> Self {
        Self {
            exporter,
            criteria,
            spans_forwarded: AtomicU64::new(0),
            spans_dropped: AtomicU64::new(0),
        }
    }

    /// The criteria this processor evaluates.
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Spans forwarded to the wrapped exporter so far.
    pub fn spans_forwarded(&self) -> u64 {
        self.spans_forwarded.load(Ordering::Relaxed)
    }

    /// Spans dropped by the criteria so far.
    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }
}

impl<E: SpanExporter> SpanProcessor for FilteringSpanProcessor<E> {
    // No-op: duration and final attributes are unknown until the span ends.
    fn on_start(&self, _span: &Span) {}

    async fn on_end(&self, span: Span) -> Result<(), ExportError> {
        if !self.criteria.allows(&span) {
            self.spans_dropped.fetch_add(1, Ordering::Relaxed);
            trace!(name = %span.name, exporter = self.exporter.name(), "span dropped by filter");
            return Ok(());
        }

        self.spans_forwarded.fetch_add(1, Ordering::Relaxed);
        self.exporter.export(SpanBatch::single(span)).await
    }

    async fn force_flush(&self, timeout: Duration) -> Result<(), ExportError> {
        self.exporter.force_flush(timeout).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        // No filtering state to release; idempotence lives in the exporter.
        self.exporter.shutdown().await
    }

    fn name(&self) -> &str {
        self.exporter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::TestExporter;
    use crate::filter::DEFAULT_OPERATION_KEY;
    use crate::span::{AttributeValue, SpanKind, SpanStatus};
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    /// An exporter that always fails, for error-propagation tests.
    struct FailingExporter {
        export_count: AtomicU32,
    }

    impl FailingExporter {
        fn new() -> Self {
            Self {
                export_count: AtomicU32::new(0),
            }
        }
    }

    impl SpanExporter for FailingExporter {
        async fn export(&self, _batch: SpanBatch) -> Result<(), ExportError> {
            self.export_count.fetch_add(1, Ordering::Relaxed);
            Err(ExportError::Transport("simulated failure".into()))
        }

        async fn force_flush(&self, _timeout: Duration) -> Result<(), ExportError> {
            Err(ExportError::Timeout)
        }

        async fn shutdown(&self) -> Result<(), ExportError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn make_span(name: &str, kind: SpanKind) -> Span {
        let mut span = Span::new(1, 1, 0, name.to_string(), kind);
        span.finish(SpanStatus::Ok);
        span
    }

    fn make_span_with_operation(name: &str, operation: &str) -> Span {
        let mut span = make_span(name, SpanKind::Client);
        span.set_attribute(
            DEFAULT_OPERATION_KEY.to_string(),
            AttributeValue::String(operation.to_string()),
        );
        span
    }

    #[tokio::test]
    async fn test_forwards_as_single_element_batch() {
        let exporter = Arc::new(TestExporter::new());
        let processor =
            FilteringSpanProcessor::new(Arc::clone(&exporter), FilterCriteria::new());

        for i in 0..5 {
            let span = make_span(&format!("op-{}", i), SpanKind::Internal);
            processor.on_end(span).await.unwrap();
        }

        assert_eq!(exporter.exported_count(), 5);
        // One export call per span, each with a batch of exactly one
        assert_eq!(exporter.batch_sizes(), vec![1, 1, 1, 1, 1]);
        assert_eq!(processor.spans_forwarded(), 5);
        assert_eq!(processor.spans_dropped(), 0);
    }

    #[tokio::test]
    async fn test_dropped_span_never_reaches_exporter() {
        let exporter = Arc::new(TestExporter::new());
        let criteria = FilterCriteria::new().with_exclude_operations(["debug_ping"]);
        let processor = FilteringSpanProcessor::new(Arc::clone(&exporter), criteria);

        processor
            .on_end(make_span_with_operation("ping", "debug_ping"))
            .await
            .unwrap();

        assert_eq!(exporter.exported_count(), 0);
        assert_eq!(processor.spans_dropped(), 1);
        assert_eq!(processor.spans_forwarded(), 0);
    }

    #[tokio::test]
    async fn test_drop_returns_ok_even_with_failing_exporter() {
        // A dropped span makes zero exporter calls, so the failing exporter
        // never gets a chance to error.
        let criteria = FilterCriteria::new().with_include_names(["chat"]);
        let processor = FilteringSpanProcessor::new(FailingExporter::new(), criteria);

        let result = processor
            .on_end(make_span("execute_tool", SpanKind::Internal))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_export_failure_propagates_unchanged() {
        let processor =
            FilteringSpanProcessor::new(FailingExporter::new(), FilterCriteria::new());

        let result = processor.on_end(make_span("chat", SpanKind::Client)).await;
        assert!(matches!(result, Err(ExportError::Transport(_))));
        // The span still counts as forwarded: the gate passed it through.
        assert_eq!(processor.spans_forwarded(), 1);
    }

    #[tokio::test]
    async fn test_on_start_is_noop() {
        let exporter = Arc::new(TestExporter::new());
        let processor =
            FilteringSpanProcessor::new(Arc::clone(&exporter), FilterCriteria::new());

        let span = Span::new(1, 1, 0, "chat".to_string(), SpanKind::Client);
        SpanProcessor::on_start(&processor, &span);

        assert_eq!(exporter.exported_count(), 0);
        assert_eq!(processor.spans_forwarded(), 0);
        assert_eq!(processor.spans_dropped(), 0);
    }

    #[tokio::test]
    async fn test_flush_and_shutdown_delegate() {
        let exporter = Arc::new(TestExporter::new());
        let processor =
            FilteringSpanProcessor::new(Arc::clone(&exporter), FilterCriteria::new());

        processor.force_flush(Duration::from_secs(30)).await.unwrap();
        assert_eq!(exporter.flush_calls(), 1);

        processor.shutdown().await.unwrap();
        processor.shutdown().await.unwrap();
        assert_eq!(exporter.shutdown_calls(), 2);
    }

    #[tokio::test]
    async fn test_flush_failure_propagates() {
        let processor =
            FilteringSpanProcessor::new(FailingExporter::new(), FilterCriteria::new());
        let result = processor.force_flush(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ExportError::Timeout)));
    }

    #[tokio::test]
    async fn test_boxed_dispatch() {
        let exporter = Arc::new(TestExporter::new());
        let processor: Arc<dyn SpanProcessorBoxed> = Arc::new(FilteringSpanProcessor::new(
            Arc::clone(&exporter),
            FilterCriteria::new().with_exclude_span_kinds([SpanKind::Consumer]),
        ));

        processor
            .on_end_boxed(make_span("chat", SpanKind::Client))
            .await
            .unwrap();
        processor
            .on_end_boxed(make_span("queue", SpanKind::Consumer))
            .await
            .unwrap();

        assert_eq!(exporter.exported_count(), 1);
        assert_eq!(processor.name(), "test");
    }
}
