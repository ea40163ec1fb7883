//! Span Exporters
//!
//! The [`SpanExporter`] trait is the downstream side of the filtering layer:
//! a sink that accepts batches of completed spans and supports flush and
//! shutdown. Uses native async fn in traits — no `#[async_trait]` macro.
//!
//! Stock implementations:
//!
//! - [`StdoutExporter`]: one line per span, for local visibility
//! - [`JsonLinesExporter`]: appends spans as JSON Lines to a file
//! - [`NullExporter`]: discards everything (benchmarking)

use crate::span::SpanBatch;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Error types for span export operations
#[derive(Debug, Error, Clone)]
pub enum ExportError {
    /// Transport-layer error (network, file I/O)
    #[error("transport error: {0}")]
    Transport(String),
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Export or flush operation timed out
    #[error("export operation timed out")]
    Timeout,
}

/// Trait for exporting span batches to a backend.
///
/// `force_flush` and `shutdown` are idempotent: calling either twice must
/// not fail, and the second call has no effect beyond the first. Exporters
/// that own a real sink reject `export` after `shutdown`.
///
/// # Note on Object Safety
///
/// The `impl Future` return types are not object-safe. Filtering processors
/// are generic over `E: SpanExporter`; dynamic dispatch happens one level
/// up, at the processor boundary (see `SpanProcessorBoxed`).
pub trait SpanExporter: Send + Sync {
    /// Exports a batch of spans.
    fn export(&self, batch: SpanBatch) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Flushes buffered spans, waiting at most `timeout`.
    fn force_flush(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Releases the exporter. Idempotent.
    fn shutdown(&self) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Returns the exporter name for debugging.
    fn name(&self) -> &str;
}

/// Shared handles export through the same exporter.
///
/// Lets a caller keep an `Arc` to an exporter (e.g. to inspect it after a
/// run) while a filtering processor owns a clone of the same handle.
impl<E: SpanExporter> SpanExporter for Arc<E> {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        self.as_ref().export(batch).await
    }

    async fn force_flush(&self, timeout: Duration) -> Result<(), ExportError> {
        self.as_ref().force_flush(timeout).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.as_ref().shutdown().await
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}

/// Stdout exporter for local runs and debugging
pub struct StdoutExporter {
    verbose: bool,
}

impl StdoutExporter {
    /// Creates a new stdout exporter. When `verbose` is false, exports are
    /// silent (useful in tests).
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl SpanExporter for StdoutExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if self.verbose {
            for span in &batch.spans {
                println!(
                    "[span] name={} kind={:?} duration={}ms status={:?} trace_id={:032x}",
                    span.name,
                    span.kind,
                    span.duration_millis(),
                    span.status,
                    span.trace_id,
                );
            }
        }
        Ok(())
    }

    async fn force_flush(&self, _timeout: Duration) -> Result<(), ExportError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// JSON Lines file exporter: appends each span as one JSON object per line.
///
/// Stands in for a real backend exporter as a durable local sink. The file
/// is opened per export call, so there is no buffered state to flush.
pub struct JsonLinesExporter {
    path: PathBuf,
    shut_down: AtomicBool,
}

impl JsonLinesExporter {
    /// Creates an exporter appending to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Path this exporter appends to.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SpanExporter for JsonLinesExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ExportError::Transport("exporter is shut down".to_string()));
        }

        let mut buf = String::new();
        for span in &batch.spans {
            let line = serde_json::to_string(span)
                .map_err(|e| ExportError::Serialization(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        Ok(())
    }

    async fn force_flush(&self, _timeout: Duration) -> Result<(), ExportError> {
        // Every export call writes through; nothing buffered here.
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.shut_down.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "json_lines"
    }
}

/// Null exporter that discards all spans (for benchmarking)
pub struct NullExporter;

impl NullExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanExporter for NullExporter {
    async fn export(&self, _batch: SpanBatch) -> Result<(), ExportError> {
        Ok(())
    }

    async fn force_flush(&self, _timeout: Duration) -> Result<(), ExportError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Test exporter that records exported spans and lifecycle calls
#[cfg(test)]
pub struct TestExporter {
    spans: std::sync::Mutex<Vec<crate::span::Span>>,
    batch_sizes: std::sync::Mutex<Vec<usize>>,
    flush_calls: std::sync::atomic::AtomicU32,
    shutdown_calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl Default for TestExporter {
    fn default() -> Self {
        Self {
            spans: std::sync::Mutex::new(Vec::new()),
            batch_sizes: std::sync::Mutex::new(Vec::new()),
            flush_calls: std::sync::atomic::AtomicU32::new(0),
            shutdown_calls: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

#[cfg(test)]
impl TestExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exported_count(&self) -> usize {
        self.spans.lock().unwrap().len()
    }

    pub fn all_spans(&self) -> Vec<crate::span::Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn flush_calls(&self) -> u32 {
        self.flush_calls.load(Ordering::Relaxed)
    }

    pub fn shutdown_calls(&self) -> u32 {
        self.shutdown_calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
impl SpanExporter for TestExporter {
    async fn export(&self, batch: SpanBatch) -> Result<(), ExportError> {
        self.batch_sizes.lock().unwrap().push(batch.spans.len());
        self.spans.lock().unwrap().extend(batch.spans);
        Ok(())
    }

    async fn force_flush(&self, _timeout: Duration) -> Result<(), ExportError> {
        self.flush_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        self.shutdown_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "test"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Span, SpanKind};

    fn make_span(name: &str) -> Span {
        Span::new(1, 1, 0, name.to_string(), SpanKind::Internal)
    }

    #[tokio::test]
    async fn test_stdout_exporter() {
        let exporter = StdoutExporter::new(false);
        let result = exporter.export(SpanBatch::single(make_span("test"))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_null_exporter() {
        let exporter = NullExporter::new();
        let mut batch = SpanBatch::new();
        for i in 0..1000 {
            batch.add(Span::new(i as u128, i, 0, "test".to_string(), SpanKind::Internal));
        }
        assert!(exporter.export(batch).await.is_ok());
    }

    #[tokio::test]
    async fn test_json_lines_exporter_appends() {
        let path = std::env::temp_dir().join(format!("span_filter_test_{}.jsonl", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        let exporter = JsonLinesExporter::new(&path);
        exporter.export(SpanBatch::single(make_span("first"))).await.unwrap();
        exporter.export(SpanBatch::single(make_span("second"))).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Span = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.name, "first");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_json_lines_rejects_export_after_shutdown() {
        let path = std::env::temp_dir()
            .join(format!("span_filter_shutdown_{}.jsonl", std::process::id()));
        let exporter = JsonLinesExporter::new(&path);

        exporter.shutdown().await.unwrap();
        // Second shutdown is fine
        exporter.shutdown().await.unwrap();

        let result = exporter.export(SpanBatch::single(make_span("late"))).await;
        assert!(matches!(result, Err(ExportError::Transport(_))));
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_arc_exporter_delegates() {
        let exporter = Arc::new(TestExporter::new());
        let handle = Arc::clone(&exporter);

        handle.export(SpanBatch::single(make_span("shared"))).await.unwrap();
        handle.force_flush(Duration::from_secs(1)).await.unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(exporter.exported_count(), 1);
        assert_eq!(exporter.flush_calls(), 1);
        assert_eq!(exporter.shutdown_calls(), 1);
        assert_eq!(SpanExporter::name(&handle), "test");
    }
}
