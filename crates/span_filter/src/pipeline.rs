//! Trace Pipeline
//!
//! Explicit, caller-owned processor registration. The process composes its
//! exporter chain once at startup — construct each exporter, wrap it in a
//! processor, hand the processors to the builder — and the built pipeline
//! is immutable from then on. There is no runtime-managed processor list to
//! inspect or splice.
//!
//! Every registered processor sees every span independently. Relative order
//! between processors is an implementation detail and must not be relied
//! upon.

use crate::exporter::ExportError;
use crate::processor::{SpanProcessor, SpanProcessorBoxed};
use crate::span::Span;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Builder collecting processors before the pipeline is sealed.
#[derive(Default)]
pub struct TracePipelineBuilder {
    processors: Vec<Arc<dyn SpanProcessorBoxed>>,
}

impl TracePipelineBuilder {
    /// Registers a processor the pipeline will own exclusively.
    pub fn with_processor<P>(self, processor: P) -> Self
    where
        P: SpanProcessor + 'static,
    {
        self.with_shared_processor(Arc::new(processor))
    }

    /// Registers a shared processor. Use this when the caller keeps a
    /// handle, e.g. to read filter metrics after the run.
    pub fn with_shared_processor(mut self, processor: Arc<dyn SpanProcessorBoxed>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Seals the pipeline.
    pub fn build(self) -> TracePipeline {
        TracePipeline {
            processors: self.processors,
        }
    }
}

/// An immutable fan-out of span lifecycle events to registered processors.
pub struct TracePipeline {
    processors: Vec<Arc<dyn SpanProcessorBoxed>>,
}

impl TracePipeline {
    /// Starts composing a pipeline.
    pub fn builder() -> TracePipelineBuilder {
        TracePipelineBuilder::default()
    }

    /// Number of registered processors.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Notifies every processor that a span has started.
    pub fn on_start(&self, span: &Span) {
        for processor in &self.processors {
            processor.on_start(span);
        }
    }

    /// Hands a completed span to every processor.
    ///
    /// All processors are invoked even if one fails; the first error is
    /// returned after the fan-out completes.
    pub async fn on_end(&self, span: Span) -> Result<(), ExportError> {
        let mut first_err = None;
        for processor in &self.processors {
            if let Err(e) = processor.on_end_boxed(span.clone()).await {
                warn!(processor = processor.name(), error = %e, "span export failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flushes every processor, waiting at most `timeout` for each.
    pub async fn force_flush(&self, timeout: Duration) -> Result<(), ExportError> {
        let mut first_err = None;
        for processor in &self.processors {
            if let Err(e) = processor.force_flush_boxed(timeout).await {
                warn!(processor = processor.name(), error = %e, "flush failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Shuts down every processor. Idempotent.
    pub async fn shutdown(&self) -> Result<(), ExportError> {
        let mut first_err = None;
        for processor in &self.processors {
            if let Err(e) = processor.shutdown_boxed().await {
                warn!(processor = processor.name(), error = %e, "shutdown failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
