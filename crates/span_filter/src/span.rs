//! Span Data Model
//!
//! An OpenTelemetry-compatible span value type: name, kind, start/end
//! timestamps at nanosecond resolution, and a key/value attribute map.
//! Spans are plain data — the filtering layer only ever reads them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Typed attribute value attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Returns the string content if this is a `String` attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Role of a span relative to its trace, mirroring the OpenTelemetry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanKind {
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

/// Outcome recorded when a span finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanStatus {
    /// Span has not finished (or finished without an explicit status).
    Unset,
    Ok,
    Error,
}

/// A completed (or in-flight) trace span.
///
/// Timestamps are nanoseconds since the Unix epoch. Invariant:
/// `end_time_ns >= start_time_ns` — `finish` maintains it even if the
/// system clock steps backwards between start and end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub trace_id: u128,
    pub span_id: u64,
    /// Parent span id, 0 for root spans.
    pub parent_span_id: u64,
    pub name: String,
    pub kind: SpanKind,
    pub start_time_ns: u64,
    pub end_time_ns: u64,
    pub status: SpanStatus,
    pub attributes: HashMap<String, AttributeValue>,
}

impl Span {
    /// Creates a new span starting now.
    pub fn new(
        trace_id: u128,
        span_id: u64,
        parent_span_id: u64,
        name: String,
        kind: SpanKind,
    ) -> Self {
        let now = unix_nanos();
        Self {
            trace_id,
            span_id,
            parent_span_id,
            name,
            kind,
            start_time_ns: now,
            end_time_ns: now,
            status: SpanStatus::Unset,
            attributes: HashMap::new(),
        }
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attribute(&mut self, key: String, value: AttributeValue) {
        self.attributes.insert(key, value);
    }

    /// Looks up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Finishes the span now with the given status.
    pub fn finish(&mut self, status: SpanStatus) {
        self.end_time_ns = unix_nanos().max(self.start_time_ns);
        self.status = status;
    }

    /// Span duration in nanoseconds.
    pub fn duration_nanos(&self) -> u64 {
        self.end_time_ns.saturating_sub(self.start_time_ns)
    }

    /// Span duration in whole milliseconds (truncating).
    pub fn duration_millis(&self) -> u64 {
        self.duration_nanos() / 1_000_000
    }
}

/// A batch of spans handed to an exporter in one call.
#[derive(Debug, Clone, Default)]
pub struct SpanBatch {
    pub spans: Vec<Span>,
}

impl SpanBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch from existing spans.
    pub fn with_spans(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    /// Creates a batch containing exactly one span.
    pub fn single(span: Span) -> Self {
        Self { spans: vec![span] }
    }

    /// Appends a span to the batch.
    pub fn add(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_duration() {
        let mut span = Span::new(1, 1, 0, "op".to_string(), SpanKind::Internal);
        span.start_time_ns = 1_000_000_000;
        span.end_time_ns = 1_099_900_000; // 99.9ms later
        assert_eq!(span.duration_nanos(), 99_900_000);
        assert_eq!(span.duration_millis(), 99); // truncates, not rounds
    }

    #[test]
    fn test_duration_never_underflows() {
        let mut span = Span::new(1, 1, 0, "op".to_string(), SpanKind::Internal);
        span.start_time_ns = 2_000;
        span.end_time_ns = 1_000;
        assert_eq!(span.duration_nanos(), 0);
    }

    #[test]
    fn test_finish_keeps_end_after_start() {
        let mut span = Span::new(1, 1, 0, "op".to_string(), SpanKind::Client);
        // Start artificially in the future; finish must not move end before it.
        span.start_time_ns = u64::MAX;
        span.finish(SpanStatus::Ok);
        assert_eq!(span.end_time_ns, span.start_time_ns);
        assert_eq!(span.status, SpanStatus::Ok);
    }

    #[test]
    fn test_attributes() {
        let mut span = Span::new(1, 2, 0, "chat".to_string(), SpanKind::Client);
        span.set_attribute(
            "gen_ai.operation.name".to_string(),
            AttributeValue::String("chat".to_string()),
        );
        span.set_attribute("retries".to_string(), AttributeValue::Int(2));

        assert_eq!(
            span.attribute("gen_ai.operation.name").and_then(AttributeValue::as_str),
            Some("chat")
        );
        // Non-string attributes have no string view
        assert_eq!(span.attribute("retries").and_then(AttributeValue::as_str), None);
        assert_eq!(span.attribute("missing"), None);
    }

    #[test]
    fn test_batch_helpers() {
        let mut batch = SpanBatch::new();
        assert!(batch.is_empty());

        batch.add(Span::new(1, 1, 0, "a".to_string(), SpanKind::Internal));
        assert_eq!(batch.len(), 1);

        let single = SpanBatch::single(Span::new(1, 2, 0, "b".to_string(), SpanKind::Internal));
        assert_eq!(single.len(), 1);
        assert_eq!(single.spans[0].name, "b");
    }

    #[test]
    fn test_span_serde_round_trip() {
        let mut span = Span::new(u128::MAX, 42, 7, "execute_tool".to_string(), SpanKind::Internal);
        span.set_attribute("cache.hit".to_string(), AttributeValue::Bool(true));
        span.finish(SpanStatus::Error);

        let json = serde_json::to_string(&span).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trace_id, u128::MAX);
        assert_eq!(back.span_id, 42);
        assert_eq!(back.name, "execute_tool");
        assert_eq!(back.status, SpanStatus::Error);
        assert_eq!(back.attribute("cache.hit"), Some(&AttributeValue::Bool(true)));
    }
}
