//! Filter Criteria
//!
//! A fixed set of optional predicates evaluated against completed spans.
//! Evaluation order is deterministic with short-circuit semantics:
//!
//! 1. `include_names` — name must contain one of the substrings
//! 2. `operation_names` — operation attribute must be in the allow-list
//! 3. `min_duration_ms` — duration floor in whole milliseconds
//! 4. `exclude_operations` — operation attribute must not be in the deny-list
//! 5. `exclude_span_kinds` — span kind must not be in the deny-list
//!
//! Every criterion is optional; an absent or empty criterion is not applied
//! and never causes a drop. Configured criteria combine with AND semantics.
//! Evaluation is pure: the span is only read, never mutated.

use crate::span::{AttributeValue, Span, SpanKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Attribute key consulted by the operation-based predicates when no other
/// key is configured. Matches the GenAI semantic convention emitted by
/// agent-framework instrumentation.
pub const DEFAULT_OPERATION_KEY: &str = "gen_ai.operation.name";

/// Immutable filter configuration, constructed once at startup.
///
/// Deserialization tolerates unknown keys and fills missing criteria with
/// "not applied", so a partially populated static configuration is valid.
///
/// # Example
///
/// ```
/// use span_filter::FilterCriteria;
/// use span_filter::SpanKind;
///
/// let criteria = FilterCriteria::new()
///     .with_include_names(["chat", "execute_tool"])
///     .with_min_duration_ms(100)
///     .with_exclude_span_kinds([SpanKind::Consumer]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Span passes only if its name contains at least one of these
    /// substrings (case-sensitive). Empty = not applied.
    pub include_names: Vec<String>,
    /// Allow-list for the operation attribute. A span whose operation
    /// attribute is absent does not match. Empty = not applied.
    pub operation_names: HashSet<String>,
    /// Minimum span duration in whole milliseconds. `None` = not applied.
    pub min_duration_ms: Option<u64>,
    /// Deny-list for the operation attribute. A span whose operation
    /// attribute is absent is not dropped. Empty = not applied.
    pub exclude_operations: HashSet<String>,
    /// Span kinds to drop. Empty = not applied.
    pub exclude_span_kinds: HashSet<SpanKind>,
    /// Attribute key holding the operation identifier.
    pub operation_key: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            include_names: Vec::new(),
            operation_names: HashSet::new(),
            min_duration_ms: None,
            exclude_operations: HashSet::new(),
            exclude_span_kinds: HashSet::new(),
            operation_key: DEFAULT_OPERATION_KEY.to_string(),
        }
    }
}

impl FilterCriteria {
    /// Creates criteria with no predicates applied (every span passes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name-substring allow-list.
    pub fn with_include_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the operation allow-list.
    pub fn with_operation_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operation_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the minimum duration floor in milliseconds.
    pub fn with_min_duration_ms(mut self, floor: u64) -> Self {
        self.min_duration_ms = Some(floor);
        self
    }

    /// Sets the operation deny-list.
    pub fn with_exclude_operations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_operations = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the span-kind deny-list.
    pub fn with_exclude_span_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = SpanKind>,
    {
        self.exclude_span_kinds = kinds.into_iter().collect();
        self
    }

    /// Overrides the attribute key holding the operation identifier.
    pub fn with_operation_key(mut self, key: impl Into<String>) -> Self {
        self.operation_key = key.into();
        self
    }

    /// Returns true if no criterion is applied.
    pub fn is_empty(&self) -> bool {
        self.include_names.is_empty()
            && self.operation_names.is_empty()
            && self.min_duration_ms.is_none()
            && self.exclude_operations.is_empty()
            && self.exclude_span_kinds.is_empty()
    }

    /// Evaluates all configured predicates against a completed span.
    ///
    /// Returns true if the span should be forwarded. Short-circuits at the
    /// first failing predicate.
    pub fn allows(&self, span: &Span) -> bool {
        self.passes_include_names(span)
            && self.passes_operation_names(span)
            && self.passes_min_duration(span)
            && self.passes_exclude_operations(span)
            && self.passes_exclude_span_kinds(span)
    }

    /// The span's operation identifier, if present as a string attribute.
    fn operation<'a>(&self, span: &'a Span) -> Option<&'a str> {
        span.attribute(&self.operation_key)
            .and_then(AttributeValue::as_str)
    }

    fn passes_include_names(&self, span: &Span) -> bool {
        if self.include_names.is_empty() {
            return true;
        }
        self.include_names
            .iter()
            .any(|needle| span.name.contains(needle.as_str()))
    }

    fn passes_operation_names(&self, span: &Span) -> bool {
        if self.operation_names.is_empty() {
            return true;
        }
        // Absent operation attribute is a non-match for the allow-list.
        self.operation(span)
            .is_some_and(|op| self.operation_names.contains(op))
    }

    fn passes_min_duration(&self, span: &Span) -> bool {
        match self.min_duration_ms {
            Some(floor) => span.duration_millis() >= floor,
            None => true,
        }
    }

    fn passes_exclude_operations(&self, span: &Span) -> bool {
        if self.exclude_operations.is_empty() {
            return true;
        }
        // Absent operation attribute passes the deny-list.
        !self
            .operation(span)
            .is_some_and(|op| self.exclude_operations.contains(op))
    }

    fn passes_exclude_span_kinds(&self, span: &Span) -> bool {
        !self.exclude_span_kinds.contains(&span.kind)
    }
}
