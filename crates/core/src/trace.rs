//! Span capability used by the worker to continue a submitter's trace.
//!
//! [`TaskTracer`] is the only tracing surface the worker depends on: open a
//! span (optionally parented on a [`TraceParent`]) with task attributes,
//! then close it with a status. [`LogTracer`] is the default backend and
//! emits `tracing` spans/events carrying the W3C ids, so any subscriber
//! (fmt, JSON) can reconstruct the cross-process trace.

use std::time::Instant;

use crate::correlation::TraceParent;
use crate::task::TaskKind;
use crate::types::TaskId;

/// Attributes attached to a task span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpanAttributes {
    pub task_kind: TaskKind,
    pub task_id: TaskId,
    pub request_id: Option<String>,
}

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error(String),
}

/// An open span returned by [`TaskTracer::start_span`].
#[derive(Debug)]
pub struct ActiveSpan {
    pub name: &'static str,
    /// Identity of this span, usable as the parent of downstream work.
    pub context: TraceParent,
    /// Span id of the remote parent, when the span continues a trace.
    pub parent_span_id: Option<String>,
    pub attributes: TaskSpanAttributes,
    started: Instant,
    span: tracing::Span,
}

impl ActiveSpan {
    pub fn new(
        name: &'static str,
        context: TraceParent,
        parent_span_id: Option<String>,
        attributes: TaskSpanAttributes,
        span: tracing::Span,
    ) -> Self {
        Self {
            name,
            context,
            parent_span_id,
            attributes,
            started: Instant::now(),
            span,
        }
    }

    /// The `tracing` span to instrument work inside this span with.
    pub fn tracing_span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Start/end span capability.
pub trait TaskTracer: Send + Sync {
    fn start_span(
        &self,
        name: &'static str,
        parent: Option<&TraceParent>,
        attributes: TaskSpanAttributes,
    ) -> ActiveSpan;

    fn end_span(&self, span: ActiveSpan, status: SpanStatus);
}

/// Default tracer backed by the `tracing` crate.
#[derive(Debug, Clone)]
pub struct LogTracer {
    service_name: String,
}

impl LogTracer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl TaskTracer for LogTracer {
    fn start_span(
        &self,
        name: &'static str,
        parent: Option<&TraceParent>,
        attributes: TaskSpanAttributes,
    ) -> ActiveSpan {
        let context = match parent {
            Some(parent) => parent.child(),
            None => TraceParent::new_root(),
        };
        let parent_span_id = parent.map(|p| p.span_id().to_string());

        let span = tracing::info_span!(
            "task",
            otel.name = name,
            service.name = %self.service_name,
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            parent_span_id = parent_span_id.as_deref().unwrap_or(""),
            task.kind = %attributes.task_kind,
            task.id = %attributes.task_id,
            request_id = attributes.request_id.as_deref().unwrap_or(""),
        );

        span.in_scope(|| {
            tracing::debug!(
                linked = parent.is_some(),
                sampled = context.is_sampled(),
                "Span started",
            );
        });

        ActiveSpan::new(name, context, parent_span_id, attributes, span)
    }

    fn end_span(&self, span: ActiveSpan, status: SpanStatus) {
        let elapsed_ms = span.elapsed_ms();
        span.tracing_span().in_scope(|| match &status {
            SpanStatus::Ok => {
                tracing::info!(elapsed_ms, status = "ok", "Span ended");
            }
            SpanStatus::Error(message) => {
                tracing::warn!(elapsed_ms, status = "error", error = %message, "Span ended");
            }
        });
    }
}
