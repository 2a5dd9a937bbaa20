use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::ids::{SpanId, TraceFlags, TraceId};

thread_local! {
    static ACTIVE: RefCell<Vec<SpanContext>> = const { RefCell::new(Vec::new()) };
}

/// Identity of one span within a distributed trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub trace_flags: TraceFlags,
    /// W3C `tracestate` list, carried verbatim.
    pub trace_state: String,
    /// True when this context was received from another process or task.
    pub remote: bool,
}

impl SpanContext {
    /// A sampled, local context.
    pub fn new(trace_id: TraceId, span_id: SpanId) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags: TraceFlags::SAMPLED,
            trace_state: String::new(),
            remote: false,
        }
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    /// The context of the span currently entered on this thread, if any.
    pub fn current() -> Option<SpanContext> {
        ACTIVE.with(|active| active.borrow().last().cloned())
    }

    fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: SpanId::random(),
            trace_flags: self.trace_flags,
            trace_state: self.trace_state.clone(),
            remote: false,
        }
    }

    fn root() -> Self {
        Self::new(TraceId::random(), SpanId::random())
    }
}

/// A span that has ended, as seen by a [`SpanRecorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinishedSpan {
    pub name: String,
    pub service: String,
    pub context: SpanContext,
    pub parent: Option<SpanContext>,
    pub duration: Duration,
}

/// In-memory exporter collecting finished spans.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct SpanRecorder {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl SpanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, span: FinishedSpan) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(span);
    }

    /// All finished spans in the order they ended.
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find(&self, name: &str) -> Option<FinishedSpan> {
        self.spans().into_iter().find(|s| s.name == name)
    }

    pub fn find_all(&self, name: &str) -> Vec<FinishedSpan> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

struct TracerInner {
    service: String,
    recorder: Option<SpanRecorder>,
}

/// Starts spans for one service. Cheap to clone.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new("order-outbox")
    }
}

impl Tracer {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                service: service.into(),
                recorder: None,
            }),
        }
    }

    /// A tracer that also exports finished spans into `recorder`.
    pub fn with_recorder(service: impl Into<String>, recorder: SpanRecorder) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                service: service.into(),
                recorder: Some(recorder),
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn recorder(&self) -> Option<&SpanRecorder> {
        self.inner.recorder.as_ref()
    }

    /// Start a span as a child of the span active on this thread, or as the
    /// root of a new trace when none is active.
    pub fn start(&self, name: impl Into<String>) -> Span {
        match SpanContext::current() {
            Some(parent) => self.start_with_parent(name, &parent),
            None => self.start_span(name.into(), SpanContext::root(), None),
        }
    }

    /// Start a span under an explicit parent. An invalid parent starts a new
    /// trace instead.
    pub fn start_with_parent(&self, name: impl Into<String>, parent: &SpanContext) -> Span {
        if parent.is_valid() {
            self.start_span(name.into(), parent.child(), Some(parent.clone()))
        } else {
            self.start_span(name.into(), SpanContext::root(), None)
        }
    }

    /// Continue a trace received across an asynchronous boundary.
    ///
    /// The recorded parent is marked remote.
    pub fn start_with_remote_parent(&self, name: impl Into<String>, remote: &SpanContext) -> Span {
        self.start_with_parent(name, &remote.clone().with_remote(true))
    }

    fn start_span(&self, name: String, context: SpanContext, parent: Option<SpanContext>) -> Span {
        let log_span = tracing::info_span!(
            "span",
            span_name = %name,
            trace_id = %context.trace_id,
            span_id = %context.span_id,
        );
        Span {
            name,
            context,
            parent,
            started: Instant::now(),
            tracer: self.clone(),
            log_span,
            ended: false,
        }
    }
}

/// A unit of traced work. Ends when dropped or when [`Span::end`] is called.
pub struct Span {
    name: String,
    context: SpanContext,
    parent: Option<SpanContext>,
    started: Instant,
    tracer: Tracer,
    log_span: tracing::Span,
    ended: bool,
}

impl Span {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn parent(&self) -> Option<&SpanContext> {
        self.parent.as_ref()
    }

    /// Make this span the active span on the current thread until the guard
    /// is dropped. Log lines emitted meanwhile carry its trace and span ids.
    pub fn enter(&self) -> SpanGuard<'_> {
        ACTIVE.with(|active| active.borrow_mut().push(self.context.clone()));
        SpanGuard {
            _entered: self.log_span.enter(),
        }
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let duration = self.started.elapsed();
        tracing::debug!(
            span_name = %self.name,
            trace_id = %self.context.trace_id,
            span_id = %self.context.span_id,
            parent_span_id = ?self.parent.as_ref().map(|p| p.span_id.to_string()),
            remote_parent = self.parent.as_ref().is_some_and(|p| p.remote),
            elapsed_us = duration.as_micros() as u64,
            "span ended"
        );

        if let Some(recorder) = &self.tracer.inner.recorder {
            recorder.record(FinishedSpan {
                name: self.name.clone(),
                service: self.tracer.inner.service.clone(),
                context: self.context.clone(),
                parent: self.parent.clone(),
                duration,
            });
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Keeps a span active on the current thread.
pub struct SpanGuard<'a> {
    _entered: tracing::span::Entered<'a>,
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().pop();
        });
    }
}
