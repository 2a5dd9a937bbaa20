//! Distributed trace identity and its propagation across the broker.
//!
//! ```text
//! producer thread                         consumer thread
//! ───────────────                         ───────────────
//! tracer.start("order.service.create")
//!   └─ TraceContext::capture() ──JSON──▶ TraceContext (decoded)
//!                                          └─ tracer.start_with_remote_parent(..)
//! ```
//!
//! Spans are plain values; entering one makes it the thread's active span so
//! nested `Tracer::start` calls and `TraceContext::capture` pick it up.

mod error;
mod ids;
mod propagation;
mod span;

pub use error::{CodecError, IdParseError};
pub use ids::{SpanId, TraceFlags, TraceId};
pub use propagation::{deserialize_or_default, TraceContext};
pub use span::{FinishedSpan, Span, SpanContext, SpanGuard, SpanRecorder, Tracer};
