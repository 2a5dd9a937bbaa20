//! Transport form of a span context.
//!
//! Producers embed a [`TraceContext`] in every event envelope; consumers
//! decode it and continue the trace with
//! [`Tracer::start_with_remote_parent`](super::Tracer::start_with_remote_parent).
//! Decoding never fails on bad identifiers: they are replaced by all-zero
//! values so a lost trace link cannot block message processing.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::CodecError;
use super::ids::{SpanId, TraceFlags, TraceId};
use super::span::SpanContext;

/// Serialized span context: `{traceId, spanId, traceFlags, traceState, remote}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTraceContext")]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub trace_flags: String,
    pub trace_state: String,
    pub remote: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTraceContext {
    trace_id: String,
    span_id: String,
    trace_flags: String,
    trace_state: String,
    remote: bool,
}

impl Default for RawTraceContext {
    fn default() -> Self {
        Self {
            trace_id: String::new(),
            span_id: String::new(),
            trace_flags: TraceFlags::SAMPLED.to_string(),
            trace_state: String::new(),
            remote: false,
        }
    }
}

impl From<RawTraceContext> for TraceContext {
    fn from(raw: RawTraceContext) -> Self {
        let trace_id = TraceId::from_hex(&raw.trace_id).unwrap_or(TraceId::INVALID);
        let span_id = SpanId::from_hex(&raw.span_id).unwrap_or(SpanId::INVALID);
        let trace_flags = TraceFlags::from_hex(&raw.trace_flags).unwrap_or(TraceFlags::SAMPLED);
        TraceContext {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            trace_flags: trace_flags.to_string(),
            trace_state: raw.trace_state,
            remote: raw.remote,
        }
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        RawTraceContext::default().into()
    }
}

impl TraceContext {
    /// Capture the identity of a live span.
    pub fn serialize(context: &SpanContext) -> Self {
        TraceContext {
            trace_id: context.trace_id.to_string(),
            span_id: context.span_id.to_string(),
            trace_flags: context.trace_flags.to_string(),
            trace_state: context.trace_state.clone(),
            remote: context.remote,
        }
    }

    /// Capture the span entered on the calling thread, or an all-zero
    /// context when nothing is active.
    pub fn capture() -> Self {
        SpanContext::current()
            .map(|context| Self::serialize(&context))
            .unwrap_or_default()
    }

    /// Decode a JSON trace context.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The decoded identity as seen by a consumer: always marked remote.
    pub fn span_context(&self) -> SpanContext {
        SpanContext {
            trace_id: TraceId::from_hex(&self.trace_id).unwrap_or(TraceId::INVALID),
            span_id: SpanId::from_hex(&self.span_id).unwrap_or(SpanId::INVALID),
            trace_flags: TraceFlags::from_hex(&self.trace_flags).unwrap_or(TraceFlags::SAMPLED),
            trace_state: self.trace_state.clone(),
            remote: true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.span_context().is_valid()
    }
}

/// Envelope field decoder that reads an absent or `null` trace context as
/// the all-zero default.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn deserialize_or_default<'de, D>(deserializer: D) -> Result<TraceContext, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TraceContext>::deserialize(deserializer)?.unwrap_or_default())
}
