use thiserror::Error;

/// Failure parsing a hex-encoded trace identifier.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IdParseError {
    #[error("{kind} must be {expected} hex characters, got {actual}")]
    Length {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{kind} is not valid hex: {source}")]
    Hex {
        kind: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("{0} must not be all zeros")]
    AllZero(&'static str),
}

/// Failure decoding a serialized trace context.
///
/// Only structural failures surface here; malformed identifiers inside a
/// well-formed document are zeroed instead.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("trace context is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
