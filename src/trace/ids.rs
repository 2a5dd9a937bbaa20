use std::fmt;

use super::error::IdParseError;

/// 16-byte trace identifier, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

/// 8-byte span identifier, rendered as 16 lowercase hex characters.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

/// W3C trace flags. Only the sampled bit is interpreted.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraceFlags(u8);

macro_rules! hex_id {
    ($name:ident, $len:expr, $label:expr) => {
        impl $name {
            /// The all-zero identifier.
            pub const INVALID: $name = $name([0; $len]);

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            pub const fn to_bytes(self) -> [u8; $len] {
                self.0
            }

            /// Generate a random, non-zero identifier.
            pub fn random() -> Self {
                loop {
                    let bytes: [u8; $len] = rand::random();
                    if bytes != [0; $len] {
                        return $name(bytes);
                    }
                }
            }

            /// Parse from hex. The all-zero value is rejected, as it never
            /// identifies a real trace or span.
            pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
                if s.len() != $len * 2 {
                    return Err(IdParseError::Length {
                        kind: $label,
                        expected: $len * 2,
                        actual: s.len(),
                    });
                }
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes).map_err(|e| IdParseError::Hex {
                    kind: $label,
                    source: e,
                })?;
                if bytes == [0; $len] {
                    return Err(IdParseError::AllZero($label));
                }
                Ok($name(bytes))
            }

            pub fn is_valid(&self) -> bool {
                self.0 != [0; $len]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

hex_id!(TraceId, 16, "trace id");
hex_id!(SpanId, 8, "span id");

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    pub const fn new(bits: u8) -> Self {
        TraceFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 == Self::SAMPLED.0
    }

    pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
        if s.len() != 2 {
            return Err(IdParseError::Length {
                kind: "trace flags",
                expected: 2,
                actual: s.len(),
            });
        }
        let mut byte = [0u8; 1];
        hex::decode_to_slice(s, &mut byte).map_err(|e| IdParseError::Hex {
            kind: "trace flags",
            source: e,
        })?;
        Ok(TraceFlags(byte[0]))
    }
}

impl fmt::Display for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl fmt::Debug for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceFlags({:02x})", self.0)
    }
}
