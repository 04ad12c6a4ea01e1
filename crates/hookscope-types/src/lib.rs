//! Shared data model for hookscope: recorded variable observations and the
//! query envelope that floods between execution contexts.

use facet::Facet;
use std::error::Error;
use std::fmt;

mod message;
mod record;

pub use message::{MESSAGE_TYPE, QueryMessage, SearchPattern};
pub use record::{Record, RecordField, RecordValue, UNDEFINED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    ZeroId(&'static str),
    IdOutOfRange {
        field: &'static str,
        max: u64,
        got: u64,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId(field) => write!(f, "{field} must be non-zero"),
            Self::IdOutOfRange { field, max, got } => {
                write!(f, "{field} must be <= {max}, got {got}")
            }
        }
    }
}

impl Error for InvariantError {}

/// Identifiers travel through JSON, so they stay within the JS safe-integer range.
pub const JS_SAFE_INT_MAX_U64: u64 = (1u64 << 53) - 1;

/// Identifier of one query flood.
///
/// Derived from the millisecond wall clock at send time, so two queries sent
/// from one context within the same millisecond share an id and the second
/// one is dropped as a duplicate everywhere.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[facet(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(value: u64) -> Result<Self, InvariantError> {
        if value == 0 {
            return Err(InvariantError::ZeroId("uid"));
        }
        if value > JS_SAFE_INT_MAX_U64 {
            return Err(InvariantError::IdOutOfRange {
                field: "uid",
                max: JS_SAFE_INT_MAX_U64,
                got: value,
            });
        }
        Ok(Self(value))
    }

    pub fn from_millis(millis: u64) -> Result<Self, InvariantError> {
        Self::new(millis)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
