use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Caller-supplied transaction identifier.
///
/// Always strictly positive. The wire representation is a signed 64-bit
/// integer, so the largest accepted value is `i64::MAX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TransactionId(u64);

impl TransactionId {
    /// Build an identifier from a raw signed value, rejecting zero and negatives.
    pub fn new(raw: i64) -> Result<Self, TypeError> {
        if raw <= 0 {
            return Err(TypeError::InvalidId(raw.to_string()));
        }
        Ok(Self(raw as u64))
    }

    /// Parse the decimal text form supplied by a caller.
    ///
    /// Surrounding whitespace is not stripped; `" 7 "` is malformed.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let value: i64 = raw
            .parse()
            .map_err(|_| TypeError::InvalidId(raw.to_string()))?;
        Self::new(value)
    }
}

impl FromStr for TransactionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for TransactionId {
    type Error = TypeError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<TransactionId> for i64 {
    fn from(id: TransactionId) -> Self {
        // Constructed from a positive i64, so the cast is lossless.
        id.0 as i64
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
