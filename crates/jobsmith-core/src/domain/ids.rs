//! Job identifiers.
//!
//! Ids are plain integers handed out by the store in creation order, starting at 1.
//! The newtype keeps them from being confused with counts or attempt numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a Job.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Raised when boundary input is not a syntactically valid job id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job id `{0}`")]
pub struct ParseJobIdError(pub String);

impl FromStr for JobId {
    type Err = ParseJobIdError;

    /// Accepts positive decimal integers that fit in a `u64`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match JobId::parse_lookup(s)? {
            Some(id) => Ok(id),
            None => Err(ParseJobIdError(s.to_string())),
        }
    }
}

impl JobId {
    /// Parse an id used for a lookup.
    ///
    /// Any signed decimal integer is well formed. Integers no store ever hands out
    /// (`0`, negatives, anything past `u64::MAX`) come back as `Ok(None)` so callers can
    /// report them as missing. Only non-integers are an error.
    pub fn parse_lookup(raw: &str) -> Result<Option<JobId>, ParseJobIdError> {
        let trimmed = raw.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseJobIdError(raw.to_string()));
        }
        if negative {
            return Ok(None);
        }
        Ok(digits.parse::<u64>().ok().filter(|v| *v > 0).map(JobId))
    }
}
