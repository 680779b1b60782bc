//! HTTP byte ranges.
//!
//! Only single `bytes=` ranges are understood. Anything else is treated as if
//! no `Range` header had been sent, which lets the server fall back to a full
//! response as RFC 9110 permits.

use std::fmt;
use std::str::FromStr;

/// A single byte range as requested by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-end`, both inclusive.
    Bounded { start: u64, end: u64 },
    /// `bytes=start-`
    From { start: u64 },
    /// `bytes=-length`: the last `length` bytes.
    Suffix { length: u64 },
}

/// The part of an object actually served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServedRange {
    pub offset: u64,
    pub length: u64,
}

impl ServedRange {
    /// Offset of the last byte in the range.
    pub fn last_byte(&self) -> u64 {
        self.offset + self.length - 1
    }

    /// `Content-Range` value for this range within an object of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.offset, self.last_byte(), total)
    }
}

impl ByteRange {
    /// Parse a `Range` header value, returning `None` for anything unsupported.
    pub fn parse_header(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Resolve against an object of `size` bytes.
    ///
    /// Returns `None` when the range cannot be satisfied.
    pub fn resolve(&self, size: u64) -> Option<ServedRange> {
        match *self {
            Self::Bounded { start, end } => {
                if start >= size {
                    return None;
                }
                let end = end.min(size - 1);
                Some(ServedRange {
                    offset: start,
                    length: end - start + 1,
                })
            }
            Self::From { start } => {
                if start >= size {
                    return None;
                }
                Some(ServedRange {
                    offset: start,
                    length: size - start,
                })
            }
            Self::Suffix { length } => {
                if length == 0 || size == 0 {
                    return None;
                }
                let length = length.min(size);
                Some(ServedRange {
                    offset: size - length,
                    length,
                })
            }
        }
    }
}

impl FromStr for ByteRange {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = || crate::Error::InvalidRange(s.to_string());

        let range_set = s
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(invalid)?
            .trim();
        if range_set.contains(',') {
            return Err(invalid());
        }

        let (start, end) = range_set.split_once('-').ok_or_else(invalid)?;
        let (start, end) = (start.trim(), end.trim());

        let parse = |v: &str| v.parse::<u64>().map_err(|_| invalid());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => Err(invalid()),
            (true, false) => Ok(Self::Suffix {
                length: parse(end)?,
            }),
            (false, true) => Ok(Self::From {
                start: parse(start)?,
            }),
            (false, false) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if end < start {
                    return Err(invalid());
                }
                Ok(Self::Bounded { start, end })
            }
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded { start, end } => write!(f, "bytes={start}-{end}"),
            Self::From { start } => write!(f, "bytes={start}-"),
            Self::Suffix { length } => write!(f, "bytes=-{length}"),
        }
    }
}
