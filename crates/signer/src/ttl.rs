//! Link lifetimes.

use crate::error::SignerError;
use std::fmt;
use std::str::FromStr;

const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;

/// Shorthand spellings accepted on the command line, including the Chinese
/// forms used by existing operators.
const ALIASES: &[(&str, u64)] = &[
    ("1h", HOUR),
    ("1小时", HOUR),
    ("6h", 6 * HOUR),
    ("6小时", 6 * HOUR),
    ("1d", DAY),
    ("1天", DAY),
    ("24h", DAY),
    ("7d", 7 * DAY),
    ("7天", 7 * DAY),
    ("1w", 7 * DAY),
    ("30d", 30 * DAY),
    ("30天", 30 * DAY),
    ("1m", 30 * DAY),
];

/// A positive link lifetime in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ttl(u64);

impl Ttl {
    /// One hour, the default lifetime.
    pub const DEFAULT: Ttl = Ttl(HOUR);

    pub fn from_secs(secs: u64) -> Result<Self, SignerError> {
        if secs == 0 {
            return Err(SignerError::InvalidTtl(
                "ttl must be at least 1 second".to_string(),
            ));
        }
        Ok(Self(secs))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Ttl {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, secs)) = ALIASES.iter().find(|(alias, _)| *alias == s) {
            return Ok(Self(*secs));
        }

        let secs: u64 = s.parse().map_err(|_| {
            SignerError::InvalidTtl(format!(
                "'{s}' is neither a number of seconds nor one of 1h, 6h, 1d, 24h, 7d, 1w, 30d, 1m"
            ))
        })?;
        Self::from_secs(secs)
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

impl fmt::Display for Ttl {
    /// Human-readable lifetime, rounded down to the largest whole unit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0;
        let text = if secs < 60 {
            plural(secs, "second")
        } else if secs < HOUR {
            plural(secs / 60, "minute")
        } else if secs < DAY {
            plural(secs / HOUR, "hour")
        } else {
            plural(secs / DAY, "day")
        };
        f.write_str(&text)
    }
}
