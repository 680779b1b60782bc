//! Core domain types and shared logic for reelgate.
//!
//! This crate defines what the signer, proxy, storage and CLI crates share:
//! - Process-wide configuration
//! - An injectable clock
//! - HTTP byte ranges and how they resolve against an object size
//! - The extension to MIME type table used for served and uploaded media

pub mod clock;
pub mod config;
pub mod content_type;
pub mod error;
pub mod range;

pub use clock::{Clock, FixedClock, SystemClock};
pub use content_type::{content_type_for, is_video_file};
pub use error::{Error, Result};
pub use range::{ByteRange, ServedRange};

/// Cache lifetime advertised on every object response: 24 hours.
pub const CACHE_MAX_AGE_SECS: u64 = 86_400;

/// How long browsers may cache a CORS preflight answer: 24 hours.
pub const PREFLIGHT_MAX_AGE_SECS: u64 = 86_400;
