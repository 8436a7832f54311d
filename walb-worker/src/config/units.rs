//! Unit grammars used by policy fields.
//!
//! - periods: `"10"`, `"10s"`, `"5m"`, `"2h"`, `"14d"`
//! - byte sizes: `"123"`, `"10K"`, `"7M"`, `"8G"`
//! - compression options: `"none"`, `"snappy:3"`, `"gzip:9:4"`

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Error parsing a unit-bearing token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitParseError {
    /// The token is not a valid period.
    #[error("Invalid period '{0}' - expected digits with an optional s/m/h/d suffix")]
    Period(String),

    /// The token is not a valid byte size.
    #[error("Invalid size '{0}' - expected digits with an optional K/M/G suffix")]
    Size(String),

    /// The codec name is not one of the supported codecs.
    #[error("Unknown compression type '{0}' - must be one of: none, snappy, gzip, lzma")]
    UnknownCodec(String),

    /// The token is not of the form `name[:level[:threads]]`.
    #[error("Invalid compression option '{0}' - expected name[:level[:threads]]")]
    Compress(String),
}

/// Splits `s` into its leading run of ASCII digits and the remainder.
fn split_digits(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(end)
}

/// Parse a period such as `"10m"` into a [`Duration`].
///
/// A bare number is a count of seconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use walb_worker::config::parse_period;
///
/// assert_eq!(parse_period("123").unwrap(), Duration::from_secs(123));
/// assert_eq!(parse_period("10m").unwrap(), Duration::from_secs(600));
/// assert_eq!(parse_period("100d").unwrap(), Duration::from_secs(8_640_000));
/// ```
pub fn parse_period(s: &str) -> Result<Duration, UnitParseError> {
    let s = s.trim();
    let err = || UnitParseError::Period(s.to_string());

    let (num_str, suffix) = split_digits(s);
    if num_str.is_empty() {
        return Err(err());
    }

    let multiplier: u64 = match suffix {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(err()),
    };

    let num: u64 = num_str.parse().map_err(|_| err())?;
    num.checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(err)
}

/// Parse a byte size such as `"7M"` into a byte count.
///
/// Suffixes are binary multiples and case-insensitive. A bare number is bytes.
///
/// # Examples
///
/// ```
/// use walb_worker::config::parse_size_unit;
///
/// assert_eq!(parse_size_unit("123").unwrap(), 123);
/// assert_eq!(parse_size_unit("10K").unwrap(), 10 * 1024);
/// assert_eq!(parse_size_unit("8G").unwrap(), 8 * 1024 * 1024 * 1024);
/// ```
pub fn parse_size_unit(s: &str) -> Result<u64, UnitParseError> {
    let s = s.trim();
    let err = || UnitParseError::Size(s.to_string());

    let (num_str, suffix) = split_digits(s);
    if num_str.is_empty() {
        return Err(err());
    }

    let multiplier: u64 = match suffix {
        "" => 1,
        "K" | "k" => 1024,
        "M" | "m" => 1024 * 1024,
        "G" | "g" => 1024 * 1024 * 1024,
        _ => return Err(err()),
    };

    let num: u64 = num_str.parse().map_err(|_| err())?;
    num.checked_mul(multiplier).ok_or_else(err)
}

/// Compression codecs understood by the archive servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    None,
    Snappy,
    Gzip,
    Lzma,
}

impl Codec {
    pub fn as_str(self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Snappy => "snappy",
            Codec::Gzip => "gzip",
            Codec::Lzma => "lzma",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Codec::None),
            "snappy" => Ok(Codec::Snappy),
            "gzip" => Ok(Codec::Gzip),
            "lzma" => Ok(Codec::Lzma),
            other => Err(UnitParseError::UnknownCodec(other.to_string())),
        }
    }
}

/// A compression option: codec, compression level and worker thread count.
///
/// Zero for `level` or `threads` lets the server choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressOpt {
    pub codec: Codec,
    pub level: u32,
    pub threads: u32,
}

impl CompressOpt {
    pub fn new(codec: Codec, level: u32, threads: u32) -> Self {
        Self {
            codec,
            level,
            threads,
        }
    }
}

impl Default for CompressOpt {
    fn default() -> Self {
        Self::new(Codec::None, 0, 0)
    }
}

impl fmt::Display for CompressOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.codec, self.level, self.threads)
    }
}

impl FromStr for CompressOpt {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_compress_opt(s)
    }
}

/// Parse a compression option of the form `name[:level[:threads]]`.
///
/// # Examples
///
/// ```
/// use walb_worker::config::{parse_compress_opt, Codec, CompressOpt};
///
/// assert_eq!(parse_compress_opt("none").unwrap(), CompressOpt::new(Codec::None, 0, 0));
/// assert_eq!(parse_compress_opt("gzip:9:4").unwrap(), CompressOpt::new(Codec::Gzip, 9, 4));
/// ```
pub fn parse_compress_opt(s: &str) -> Result<CompressOpt, UnitParseError> {
    let s = s.trim();
    let fields: Vec<&str> = s.split(':').collect();
    if fields.len() > 3 {
        return Err(UnitParseError::Compress(s.to_string()));
    }

    let codec: Codec = fields[0].parse()?;
    let number = |i: usize| -> Result<u32, UnitParseError> {
        match fields.get(i) {
            None => Ok(0),
            Some(v) => v
                .parse()
                .map_err(|_| UnitParseError::Compress(s.to_string())),
        }
    };

    Ok(CompressOpt::new(codec, number(1)?, number(2)?))
}
