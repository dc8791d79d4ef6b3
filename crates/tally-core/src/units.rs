// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parsing of human-readable durations (`"50s"`, `"100ms"`) and sizes
//! (`"250mb"`) into numeric units.
//!
//! Both grammars are a decimal integer followed by an optional unit suffix,
//! case-insensitive, with surrounding whitespace ignored. When the suffix is
//! omitted the number is taken to already be in the requested unit.

use thiserror::Error;

const TIME_HINT: &str = "Time must be specified as seconds (s), milliseconds (ms), \
    microseconds (us), minutes (m or min), hour (h), or day (d). E.g. 50s, 100ms, or 250us.";

const SIZE_HINT: &str = "Size must be specified as bytes (b), kilobytes (kb), megabytes (mb), \
    gigabytes (gb), terabytes (tb), or petabytes (pb). E.g. 50b, 100kb, or 250mb.";

/// An error produced while parsing a duration or size string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitParseError {
    /// The input did not match `-?[0-9]+[a-z]*`.
    #[error("{hint}\nFailed to parse time string: {0}", hint = TIME_HINT)]
    MalformedTime(String),
    /// The time suffix is not one of the known units.
    #[error("{hint}\nInvalid suffix: \"{0}\"", hint = TIME_HINT)]
    InvalidTimeSuffix(String),
    /// The input did not match `[0-9]+[a-z]*`.
    #[error("{hint}\nFailed to parse byte string: {0}", hint = SIZE_HINT)]
    MalformedSize(String),
    /// The size suffix is not one of the known units.
    #[error("{hint}\nInvalid suffix: \"{0}\"", hint = SIZE_HINT)]
    InvalidSizeSuffix(String),
    /// The size does not fit in 64 bits once converted.
    #[error("{hint}\nSize out of range: {0}", hint = SIZE_HINT)]
    SizeOverflow(String),
}

/// A unit of time, from microseconds to days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    /// `us`
    Microseconds,
    /// `ms`
    Milliseconds,
    /// `s`
    Seconds,
    /// `m` or `min`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl TimeUnit {
    fn micros(self) -> i64 {
        match self {
            TimeUnit::Microseconds => 1,
            TimeUnit::Milliseconds => 1_000,
            TimeUnit::Seconds => 1_000_000,
            TimeUnit::Minutes => 60_000_000,
            TimeUnit::Hours => 3_600_000_000,
            TimeUnit::Days => 86_400_000_000,
        }
    }

    /// Looks up a unit by its suffix.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "us" => Some(TimeUnit::Microseconds),
            "ms" => Some(TimeUnit::Milliseconds),
            "s" => Some(TimeUnit::Seconds),
            "m" | "min" => Some(TimeUnit::Minutes),
            "h" => Some(TimeUnit::Hours),
            "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    /// Converts `value` expressed in `from` into this unit.
    ///
    /// Converting to a coarser unit truncates toward zero; converting to a
    /// finer unit saturates at the `i64` bounds.
    pub fn convert(self, value: i64, from: TimeUnit) -> i64 {
        let (src, dst) = (from.micros(), self.micros());
        if src >= dst {
            value.saturating_mul(src / dst)
        } else {
            value / (dst / src)
        }
    }
}

/// A binary unit of size, from bytes to pebibytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ByteUnit {
    /// `b`
    Byte,
    /// `kb` (1024 bytes)
    Kb,
    /// `mb`
    Mb,
    /// `gb`
    Gb,
    /// `tb`
    Tb,
    /// `pb`
    Pb,
}

impl ByteUnit {
    fn multiplier(self) -> u64 {
        match self {
            ByteUnit::Byte => 1,
            ByteUnit::Kb => 1 << 10,
            ByteUnit::Mb => 1 << 20,
            ByteUnit::Gb => 1 << 30,
            ByteUnit::Tb => 1 << 40,
            ByteUnit::Pb => 1 << 50,
        }
    }

    /// Looks up a unit by its suffix.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "b" => Some(ByteUnit::Byte),
            "kb" => Some(ByteUnit::Kb),
            "mb" => Some(ByteUnit::Mb),
            "gb" => Some(ByteUnit::Gb),
            "tb" => Some(ByteUnit::Tb),
            "pb" => Some(ByteUnit::Pb),
            _ => None,
        }
    }

    /// Converts `value` expressed in `from` into this unit, or `None` on
    /// overflow. Converting to a coarser unit truncates.
    pub fn convert(self, value: u64, from: ByteUnit) -> Option<u64> {
        let (src, dst) = (from.multiplier(), self.multiplier());
        if src >= dst {
            value.checked_mul(src / dst)
        } else {
            Some(value / (dst / src))
        }
    }
}

/// Splits `input` into its digits and its alphabetic suffix.
fn split_number(input: &str, allow_negative: bool) -> Option<(&str, Option<&str>)> {
    let unsigned = match input.strip_prefix('-') {
        Some(rest) if allow_negative => rest,
        Some(_) => return None,
        None => input,
    };
    let digits_len = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits_len == 0 {
        return None;
    }
    let number_len = input.len() - unsigned.len() + digits_len;
    let (number, suffix) = input.split_at(number_len);
    if !suffix.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    Some((number, (!suffix.is_empty()).then_some(suffix)))
}

fn parse_time(input: &str, unit: TimeUnit) -> Result<i64, UnitParseError> {
    parse_time_in(input, unit, unit)
}

/// Parses a duration into `target` units, taking a bare number as `bare`.
///
/// Lets a caller keep a coarse default for unsuffixed values while still
/// honoring finer suffixes, e.g. `"500us"` into microseconds with a bare
/// number read as milliseconds.
pub fn parse_time_in(input: &str, bare: TimeUnit, target: TimeUnit) -> Result<i64, UnitParseError> {
    let lower = input.trim().to_ascii_lowercase();
    let (number, suffix) = split_number(&lower, true)
        .ok_or_else(|| UnitParseError::MalformedTime(input.to_string()))?;
    let value: i64 = number
        .parse()
        .map_err(|_| UnitParseError::MalformedTime(input.to_string()))?;
    let from = match suffix {
        Some(suffix) => TimeUnit::from_suffix(suffix)
            .ok_or_else(|| UnitParseError::InvalidTimeSuffix(suffix.to_string()))?,
        None => bare,
    };
    Ok(target.convert(value, from))
}

fn parse_bytes(input: &str, unit: ByteUnit) -> Result<u64, UnitParseError> {
    let lower = input.trim().to_ascii_lowercase();
    let (number, suffix) = split_number(&lower, false)
        .ok_or_else(|| UnitParseError::MalformedSize(input.to_string()))?;
    let value: u64 = number
        .parse()
        .map_err(|_| UnitParseError::SizeOverflow(input.to_string()))?;
    let from = match suffix {
        Some(suffix) => ByteUnit::from_suffix(suffix)
            .ok_or_else(|| UnitParseError::InvalidSizeSuffix(suffix.to_string()))?,
        None => unit,
    };
    unit.convert(value, from)
        .ok_or_else(|| UnitParseError::SizeOverflow(input.to_string()))
}

/// Parses a duration such as `"50s"` into milliseconds. A bare number is
/// taken as milliseconds.
pub fn parse_time_as_ms(input: &str) -> Result<i64, UnitParseError> {
    parse_time(input, TimeUnit::Milliseconds)
}

/// Parses a duration such as `"5min"` into seconds. A bare number is taken as
/// seconds.
pub fn parse_time_as_secs(input: &str) -> Result<i64, UnitParseError> {
    parse_time(input, TimeUnit::Seconds)
}

/// Parses a size such as `"250mb"` into bytes. A bare number is taken as bytes.
pub fn parse_bytes_as_bytes(input: &str) -> Result<u64, UnitParseError> {
    parse_bytes(input, ByteUnit::Byte)
}

/// Parses a size into kibibytes. A bare number is taken as kibibytes.
pub fn parse_bytes_as_kb(input: &str) -> Result<u64, UnitParseError> {
    parse_bytes(input, ByteUnit::Kb)
}

/// Parses a size into mebibytes. A bare number is taken as mebibytes.
pub fn parse_bytes_as_mb(input: &str) -> Result<u64, UnitParseError> {
    parse_bytes(input, ByteUnit::Mb)
}

/// Parses a size into gibibytes. A bare number is taken as gibibytes.
pub fn parse_bytes_as_gb(input: &str) -> Result<u64, UnitParseError> {
    parse_bytes(input, ByteUnit::Gb)
}
