//! Field codec: single values to and from text.
//!
//! Every serialization format stores cells through this codec (the binary
//! format only for types without a native representation), so a value
//! that survives `decode(encode(v))` survives a save and reload.
//!
//! ## Text forms
//!
//! | type             | text                                             |
//! |------------------|--------------------------------------------------|
//! | `Bool`           | `True` / `False` (read case-insensitively)       |
//! | integers, floats | Rust's invariant `Display` / `FromStr`           |
//! | `DateTimeOffset` | RFC 3339 with numeric offset                     |
//! | `Duration`       | `[-][d.]hh:mm:ss[.fffffffff]`                    |
//! | `Uuid`           | hyphenated lowercase                             |
//! | `Enum`           | exact member name                                |
//! | `Array`          | encoded elements joined with `,`                 |
//!
//! An empty cell decodes to the type's zero value, or to null for nullable
//! and array types. Because an empty array also encodes to an empty cell,
//! it reads back as null. Nested arrays flatten for the same reason.

use crate::error::{CodecError, CodecResult};
use crate::value::{Value, ValueType};
use chrono::{DateTime, SecondsFormat, TimeDelta};
use std::fmt::Write;
use uuid::Uuid;

const ARRAY_SEPARATOR: char = ',';
const SECONDS_PER_DAY: i64 = 86_400;

/// Encodes a value to its text form.
///
/// Null encodes to the empty string.
#[must_use]
pub fn encode(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::UInt8(n) => n.to_string(),
        Value::Int32(n) => n.to_string(),
        Value::Int64(n) => n.to_string(),
        Value::Float64(f) => f.to_string(),
        Value::Text(s) | Value::Enum(s) => s.clone(),
        Value::DateTimeOffset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        Value::Duration(d) => encode_duration(*d),
        Value::Uuid(u) => u.hyphenated().to_string(),
        Value::Array(items) => items
            .iter()
            .map(encode)
            .collect::<Vec<_>>()
            .join(&ARRAY_SEPARATOR.to_string()),
    }
}

/// Decodes text as a value of type `ty`.
///
/// # Errors
///
/// Returns [`CodecError::Format`] if the text is not a valid instance of
/// the type.
pub fn decode(text: &str, ty: &ValueType) -> CodecResult<Value> {
    if text.is_empty() {
        return Ok(ty.zero_value());
    }

    let fail = |reason: &str| CodecError::format(ty.to_string(), text, reason);

    match ty {
        ValueType::Nullable(inner) => decode(text, inner),
        ValueType::Array(element) => text
            .split(ARRAY_SEPARATOR)
            .map(|piece| decode(piece, element))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        ValueType::Bool => {
            let t = text.trim();
            if t.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if t.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(fail("expected True or False"))
            }
        }
        ValueType::UInt8 => text
            .trim()
            .parse()
            .map(Value::UInt8)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Int32 => text
            .trim()
            .parse()
            .map(Value::Int32)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Int64 => text
            .trim()
            .parse()
            .map(Value::Int64)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Float64 => text
            .trim()
            .parse()
            .map(Value::Float64)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Text => Ok(Value::Text(text.to_string())),
        ValueType::DateTimeOffset => DateTime::parse_from_rfc3339(text.trim())
            .map(Value::DateTimeOffset)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Duration => decode_duration(text.trim())
            .map(Value::Duration)
            .map_err(|reason| fail(reason)),
        ValueType::Uuid => Uuid::parse_str(text.trim())
            .map(Value::Uuid)
            .map_err(|e| fail(&e.to_string())),
        ValueType::Enum(e) => {
            if e.contains(text) {
                Ok(Value::Enum(text.to_string()))
            } else {
                Err(fail(&format!("not a member of {}", e.name())))
            }
        }
    }
}

fn encode_duration(d: TimeDelta) -> String {
    let mut out = String::new();
    let abs = if d < TimeDelta::zero() {
        out.push('-');
        -d
    } else {
        d
    };

    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos();
    let days = total / SECONDS_PER_DAY;
    let rem = total % SECONDS_PER_DAY;

    if days != 0 {
        let _ = write!(out, "{days}.");
    }
    let _ = write!(out, "{:02}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60);
    if nanos != 0 {
        let frac = format!("{nanos:09}");
        let _ = write!(out, ".{}", frac.trim_end_matches('0'));
    }
    out
}

fn decode_duration(text: &str) -> Result<TimeDelta, &'static str> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = if body.contains(':') {
        parse_clock(body)?
    } else {
        let days: i64 = body.parse().map_err(|_| "expected a day count")?;
        days.checked_mul(SECONDS_PER_DAY)
            .and_then(TimeDelta::try_seconds)
            .ok_or("duration out of range")?
    };

    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_clock(body: &str) -> Result<TimeDelta, &'static str> {
    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err("expected [d.]hh:mm[:ss[.fffffffff]]");
    }

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (parse_unit(d)?, parse_unit(h)?),
        None => (0, parse_unit(parts[0])?),
    };
    let minutes = parse_unit(parts[1])?;
    let (seconds, nanos) = match parts.get(2) {
        None => (0, 0),
        Some(sec) => match sec.split_once('.') {
            Some((s, f)) => (parse_unit(s)?, parse_fraction(f)?),
            None => (parse_unit(sec)?, 0),
        },
    };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err("time component out of range");
    }

    let total = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(hours * 3600 + minutes * 60 + seconds))
        .and_then(TimeDelta::try_seconds)
        .ok_or("duration out of range")?;
    total
        .checked_add(&TimeDelta::nanoseconds(nanos))
        .ok_or("duration out of range")
}

fn parse_unit(text: &str) -> Result<i64, &'static str> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected digits");
    }
    text.parse().map_err(|_| "number out of range")
}

fn parse_fraction(text: &str) -> Result<i64, &'static str> {
    if text.is_empty() || text.len() > 9 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected one to nine fraction digits");
    }
    let padded = format!("{text:0<9}");
    padded.parse().map_err(|_| "invalid fraction")
}
