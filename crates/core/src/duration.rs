//! Duration strings in the `1h30m0s` notation.
//!
//! [`parse`] accepts an optionally signed sequence of decimal numbers, each
//! followed by a unit (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`), for example
//! `"90s"`, `"1h30m"` or `"-1.5h"`. A bare `"0"` is accepted as well.
//! [`format`] produces the canonical form: `"1h30m0s"`, `"500ms"`, `"0s"`.
//!
//! The same notation is used for configuration values (the scheduler check
//! interval) and for serializing [`Event`](crate::Event) durations.

use chrono::Duration;

use crate::error::CoreError;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SEC: i128 = 1_000_000_000;
const NANOS_PER_MIN: i128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MIN;

/// Parse a duration string such as `"1m"` or `"2h45m30.5s"`.
pub fn parse(input: &str) -> Result<Duration, CoreError> {
    let invalid = |reason: &'static str| CoreError::InvalidDuration {
        input: input.to_string(),
        reason,
    };

    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let int_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut value = whole.checked_mul(unit).ok_or_else(|| invalid("overflow"))?;

        // Digits finer than one nanosecond are dropped.
        let mut scale = unit;
        for digit in frac_part.bytes() {
            scale /= 10;
            if scale == 0 {
                break;
            }
            value += i128::from(digit - b'0') * scale;
        }

        total = total.checked_add(value).ok_or_else(|| invalid("overflow"))?;
    }

    let nanos = i64::try_from(total).map_err(|_| invalid("overflow"))?;
    let duration = Duration::nanoseconds(nanos);
    Ok(if negative { -duration } else { duration })
}

/// Render a duration in canonical form (`"1h30m0s"`, `"1.5s"`, `"250ms"`).
pub fn format(duration: Duration) -> String {
    let total = i128::from(duration.num_seconds()) * NANOS_PER_SEC
        + i128::from(duration.subsec_nanos());

    if total == 0 {
        return "0s".to_string();
    }

    let sign = if total < 0 { "-" } else { "" };
    let nanos = total.abs();

    let body = if nanos < NANOS_PER_MICRO {
        format!("{nanos}ns")
    } else if nanos < NANOS_PER_MILLI {
        format!("{}µs", decimal(nanos, NANOS_PER_MICRO))
    } else if nanos < NANOS_PER_SEC {
        format!("{}ms", decimal(nanos, NANOS_PER_MILLI))
    } else {
        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
        let seconds = nanos % NANOS_PER_MIN;

        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{hours}h"));
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&format!("{minutes}m"));
        }
        out.push_str(&decimal(seconds, NANOS_PER_SEC));
        out.push('s');
        out
    };

    format!("{sign}{body}")
}

/// `value / unit` as a decimal string without trailing zeros.
fn decimal(value: i128, unit: i128) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Serde adapter storing a [`Duration`] as its canonical string.
///
/// ```ignore
/// #[serde(with = "calendar_core::duration::serde_string")]
/// pub duration: chrono::Duration,
/// ```
pub mod serde_string {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
