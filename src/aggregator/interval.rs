//! Poll interval parsing.

use std::time::Duration;

use crate::{GatorError, Result};

/// Parse a duration string such as `"1m"`, `"30s"`, `"1h30m"` or `"1.5h"`.
///
/// Each component is a decimal number followed by one of the units
/// `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. The total must be positive.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let invalid = || GatorError::Config(format!("invalid interval: {s:?}"));

    let input = s.trim();
    if input.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = input;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(num_end);
        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        total_nanos += value * unit_nanos(unit).ok_or_else(invalid)?;
        rest = next;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    let duration = Duration::from_nanos(total_nanos.round() as u64);
    if duration.is_zero() {
        return Err(GatorError::Config(format!(
            "interval must be positive: {s:?}"
        )));
    }

    Ok(duration)
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        _ => return None,
    };
    Some(nanos)
}
