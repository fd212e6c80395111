//! Compact duration strings for the wire format: `0s`, `150ms`, `2s`, `1m30s`.
//!
//! Sub-second values use the largest of `ns`, `µs` and `ms` that keeps a
//! non-zero integer part. From one second up the value is split into hours,
//! minutes and seconds, and the seconds carry any fractional remainder with
//! trailing zeros trimmed.

use std::time::Duration;

use serde::Serializer;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Format `d` as a compact unit-suffixed string.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI, 6));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = u128::from(total_secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&decimal(secs, NANOS_PER_SEC, 9));
    out.push('s');
    out
}

/// `value / unit` rendered with up to `digits` fractional digits, trailing
/// zeros and a bare decimal point removed.
fn decimal(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0digits$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// `serialize_with` adapter that writes a [`Duration`] through
/// [`format_duration`].
pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}
