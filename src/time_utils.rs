// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with milliseconds and a `Z` suffix,
/// matching what browsers produce with `Date.toISOString()`.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_matches_iso_string() {
        let date = DateTime::from_timestamp(1_736_942_400, 7_000_000).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2025-01-15T12:00:00.007Z");
    }
}
