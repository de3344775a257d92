// SPDX-FileCopyrightText: 2026 Instabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tolerant parsing of provider timestamps.
//!
//! The Graph API has been seen to emit `2026-03-01T12:00:00Z`,
//! `2026-03-01T12:00:00+0000`, other RFC 3339 offsets, and offset-less
//! values. Offset-less values are read as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses any of the known encodings, or `None`.
pub fn parse_provider_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Inclusive recency check. Missing or unparsable timestamps pass.
pub fn is_within_window(updated_time: Option<&str>, cutoff: DateTime<Utc>) -> bool {
    match updated_time.and_then(parse_provider_timestamp) {
        Some(ts) => ts >= cutoff,
        None => true,
    }
}
