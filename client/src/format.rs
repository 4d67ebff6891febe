//! Display helpers for counts, timestamps and player URLs.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

const COMPACT_UNITS: [(u64, &str); 4] = [
    (1_000, "K"),
    (1_000_000, "M"),
    (1_000_000_000, "B"),
    (1_000_000_000_000, "T"),
];

/// Compact count: `999`, `1.2K`, `15K`, `3M`. At most one fractional digit,
/// rounded half up. A missing count reads as `"0"`.
pub fn format_number(n: Option<u64>) -> String {
    let Some(n) = n else {
        return "0".to_string();
    };
    if n < 1_000 {
        return n.to_string();
    }

    let mut idx = COMPACT_UNITS
        .iter()
        .rposition(|(unit, _)| n >= *unit)
        .unwrap_or(0);
    let mut tenths = round_tenths(n, COMPACT_UNITS[idx].0);
    // 999_960 rounds to "1000K"; promote it to "1M".
    if tenths >= 10_000 && idx + 1 < COMPACT_UNITS.len() {
        idx += 1;
        tenths = round_tenths(n, COMPACT_UNITS[idx].0);
    }

    let suffix = COMPACT_UNITS[idx].1;
    if tenths % 10 == 0 {
        format!("{}{suffix}", tenths / 10)
    } else {
        format!("{}.{}{suffix}", tenths / 10, tenths % 10)
    }
}

fn round_tenths(n: u64, unit: u64) -> u64 {
    ((u128::from(n) * 10 + u128::from(unit) / 2) / u128::from(unit)) as u64
}

const TIME_STEPS: [(f64, &str); 6] = [
    (60.0, "second"),
    (60.0, "minute"),
    (24.0, "hour"),
    (7.0, "day"),
    (365.0 / 7.0 / 12.0, "week"),
    (12.0, "month"),
];

/// Relative timestamp: "just now", "42 seconds ago", "1 hour ago", "3 weeks ago".
/// Future instants read as "just now".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mut diff = (now - then).num_milliseconds().max(0) as f64 / 1000.0;
    let mut step = 0;
    while step < TIME_STEPS.len() && diff >= TIME_STEPS[step].0 {
        diff /= TIME_STEPS[step].0;
        step += 1;
    }
    let diff = diff.floor() as u64;
    let unit = TIME_STEPS.get(step).map(|(_, u)| *u).unwrap_or("year");

    match step {
        0 if diff <= 9 => "just now".to_string(),
        0 => format!("{diff} seconds ago"),
        _ if diff <= 1 => format!("1 {unit} ago"),
        _ => format!("{diff} {unit}s ago"),
    }
}

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("player URL pattern is valid")
});

/// Turn a YouTube watch/share link into an autoplaying embed URL.
/// Anything unrecognised is returned unchanged; empty stays empty.
pub fn embed_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    match YOUTUBE_ID.captures(url).and_then(|c| c.get(2)) {
        Some(id) if id.as_str().len() == 11 => {
            format!("https://www.youtube.com/embed/{}?autoplay=1", id.as_str())
        }
        _ => url.to_string(),
    }
}
