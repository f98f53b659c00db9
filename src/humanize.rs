// Human readable durations and dates for log lines and notifications

use crate::scrobbler::Timestamp;
use chrono::{DateTime, Local, TimeZone};

const INTERVALS: [(&str, i64); 7] = [
    ("years", 31_556_952),
    ("months", 2_629_746),
    ("weeks", 604_800),
    ("days", 86_400),
    ("hours", 3_600),
    ("minutes", 60),
    ("seconds", 1),
];

/// Seconds as e.g. "2 hours, 5 minutes", keeping the `granularity` largest units
pub fn display_time(seconds: i64, granularity: usize) -> String {
    if seconds <= 0 {
        return "0 seconds".to_string();
    }

    let mut rest = seconds;
    let mut parts = Vec::new();
    for (name, unit) in INTERVALS {
        let value = rest / unit;
        if value > 0 {
            rest -= value * unit;
            let name = if value == 1 { name.trim_end_matches('s') } else { name };
            parts.push(format!("{} {}", value, name));
        }
    }
    parts.truncate(granularity);
    parts.join(", ")
}

/// Time between two timestamps in either order
pub fn timespan(a: Timestamp, b: Timestamp) -> String {
    display_time((a - b).abs(), 3)
}

fn local(ts: Timestamp) -> Option<DateTime<Local>> {
    Local.timestamp_opt(ts, 0).single()
}

/// "Sun 21 Apr 2024, 15:08:45"
pub fn date(ts: Timestamp) -> String {
    local(ts)
        .map(|dt| dt.format("%a %d %b %Y, %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// "Sun 21 Apr 15:08"
pub fn short_date(ts: Timestamp) -> String {
    local(ts)
        .map(|dt| dt.format("%a %d %b %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub fn hour_min(ts: Timestamp, with_seconds: bool) -> String {
    let fmt = if with_seconds { "%H:%M:%S" } else { "%H:%M" };
    local(ts)
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// "Sun 21 Apr 14:09 - 14:15" when both fall on the same day
pub fn date_range(from: Timestamp, to: Timestamp, short: bool) -> String {
    let same_day = match (local(from), local(to)) {
        (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
        _ => false,
    };

    match (same_day, short) {
        (true, true) => format!("{} - {}", short_date(from), hour_min(to, false)),
        (true, false) => format!("{} - {}", date(from), hour_min(to, true)),
        (false, true) => format!("{} - {}", short_date(from), short_date(to)),
        (false, false) => format!("{} - {}", date(from), date(to)),
    }
}

/// Current local time, used to stamp log separators
pub fn now_stamp() -> String {
    Local::now().format("%a, %d %b %Y, %H:%M:%S").to_string()
}

/// `HH:MM:SS` of a non-negative number of seconds
pub fn clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}:{:02}", seconds / 3_600, (seconds % 3_600) / 60, seconds % 60)
}
