use chrono::{DateTime, SecondsFormat, TimeZone};

/// This is the standard way of converting a moment into a time log key in jotter.
/// Keys are RFC 3339 with microseconds and the local offset, so that they sort lexically.
pub fn timestamp_to_log_key<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Human readable form of a time log key. Keys that don't parse are returned unchanged.
pub fn display_log_key(key: &str) -> String {
    DateTime::parse_from_rfc3339(key)
        .map(|v| v.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| key.to_string())
}

/// Formats seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_countdown(remaining_seconds: u64) -> String {
    let (minutes, seconds) = (remaining_seconds / 60, remaining_seconds % 60);
    format!("{minutes:02}:{seconds:02}")
}
