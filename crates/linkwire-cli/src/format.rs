use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format epoch milliseconds as a calendar date (UTC)
pub fn format_date(epoch_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_millis) {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None => "unknown date".to_string(),
    }
}

/// Format epoch milliseconds as date and time (UTC)
pub fn format_timestamp(epoch_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(epoch_millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "unknown time".to_string(),
    }
}

/// Human description of how far away `target` is from `now`, e.g. "in 2h 5m"
pub fn format_relative(target_millis: i64, now_millis: i64) -> String {
    let delta_secs = (target_millis - now_millis) / 1000;
    let span = delta_secs.unsigned_abs();
    let text = if span >= 86_400 {
        format!("{}d {}h", span / 86_400, (span % 86_400) / 3600)
    } else if span >= 3600 {
        format!("{}h {}m", span / 3600, (span % 3600) / 60)
    } else if span >= 60 {
        format!("{}m", span / 60)
    } else {
        format!("{}s", span)
    };

    if delta_secs > 0 {
        format!("in {}", text)
    } else {
        format!("{} ago", text)
    }
}
