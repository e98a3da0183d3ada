//! Reusable formatting helpers for CLI output

use chrono::{DateTime, Local, Utc};

/// Local `YYYY-MM-DD HH:MM`, or "N/A"
pub fn format_local(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Human-readable age of a timestamp relative to `now`.
///
/// # Example output
/// - `45s ago`
/// - `12m ago`
/// - `3h 5m ago`
/// - `2d ago`
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(then).num_seconds().max(0);
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h {}m ago", hours, mins)
    } else if mins > 0 {
        format!("{}m ago", mins)
    } else {
        format!("{}s ago", secs)
    }
}

/// Bytes as a human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Shorten to `max_len` characters with an ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::seconds(45), now), "45s ago");
        assert_eq!(format_age(now - Duration::minutes(12), now), "12m ago");
        assert_eq!(
            format_age(now - Duration::minutes(185), now),
            "3h 5m ago"
        );
        assert_eq!(format_age(now - Duration::days(2), now), "2d ago");
        assert_eq!(format_age(now + Duration::seconds(5), now), "0s ago");
    }

    #[test]
    fn test_format_local_none() {
        assert_eq!(format_local(None), "N/A");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a long description", 10), "a long ...");
    }
}
