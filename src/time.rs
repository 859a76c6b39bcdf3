use chrono::{NaiveDateTime, Utc};

/// SQLite's `datetime('now')` format.
const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_db_time(db_time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(db_time, DB_FORMAT).ok()
}

/// "Jan 05 2025, 08:58 AM". Unparseable input is returned unchanged.
pub fn format_timestamp(db_time: &str) -> String {
    parse_db_time(db_time)
        .map(|dt| dt.format("%b %d %Y, %I:%M %p").to_string())
        .unwrap_or_else(|| db_time.to_string())
}

pub fn parse_and_format_relative(db_time: &str) -> String {
    parse_db_time(db_time)
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}
