// src/durations.rs - Parsing and formatting of user supplied ban durations

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration")]
    Invalid,
}

/// How permanent bans are stored: ten years in the future.
const PERMANENT_YEARS: i64 = 10;

/// Expiries at least this far out are reported as "Permanent".
const PERMANENT_DISPLAY_YEARS: i32 = 5;

/// Parse a user supplied duration string such as "30m", "1d" or "2w".
///
/// Accepted units are s, m, h, d, w, M (30 days) and y. A value of "0" or
/// an empty string is interpreted as permanent and mapped to ten years,
/// mirroring how permanent bans are stored.
pub fn parse_duration(value: &str) -> Result<Duration, DurationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return Ok(Duration::days(365 * PERMANENT_YEARS));
    }

    let unit = trimmed.chars().last().ok_or(DurationError::Invalid)?;

    let (digits, multiplier) = if unit.is_ascii_digit() {
        // Bare integers are seconds.
        (trimmed, Duration::seconds(1))
    } else {
        let multiplier = match unit {
            's' => Duration::seconds(1),
            'm' => Duration::minutes(1),
            'h' => Duration::hours(1),
            'd' => Duration::days(1),
            'w' => Duration::weeks(1),
            'M' => Duration::days(30),
            'y' => Duration::days(365),
            _ => return Err(DurationError::Invalid),
        };

        (&trimmed[..trimmed.len() - 1], multiplier)
    };

    let count = digits
        .parse::<i64>()
        .map_err(|_| DurationError::Invalid)?;
    if count < 0 {
        return Err(DurationError::Invalid);
    }

    let seconds = multiplier
        .num_seconds()
        .checked_mul(count)
        .ok_or(DurationError::Invalid)?;

    Ok(Duration::seconds(seconds))
}

/// Whether an expiry is far enough out to be shown as permanent.
pub fn is_permanent(valid_until: DateTime<Utc>) -> bool {
    use chrono::Datelike;

    valid_until.year() - Utc::now().year() >= PERMANENT_DISPLAY_YEARS
}

/// Human readable remaining time until an expiry, e.g. "3d 4h".
pub fn fmt_duration(valid_until: DateTime<Utc>) -> String {
    let remaining = valid_until - Utc::now();
    if remaining <= Duration::zero() {
        return "expired".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", remaining.num_seconds().max(1))
    }
}

/// Short absolute timestamp for embeds.
pub fn fmt_time_short(when: DateTime<Utc>) -> String {
    when.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
