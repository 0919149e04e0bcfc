//! Human-readable rendering of byte counts, timestamps, and durations.
use chrono::{DateTime, Local, TimeZone};

const SYMBOLS: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];
const DAY_SECS: i64 = 86_400;

/// Formats a byte count using binary prefixes (`1.5MB`).
///
/// Counts below one KiB are printed as the plain integer.
pub fn bytes_to_human(bytes: u64) -> String {
    for (idx, symbol) in SYMBOLS.iter().enumerate().rev() {
        let prefix = 1u128 << ((idx + 1) * 10);
        if u128::from(bytes) >= prefix {
            let value = bytes as f64 / prefix as f64;
            return format!("{value:.1}{symbol}B");
        }
    }

    bytes.to_string()
}

/// Formats a unix timestamp relative to `now`: time only if it happened
/// within the last day, full date and time otherwise.
pub fn pprint_secs_at<Tz: TimeZone>(secs: i64, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(when) = now.timezone().timestamp_opt(secs, 0).single() else {
        return secs.to_string();
    };

    if now.timestamp() - secs < DAY_SECS {
        when.format("%H:%M:%S").to_string()
    } else {
        when.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Formats a unix timestamp in local time, see [`pprint_secs_at`].
pub fn pprint_secs(secs: i64) -> String {
    pprint_secs_at(secs, &Local::now())
}

/// Formats seconds since boot as `up 3 days, 04:05`.
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;

    match days {
        0 => format!("up {hours:02}:{minutes:02}"),
        1 => format!("up 1 day, {hours:02}:{minutes:02}"),
        _ => format!("up {days} days, {hours:02}:{minutes:02}"),
    }
}

/// Parses an interval such as `5`, `5s`, `2m` or `1h` into seconds.
pub fn parse_interval(window: &str) -> Result<u64, String> {
    let window = window.trim();
    if window.is_empty() {
        return Err("Interval cannot be empty".to_string());
    }

    let (num_str, unit) = match window.chars().position(|c| c.is_alphabetic()) {
        Some(pos) => window.split_at(pos),
        None => (window, "s"),
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in interval: {num_str}"))?;

    if value <= 0.0 {
        return Err("Interval must be positive".to_string());
    }

    let seconds = match unit.to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => value,
        "m" | "min" | "mins" | "minute" | "minutes" => value * 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => value * 3600.0,
        _ => return Err(format!("Unknown time unit: {unit}")),
    };

    Ok((seconds as u64).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn bytes_below_one_kib_are_plain() {
        assert_eq!(bytes_to_human(0), "0");
        assert_eq!(bytes_to_human(1023), "1023");
    }

    #[test]
    fn bytes_use_binary_prefixes() {
        assert_eq!(bytes_to_human(1024), "1.0KB");
        assert_eq!(bytes_to_human(1536 * 1024), "1.5MB");
        assert_eq!(bytes_to_human(8 * 1024 * 1024 * 1024), "8.0GB");
        assert_eq!(bytes_to_human(u64::MAX), "16.0EB");
    }

    #[test]
    fn recent_timestamps_show_time_only() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let an_hour_ago = now.timestamp() - 3_600;
        assert_eq!(pprint_secs_at(an_hour_ago, &now), "11:00:00");
    }

    #[test]
    fn old_timestamps_show_date() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let two_days_ago = now.timestamp() - 2 * DAY_SECS;
        assert_eq!(pprint_secs_at(two_days_ago, &now), "2024-04-30 12:00:00");
    }

    #[test]
    fn uptime_is_split_into_days_hours_minutes() {
        assert_eq!(format_uptime(59), "up 00:00");
        assert_eq!(format_uptime(3_660), "up 01:01");
        assert_eq!(format_uptime(86_400 + 120), "up 1 day, 00:02");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3_600 + 5 * 60), "up 3 days, 04:05");
    }

    #[test]
    fn intervals_accept_bare_numbers_and_units() {
        assert_eq!(parse_interval("5"), Ok(5));
        assert_eq!(parse_interval("5s"), Ok(5));
        assert_eq!(parse_interval("2m"), Ok(120));
        assert_eq!(parse_interval("1h"), Ok(3_600));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("3d").is_err());
        assert!(parse_interval("").is_err());
    }
}
