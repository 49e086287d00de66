use chrono::{DateTime, Utc};

/// Parse a raw form field into a number.
/// Empty input, garbage, and non-finite values all become NaN (the "missing"
/// sentinel). Thousands separators and surrounding whitespace are ignored.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|&c| c != ',').collect();
    if cleaned.is_empty() {
        return f64::NAN;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => f64::NAN,
    }
}

/// Format a value with a fixed number of decimals.
/// Negative zero is shown as zero.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.*}", decimals, value)
}

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

/// How long ago `since` was, for status lines ("just now", "5m ago", "2h ago").
pub fn age_display(since: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - since).num_minutes();
    if minutes < 1 {
        // Clock skew lands here too
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_age_display() {
        assert_eq!(age_display(Utc::now()), "just now");
        assert_eq!(age_display(Utc::now() + Duration::minutes(10)), "just now");
        assert_eq!(age_display(Utc::now() - Duration::minutes(5)), "5m ago");
        assert_eq!(age_display(Utc::now() - Duration::minutes(95)), "2h ago");
        assert_eq!(age_display(Utc::now() - Duration::hours(30)), "1d ago");
        assert_eq!(age_display(Utc::now() - Duration::hours(40)), "2d ago");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("80"), 80.0);
        assert_eq!(parse_number(" 0.8 "), 0.8);
        assert_eq!(parse_number("1,250.5"), 1250.5);
        assert_eq!(parse_number("13,800"), 13800.0);
        assert_eq!(parse_number("-12"), -12.0);
        assert_eq!(parse_number("4.7e3"), 4700.0);
    }

    #[test]
    fn test_parse_number_missing() {
        assert!(parse_number("").is_nan());
        assert!(parse_number("   ").is_nan());
        assert!(parse_number(",").is_nan());
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("NaN").is_nan());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(0.8, 4), "0.8000");
        assert_eq!(format_fixed(60.0, 3), "60.000");
        assert_eq!(format_fixed(36.869_897_6, 2), "36.87");
        assert_eq!(format_fixed(-0.0, 3), "0.000");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Ω Ω Ω Ω", 5), "Ω ...");
    }
}
