//! Text conversions for the countdown display and manual time input.

use crate::timer::MAX_DURATION_SECS;

/// `MM:SS`, minutes zero-padded to two digits.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parses manual `MM:SS` input. Halves that are not numbers count as zero,
/// matching a lenient text field; anything without exactly one colon is
/// rejected so the caller can restore the previous display.
pub fn parse_clock(input: &str) -> Option<i64> {
    let mut parts = input.trim().split(':');
    let (minutes, seconds) = match (parts.next(), parts.next(), parts.next()) {
        (Some(minutes), Some(seconds), None) => (minutes, seconds),
        _ => return None,
    };

    let minutes = leading_int(minutes);
    let seconds = leading_int(seconds);
    Some((minutes * 60 + seconds).clamp(0, MAX_DURATION_SECS))
}

/// Integer prefix of a field (`"12abc"` -> 12), zero when there is none.
fn leading_int(field: &str) -> i64 {
    let field = field.trim();
    let (sign, digits) = match field.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, field.strip_prefix('+').unwrap_or(field)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|value| sign * value.min(MAX_DURATION_SECS))
        .unwrap_or(0)
}

/// The preset (in minutes) matching the configured duration, if any.
pub fn active_preset(total_seconds: i64, presets: &[u32]) -> Option<u32> {
    let minutes = (total_seconds as f64 / 60.0).round() as i64;
    presets
        .iter()
        .copied()
        .find(|preset| i64::from(*preset) == minutes)
}

/// Human-readable work total for archive headers.
pub fn format_work_time(millis: i64) -> String {
    let total_minutes = millis.max(0) / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(format_clock(-4), "00:00");
    }

    #[test]
    fn parses_manual_input() {
        assert_eq!(parse_clock("25:00"), Some(1500));
        assert_eq!(parse_clock(" 1:30 "), Some(90));
        assert_eq!(parse_clock("ab:30"), Some(30));
        assert_eq!(parse_clock("99:00"), Some(MAX_DURATION_SECS));
        assert_eq!(parse_clock("-5:00"), Some(0));
    }

    #[test]
    fn rejects_input_without_one_colon() {
        assert_eq!(parse_clock("25"), None);
        assert_eq!(parse_clock("1:2:3"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn highlights_matching_preset() {
        let presets = [5, 15, 25, 45, 60];
        assert_eq!(active_preset(1500, &presets), Some(25));
        assert_eq!(active_preset(1490, &presets), Some(25));
        assert_eq!(active_preset(1200, &presets), None);
    }

    #[test]
    fn work_time_labels() {
        assert_eq!(format_work_time(0), "0m");
        assert_eq!(format_work_time(25 * 60_000), "25m");
        assert_eq!(format_work_time(95 * 60_000 + 59_000), "1h 35m");
    }
}
