//! Date helper functions

use chrono::{DateTime, Locale, TimeZone};

/// Format a date using a Moment.js-compatible format string and a chrono locale name
///
/// Unknown locale names fall back to POSIX (English) names.
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", "pt_BR") // -> "15 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    let locale = Locale::try_from(locale).unwrap_or(Locale::POSIX);
    date.format_localized(&chrono_format, locale).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each family
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DDDD", "%j"),
        ("DD", "%d"),
        // Hour 24h
        ("HH", "%H"),
        // Hour 12h
        ("hh", "%I"),
        // Minute (after MM is gone)
        ("mm", "%M"),
        // Second
        ("ss", "%S"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
        // Timezone
        ("ZZ", "%z"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn sample() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-03-15T19:25:28+00:00").unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(&sample(), "YYYY-MM-DD", "en_US"), "2021-03-15");
        assert_eq!(format_date(&sample(), "DD MMM YYYY", "en_US"), "15 Mar 2021");
        assert_eq!(format_date(&sample(), "HH:mm", "pt_BR"), "19:25");
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        assert_eq!(format_date(&sample(), "DD MMM YYYY", "xx_XX"), "15 Mar 2021");
    }

    #[test]
    fn test_date_xml() {
        assert_eq!(date_xml(&sample()), "2021-03-15T19:25:28+00:00");
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("DD MMM YYYY"), "%d %b %Y");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
    }
}
