//! Date helper functions

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::fmt::Write;

use crate::error::SiteError;

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY/MM/DD")? // -> "2024/01/15"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str) -> Result<String, SiteError>
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    let mut out = String::new();
    write!(out, "{}", date.format(&chrono_format)).map_err(|_| invalid_format(format))?;
    Ok(out)
}

/// Reject a Moment.js format string chrono cannot render
pub fn check_date_format(format: &str) -> Result<(), SiteError> {
    let chrono_format = moment_to_chrono_format(format);
    if StrftimeItems::new(&chrono_format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid_format(format));
    }
    Ok(())
}

fn invalid_format(format: &str) -> SiteError {
    SiteError::config(format!("invalid date_format {:?}", format))
}

/// RFC 2822 date used by RSS `pubDate` and `lastBuildDate`
pub fn date_rfc2822<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.to_rfc2822()
}

/// Calendar date in the date's own timezone, as used by sitemap `lastmod`
pub fn date_iso<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%d").to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each family
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
        ("SSS", "%3f"),
    ];

    // Literal `%` must not reach chrono as a specifier
    let mut result = format.replace('%', "%%");

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_format_date() {
        let date = Tokyo.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_date(&date, "YYYY/MM/DD").unwrap(), "2024/01/15");
        assert_eq!(format_date(&date, "YYYY-MM-DD HH:mm").unwrap(), "2024-01-15 10:30");
        assert_eq!(format_date(&date, "MMMM DD, YYYY").unwrap(), "January 15, 2024");
    }

    #[test]
    fn test_format_date_keeps_literal_percent() {
        let date = Tokyo.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_date(&date, "YYYY/MM/DD 100%").unwrap(), "2024/01/15 100%");
        assert_eq!(format_date(&date, "%Y %d").unwrap(), "%Y %d");
        assert!(check_date_format("YYYY/MM/DD 100%").is_ok());
        assert!(check_date_format("%").is_ok());
    }

    #[test]
    fn test_rfc2822_keeps_offset() {
        let date = Tokyo.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(date_rfc2822(&date), "Mon, 15 Jan 2024 00:00:00 +0900");
    }

    #[test]
    fn test_iso_date_is_local_calendar_day() {
        let date = Tokyo.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(date_iso(&date), "2024-01-15");
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("HH:mm:ss"), "%H:%M:%S");
        assert_eq!(moment_to_chrono_format("DD 50%"), "%d 50%%");
    }
}
