//! Parsers for the loosely formatted fields of the catalog API.
//!
//! None of these fail: input that cannot be understood yields `None`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static AIRED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)\s+(\d+),\s+(\d+)").expect("valid aired date regex"));

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid float regex")
});

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Episode number from an episode title such as "12" or "12 END".
///
/// Leading whitespace and a `+` sign are accepted, then the leading decimal
/// digits are read. Titles without leading digits ("Episode 5", "OVA") and
/// negative numbers give `None`.
pub fn parse_episode_number(title: &str) -> Option<u32> {
    let trimmed = title.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    unsigned[..digits_end].parse().ok()
}

/// Release date from an "aired" string such as "Oct 4, 2024 to ?".
///
/// Only three-letter English month abbreviations are recognised. Impossible
/// calendar dates give `None`.
pub fn parse_release_date(aired: &str) -> Option<NaiveDate> {
    let caps = AIRED_DATE.captures(aired)?;

    let month = MONTHS.iter().position(|m| *m == &caps[1])? as u32 + 1;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Rating from a score value such as "8.52" or "7.1 (scored by 1000)".
pub fn parse_rating(score: &str) -> Option<f64> {
    let caps = LEADING_FLOAT.captures(score)?;
    caps[1].parse::<f64>().ok().filter(|r| r.is_finite())
}

/// Synopsis paragraphs joined by newlines; `None` when there is no text.
pub fn join_paragraphs(paragraphs: &[String]) -> Option<String> {
    let text = paragraphs.join("\n");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Treat empty strings from the API as absent values
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_number() {
        assert_eq!(parse_episode_number("12"), Some(12));
        assert_eq!(parse_episode_number("  7"), Some(7));
        assert_eq!(parse_episode_number("+3"), Some(3));
        assert_eq!(parse_episode_number("12 END"), Some(12));
        assert_eq!(parse_episode_number("0"), Some(0));
        assert_eq!(parse_episode_number("003"), Some(3));
    }

    #[test]
    fn test_episode_number_unparseable() {
        for title in ["Episode 5", "OVA", "", "   ", "-2", "+", "SP1", "99999999999"] {
            assert_eq!(parse_episode_number(title), None, "title {title:?}");
        }
    }

    #[test]
    fn test_release_date() {
        assert_eq!(
            parse_release_date("Oct 4, 2024 to ?"),
            NaiveDate::from_ymd_opt(2024, 10, 4)
        );
        assert_eq!(
            parse_release_date("Jan 10, 2023 to Mar 28, 2023"),
            NaiveDate::from_ymd_opt(2023, 1, 10)
        );
        assert_eq!(
            parse_release_date("Aired: Dec 31,  1999"),
            NaiveDate::from_ymd_opt(1999, 12, 31)
        );
    }

    #[test]
    fn test_release_date_unparseable() {
        for aired in [
            "",
            "?",
            "2024-10-04",
            "October 4, 2024",
            "oct 4, 2024",
            "Oct 4 2024",
            "Feb 30, 2024",
            "Oct 4, 99999999999",
        ] {
            assert_eq!(parse_release_date(aired), None, "aired {aired:?}");
        }
    }

    #[test]
    fn test_rating() {
        assert_eq!(parse_rating("8.52"), Some(8.52));
        assert_eq!(parse_rating(" 7"), Some(7.0));
        assert_eq!(parse_rating("7.1 (scored by 1000)"), Some(7.1));
        assert_eq!(parse_rating(".5"), Some(0.5));
        assert_eq!(parse_rating("N/A"), None);
        assert_eq!(parse_rating("?"), None);
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("1e999"), None);
    }

    #[test]
    fn test_join_paragraphs() {
        assert_eq!(
            join_paragraphs(&["One.".to_string(), "Two.".to_string()]).as_deref(),
            Some("One.\nTwo.")
        );
        assert_eq!(join_paragraphs(&[]), None);
        assert_eq!(join_paragraphs(&[String::new()]), None);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" https://x ")).as_deref(), Some("https://x"));
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(None), None);
    }
}
