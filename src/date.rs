//! Edition dates and inclusive date ranges.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

/// Oldest year the archive serves.
pub const FIRST_EDITION_YEAR: i32 = 2003;

// Accepted notations with their zero-padded length.
const FORMATS: [(&str, usize); 5] = [
    ("%Y%m%d", 8),
    ("%Y-%m-%d", 10),
    ("%Y/%m/%d", 10),
    ("%Y-%m/%d", 10),
    ("%Y%m/%d", 9),
];

/// Parse a single date. Accepts `YYYYMMDD`, `YYYY-MM-DD`, `YYYY/MM/DD`,
/// `YYYY-MM/DD` and `YYYYMM/DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    try_parse_date(s).ok_or_else(|| Error::InvalidDateFormat(s.to_owned()))
}

fn try_parse_date(s: &str) -> Option<NaiveDate> {
    // chrono tolerates signs and blanks before numbers; the notations don't.
    if !s.starts_with(|c: char| c.is_ascii_digit())
        || !s.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '/')
    {
        return None;
    }
    FORMATS
        .iter()
        .filter(|(_, len)| s.len() == *len)
        .find_map(|(fmt, _)| NaiveDate::parse_from_str(s, fmt).ok())
}

/// An inclusive, ascending run of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Parse `YYYYMMDD`, `YYYYMMDD-YYYYMMDD` or the 16 bare digits. The
    /// dashed and slashed notations accepted by [`parse_date`] work on both
    /// sides of the dash.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(date) = try_parse_date(s) {
            return Ok(Self::single(date));
        }
        if s.len() == 16 && s.bytes().all(|b| b.is_ascii_digit()) {
            let (start, end) = s.split_at(8);
            if let (Some(start), Some(end)) = (try_parse_date(start), try_parse_date(end)) {
                return Self::new(start, end);
            }
        }
        // The dash joining the two dates is the first one with a date on each side.
        s.match_indices('-')
            .find_map(|(i, _)| Some((try_parse_date(&s[..i])?, try_parse_date(&s[i + 1..])?)))
            .map_or_else(
                || Err(Error::InvalidDateFormat(s.to_owned())),
                |(start, end)| Self::new(start, end),
            )
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, always at least one.
    pub fn len(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Lazily walks the range. Each call starts over from `start`.
    pub fn days(&self) -> Days {
        Days {
            next: Some(self.start),
            end: self.end,
        }
    }

    /// Reject ranges reaching outside what can have been published by `today`.
    pub fn check_published(&self, today: NaiveDate) -> Result<()> {
        if self.start.year() < FIRST_EDITION_YEAR {
            return Err(Error::DateTooEarly {
                date: self.start,
                first_year: FIRST_EDITION_YEAR,
            });
        }
        if self.end > today {
            return Err(Error::DateInFuture {
                date: self.end,
                today,
            });
        }
        Ok(())
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} .. {}", self.start, self.end)
        }
    }
}

impl IntoIterator for &DateRange {
    type Item = NaiveDate;
    type IntoIter = Days;

    fn into_iter(self) -> Days {
        self.days()
    }
}

#[derive(Debug, Clone)]
pub struct Days {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current.succ_opt().filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self
            .next
            .map_or(0, |d| (self.end - d).num_days() as usize + 1);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Days {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_notations() {
        for s in ["20250408", "2025-04-08", "2025/04/08", "2025-04/08", "202504/08", " 20250408 "] {
            assert_eq!(parse_date(s).unwrap(), ymd(2025, 4, 8), "{s}");
        }
        assert_eq!(parse_date("20240229").unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_parse_date_rejects_bad_input() {
        for s in [
            "", "2025048", "202504081", "20251301", "20250431", "20230229", "2025O408",
            "20250401-20250402", "abcdefgh", "2-0-2-5-0-4-0-8", "--20250401//", "2025/0408",
            "2025-4-8", "+20250408", "2025 0408", "20250401-",
        ] {
            assert!(
                matches!(parse_date(s), Err(Error::InvalidDateFormat(_))),
                "{s} should fail"
            );
        }
    }

    #[test]
    fn test_range_expands_inclusive_ascending() {
        let range = DateRange::parse("20250401-20250407").unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 7);
        assert_eq!(range.len(), 7);
        assert_eq!(days.first(), Some(&ymd(2025, 4, 1)));
        assert_eq!(days.last(), Some(&ymd(2025, 4, 7)));
        assert!(days.windows(2).all(|w| w[0].succ_opt() == Some(w[1])));
    }

    #[test]
    fn test_range_is_restartable() {
        let range = DateRange::parse("20250401-20250403").unwrap();
        let first: Vec<_> = range.days().collect();
        let second: Vec<_> = (&range).into_iter().collect();
        assert_eq!(first, second);

        let mut days = range.days();
        days.next();
        assert_eq!(days.len(), 2);
        assert_eq!(days.clone().count(), 2);
    }

    #[test]
    fn test_single_date_range() {
        let range = DateRange::parse("20250408").unwrap();
        assert_eq!(range.days().collect::<Vec<_>>(), vec![ymd(2025, 4, 8)]);
        assert_eq!(range.to_string(), "2025-04-08");
    }

    #[test]
    fn test_range_across_month_and_year() {
        let range = DateRange::parse("2024-12-30-2025-01-02").unwrap();
        assert_eq!(
            range.days().collect::<Vec<_>>(),
            vec![ymd(2024, 12, 30), ymd(2024, 12, 31), ymd(2025, 1, 1), ymd(2025, 1, 2)]
        );
    }

    #[test]
    fn test_range_without_separator() {
        let range = DateRange::parse("2025040120250403").unwrap();
        assert_eq!((range.start(), range.end()), (ymd(2025, 4, 1), ymd(2025, 4, 3)));
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        let err = DateRange::parse("20250407-20250401").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRange { start, end } if start == ymd(2025, 4, 7) && end == ymd(2025, 4, 1)
        ));
    }

    #[test]
    fn test_malformed_ranges() {
        for s in [
            "20250401-2025040",
            "20250401-20250230",
            "20250401~20250407",
            "-",
            "20250401-",
            "-20250401",
            "20250401--20250407",
            "20250401/20250407",
        ] {
            assert!(
                matches!(DateRange::parse(s), Err(Error::InvalidDateFormat(_))),
                "{s} should fail"
            );
        }
    }

    #[test]
    fn test_check_published() {
        let today = ymd(2025, 4, 8);
        assert!(DateRange::parse("20250401-20250408")
            .unwrap()
            .check_published(today)
            .is_ok());
        assert!(matches!(
            DateRange::parse("20250401-20250409").unwrap().check_published(today),
            Err(Error::DateInFuture { .. })
        ));
        assert!(matches!(
            DateRange::parse("20021231-20030102").unwrap().check_published(today),
            Err(Error::DateTooEarly { first_year: 2003, .. })
        ));
    }
}
