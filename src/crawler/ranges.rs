//! Date ranges for historical crawls
//!
//! A historical crawl runs one search per range rather than a single long
//! scroll, because the search results for a narrow window stay short enough
//! to be scrolled to the end.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Size of each historical search window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeChunk {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl RangeChunk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    /// First day of the window following the one containing `date`
    fn next_boundary(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => date.checked_add_signed(Duration::days(7)),
            Self::Monthly => first_of_month_after(date.year(), date.month()),
            Self::Quarterly => {
                let quarter_end_month = (date.month0() / 3) * 3 + 3;
                first_of_month_after(date.year(), quarter_end_month)
            }
        }
    }
}

fn first_of_month_after(year: i32, month: u32) -> Option<NaiveDate> {
    if month >= 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

impl FromStr for RangeChunk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(format!(
                "unknown chunk '{}' (expected weekly, monthly or quarterly)",
                other
            )),
        }
    }
}

impl fmt::Display for RangeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open date window `[since, until)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    pub fn since_param(&self) -> String {
        self.since.format("%Y-%m-%d").to_string()
    }

    pub fn until_param(&self) -> String {
        self.until.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.since_param(), self.until_param())
    }
}

/// Splits `[since, until)` into consecutive windows
///
/// Windows after the first start on a chunk boundary (calendar month or
/// quarter); the last one is cut short at `until`. An empty or inverted
/// interval yields no ranges.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use timeline_harvest::crawler::{date_ranges, RangeChunk};
///
/// let since = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let until = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// let ranges = date_ranges(since, until, RangeChunk::Monthly);
///
/// assert_eq!(ranges.len(), 3);
/// assert_eq!(ranges[0].until, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
/// assert_eq!(ranges[2].until, until);
/// ```
pub fn date_ranges(since: NaiveDate, until: NaiveDate, chunk: RangeChunk) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut current = since;

    while current < until {
        let end = match chunk.next_boundary(current) {
            Some(boundary) => boundary.min(until),
            None => until,
        };
        ranges.push(DateRange {
            since: current,
            until: end,
        });
        current = end;
    }

    ranges
}

/// Parses `YYYY-MM-DD` or a relative offset such as `6months`, `2years`, `30days`
///
/// Relative offsets count back from `today` using 30-day months and
/// 365-day years.
pub fn parse_date_or_relative(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let input = input.trim();
    if input.contains('-') {
        return NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{}': {}", input, e));
    }

    let lower = input.to_ascii_lowercase();
    let digits: String = lower.chars().filter(char::is_ascii_digit).collect();
    let count: i64 = digits
        .parse()
        .map_err(|_| format!("invalid relative date '{}'", input))?;

    let days_per_unit = if lower.contains("month") {
        30
    } else if lower.contains("year") {
        365
    } else if lower.contains("day") {
        1
    } else {
        return Err(format!(
            "invalid relative date '{}' (use days, months or years)",
            input
        ));
    };

    count
        .checked_mul(days_per_unit)
        .and_then(Duration::try_days)
        .and_then(|span| today.checked_sub_signed(span))
        .ok_or_else(|| format!("relative date '{}' is out of range", input))
}
