use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{QuireError, Result};

/// Asia/Shanghai has no DST, so a fixed +08:00 offset is exact.
pub const SHANGHAI_OFFSET_SECS: i32 = 8 * 60 * 60;

pub fn shanghai() -> FixedOffset {
    FixedOffset::east_opt(SHANGHAI_OFFSET_SECS).unwrap_or(Utc.fix())
}

pub fn to_shanghai(instant: &DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&shanghai())
}

/// `2024-02-27T14:20:53+08:00`
pub fn iso_shanghai(instant: &DateTime<Utc>) -> String {
    to_shanghai(instant).format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// `20240227142053`, the timestamp component of a slug.
pub fn slug_timestamp(instant: &DateTime<Utc>) -> String {
    to_shanghai(instant).format("%Y%m%d%H%M%S").to_string()
}

/// `2024-02-27`
pub fn date_shanghai(instant: &DateTime<Utc>) -> String {
    to_shanghai(instant).format("%Y-%m-%d").to_string()
}

/// `20240227`
pub fn ymd(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn parse_ymd(buf: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(buf, "%Y%m%d")
        .map_err(|e| QuireError::invalid_field("date", format!("{} is not YYYYMMDD: {}", buf, e)))
}

pub fn prev_ymd(buf: &str) -> Result<String> {
    let date = parse_ymd(buf)?;
    let prev = date
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| QuireError::invalid_field("date", format!("{} has no previous day", buf)))?;
    Ok(ymd(&prev))
}

/// Half-open range `[yesterday 00:00, today 00:00)` in Shanghai time,
/// returned on the UTC timeline together with yesterday's local date.
pub struct DayRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub date: NaiveDate,
}

pub fn yesterday_range(now: &DateTime<Utc>) -> DayRange {
    let today = to_shanghai(now).date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);
    DayRange {
        since: local_midnight_utc(&yesterday),
        until: local_midnight_utc(&today),
        date: yesterday,
    }
}

fn local_midnight_utc(date: &NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let shifted = midnight - chrono::Duration::seconds(SHANGHAI_OFFSET_SECS as i64);
    Utc.from_utc_datetime(&shifted)
}

/// A `pubDate` as found in frontmatter: a bare calendar day or a full
/// timestamp with offset.
#[derive(Debug, Clone, PartialEq)]
pub enum PubDate {
    Day(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
}

impl PubDate {
    pub fn parse(buf: &str) -> Result<PubDate> {
        lazy_static! {
            static ref DAY_REGEX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
        }

        let buf = buf.trim();
        if DAY_REGEX.is_match(buf) {
            return NaiveDate::parse_from_str(buf, "%Y-%m-%d")
                .map(PubDate::Day)
                .map_err(|e| QuireError::invalid_field("pubDate", format!("{}: {}", buf, e)));
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(buf) {
            return Ok(PubDate::Timestamp(ts));
        }

        // Date-times without an offset are read as Shanghai local time
        NaiveDateTime::parse_from_str(buf, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .and_then(|naive| shanghai().from_local_datetime(&naive).single())
            .map(PubDate::Timestamp)
            .ok_or_else(|| QuireError::invalid_field("pubDate", format!("Unable to parse date time {}", buf)))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            PubDate::Day(date) => *date,
            PubDate::Timestamp(ts) => ts.date_naive(),
        }
    }

    pub fn has_time(&self) -> bool {
        matches!(self, PubDate::Timestamp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_iso_shanghai() {
        let now = instant("2024-02-27T06:20:53Z");
        assert_eq!(iso_shanghai(&now), "2024-02-27T14:20:53+08:00");
        assert_eq!(slug_timestamp(&now), "20240227142053");
        assert_eq!(date_shanghai(&now), "2024-02-27");
    }

    #[test]
    fn test_shanghai_crosses_midnight() {
        let now = instant("2024-02-29T17:30:00Z");
        assert_eq!(iso_shanghai(&now), "2024-03-01T01:30:00+08:00");
        assert_eq!(slug_timestamp(&now), "20240301013000");
    }

    #[test]
    fn test_prev_ymd() {
        assert_eq!(prev_ymd("20240301").unwrap(), "20240229");
        assert_eq!(prev_ymd("20250101").unwrap(), "20241231");
        assert!(prev_ymd("2025-01-01").is_err());
    }

    #[test]
    fn test_yesterday_range() {
        // 00:05 in Shanghai on March 1st
        let now = instant("2024-02-29T16:05:00Z");
        let range = yesterday_range(&now);
        assert_eq!(ymd(&range.date), "20240229");
        assert_eq!(range.since, instant("2024-02-28T16:00:00Z"));
        assert_eq!(range.until, instant("2024-02-29T16:00:00Z"));
    }

    #[test]
    fn test_parse_pub_date() {
        let day = PubDate::parse("2026-02-01").unwrap();
        assert_eq!(day, PubDate::Day(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
        assert!(!day.has_time());

        let ts = PubDate::parse("2026-02-01T12:05:01+08:00").unwrap();
        assert!(ts.has_time());
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

        let local = PubDate::parse("2026-02-01T23:30:00").unwrap();
        assert_eq!(local, PubDate::parse("2026-02-01T23:30:00+08:00").unwrap());

        assert!(PubDate::parse("yesterday").is_err());
        assert!(PubDate::parse("2026-02-30").is_err());
    }
}
