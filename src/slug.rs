use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::collection::INDEX_FILE;
use crate::error::{QuireError, Result};
use crate::text_utils::{shanghai, slug_timestamp};

/// Upper bound on `-N` suffix attempts before giving up on a base slug.
pub const MAX_SLUG_PROBES: usize = 10_000;

/// Noon baseline and spacing used when spreading same-day entries.
const BACKFILL_BASE_MINUTES: u32 = 12 * 60;
const BACKFILL_STEP_MINUTES: u32 = 5;

pub fn slugify(s: &str) -> String {
    lazy_static! {
        static ref QUOTES_REGEX: Regex = Regex::new(r#"['"`]"#).unwrap();
        static ref SEPARATOR_REGEX: Regex = Regex::new(r"[^a-z0-9\x{4e00}-\x{9fa5}]+").unwrap();
    }

    let lower = s.trim().to_lowercase();
    let unquoted = QUOTES_REGEX.replace_all(&lower, "");
    let dashed = SEPARATOR_REGEX.replace_all(&unquoted, "-");
    dashed.trim_matches('-').to_string()
}

/// `<YYYYMMDDHHmmss>` or `<YYYYMMDDHHmmss>-<slugified title>`.
pub fn timestamp_slug(instant: &DateTime<Utc>, title: Option<&str>) -> String {
    let ts = slug_timestamp(instant);
    match title.map(slugify) {
        Some(suffix) if !suffix.is_empty() => format!("{}-{}", ts, suffix),
        _ => ts,
    }
}

/// Probes `<collection_dir>/<candidate>/index.md` starting from `base`,
/// then `base-1`, `base-2`, ... until a free one is found.
pub fn ensure_unique_slug(collection_dir: &Path, base: &str) -> Result<String> {
    ensure_unique_slug_with_cap(collection_dir, base, MAX_SLUG_PROBES)
}

fn ensure_unique_slug_with_cap(collection_dir: &Path, base: &str, cap: usize) -> Result<String> {
    for n in 0..cap {
        let candidate = if n == 0 {
            base.to_string()
        } else {
            format!("{}-{}", base, n)
        };

        if !collection_dir.join(&candidate).join(INDEX_FILE).exists() {
            return Ok(candidate);
        }
    }

    Err(QuireError::SlugExhausted {
        base: base.to_string(),
        attempts: cap,
    })
}

/// Time of day for the `index`-th entry published on `date`, with the
/// entries already sorted by the caller.
pub fn day_slot(date: &NaiveDate, index: usize) -> Result<DateTime<FixedOffset>> {
    let minutes = BACKFILL_BASE_MINUTES as usize + index * BACKFILL_STEP_MINUTES as usize;
    let time = NaiveTime::from_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, (index % 60) as u32)
        .ok_or_else(|| QuireError::invalid_field(
            "pubDate",
            format!("too many entries on {} to allocate a time for entry #{}", date, index + 1)))?;

    shanghai()
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| QuireError::invalid_field("pubDate", format!("invalid local time on {}", date)))
}

pub fn allocate_day_slots(date: &NaiveDate, count: usize) -> Result<Vec<DateTime<FixedOffset>>> {
    (0..count).map(|index| day_slot(date, index)).collect()
}
