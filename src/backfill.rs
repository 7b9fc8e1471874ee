use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use spdlog::info;

use crate::collection::{list_entries, Collection};
use crate::content::entry_meta::render_pub_date;
use crate::content::frontmatter::{quote, unquote, Document};
use crate::error::{QuireError, Result};
use crate::slug::allocate_day_slots;
use crate::text_utils::PubDate;

#[derive(Debug, Clone, PartialEq)]
pub struct BackfillChange {
    pub index: PathBuf,
    pub from: NaiveDate,
    pub to: DateTime<FixedOffset>,
}

/// Every date-only `pubDate` in the collection gets a time of day. Entries
/// sharing a day are spread out in path order, so re-running on the same
/// tree plans the same times.
pub fn plan_backfill(content_root: &Path, collection: Collection) -> Result<Vec<(BackfillChange, Document)>> {
    let collection_dir = collection.dir(content_root);
    if !collection_dir.is_dir() {
        return Err(QuireError::NotFound(collection_dir));
    }

    let mut by_day: BTreeMap<NaiveDate, Vec<(PathBuf, Document)>> = BTreeMap::new();
    for entry in list_entries(&collection_dir)? {
        let doc = Document::read(&entry.index)?;
        let Some(raw) = doc.front.value("pubDate") else {
            continue;
        };
        if let PubDate::Day(day) = PubDate::parse(&unquote(raw)?)? {
            by_day.entry(day).or_default().push((entry.index, doc));
        }
    }

    let mut plan = vec![];
    for (day, mut items) in by_day {
        items.sort_by(|a, b| a.0.cmp(&b.0));
        let slots = allocate_day_slots(&day, items.len())?;
        for ((index, doc), to) in items.into_iter().zip(slots) {
            plan.push((BackfillChange { index, from: day, to }, doc));
        }
    }

    Ok(plan)
}

/// Plans everything first so a bad file aborts before anything is written.
pub fn backfill_pub_dates(content_root: &Path, collection: Collection, dry_run: bool) -> Result<Vec<BackfillChange>> {
    let plan = plan_backfill(content_root, collection)?;

    let mut changes = vec![];
    for (change, mut doc) in plan {
        let value = quote(&render_pub_date(&PubDate::Timestamp(change.to)));
        if dry_run {
            info!("[dry] {}: pubDate {} -> {}", change.index.display(), change.from, value);
        } else {
            doc.front.set("pubDate", &value);
            doc.write(&change.index)?;
            info!("{}: pubDate {} -> {}", change.index.display(), change.from, value);
        }
        changes.push(change);
    }

    Ok(changes)
}
