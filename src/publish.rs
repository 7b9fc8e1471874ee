use std::fmt::{Display, Formatter};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use spdlog::info;

use crate::collection::{find_entry, Collection};
use crate::content::frontmatter::{quote, Anchor, Document};
use crate::error::{QuireError, Result};
use crate::text_utils::iso_shanghai;

pub const UPDATED_FIELD: &str = "updatedDate";

/// Where a new `updatedDate` goes when the entry has none yet.
const UPDATED_ANCHORS: [Anchor<'static>; 2] = [Anchor::After("pubDate"), Anchor::Before("tags")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Entry must still be `draft: true`
    Draft,
    /// Entry must be `draft: false`
    Final,
}

impl Stage {
    fn expects_draft(&self) -> bool {
        matches!(self, Stage::Draft)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Draft => write!(f, "draft"),
            Stage::Final => write!(f, "final"),
        }
    }
}

fn open(content_root: &Path, collection: Collection, slug: &str) -> Result<(PathBuf, Document)> {
    let entry = find_entry(content_root, collection, slug)?;
    let doc = Document::read(&entry.index)?;
    Ok((entry.index, doc))
}

/// Sets `updatedDate` to `now` in Shanghai time. Every other line of the
/// file stays as it was.
pub fn touch_updated(content_root: &Path, collection: Collection, slug: &str, now: &DateTime<Utc>) -> Result<PathBuf> {
    let (index, mut doc) = open(content_root, collection, slug)?;
    doc.front.upsert(UPDATED_FIELD, &quote(&iso_shanghai(now)), &UPDATED_ANCHORS);
    doc.write(&index)?;

    info!("Updated {}: {}", UPDATED_FIELD, index.display());
    Ok(index)
}

fn flip_draft(content_root: &Path, collection: Collection, slug: &str, from: bool, to: bool) -> Result<PathBuf> {
    let (index, mut doc) = open(content_root, collection, slug)?;
    doc.transition_draft(&index, from, to)?;
    doc.write(&index)?;

    info!("{}: draft {} -> {}", index.display(), from, to);
    Ok(index)
}

/// `draft: true` to `draft: false`.
pub fn confirm_publish(content_root: &Path, collection: Collection, slug: &str) -> Result<PathBuf> {
    flip_draft(content_root, collection, slug, true, false)
}

/// `draft: false` back to `draft: true`.
pub fn retract(content_root: &Path, collection: Collection, slug: &str) -> Result<PathBuf> {
    flip_draft(content_root, collection, slug, false, true)
}

/// Read-only gate for the draft and final publish stages.
pub fn check_stage(content_root: &Path, collection: Collection, slug: &str, stage: Stage) -> Result<PathBuf> {
    let (index, doc) = open(content_root, collection, slug)?;
    let expected = stage.expects_draft();
    let found = doc.draft();
    if found != Some(expected) {
        return Err(QuireError::DraftState { path: index, expected, found });
    }
    Ok(index)
}
