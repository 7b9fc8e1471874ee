use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use spdlog::info;

use crate::collection::{Collection, INDEX_FILE};
use crate::config::Config;
use crate::content::entry_meta::{normalize_tags, parse_tag_list, Byline, EntryMeta, Source};
use crate::content::frontmatter::Document;
use crate::error::{QuireError, Result};
use crate::prompt::LinePrompt;
use crate::slug::{ensure_unique_slug, slugify, timestamp_slug};
use crate::text_utils::{date_shanghai, to_shanghai, PubDate};
use crate::view::scaffold_renderer::{render_scaffold, EntryScaffold, Scaffold};

pub const NOW_TAG: &str = "now";
pub const NOW_TITLE_PREFIX: &str = "Now: ";

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub collection: Collection,
    pub title: String,
    /// Used as given (after slugification) instead of a timestamp slug
    pub slug: Option<String>,
    pub tags: Vec<String>,
    /// Calendar day for `writing`; today in Shanghai when absent
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEntry {
    pub slug: String,
    pub dir: PathBuf,
    pub index: PathBuf,
}

fn allocate_slug(collection_dir: &Path, request: &NewEntry, now: &DateTime<Utc>) -> Result<String> {
    match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => {
            let slug = slugify(explicit);
            if slug.is_empty() {
                return Err(QuireError::invalid_field("slug", format!("{:?} has no usable characters", explicit)));
            }
            let index = collection_dir.join(&slug).join(INDEX_FILE);
            if index.exists() {
                return Err(QuireError::EntryExists(index));
            }
            Ok(slug)
        }
        None => ensure_unique_slug(collection_dir, &timestamp_slug(now, Some(&request.title))),
    }
}

fn entry_meta(config: &Config, request: &NewEntry, title: &str, now: &DateTime<Utc>) -> EntryMeta {
    let defaults = match request.collection {
        Collection::Writing => &config.writing,
        Collection::Now => &config.now,
    };

    let (title, pub_date, tags) = match request.collection {
        Collection::Writing => {
            let day = request.date.unwrap_or_else(|| to_shanghai(now).date_naive());
            (title.to_string(), PubDate::Day(day), normalize_tags(&request.tags))
        }
        Collection::Now => {
            let mut tags = normalize_tags(&request.tags);
            tags.retain(|t| t != NOW_TAG);
            tags.insert(0, NOW_TAG.to_string());
            (format!("{}{}", NOW_TITLE_PREFIX, title), PubDate::Timestamp(to_shanghai(now)), tags)
        }
    };

    EntryMeta {
        title,
        description: None,
        pub_date,
        updated_date: None,
        tags,
        draft: defaults.draft,
        by: Some(Byline {
            role: defaults.role.into(),
            name: config.byline_name(defaults),
            note: defaults.note.clone(),
        }),
        source: Some(Source::default()),
        cover: None,
    }
}

/// Asks for the optional fields left out of `request`. Blank answers keep
/// the defaults.
pub fn prompt_optional_fields<R: BufRead, W: Write>(prompt: &mut LinePrompt<R, W>, request: &mut NewEntry) -> Result<()> {
    if request.slug.is_none() {
        request.slug = prompt.ask_optional("slug")?;
    }

    if request.tags.is_empty() {
        if let Some(raw) = prompt.ask_optional("tags, comma separated")? {
            request.tags = parse_tag_list(&raw);
        }
    }

    if request.collection == Collection::Writing && request.date.is_none() {
        if let Some(raw) = prompt.ask_optional("date, YYYY-MM-DD")? {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| QuireError::invalid_field("date", format!("{}: {}", raw, e)))?;
            request.date = Some(date);
        }
    }

    Ok(())
}

/// Creates `<content_dir>/<collection>/<slug>/index.md` with a fresh
/// metadata block and the collection's body scaffold.
pub fn create_entry(config: &Config, request: &NewEntry, now: &DateTime<Utc>) -> Result<CreatedEntry> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(QuireError::MissingArgument("title".to_string()));
    }

    let collection_dir = request.collection.dir(&config.paths.content_dir);
    let slug = allocate_slug(&collection_dir, request, now)?;
    let meta = entry_meta(config, request, title, now);

    let scaffold = match request.collection {
        Collection::Writing => Scaffold::Writing,
        Collection::Now => Scaffold::Now,
    };
    let date = date_shanghai(now);
    let body = render_scaffold(scaffold, config.paths.template_dir.as_deref(), &EntryScaffold { title, date: &date })?;

    let dir = collection_dir.join(&slug);
    let index = dir.join(INDEX_FILE);
    fs::create_dir_all(&dir)?;
    Document::new(meta.to_frontmatter(), &body).write(&index)?;

    info!("Created {}", index.display());
    Ok(CreatedEntry { slug, dir, index })
}
