use std::path::{Path, PathBuf};

use spdlog::{debug, warn};

use crate::collection::{list_entries, Collection, EntryDir};
use crate::content::cover::cover_url;
use crate::content::entry_meta::EntryMeta;
use crate::content::frontmatter::Document;
use crate::error::{QuireError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    pub index: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub checked: usize,
    pub failures: Vec<CheckFailure>,
    /// Entries whose cover points at a file that is not next to `index.md`
    pub missing_covers: Vec<(PathBuf, String)>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

fn check_entry(collection: Collection, entry: &EntryDir, report: &mut CheckReport) {
    report.checked += 1;

    let parsed = Document::read(&entry.index)
        .and_then(|doc| EntryMeta::from_frontmatter(&doc.front).map(|meta| (meta, doc)));
    let (meta, doc) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            report.failures.push(CheckFailure { index: entry.index.clone(), reason: e.to_string() });
            return;
        }
    };

    let base_path = collection.base_path(&entry.slug);
    let Some(cover) = cover_url(&meta, &doc.body, &base_path) else {
        return;
    };
    debug!("{}: cover {}", entry.slug, cover);

    if let Some(file) = cover.strip_prefix(&base_path) {
        if !entry.dir.join(file).is_file() {
            warn!("{}: cover {} does not exist", entry.index.display(), cover);
            report.missing_covers.push((entry.index.clone(), cover));
        }
    }
}

/// Validates the metadata of every entry in every collection. A missing
/// collection directory is skipped, a missing content root is an error.
pub fn check_entries(content_root: &Path) -> Result<CheckReport> {
    if !content_root.is_dir() {
        return Err(QuireError::NotFound(content_root.to_path_buf()));
    }

    let mut report = CheckReport::default();
    for collection in Collection::ALL {
        let dir = collection.dir(content_root);
        if !dir.is_dir() {
            warn!("Skipping missing collection {}", dir.display());
            continue;
        }

        for entry in list_entries(&dir)? {
            check_entry(collection, &entry, &mut report);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::collection::INDEX_FILE;
    use crate::test_data::{NOW_ENTRY, WRITING_DRAFT, WRITING_PUBLISHED};

    use super::*;

    fn write_entry(root: &Path, collection: &str, slug: &str, raw: &str) -> PathBuf {
        let dir = root.join(collection).join(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INDEX_FILE), raw).unwrap();
        dir
    }

    #[test]
    fn test_check_entries() {
        let tmp = TempDir::new().unwrap();
        let hello = write_entry(tmp.path(), "writing", "hello", WRITING_DRAFT);
        fs::write(hello.join("cover.jpg"), b"jpg").unwrap();
        write_entry(tmp.path(), "writing", "out", WRITING_PUBLISHED);
        write_entry(tmp.path(), "now", "20260201000000-yesterday-small-wins", NOW_ENTRY);
        write_entry(tmp.path(), "writing", "no-draft", "---\ntitle: x\npubDate: 2026-02-01\n---\n");
        write_entry(tmp.path(), "writing", "plain", "# just markdown\n");

        let report = check_entries(tmp.path()).unwrap();
        assert_eq!(report.checked, 5);
        assert!(!report.is_ok());

        let failed: Vec<String> = report.failures.iter()
            .map(|f| f.index.parent().unwrap().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(failed, ["no-draft", "plain"]);

        // The now entry points at a cover.jpg that was never copied
        assert_eq!(report.missing_covers.len(), 1);
        assert_eq!(report.missing_covers[0].1, "/now/20260201000000-yesterday-small-wins/cover.jpg");
    }

    #[test]
    fn test_missing_collections() {
        let tmp = TempDir::new().unwrap();
        write_entry(tmp.path(), "writing", "out", WRITING_PUBLISHED);

        let report = check_entries(tmp.path()).unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.is_ok());

        assert!(matches!(check_entries(&tmp.path().join("nope")), Err(QuireError::NotFound(_))));
    }
}
