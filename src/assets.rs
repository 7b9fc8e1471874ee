use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use spdlog::{debug, info, warn};

use crate::collection::{list_entries, Collection, EntryDir};
use crate::error::{QuireError, Result};
use crate::prompt::Confirm;

/// Media extensions that travel with an entry, lowercase and without dot.
pub const ASSET_EXTS: [&str; 7] = ["png", "jpg", "jpeg", "webp", "gif", "svg", "mp4"];

pub const CLEAN_ACTION: &str = "Asset cleanup";

pub fn is_asset(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ASSET_EXTS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    pub entries: usize,
    pub copied: usize,
    pub removed: Vec<PathBuf>,
    pub missing_collections: Vec<Collection>,
}

/// Mirrors the assets of every entry of every collection into
/// `<public_root>/<collection>/<slug>/`. Copies always overwrite.
///
/// With `clean`, asset files in an output directory that no longer exist
/// next to the entry are deleted once that entry's copies have landed.
/// Cleaning asks `confirm` once, before anything is touched.
pub fn sync_assets(content_root: &Path, public_root: &Path, clean: bool, confirm: &mut dyn Confirm) -> Result<SyncReport> {
    if !content_root.is_dir() {
        return Err(QuireError::NotFound(content_root.to_path_buf()));
    }

    if clean && !confirm.confirm(CLEAN_ACTION)? {
        return Err(QuireError::ConfirmationRefused(CLEAN_ACTION.to_string()));
    }

    let mut report = SyncReport::default();

    for collection in Collection::ALL {
        let collection_dir = collection.dir(content_root);
        if !collection_dir.is_dir() {
            warn!("No {} dir: {}", collection, collection_dir.display());
            report.missing_collections.push(collection);
            continue;
        }

        let out_root = collection.dir(public_root);
        for entry in list_entries(&collection_dir)? {
            let out_dir = out_root.join(&entry.slug);
            report.copied += copy_entry_assets(&entry, &out_dir)?;
            if clean {
                report.removed.extend(clean_entry_assets(&entry, &out_dir)?);
            }
            report.entries += 1;
        }

        info!("Synced assets for {} -> {}", collection, out_root.display());
    }

    Ok(report)
}

fn source_assets(entry: &EntryDir) -> Result<Vec<PathBuf>> {
    let mut assets = vec![];
    for item in fs::read_dir(&entry.dir)? {
        let item = item?;
        if item.file_type()?.is_file() && is_asset(&item.path()) {
            assets.push(item.path());
        }
    }
    assets.sort();
    Ok(assets)
}

pub fn copy_entry_assets(entry: &EntryDir, out_dir: &Path) -> Result<usize> {
    fs::create_dir_all(out_dir)?;

    let mut copied = 0;
    for src in source_assets(entry)? {
        let Some(name) = src.file_name() else {
            continue;
        };
        fs::copy(&src, out_dir.join(name))?;
        copied += 1;
    }

    debug!("{}: copied {} assets", entry.slug, copied);
    Ok(copied)
}

/// Removes asset files from `out_dir` that have no source next to the
/// entry. Files of other types are never touched.
pub fn clean_entry_assets(entry: &EntryDir, out_dir: &Path) -> Result<Vec<PathBuf>> {
    if !out_dir.is_dir() {
        return Ok(vec![]);
    }

    let sources: HashSet<_> = source_assets(entry)?
        .into_iter()
        .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
        .collect();

    let mut removed = vec![];
    for item in fs::read_dir(out_dir)? {
        let item = item?;
        let path = item.path();
        if !item.file_type()?.is_file() || !is_asset(&path) || sources.contains(&item.file_name()) {
            continue;
        }
        fs::remove_file(&path)?;
        info!("Removed stale asset {}", path.display());
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::collection::INDEX_FILE;
    use crate::prompt::testing::Scripted;
    use crate::prompt::AssumeYes;

    use super::*;

    fn entry(root: &Path, collection: &str, slug: &str, assets: &[(&str, &[u8])]) {
        let dir = root.join(collection).join(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INDEX_FILE), "---\ntitle: x\n---\n").unwrap();
        for (name, data) in assets {
            fs::write(dir.join(name), data).unwrap();
        }
    }

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = vec![];
        for item in walkdir::WalkDir::new(root).sort_by_file_name() {
            let item = item.unwrap();
            if item.file_type().is_file() {
                files.push((item.path().strip_prefix(root).unwrap().to_path_buf(), fs::read(item.path()).unwrap()));
            }
        }
        files
    }

    #[test]
    fn test_is_asset() {
        assert!(is_asset(Path::new("a/cover.JPG")));
        assert!(is_asset(Path::new("clip.mp4")));
        assert!(!is_asset(Path::new("index.md")));
        assert!(!is_asset(Path::new("notes.txt")));
        assert!(!is_asset(Path::new("Makefile")));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let public = tmp.path().join("public");
        entry(&content, "writing", "hello", &[("cover.jpg", b"jpg"), ("diagram.png", b"png"), ("draft.txt", b"txt")]);
        entry(&content, "now", "20260202000000-small-wins", &[("cover.jpg", b"now")]);
        fs::write(content.join("writing").join("legacy.md"), "---\n---\n").unwrap();

        let first = sync_assets(&content, &public, false, &mut AssumeYes).unwrap();
        assert_eq!(first.entries, 2);
        assert_eq!(first.copied, 3);
        let before = snapshot(&public);

        sync_assets(&content, &public, false, &mut AssumeYes).unwrap();
        assert_eq!(snapshot(&public), before);

        assert_eq!(fs::read(public.join("writing/hello/diagram.png")).unwrap(), b"png");
        assert!(!public.join("writing/hello/draft.txt").exists());
        assert!(!public.join("writing/hello/index.md").exists());
    }

    #[test]
    fn test_copy_overwrites() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let public = tmp.path().join("public");
        entry(&content, "writing", "hello", &[("cover.jpg", b"old")]);
        sync_assets(&content, &public, false, &mut AssumeYes).unwrap();

        fs::write(content.join("writing/hello/cover.jpg"), b"new").unwrap();
        sync_assets(&content, &public, false, &mut AssumeYes).unwrap();
        assert_eq!(fs::read(public.join("writing/hello/cover.jpg")).unwrap(), b"new");
    }

    #[test]
    fn test_clean_removes_only_stale_assets() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let public = tmp.path().join("public");
        entry(&content, "writing", "hello", &[("keep.png", b"keep"), ("gone.png", b"gone")]);
        sync_assets(&content, &public, false, &mut AssumeYes).unwrap();

        fs::remove_file(content.join("writing/hello/gone.png")).unwrap();
        fs::write(public.join("writing/hello/readme.txt"), b"other").unwrap();

        let mut confirm = Scripted { answer: Some(true), asked: vec![] };
        let report = sync_assets(&content, &public, true, &mut confirm).unwrap();
        assert_eq!(confirm.asked, [CLEAN_ACTION]);
        assert_eq!(report.removed, [public.join("writing/hello/gone.png")]);
        assert!(public.join("writing/hello/keep.png").exists());
        assert!(public.join("writing/hello/readme.txt").exists());
    }

    #[test]
    fn test_clean_needs_confirmation() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        let public = tmp.path().join("public");
        entry(&content, "writing", "hello", &[("a.png", b"a")]);
        fs::create_dir_all(public.join("writing/hello")).unwrap();
        fs::write(public.join("writing/hello/stale.png"), b"s").unwrap();

        let mut refuse = Scripted { answer: Some(false), asked: vec![] };
        let err = sync_assets(&content, &public, true, &mut refuse).unwrap_err();
        assert!(matches!(err, QuireError::ConfirmationRefused(_)));
        assert_eq!(err.exit_code(), 1);

        let mut headless = Scripted { answer: None, asked: vec![] };
        let err = sync_assets(&content, &public, true, &mut headless).unwrap_err();
        assert!(matches!(err, QuireError::ConfirmationRequired(_)));
        assert_eq!(err.exit_code(), 2);

        // Nothing was copied or removed
        assert!(public.join("writing/hello/stale.png").exists());
        assert!(!public.join("writing/hello/a.png").exists());
    }

    #[test]
    fn test_missing_roots() {
        let tmp = TempDir::new().unwrap();
        let err = sync_assets(&tmp.path().join("nope"), tmp.path(), false, &mut AssumeYes).unwrap_err();
        assert!(matches!(err, QuireError::NotFound(_)));

        let content = tmp.path().join("content");
        entry(&content, "writing", "hello", &[]);
        let report = sync_assets(&content, &tmp.path().join("public"), false, &mut AssumeYes).unwrap();
        assert_eq!(report.missing_collections, [Collection::Now]);
        assert_eq!(report.entries, 1);
    }
}
