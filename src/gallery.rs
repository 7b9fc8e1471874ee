use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use spdlog::{info, warn};
use walkdir::WalkDir;

use crate::collection::Collection;
use crate::error::Result;

const IMAGE_EXTS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];
const COVER_STEM: &str = "cover";

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    WritingCover,
    MoodImage,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GalleryItem {
    pub url: String,
    pub kind: ItemKind,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Counts {
    pub writing: usize,
    pub bank: usize,
    pub total: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub built_at: String,
    pub counts: Counts,
    pub items: Vec<GalleryItem>,
}

fn image_ext(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| IMAGE_EXTS.contains(&e.as_str()))
}

/// Copies the bank's images into `<public_dir>/<gallery_dir>/` and returns
/// their site URLs, sorted by file name.
fn publish_bank_images(bank_dir: &Path, public_dir: &Path, gallery_dir: &Path) -> Result<Vec<String>> {
    if !bank_dir.is_dir() {
        warn!("No image bank: {}", bank_dir.display());
        return Ok(vec![]);
    }

    let out_dir = public_dir.join(gallery_dir);
    fs::create_dir_all(&out_dir)?;

    let mut names = vec![];
    for item in fs::read_dir(bank_dir)? {
        let item = item?;
        if item.file_type()?.is_file() && image_ext(&item.path()).is_some() {
            if let Some(name) = item.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let prefix = gallery_dir.to_string_lossy().trim_matches('/').to_string();
    let mut urls = vec![];
    for name in names {
        fs::copy(bank_dir.join(&name), out_dir.join(&name))?;
        urls.push(format!("/{}/{}", prefix, urlencoding::encode(&name)));
    }

    Ok(urls)
}

/// `cover.*` images anywhere under `<public_dir>/writing/`, as site URLs.
fn collect_writing_covers(public_dir: &Path) -> Vec<String> {
    let writing_dir = Collection::Writing.dir(public_dir);
    if !writing_dir.is_dir() {
        return vec![];
    }

    let mut covers: Vec<String> = WalkDir::new(&writing_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let path = e.path();
            image_ext(path).is_some() && path.file_stem().and_then(|s| s.to_str()) == Some(COVER_STEM)
        })
        .filter_map(|e| {
            let rel = e.path().strip_prefix(public_dir).ok()?;
            let parts: Vec<String> = rel.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            Some(format!("/{}", parts.join("/")))
        })
        .collect();

    covers.sort();
    covers
}

pub fn build_gallery(public_dir: &Path, bank_dir: &Path, gallery_dir: &Path, now: &DateTime<Utc>) -> Result<Gallery> {
    let bank = publish_bank_images(bank_dir, public_dir, gallery_dir)?;
    let writing = collect_writing_covers(public_dir);

    let items: Vec<GalleryItem> = writing.iter()
        .map(|url| GalleryItem { url: url.clone(), kind: ItemKind::WritingCover })
        .chain(bank.iter().map(|url| GalleryItem { url: url.clone(), kind: ItemKind::MoodImage }))
        .collect();

    Ok(Gallery {
        built_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        counts: Counts {
            writing: writing.len(),
            bank: bank.len(),
            total: items.len(),
        },
        items,
    })
}

pub fn write_gallery(gallery: &Gallery, out_json: &Path) -> Result<()> {
    if let Some(parent) = out_json.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut json = serde_json::to_string_pretty(gallery)?;
    json.push('\n');
    fs::write(out_json, json)?;

    info!("Wrote {} gallery items -> {}", gallery.counts.total, out_json.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-02T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_build_gallery() {
        let tmp = TempDir::new().unwrap();
        let public = tmp.path().join("public");
        let bank = tmp.path().join("bank");
        fs::create_dir_all(&bank).unwrap();
        fs::write(bank.join("working at laptop.jpg"), b"a").unwrap();
        fs::write(bank.join("eating-burger.png"), b"b").unwrap();
        fs::write(bank.join("notes.txt"), b"c").unwrap();

        for (slug, file) in [("b-post", "cover.jpg"), ("a-post", "cover.PNG"), ("c-post", "diagram.png")] {
            let dir = public.join("writing").join(slug);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(file), b"x").unwrap();
        }

        let gallery = build_gallery(&public, &bank, Path::new("gallery"), &now()).unwrap();
        assert_eq!(gallery.built_at, "2026-02-02T00:00:00.000Z");
        assert_eq!(gallery.counts, Counts { writing: 2, bank: 2, total: 4 });

        let urls: Vec<&str> = gallery.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, [
            "/writing/a-post/cover.PNG",
            "/writing/b-post/cover.jpg",
            "/gallery/eating-burger.png",
            "/gallery/working%20at%20laptop.jpg",
        ]);
        assert_eq!(gallery.items[0].kind, ItemKind::WritingCover);
        assert_eq!(gallery.items[3].kind, ItemKind::MoodImage);
        assert!(public.join("gallery/working at laptop.jpg").is_file());
        assert!(!public.join("gallery/notes.txt").exists());
    }

    #[test]
    fn test_missing_sources_contribute_nothing() {
        let tmp = TempDir::new().unwrap();
        let gallery = build_gallery(&tmp.path().join("public"), &tmp.path().join("bank"), Path::new("gallery"), &now()).unwrap();
        assert_eq!(gallery.counts, Counts { writing: 0, bank: 0, total: 0 });
        assert!(gallery.items.is_empty());
    }

    #[test]
    fn test_write_gallery_json() {
        let tmp = TempDir::new().unwrap();
        let gallery = Gallery {
            built_at: "2026-02-02T00:00:00.000Z".to_string(),
            counts: Counts { writing: 1, bank: 0, total: 1 },
            items: vec![GalleryItem { url: "/writing/a/cover.jpg".to_string(), kind: ItemKind::WritingCover }],
        };
        let out = tmp.path().join("data/gallery.json");
        write_gallery(&gallery, &out).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["builtAt"], "2026-02-02T00:00:00.000Z");
        assert_eq!(json["counts"]["total"], 1);
        assert_eq!(json["items"][0]["kind"], "writing-cover");
    }
}
