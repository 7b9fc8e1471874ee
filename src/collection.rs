use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::{QuireError, Result};

/// Every entry is a directory holding exactly one of these.
pub const INDEX_FILE: &str = "index.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Long-form posts
    Writing,
    /// Short status updates
    Now,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Writing, Collection::Now];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Writing => "writing",
            Collection::Now => "now",
        }
    }

    /// Site path every asset of the entry is published under.
    pub fn base_path(&self, slug: &str) -> String {
        format!("/{}/{}/", self.name(), slug)
    }

    pub fn dir(&self, content_root: &Path) -> PathBuf {
        content_root.join(self.name())
    }

    pub fn index_path(&self, content_root: &Path, slug: &str) -> PathBuf {
        self.dir(content_root).join(slug).join(INDEX_FILE)
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryDir {
    pub slug: String,
    pub dir: PathBuf,
    pub index: PathBuf,
}

/// Top-level directories of `collection_dir` that contain an `index.md`,
/// sorted by slug. Loose files are not entries.
pub fn list_entries(collection_dir: &Path) -> io::Result<Vec<EntryDir>> {
    let mut entries = vec![];
    for dir in list_dirs(collection_dir)? {
        let index = dir.join(INDEX_FILE);
        if !index.is_file() {
            continue;
        }

        let Some(slug) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        entries.push(EntryDir {
            slug: slug.to_string(),
            dir: dir.clone(),
            index,
        });
    }

    entries.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(entries)
}

fn list_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = vec![];
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

pub fn find_entry(content_root: &Path, collection: Collection, slug: &str) -> Result<EntryDir> {
    if slug.is_empty() || slug.contains('/') || slug.contains("..") {
        return Err(QuireError::invalid_field("slug", format!("{:?} is not a valid slug", slug)));
    }

    let index = collection.index_path(content_root, slug);
    if !index.is_file() {
        return Err(QuireError::NotFound(index));
    }

    Ok(EntryDir {
        slug: slug.to_string(),
        dir: collection.dir(content_root).join(slug),
        index,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_base_path() {
        assert_eq!(Collection::Writing.base_path("my-slug"), "/writing/my-slug/");
        assert_eq!(Collection::Now.base_path("20240227142053"), "/now/20240227142053/");
    }

    #[test]
    fn test_list_entries() -> io::Result<()> {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::create_dir_all(root.join("b-post"))?;
        fs::write(root.join("b-post").join(INDEX_FILE), "---\n---\n")?;
        fs::create_dir_all(root.join("a-post"))?;
        fs::write(root.join("a-post").join(INDEX_FILE), "---\n---\n")?;
        fs::create_dir_all(root.join("no-index"))?;
        fs::write(root.join("no-index").join("cover.jpg"), b"jpg")?;
        fs::write(root.join("legacy.md"), "---\n---\n")?;

        let entries = list_entries(root)?;
        let slugs: Vec<&str> = entries.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, ["a-post", "b-post"]);
        assert_eq!(entries[0].index, root.join("a-post").join(INDEX_FILE));
        Ok(())
    }

    #[test]
    fn test_find_entry() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("writing").join("hello");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(INDEX_FILE), "").unwrap();

        let entry = find_entry(tmp.path(), Collection::Writing, "hello").unwrap();
        assert_eq!(entry.dir, dir);

        let err = find_entry(tmp.path(), Collection::Writing, "missing").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(find_entry(tmp.path(), Collection::Writing, "../hello").is_err());
    }
}
