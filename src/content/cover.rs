use lazy_static::lazy_static;
use regex::Regex;

use crate::content::asset_rewriter::has_scheme;
use crate::content::entry_meta::EntryMeta;

/// First Markdown image destination, else the first HTML `<img src>`.
pub fn pick_first_image(markdown: &str) -> Option<String> {
    lazy_static! {
        static ref MD_IMAGE_REGEX: Regex = Regex::new(r#"!\[[^\]]*\]\(\s*<?([^\s)>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap();
        static ref HTML_IMG_REGEX: Regex = Regex::new(r#"(?i)<img[^>]*\ssrc\s*=\s*["']([^"']+)["'][^>]*>"#).unwrap();
    }

    MD_IMAGE_REGEX.captures(markdown)
        .or_else(|| HTML_IMG_REGEX.captures(markdown))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|url| !url.is_empty())
}

pub fn pick_cover(meta: &EntryMeta, body: &str) -> Option<String> {
    meta.cover.as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| pick_first_image(body))
}

fn keeps_as_is(url: &str) -> bool {
    url.starts_with('/') || has_scheme(url)
}

/// Resolves `url` against a site path such as `/writing/my-slug/`.
/// Query and fragment are dropped from resolved paths.
pub fn resolve_maybe_relative_url(url: &str, base_path: &str) -> String {
    let url = url.trim();
    if url.is_empty() || keeps_as_is(url) {
        return url.to_string();
    }

    let url = url.split(['?', '#']).next().unwrap_or_default();

    // The last base segment is a file name unless the base ends with '/'
    let mut segments: Vec<&str> = base_path.split('/').filter(|s| !s.is_empty()).collect();
    if !base_path.ends_with('/') {
        segments.pop();
    }

    let parts: Vec<&str> = url.split('/').collect();
    for (idx, part) in parts.iter().enumerate() {
        let last = idx + 1 == parts.len();
        match *part {
            "." => {}
            ".." => {
                segments.pop();
            }
            "" if !last => {}
            other => segments.push(other),
        }
    }

    let mut resolved = format!("/{}", segments.join("/"));
    let ends_dir = matches!(parts.last(), Some(&"") | Some(&".") | Some(&".."));
    if ends_dir && !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

/// Site-absolute cover URL of an entry, if it has one.
pub fn cover_url(meta: &EntryMeta, body: &str, base_path: &str) -> Option<String> {
    pick_cover(meta, body).map(|cover| resolve_maybe_relative_url(&cover, base_path))
}
