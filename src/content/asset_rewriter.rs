use std::ops::Range;
use std::path::Path;

use lazy_static::lazy_static;
use markdown::mdast::Node;
use markdown::{Constructs, Options, ParseOptions};
use regex::{Captures, Regex};
use spdlog::warn;

use crate::collection::{Collection, INDEX_FILE};
use crate::error::{QuireError, Result};

/// Collection and slug of the entry a content file belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryContext {
    pub collection: Collection,
    pub slug: String,
}

impl EntryContext {
    /// Expects `.../writing/<slug>/index.md` or `.../now/<slug>/index.md`.
    /// The last segment named after a collection wins, and `writing` is
    /// tried before `now`.
    pub fn detect(file_path: &Path) -> Option<EntryContext> {
        let parts: Vec<&str> = file_path.components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();

        if parts.last() != Some(&INDEX_FILE) {
            return None;
        }

        for collection in Collection::ALL {
            if let Some(idx) = parts.iter().rposition(|p| *p == collection.name()) {
                if parts.len() >= idx + 3 {
                    return Some(EntryContext {
                        collection,
                        slug: parts[idx + 1].to_string(),
                    });
                }
            }
        }

        None
    }

    pub fn base_path(&self) -> String {
        self.collection.base_path(&self.slug)
    }
}

/// `http:`, `data:`, `mailto:` and the like.
pub fn has_scheme(url: &str) -> bool {
    lazy_static! {
        static ref SCHEME_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap();
    }

    SCHEME_REGEX.is_match(url)
}

/// Same-entry asset names only. Root-relative, fragment-only and anything
/// carrying a scheme stays as is.
pub fn is_relative_url(url: &str) -> bool {
    !url.is_empty()
        && !url.starts_with('/')
        && !url.starts_with('#')
        && !has_scheme(url)
}

fn is_cross_entry(url: &str) -> bool {
    url.starts_with("./") || url.starts_with("../")
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    pub url: String,
    original: String,
    span: Option<Range<usize>>,
}

impl AssetRef {
    pub fn new(url: &str) -> AssetRef {
        AssetRef {
            url: url.to_string(),
            original: url.to_string(),
            span: None,
        }
    }

    fn with_span(url: &str, span: Option<Range<usize>>) -> AssetRef {
        AssetRef { span, ..AssetRef::new(url) }
    }

    pub fn is_rewritten(&self) -> bool {
        self.url != self.original
    }
}

/// The only node shapes the rewriter cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetNode {
    Image(AssetRef),
    Link(AssetRef, Vec<AssetNode>),
    Container(Vec<AssetNode>),
    Other,
}

impl AssetNode {
    pub fn from_mdast(node: &Node) -> AssetNode {
        let span = |node: &Node| node.position().map(|p| p.start.offset..p.end.offset);

        match node {
            Node::Image(image) => AssetNode::Image(AssetRef::with_span(&image.url, span(node))),
            Node::Link(link) => AssetNode::Link(
                AssetRef::with_span(&link.url, span(node)),
                link.children.iter().map(Self::from_mdast).collect(),
            ),
            other => match other.children() {
                Some(children) => AssetNode::Container(children.iter().map(Self::from_mdast).collect()),
                None => AssetNode::Other,
            },
        }
    }

    pub fn refs(&self) -> Vec<&AssetRef> {
        let mut out = vec![];
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                AssetNode::Image(asset) => out.push(asset),
                AssetNode::Link(asset, children) => {
                    out.push(asset);
                    stack.extend(children.iter());
                }
                AssetNode::Container(children) => stack.extend(children.iter()),
                AssetNode::Other => {}
            }
        }
        out
    }
}

fn parse_options() -> ParseOptions {
    ParseOptions {
        constructs: Constructs {
            frontmatter: true,
            ..Constructs::gfm()
        },
        ..ParseOptions::gfm()
    }
}

pub fn parse_markdown(source: &str) -> Result<AssetNode> {
    let root = markdown::to_mdast(source, &parse_options())
        .map_err(|e| QuireError::Markdown(e.reason.to_string()))?;
    Ok(AssetNode::from_mdast(&root))
}

pub struct AssetRewriter {
    base_path: String,
}

impl AssetRewriter {
    pub fn new(context: &EntryContext) -> AssetRewriter {
        AssetRewriter {
            base_path: context.base_path(),
        }
    }

    /// `None` when the file does not live in a collection entry.
    pub fn for_file(file_path: &Path) -> Option<AssetRewriter> {
        EntryContext::detect(file_path).map(|ctx| Self::new(&ctx))
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    fn rewrite_image(&self, url: &str) -> Option<String> {
        is_relative_url(url).then(|| format!("{}{}", self.base_path, url))
    }

    fn rewrite_link(&self, url: &str) -> Option<String> {
        (is_relative_url(url) && !is_cross_entry(url)).then(|| format!("{}{}", self.base_path, url))
    }

    /// Visits every node once. Returns how many references changed.
    pub fn rewrite_tree(&self, root: &mut AssetNode) -> usize {
        let mut rewritten = 0;
        let mut stack: Vec<&mut AssetNode> = vec![root];

        while let Some(node) = stack.pop() {
            match node {
                AssetNode::Image(asset) => {
                    if let Some(url) = self.rewrite_image(&asset.url) {
                        asset.url = url;
                        rewritten += 1;
                    }
                }
                AssetNode::Link(asset, children) => {
                    if let Some(url) = self.rewrite_link(&asset.url) {
                        asset.url = url;
                        rewritten += 1;
                    }
                    stack.extend(children.iter_mut());
                }
                AssetNode::Container(children) => stack.extend(children.iter_mut()),
                AssetNode::Other => {}
            }
        }

        rewritten
    }

    /// Rewrites the destinations in the source text. Everything outside
    /// the rewritten destinations is left byte for byte.
    pub fn rewrite_markdown(&self, source: &str) -> Result<String> {
        let mut tree = parse_markdown(source)?;
        if self.rewrite_tree(&mut tree) == 0 {
            return Ok(source.to_string());
        }
        Ok(splice(source, &tree))
    }

    pub fn render_html(&self, source: &str) -> Result<String> {
        let rewritten = self.rewrite_markdown(source)?;
        render_html(&rewritten)
    }
}

pub fn render_html(source: &str) -> Result<String> {
    let options = Options {
        parse: parse_options(),
        ..Options::gfm()
    };
    markdown::to_html_with_options(source, &options)
        .map_err(|e| QuireError::Markdown(e.reason.to_string()))
}

fn splice(source: &str, tree: &AssetNode) -> String {
    let mut edits: Vec<(usize, &str)> = vec![];

    for asset in tree.refs().into_iter().filter(|a| a.is_rewritten()) {
        let prefix = asset.url.strip_suffix(asset.original.as_str());
        match (locate_destination(source, asset), prefix) {
            (Some(start), Some(prefix)) => edits.push((start, prefix)),
            _ => warn!("Could not locate destination {} in source", asset.original),
        }
    }

    edits.sort_by(|a, b| b.0.cmp(&a.0));
    edits.dedup_by_key(|e| e.0);

    let mut out = source.to_string();
    for (start, prefix) in edits {
        out.insert_str(start, prefix);
    }
    out
}

/// Offset of the raw destination text of `asset`, angle brackets excluded.
/// The raw text may differ from the parsed URL by escapes, entities and
/// surrounding whitespace, so each `](` in the span is tried from the end.
fn locate_destination(source: &str, asset: &AssetRef) -> Option<usize> {
    let span = asset.span.clone()?;
    let slice = source.get(span.clone())?;

    slice.rmatch_indices("](").find_map(|(idx, _)| {
        let after = idx + 2;
        let (offset, raw) = destination_token(&slice[after..])?;
        (decode_destination(raw) == asset.original).then_some(span.start + after + offset)
    })
}

/// Raw destination right after `](`: either `<...>` or a run ending at
/// whitespace or at the unbalanced closing paren.
fn destination_token(rest: &str) -> Option<(usize, &str)> {
    let lead = rest.len() - rest.trim_start().len();
    let body = &rest[lead..];

    if let Some(inner) = body.strip_prefix('<') {
        let mut escaped = false;
        for (i, c) in inner.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '>' => return Some((lead + 1, &inner[..i])),
                '\n' | '<' => return None,
                _ => {}
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' if depth == 0 => return Some((lead, &body[..i])),
            ')' => depth -= 1,
            c if c.is_whitespace() || c.is_control() => return Some((lead, &body[..i])),
            _ => {}
        }
    }
    Some((lead, body))
}

fn decode_entity(caps: &Captures<'_>) -> Option<String> {
    let code = if let Some(dec) = caps.get(1) {
        dec.as_str().parse::<u32>().ok()?
    } else if let Some(hex) = caps.get(2) {
        u32::from_str_radix(hex.as_str(), 16).ok()?
    } else {
        let named = match &caps[3] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            "apos" => "'",
            "nbsp" => "\u{a0}",
            _ => return None,
        };
        return Some(named.to_string());
    };

    // NUL and invalid code points become U+FFFD
    let c = char::from_u32(code).filter(|c| *c != '\0').unwrap_or('\u{fffd}');
    Some(c.to_string())
}

/// Backslash escapes and character references, as the parser resolves them.
fn decode_destination(raw: &str) -> String {
    lazy_static! {
        static ref ENTITY_REGEX: Regex = Regex::new(r"^&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([A-Za-z][A-Za-z0-9]{1,31}));").unwrap();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            if let Some(next) = rest[1..].chars().next().filter(char::is_ascii_punctuation) {
                out.push(next);
                rest = &rest[2..];
                continue;
            }
        } else if c == '&' {
            let decoded = ENTITY_REGEX.captures(rest)
                .and_then(|caps| decode_entity(&caps).map(|text| (caps[0].len(), text)));
            if let Some((len, text)) = decoded {
                out.push_str(&text);
                rest = &rest[len..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}
