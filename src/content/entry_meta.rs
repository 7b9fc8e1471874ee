use std::fmt::{Display, Formatter};
use std::fmt;

use crate::content::frontmatter::{parse_bool, parse_inline_array, quote, render_inline_array, unquote, Field, Frontmatter};
use crate::error::{QuireError, Result};
use crate::text_utils::PubDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Assistant,
    Coauthored,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Role> {
        match raw {
            "owner" => Ok(Role::Owner),
            "assistant" => Ok(Role::Assistant),
            "coauthored" => Ok(Role::Coauthored),
            _ => Err(QuireError::invalid_field("by.role", format!("{:?} is not one of owner, assistant, coauthored", raw))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::Assistant => "assistant",
            Role::Coauthored => "coauthored",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Original,
    Repost,
    Translation,
    Notes,
}

impl SourceKind {
    pub fn parse(raw: &str) -> Result<SourceKind> {
        match raw {
            "original" => Ok(SourceKind::Original),
            "repost" => Ok(SourceKind::Repost),
            "translation" => Ok(SourceKind::Translation),
            "notes" => Ok(SourceKind::Notes),
            _ => Err(QuireError::invalid_field("source.kind", format!("{:?} is not one of original, repost, translation, notes", raw))),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Original => "original",
            SourceKind::Repost => "repost",
            SourceKind::Translation => "translation",
            SourceKind::Notes => "notes",
        };
        write!(f, "{}", name)
    }
}

/// Who wrote the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Byline {
    pub role: Role,
    pub name: String,
    pub note: Option<String>,
}

/// Where the entry comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub kind: SourceKind,
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub accessed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryMeta {
    pub title: String,
    pub description: Option<String>,
    pub pub_date: PubDate,
    pub updated_date: Option<PubDate>,
    pub tags: Vec<String>,
    pub draft: bool,
    pub by: Option<Byline>,
    pub source: Option<Source>,
    pub cover: Option<String>,
}

impl EntryMeta {
    pub fn from_frontmatter(front: &Frontmatter) -> Result<EntryMeta> {
        let required = |key: &str| {
            front.value(key).ok_or_else(|| QuireError::invalid_field(key, "required field is missing"))
        };
        let optional = |key: &str| -> Result<Option<String>> {
            match front.value(key) {
                Some(raw) => Ok(Some(unquote(raw)?).filter(|s| !s.is_empty())),
                None => Ok(None),
            }
        };

        let title = unquote(required("title")?)?;
        if title.trim().is_empty() {
            return Err(QuireError::invalid_field("title", "must not be empty"));
        }

        let pub_date = PubDate::parse(&unquote(required("pubDate")?)?)?;
        let updated_date = optional("updatedDate")?
            .map(|raw| PubDate::parse(&raw))
            .transpose()?;

        let draft_raw = required("draft")?;
        let draft = parse_bool(draft_raw)
            .ok_or_else(|| QuireError::invalid_field("draft", format!("{} is not a boolean", draft_raw)))?;

        let tags = match front.value("tags") {
            Some(raw) if !raw.is_empty() => normalize_tags(parse_inline_array(raw)?),
            _ => vec![],
        };

        let by = front.get("by").map(parse_byline).transpose()?;
        let source = front.get("source").map(parse_source).transpose()?;

        Ok(EntryMeta {
            title,
            description: optional("description")?,
            pub_date,
            updated_date,
            tags,
            draft,
            by,
            source,
            cover: optional("cover")?,
        })
    }

    /// Canonical block for a freshly created entry.
    pub fn to_frontmatter(&self) -> Frontmatter {
        let mut lines = vec![
            format!("title: {}", quote(&self.title)),
            format!("description: {}", quote(self.description.as_deref().unwrap_or(""))),
            format!("pubDate: {}", quote(&render_pub_date(&self.pub_date))),
        ];
        if let Some(ref updated) = self.updated_date {
            lines.push(format!("updatedDate: {}", quote(&render_pub_date(updated))));
        }
        lines.push(format!("tags: {}", render_inline_array(&self.tags)));
        lines.push(format!("draft: {}", self.draft));

        if self.by.is_some() || self.source.is_some() {
            lines.push(String::new());
        }

        if let Some(ref by) = self.by {
            lines.push("by:".to_string());
            lines.push(format!("  role: {}", by.role));
            lines.push(format!("  name: {}", quote(&by.name)));
            if let Some(ref note) = by.note {
                lines.push(format!("  note: {}", quote(note)));
            }
        }

        if let Some(ref source) = self.source {
            lines.push("source:".to_string());
            lines.push(format!("  kind: {}", source.kind));
            let optional = [
                ("title", &source.title),
                ("url", &source.url),
                ("author", &source.author),
                ("license", &source.license),
                ("accessedAt", &source.accessed_at),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    lines.push(format!("  {}: {}", key, quote(value)));
                }
            }
        }

        if let Some(ref cover) = self.cover {
            lines.push(format!("cover: {}", quote(cover)));
        }

        Frontmatter::parse_block(lines.iter().map(|s| s.as_str()))
    }
}

pub fn render_pub_date(date: &PubDate) -> String {
    match date {
        PubDate::Day(day) => day.format("%Y-%m-%d").to_string(),
        PubDate::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
    }
}

/// Lowercased, trimmed, empty ones dropped, first occurrence wins.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item=S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = vec![];
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

fn parse_byline(field: &Field) -> Result<Byline> {
    let mut role = None;
    let mut name = None;
    let mut note = None;

    for (key, raw) in field.nested_pairs() {
        match key {
            "role" => role = Some(Role::parse(&unquote(raw)?)?),
            "name" => name = Some(unquote(raw)?),
            "note" => note = Some(unquote(raw)?),
            _ => {}
        }
    }

    Ok(Byline {
        role: role.ok_or_else(|| QuireError::invalid_field("by.role", "required field is missing"))?,
        name: name.ok_or_else(|| QuireError::invalid_field("by.name", "required field is missing"))?,
        note,
    })
}

fn parse_source(field: &Field) -> Result<Source> {
    let mut source = Source::default();

    for (key, raw) in field.nested_pairs() {
        let value = unquote(raw)?;
        match key {
            "kind" => source.kind = SourceKind::parse(&value)?,
            "title" => source.title = Some(value),
            "url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(QuireError::invalid_field("source.url", format!("{} is not an http(s) URL", value)));
                }
                source.url = Some(value)
            }
            "author" => source.author = Some(value),
            "license" => source.license = Some(value),
            "accessedAt" => source.accessed_at = Some(value),
            _ => {}
        }
    }

    Ok(source)
}
