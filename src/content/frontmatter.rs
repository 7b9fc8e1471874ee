use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{QuireError, Result};

pub const DELIMITER: &str = "---";

/// One `key: value` entry of the metadata block. The first line is kept
/// verbatim so untouched fields serialize byte for byte. Indented lines
/// that follow belong to the field (nested objects).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    head: String,
    nested: Vec<String>,
}

impl Field {
    pub fn new(key: &str, value: &str) -> Field {
        Field {
            key: key.to_string(),
            head: format!("{}: {}", key, value),
            nested: vec![],
        }
    }

    /// Everything after `key:` on the first line, trimmed.
    pub fn raw_value(&self) -> &str {
        self.head[self.key.len() + 1..].trim()
    }

    /// `key:` with an empty value followed by indented `sub: value` lines.
    pub fn nested_pairs(&self) -> Vec<(&str, &str)> {
        self.nested.iter()
            .filter_map(|line| split_key_value(line.trim()))
            .collect()
    }

    fn lines(&self) -> impl Iterator<Item=&str> {
        std::iter::once(self.head.as_str()).chain(self.nested.iter().map(|s| s.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Field(Field),
    /// Blank lines, comments, anything that is not a field
    Other(String),
}

/// Where to put a field that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor<'a> {
    After(&'a str),
    Before(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Replaced,
    Inserted,
    Appended,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frontmatter {
    lines: Vec<Line>,
}

impl Frontmatter {
    pub fn parse_block<'a>(block: impl IntoIterator<Item=&'a str>) -> Frontmatter {
        let mut lines: Vec<Line> = vec![];

        for text in block {
            let indented = text.starts_with(' ') || text.starts_with('\t');
            if indented && !text.trim().is_empty() {
                if let Some(Line::Field(field)) = lines.last_mut() {
                    field.nested.push(text.to_string());
                    continue;
                }
            }

            match field_key(text) {
                Some(key) if !indented => lines.push(Line::Field(Field {
                    key: key.to_string(),
                    head: text.to_string(),
                    nested: vec![],
                })),
                _ => lines.push(Line::Other(text.to_string())),
            }
        }

        Frontmatter { lines }
    }

    pub fn fields(&self) -> impl Iterator<Item=&Field> {
        self.lines.iter().filter_map(|line| match line {
            Line::Field(field) => Some(field),
            Line::Other(_) => None,
        })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields().map(|f| f.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields().find(|f| f.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(|f| f.raw_value())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.lines.iter().position(|line| matches!(line, Line::Field(f) if f.key == key))
    }

    /// Replaces `key` in place when present. Otherwise the first anchor
    /// that names an existing field decides the position, and without
    /// one the field goes to the end of the block.
    pub fn upsert(&mut self, key: &str, value: &str, anchors: &[Anchor]) -> Placement {
        let field = Field::new(key, value);

        if let Some(idx) = self.position(key) {
            self.lines[idx] = Line::Field(field);
            return Placement::Replaced;
        }

        for anchor in anchors {
            let found = match anchor {
                Anchor::After(name) => self.position(name).map(|idx| idx + 1),
                Anchor::Before(name) => self.position(name),
            };
            if let Some(idx) = found {
                self.lines.insert(idx, Line::Field(field));
                return Placement::Inserted;
            }
        }

        // Keep trailing blank lines after the new field
        let end = self.lines.iter()
            .rposition(|line| !matches!(line, Line::Other(s) if s.trim().is_empty()))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        self.lines.insert(end, Line::Field(field));
        Placement::Appended
    }

    pub fn set(&mut self, key: &str, value: &str) -> Placement {
        self.upsert(key, value, &[])
    }

    pub fn render_lines(&self) -> Vec<&str> {
        let mut out = vec![];
        for line in self.lines.iter() {
            match line {
                Line::Field(field) => out.extend(field.lines()),
                Line::Other(text) => out.push(text.as_str()),
            }
        }
        out
    }
}

/// A content file split into its metadata block and the Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front: Frontmatter,
    pub body: String,
    newline: &'static str,
    closed_with_newline: bool,
}

impl Document {
    pub fn new(front: Frontmatter, body: &str) -> Document {
        Document {
            front,
            body: body.to_string(),
            newline: "\n",
            closed_with_newline: true,
        }
    }

    pub fn read(file_name: &Path) -> Result<Document> {
        let raw = fs::read_to_string(file_name)?;
        Self::parse(file_name, &raw)
    }

    /// The file must open with a `---` line and close the block with
    /// another one. Anything else is a hard error.
    pub fn parse(file_name: &Path, raw: &str) -> Result<Document> {
        let missing = || QuireError::MissingFrontmatter(file_name.to_path_buf());

        let mut lines = raw.split_inclusive('\n');
        let first = lines.next().ok_or_else(missing)?;
        if strip_newline(first) != DELIMITER {
            return Err(missing());
        }

        let newline = if first.ends_with("\r\n") { "\r\n" } else { "\n" };
        let mut offset = first.len();
        let mut block = vec![];
        let mut closing = None;

        for line in lines {
            offset += line.len();
            let text = strip_newline(line);
            if text == DELIMITER {
                closing = Some(line);
                break;
            }
            block.push(text);
        }

        let closing = closing.ok_or_else(missing)?;

        Ok(Document {
            front: Frontmatter::parse_block(block),
            body: raw[offset..].to_string(),
            newline,
            closed_with_newline: closing.ends_with('\n'),
        })
    }

    pub fn render(&self) -> String {
        let nl = self.newline;
        let mut buf = String::new();
        buf.push_str(DELIMITER);
        buf.push_str(nl);
        for line in self.front.render_lines() {
            buf.push_str(line);
            buf.push_str(nl);
        }
        buf.push_str(DELIMITER);
        if self.closed_with_newline {
            buf.push_str(nl);
        }
        buf.push_str(&self.body);
        buf
    }

    pub fn write(&self, file_name: &Path) -> Result<()> {
        fs::write(file_name, self.render())?;
        Ok(())
    }

    pub fn draft(&self) -> Option<bool> {
        parse_bool(self.front.value("draft")?)
    }

    /// Flips `draft` from `from` to `to`. The document must hold `from`
    /// right now, otherwise nothing changes and the call fails.
    pub fn transition_draft(&mut self, file_name: &Path, from: bool, to: bool) -> Result<()> {
        let found = self.draft();
        if found != Some(from) {
            return Err(QuireError::DraftState {
                path: file_name.to_path_buf(),
                expected: from,
                found,
            });
        }

        self.front.set("draft", if to { "true" } else { "false" });
        Ok(())
    }
}

fn strip_newline(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\n' || c == '\r')
}

fn field_key(line: &str) -> Option<&str> {
    lazy_static! {
        static ref FIELD_REGEX: Regex = Regex::new(r"^(?P<key>[A-Za-z_][A-Za-z0-9_-]*):(\s|$)").unwrap();
    }

    FIELD_REGEX.captures(line).and_then(|cap| cap.name("key")).map(|key| key.as_str())
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let key = field_key(line)?;
    Some((key, line[key.len() + 1..].trim()))
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match unquote(raw).ok()?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Scalars may be bare, single-quoted or JSON double-quoted.
pub fn unquote(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.starts_with('"') {
        return serde_json::from_str::<String>(raw)
            .map_err(|e| QuireError::invalid_field("value", format!("{}: {}", raw, e)));
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Ok(raw[1..raw.len() - 1].replace("''", "'"));
    }

    Ok(raw.to_string())
}

pub fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// `[a, "b", 'c']`
pub fn parse_inline_array(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if !(raw.starts_with('[') && raw.ends_with(']')) {
        return Err(QuireError::invalid_field("value", format!("{} is not an inline array", raw)));
    }

    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return Ok(items);
    }

    raw[1..raw.len() - 1]
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(unquote)
        .collect()
}

pub fn render_inline_array(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| quote(i)).collect();
    format!("[{}]", quoted.join(", "))
}
