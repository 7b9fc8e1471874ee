use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use regex::Regex;
use serde::Deserialize;

use crate::error::{QuireError, Result};

const EMBEDDED_CATALOG: &str = include_str!("../res/moods.toml");

pub const DEFAULT_SKIP_PROBABILITY: f64 = 0.6;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MoodEntry {
    pub label: String,
    pub image: String,
    pub tags: Vec<String>,
    pub title: String,
    pub one_liners: Vec<String>,
    pub extras: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Fallback {
    pub idle: String,
    pub busy: String,
    pub default: String,
    pub busy_threshold: usize,
}

#[derive(Deserialize)]
struct RuleSource {
    mood: String,
    pattern: String,
}

#[derive(Deserialize)]
struct CatalogSource {
    fallback: Fallback,
    #[serde(default)]
    rules: Vec<RuleSource>,
    moods: BTreeMap<String, MoodEntry>,
}

struct Rule {
    mood: String,
    pattern: Regex,
}

/// Bounded set of moods plus the ordered rules that classify a day.
pub struct Catalog {
    fallback: Fallback,
    rules: Vec<Rule>,
    moods: BTreeMap<String, MoodEntry>,
}

/// A classified mood, borrowed from its catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mood<'a> {
    pub key: &'a str,
    pub entry: &'a MoodEntry,
}

impl Catalog {
    pub fn embedded() -> Result<Catalog> {
        Self::from_toml(EMBEDDED_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Catalog> {
        let raw = fs::read_to_string(path)
            .map_err(|e| QuireError::Config(format!("Error opening mood catalog {}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    /// Every rule and fallback must name a mood that has an image and at
    /// least one caption of each kind.
    pub fn from_toml(raw: &str) -> Result<Catalog> {
        let source: CatalogSource = toml::from_str(raw)
            .map_err(|e| QuireError::Config(format!("Error parsing mood catalog: {}", e)))?;

        let mut rules = vec![];
        for rule in source.rules {
            let pattern = Regex::new(&rule.pattern)
                .map_err(|e| QuireError::Config(format!("Invalid pattern for mood {}: {}", rule.mood, e)))?;
            rules.push(Rule { mood: rule.mood, pattern });
        }

        let catalog = Catalog {
            fallback: source.fallback,
            rules,
            moods: source.moods,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        let referenced = self.rules.iter()
            .map(|r| r.mood.as_str())
            .chain([self.fallback.idle.as_str(), self.fallback.busy.as_str(), self.fallback.default.as_str()]);

        for key in referenced {
            if !self.moods.contains_key(key) {
                return Err(QuireError::Config(format!("Mood catalog has no entry for {}", key)));
            }
        }

        for (key, entry) in self.moods.iter() {
            if entry.image.trim().is_empty() || entry.one_liners.is_empty() || entry.extras.is_empty() {
                return Err(QuireError::Config(format!("Mood {} needs an image, one_liners and extras", key)));
            }
        }

        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Mood> {
        self.moods.get_key_value(key).map(|(key, entry)| Mood { key, entry })
    }

    pub fn len(&self) -> usize {
        self.moods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moods.is_empty()
    }

    /// First matching rule wins. Otherwise no activity means idle, a busy
    /// day means busy, and anything in between is the default.
    pub fn classify(&self, signals: &str, activity: usize) -> Result<Mood> {
        let text = signals.to_lowercase();

        let key = self.rules.iter()
            .find(|rule| rule.pattern.is_match(&text))
            .map(|rule| rule.mood.as_str())
            .unwrap_or_else(|| {
                if activity == 0 {
                    self.fallback.idle.as_str()
                } else if activity >= self.fallback.busy_threshold {
                    self.fallback.busy.as_str()
                } else {
                    self.fallback.default.as_str()
                }
            });

        self.get(key).ok_or_else(|| QuireError::Config(format!("Mood catalog has no entry for {}", key)))
    }
}

/// 32-bit FNV-1a over the UTF-16 code units of `s`.
pub fn fnv1a32(s: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for unit in s.encode_utf16() {
        hash ^= unit as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

fn variant_index(key: &str, len: usize) -> usize {
    fnv1a32(key) as usize % len
}

pub fn pick_variant<'a>(key: &str, variants: &'a [String]) -> Option<&'a str> {
    if variants.is_empty() {
        return None;
    }
    Some(variants[variant_index(key, variants.len())].as_str())
}

/// Same pick as [`pick_variant`], moved one slot forward when it equals
/// `avoid` (trimmed comparison).
pub fn pick_next_variant<'a>(key: &str, variants: &'a [String], avoid: Option<&str>) -> Option<&'a str> {
    let len = variants.len();
    match len {
        0 => None,
        1 => Some(variants[0].as_str()),
        _ => {
            let idx = variant_index(key, len);
            let current = variants[idx].as_str();
            match avoid {
                Some(avoid) if current.trim() == avoid.trim() => Some(variants[(idx + 1) % len].as_str()),
                _ => Some(current),
            }
        }
    }
}

/// What the previous day's entry said, as far as it can be read back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviousDay {
    pub title: String,
    pub one_liner: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub key: String,
    pub label: String,
    pub image: String,
    pub tags: Vec<String>,
    pub title: String,
    pub one_liner: String,
    pub extra: String,
}

pub fn strip_now_prefix(title: &str) -> &str {
    title.trim().strip_prefix("Now:").map(str::trim_start).unwrap_or(title.trim())
}

/// Classifies the day and picks its captions. When yesterday carried the
/// same title, captions that repeat yesterday's are rotated forward.
pub fn choose(catalog: &Catalog, ymd: &str, signals: &str, activity: usize, previous: Option<&PreviousDay>) -> Result<Choice> {
    let Mood { key, entry } = catalog.classify(signals, activity)?;
    let one_key = format!("{}:{}:one", ymd, key);
    let extra_key = format!("{}:{}:extra", ymd, key);

    let mut one_liner = pick_variant(&one_key, &entry.one_liners);
    let mut extra = pick_variant(&extra_key, &entry.extras);

    if let Some(previous) = previous.filter(|p| strip_now_prefix(&p.title) == strip_now_prefix(&entry.title)) {
        let previous_extra = entry.extras.iter()
            .map(|e| e.as_str())
            .find(|e| previous.body.contains(e));

        one_liner = pick_next_variant(&one_key, &entry.one_liners, Some(&previous.one_liner)).or(one_liner);
        extra = pick_next_variant(&extra_key, &entry.extras, previous_extra).or(extra);
    }

    Ok(Choice {
        key: key.to_string(),
        label: entry.label.clone(),
        image: entry.image.clone(),
        tags: entry.tags.clone(),
        title: entry.title.clone(),
        one_liner: one_liner.unwrap_or_default().to_string(),
        extra: extra.unwrap_or_default().to_string(),
    })
}

/// A blank day may go unposted. `force` always posts.
pub fn should_skip<R: Rng + ?Sized>(activity: usize, force: bool, probability: f64, rng: &mut R) -> bool {
    if force || activity > 0 {
        return false;
    }
    rng.gen_bool(probability.clamp(0.0, 1.0))
}
