use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::content::entry_meta::Role;
use crate::error::{QuireError, Result};
use crate::mood::DEFAULT_SKIP_PROBABILITY;
use crate::util::os_helper::get_name;

pub const CFG_FILE_NAME: &str = "quire.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Paths {
    /// Holds the `writing/` and `now/` collections
    pub content_dir: PathBuf,
    /// Site output root; assets land in `<public_dir>/<collection>/<slug>/`
    pub public_dir: PathBuf,
    pub image_bank_dir: PathBuf,
    /// Daily notes, one `YYYY-MM-DD.md` per day
    pub notes_dir: PathBuf,
    /// Overrides for the embedded body templates
    pub template_dir: Option<PathBuf>,
    pub gallery_json: PathBuf,
    /// Relative to `public_dir`
    pub gallery_public_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            content_dir: PathBuf::from("src/content"),
            public_dir: PathBuf::from("public"),
            image_bank_dir: PathBuf::from(".image_bank"),
            notes_dir: PathBuf::from("../memory"),
            template_dir: None,
            gallery_json: PathBuf::from("src/data/gallery.json"),
            gallery_public_dir: PathBuf::from("gallery"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Author {
    pub name: Option<String>,
}

impl Author {
    /// Configured name, else the OS user.
    pub fn display_name(&self) -> String {
        match self.name {
            Some(ref name) if !name.trim().is_empty() => name.clone(),
            _ => get_name(),
        }
    }
}

/// Per-collection defaults for new entries.
#[derive(Deserialize, Debug, Clone)]
pub struct CollectionDefaults {
    pub role: RoleName,
    pub name: Option<String>,
    pub note: Option<String>,
    pub draft: bool,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Owner,
    Assistant,
    Coauthored,
}

impl From<RoleName> for Role {
    fn from(value: RoleName) -> Self {
        match value {
            RoleName::Owner => Role::Owner,
            RoleName::Assistant => Role::Assistant,
            RoleName::Coauthored => Role::Coauthored,
        }
    }
}

fn writing_defaults() -> CollectionDefaults {
    CollectionDefaults {
        role: RoleName::Coauthored,
        name: None,
        note: Some("Outline by owner".to_string()),
        draft: true,
    }
}

fn now_defaults() -> CollectionDefaults {
    CollectionDefaults {
        role: RoleName::Assistant,
        name: None,
        note: None,
        draft: false,
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Mood {
    /// Replaces the embedded catalog
    pub catalog: Option<PathBuf>,
    pub skip_probability: f64,
    /// Byline of generated entries
    pub author: String,
    pub note: String,
}

impl Default for Mood {
    fn default() -> Self {
        Mood {
            catalog: None,
            skip_probability: DEFAULT_SKIP_PROBABILITY,
            author: "Scribe".to_string(),
            note: "Daily recap".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub author: Author,
    #[serde(default = "writing_defaults")]
    pub writing: CollectionDefaults,
    #[serde(default = "now_defaults")]
    pub now: CollectionDefaults,
    #[serde(default)]
    pub mood: Mood,
    pub log: Option<Log>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: Paths::default(),
            author: Author::default(),
            writing: writing_defaults(),
            now: now_defaults(),
            mood: Mood::default(),
            log: None,
        }
    }
}

fn parse_path(path: PathBuf) -> PathBuf {
    let Some(str_path) = path.to_str() else {
        return path;
    };
    if !str_path.starts_with("${exe_dir}") {
        return path;
    }

    match env::current_exe().ok().as_deref().and_then(Path::parent).and_then(Path::to_str) {
        Some(exe_dir) => PathBuf::from(str_path.replace("${exe_dir}", exe_dir)),
        None => path,
    }
}

impl Config {
    pub fn parse(raw: &str) -> Result<Config> {
        let mut cfg: Config = toml::from_str(raw)
            .map_err(|e| QuireError::Config(format!("Error parsing configuration file: {}", e)))?;

        let paths = cfg.paths;
        cfg.paths = Paths {
            content_dir: parse_path(paths.content_dir),
            public_dir: parse_path(paths.public_dir),
            image_bank_dir: parse_path(paths.image_bank_dir),
            notes_dir: parse_path(paths.notes_dir),
            template_dir: paths.template_dir.map(parse_path),
            gallery_json: parse_path(paths.gallery_json),
            gallery_public_dir: paths.gallery_public_dir,
        };
        cfg.mood.catalog = cfg.mood.catalog.map(parse_path);

        if !(0.0..=1.0).contains(&cfg.mood.skip_probability) {
            return Err(QuireError::Config(format!("mood.skip_probability must be within 0..1, got {}", cfg.mood.skip_probability)));
        }

        Ok(cfg)
    }

    pub fn byline_name(&self, defaults: &CollectionDefaults) -> String {
        defaults.name.clone().unwrap_or_else(|| self.author.display_name())
    }
}

pub fn read_config(cfg_path: &Path) -> Result<Config> {
    let cfg_content = fs::read_to_string(cfg_path)
        .map_err(|e| QuireError::Config(format!("Error opening configuration file {}: {}", cfg_path.display(), e)))?;
    Config::parse(&cfg_content)
}

/// `quire.toml` next to the executable, in the current directory, or in the
/// user config directory, in that order.
pub fn find_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf));
    let cur_dir = env::current_dir().ok();
    let cfg_dir = dirs::config_dir();

    [exe_dir, cur_dir, cfg_dir].into_iter()
        .flatten()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.is_file())
}

/// An explicit path must exist. Without one, the first file found by
/// [`find_config_path`] is used, else the built-in defaults.
pub fn open_config(cfg_path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let config_path = match cfg_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_path(),
    };

    match config_path {
        Some(path) => Ok((read_config(&path)?, Some(path))),
        None => Ok((Config::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.paths.content_dir, PathBuf::from("src/content"));
        assert_eq!(cfg.paths.public_dir, PathBuf::from("public"));
        assert!(cfg.writing.draft);
        assert!(!cfg.now.draft);
        assert_eq!(cfg.writing.role, RoleName::Coauthored);
        assert_eq!(cfg.mood.skip_probability, DEFAULT_SKIP_PROBABILITY);
        assert!(cfg.log.is_none());
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
[paths]
content_dir = "${exe_dir}/content"
public_dir = "/srv/site/public"
template_dir = "templates"

[author]
name = "Jing"

[writing]
role = "owner"
draft = false

[mood]
skip_probability = 0.25
author = "Bot"

[log]
level = "Info"
log_to_console = true
"#;
        let cfg = Config::parse(raw).unwrap();
        assert!(!cfg.paths.content_dir.to_string_lossy().contains("${exe_dir}"));
        assert!(cfg.paths.content_dir.ends_with("content"));
        assert_eq!(cfg.paths.public_dir, PathBuf::from("/srv/site/public"));
        assert_eq!(cfg.paths.template_dir, Some(PathBuf::from("templates")));
        assert_eq!(cfg.paths.notes_dir, PathBuf::from("../memory"));
        assert_eq!(cfg.writing.role, RoleName::Owner);
        assert!(!cfg.writing.draft);
        assert_eq!(cfg.byline_name(&cfg.writing), "Jing");
        assert_eq!(cfg.mood.skip_probability, 0.25);
        assert_eq!(cfg.mood.author, "Bot");
        assert!(cfg.log.unwrap().log_to_console);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::parse("[paths]\ncontent_dir = 3\n"), Err(QuireError::Config(_))));
        assert!(Config::parse("[mood]\nskip_probability = 1.5\n").is_err());
        assert!(Config::parse("[writing]\nrole = \"ghost\"\ndraft = true\n").is_err());
    }

    #[test]
    fn test_open_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CFG_FILE_NAME);
        fs::write(&path, "[author]\nname = \"Jing\"\n").unwrap();

        let (cfg, found) = open_config(Some(&path)).unwrap();
        assert_eq!(cfg.author.name.as_deref(), Some("Jing"));
        assert_eq!(found, Some(path));

        let err = open_config(Some(&tmp.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, QuireError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
