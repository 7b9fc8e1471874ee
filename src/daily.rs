use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use spdlog::{debug, info, warn};

use crate::authoring::NOW_TITLE_PREFIX;
use crate::collection::{list_entries, Collection, INDEX_FILE};
use crate::config::Config;
use crate::content::entry_meta::{Byline, EntryMeta, Role, Source};
use crate::content::frontmatter::{unquote, Document};
use crate::error::{QuireError, Result};
use crate::mood::{choose, should_skip, Catalog, Choice, PreviousDay};
use crate::slug::{ensure_unique_slug, slugify};
use crate::text_utils::{prev_ymd, to_shanghai, ymd, yesterday_range, PubDate};
use crate::view::scaffold_renderer::{render_scaffold, MoodScaffold, Scaffold};

pub const COVER_FILE: &str = "cover.jpg";

/// What yesterday looked like from the outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signals {
    pub notes: String,
    /// One line per unit of activity, e.g. commit subjects
    pub subjects: Vec<String>,
    activity: usize,
}

impl Signals {
    pub fn new(notes: String, subjects: &str) -> Signals {
        let subjects: Vec<String> = subjects.lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Signals {
            notes,
            activity: subjects.len(),
            subjects,
        }
    }

    /// A bare activity count. Nothing is added to the text rules match on.
    pub fn with_activity(notes: String, activity: usize) -> Signals {
        Signals {
            notes,
            subjects: vec![],
            activity,
        }
    }

    pub fn activity(&self) -> usize {
        self.activity
    }

    pub fn text(&self) -> String {
        format!("{}\n{}", self.notes, self.subjects.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DailyOutcome {
    Skipped { activity: usize },
    DryRun { index: PathBuf, choice: Choice },
    Created { slug: String, index: PathBuf, choice: Choice },
}

/// `<notes_dir>/YYYY-MM-DD.md`, empty when it cannot be read.
pub fn read_notes(notes_dir: &Path, date: &NaiveDate) -> String {
    let path = notes_dir.join(format!("{}.md", date.format("%Y-%m-%d")));
    match fs::read_to_string(&path) {
        Ok(notes) => notes,
        Err(e) => {
            warn!("No notes for {} ({}): {}", date, path.display(), e);
            String::new()
        }
    }
}

/// Last `now` entry generated for `day_ymd`, if any can be read back.
pub fn load_previous_day(now_dir: &Path, day_ymd: &str) -> Option<PreviousDay> {
    let prefix = format!("{}000000-", day_ymd);
    let entries = match list_entries(now_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {}: {}", now_dir.display(), e);
            return None;
        }
    };

    let entry = entries.into_iter().filter(|e| e.slug.starts_with(&prefix)).last()?;
    let doc = match Document::read(&entry.index) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Ignoring previous entry {}: {}", entry.index.display(), e);
            return None;
        }
    };

    let field = |key: &str| doc.front.value(key).and_then(|raw| unquote(raw).ok()).unwrap_or_default();
    let previous = PreviousDay {
        title: field("title"),
        one_liner: field("description"),
        body: doc.body.clone(),
    };
    debug!("Previous day entry {}: {}", entry.slug, previous.title);
    Some(previous)
}

fn mood_meta(config: &Config, choice: &Choice, now: &DateTime<Utc>) -> EntryMeta {
    EntryMeta {
        title: format!("{}{}", NOW_TITLE_PREFIX, choice.title),
        description: Some(choice.one_liner.clone()),
        pub_date: PubDate::Timestamp(to_shanghai(now)),
        updated_date: None,
        tags: choice.tags.clone(),
        draft: false,
        by: Some(Byline {
            role: Role::Assistant,
            name: config.mood.author.clone(),
            note: Some(config.mood.note.clone()).filter(|n| !n.is_empty()),
        }),
        source: Some(Source::default()),
        cover: None,
    }
}

/// Reflects on yesterday (Shanghai time) and writes one `now` entry with a
/// cover from the image bank. Blank days may be skipped unless forced.
pub fn run_daily<R: Rng + ?Sized>(
    config: &Config,
    catalog: &Catalog,
    signals: &Signals,
    now: &DateTime<Utc>,
    options: DailyOptions,
    rng: &mut R,
) -> Result<DailyOutcome> {
    let bank_dir = &config.paths.image_bank_dir;
    if !bank_dir.is_dir() {
        return Err(QuireError::MissingAsset(bank_dir.clone()));
    }

    let range = yesterday_range(now);
    let day = ymd(&range.date);
    info!("Reflecting on {} ({} .. {})", day, range.since, range.until);

    let now_dir = Collection::Now.dir(&config.paths.content_dir);
    let previous = load_previous_day(&now_dir, &prev_ymd(&day)?);
    let activity = signals.activity();
    let choice = choose(catalog, &day, &signals.text(), activity, previous.as_ref())?;

    if should_skip(activity, options.force, config.mood.skip_probability, rng) {
        info!("Skip posting (activity={})", activity);
        return Ok(DailyOutcome::Skipped { activity });
    }

    let src_img = bank_dir.join(&choice.image);
    if !src_img.is_file() {
        return Err(QuireError::MissingAsset(src_img));
    }

    let slug = ensure_unique_slug(&now_dir, &format!("{}000000-{}", day, slugify(&choice.title)))?;
    let dir = now_dir.join(&slug);
    let index = dir.join(INDEX_FILE);

    let body = render_scaffold(Scaffold::DailyMood, config.paths.template_dir.as_deref(), &MoodScaffold {
        author: &config.mood.author,
        label: &choice.label,
        one_liner: &choice.one_liner,
        extra: &choice.extra,
    })?;
    let doc = Document::new(mood_meta(config, &choice, now).to_frontmatter(), &body);

    if options.dry_run {
        info!("Dry run. Would create {} with {}", index.display(), choice.image);
        return Ok(DailyOutcome::DryRun { index, choice });
    }

    fs::create_dir_all(&dir)?;
    fs::copy(&src_img, dir.join(COVER_FILE))?;
    doc.write(&index)?;

    info!("Created {} ({})", index.display(), choice.key);
    Ok(DailyOutcome::Created { slug, index, choice })
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;
    use tempfile::TempDir;

    use crate::test_data::NOW_ENTRY;

    use super::*;

    struct Site {
        tmp: TempDir,
        config: Config,
    }

    impl Site {
        fn new() -> Site {
            let tmp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.paths.content_dir = tmp.path().join("content");
            config.paths.image_bank_dir = tmp.path().join("bank");
            config.paths.notes_dir = tmp.path().join("notes");
            fs::create_dir_all(config.paths.content_dir.join("now")).unwrap();
            fs::create_dir_all(&config.paths.image_bank_dir).unwrap();
            for image in ["trophy-victory.jpg", "lazy-sleep-in-bed.jpg", "working-out-at-gym.jpg"] {
                fs::write(config.paths.image_bank_dir.join(image), image.as_bytes()).unwrap();
            }
            Site { tmp, config }
        }

        fn now_dir(&self) -> PathBuf {
            self.config.paths.content_dir.join("now")
        }
    }

    // 00:00:03 on 2026-02-02 in Shanghai
    fn midnight() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-01T16:00:03Z").unwrap().with_timezone(&Utc)
    }

    fn never_skip() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn test_signals() {
        let signals = Signals::new("went to the gym".to_string(), "fix parser\n\n  merge docs \n");
        assert_eq!(signals.activity(), 2);
        assert_eq!(signals.text(), "went to the gym\nfix parser\nmerge docs");

        let counted = Signals::with_activity("went to the gym".to_string(), 5);
        assert_eq!(counted.activity(), 5);
        assert_eq!(counted.text(), "went to the gym\n");
    }

    #[test]
    fn test_creates_mood_entry() {
        let site = Site::new();
        let catalog = Catalog::embedded().unwrap();
        let signals = Signals::new(String::new(), "feat: parser merged\n");

        let outcome = run_daily(&site.config, &catalog, &signals, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap();
        let DailyOutcome::Created { slug, index, choice } = outcome else {
            panic!("expected an entry");
        };

        assert_eq!(slug, "20260201000000-yesterday-small-wins");
        assert_eq!(choice.key, "small-wins");
        assert_eq!(fs::read(site.now_dir().join(&slug).join(COVER_FILE)).unwrap(), b"trophy-victory.jpg");

        let doc = Document::read(&index).unwrap();
        let meta = EntryMeta::from_frontmatter(&doc.front).unwrap();
        assert_eq!(meta.title, "Now: Yesterday: small wins");
        assert_eq!(meta.description.as_deref(), Some(choice.one_liner.as_str()));
        assert_eq!(meta.tags, ["now", "mood", "life"]);
        assert!(!meta.draft);
        assert_eq!(meta.by.unwrap().name, "Scribe");
        assert!(fs::read_to_string(&index).unwrap().contains("pubDate: \"2026-02-02T00:00:03+08:00\"\n"));
        assert!(doc.body.contains(&format!("> {}\n", choice.extra)));

        // Same day again gets its own slug
        let again = run_daily(&site.config, &catalog, &signals, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap();
        assert!(matches!(again, DailyOutcome::Created { ref slug, .. } if slug == "20260201000000-yesterday-small-wins-1"));
    }

    #[test]
    fn test_notes_drive_the_mood() {
        let site = Site::new();
        fs::create_dir_all(&site.config.paths.notes_dir).unwrap();
        fs::write(site.config.paths.notes_dir.join("2026-02-01.md"), "Morning GYM session").unwrap();

        let notes = read_notes(&site.config.paths.notes_dir, &NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        let signals = Signals::new(notes, "one commit");
        let catalog = Catalog::embedded().unwrap();
        let outcome = run_daily(&site.config, &catalog, &signals, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap();
        assert!(matches!(outcome, DailyOutcome::Created { ref choice, .. } if choice.key == "disciplined"));

        assert_eq!(read_notes(&site.config.paths.notes_dir, &NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()), "");
    }

    #[test]
    fn test_avoids_previous_days_one_liner() {
        let site = Site::new();
        let catalog = Catalog::embedded().unwrap();
        let signals = Signals::new(String::new(), "merged\n");

        let DailyOutcome::DryRun { choice: fresh, .. } = run_daily(&site.config, &catalog, &signals, &midnight(),
            DailyOptions { force: false, dry_run: true }, &mut never_skip()).unwrap() else {
            panic!("expected a dry run");
        };

        let prev_dir = site.now_dir().join("20260131000000-yesterday-small-wins");
        fs::create_dir_all(&prev_dir).unwrap();
        let previous = NOW_ENTRY
            .replace("Wrapped up a few loose ends.", &fresh.one_liner)
            .replace("Doing small things right saves future trouble.", &fresh.extra);
        fs::write(prev_dir.join(INDEX_FILE), previous).unwrap();

        let loaded = load_previous_day(&site.now_dir(), "20260131").unwrap();
        assert_eq!(loaded.title, "Now: Yesterday: small wins");
        assert_eq!(loaded.one_liner, fresh.one_liner);

        let DailyOutcome::DryRun { choice, .. } = run_daily(&site.config, &catalog, &signals, &midnight(),
            DailyOptions { force: false, dry_run: true }, &mut never_skip()).unwrap() else {
            panic!("expected a dry run");
        };
        assert_eq!(choice.key, fresh.key);
        assert_ne!(choice.one_liner, fresh.one_liner);
        assert_ne!(choice.extra, fresh.extra);
    }

    #[test]
    fn test_blank_day_skip_and_force() {
        let site = Site::new();
        let catalog = Catalog::embedded().unwrap();
        let blank = Signals::default();

        let outcome = run_daily(&site.config, &catalog, &blank, &midnight(), DailyOptions::default(), &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(outcome, DailyOutcome::Skipped { activity: 0 });
        assert!(list_entries(&site.now_dir()).unwrap().is_empty());

        let forced = DailyOptions { force: true, dry_run: false };
        let outcome = run_daily(&site.config, &catalog, &blank, &midnight(), forced, &mut StepRng::new(0, 0)).unwrap();
        assert!(matches!(outcome, DailyOutcome::Created { ref choice, .. } if choice.key == "recharge"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let site = Site::new();
        let catalog = Catalog::embedded().unwrap();
        let signals = Signals::new(String::new(), "merged\n");
        let outcome = run_daily(&site.config, &catalog, &signals, &midnight(), DailyOptions { force: false, dry_run: true }, &mut never_skip()).unwrap();

        let DailyOutcome::DryRun { index, .. } = outcome else {
            panic!("expected a dry run");
        };
        assert!(index.ends_with("now/20260201000000-yesterday-small-wins/index.md"));
        assert!(!index.exists());
        assert!(list_entries(&site.now_dir()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_assets() {
        let site = Site::new();
        let catalog = Catalog::embedded().unwrap();

        // Busy day without a matching rule needs the focused image, which the bank lacks
        let busy = Signals::new(String::new(), "a\nb\nc\n");
        let err = run_daily(&site.config, &catalog, &busy, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap_err();
        assert!(matches!(err, QuireError::MissingAsset(ref p) if p.ends_with("working-at-laptop.jpg")));
        assert_eq!(err.exit_code(), 2);
        assert!(list_entries(&site.now_dir()).unwrap().is_empty());

        // A bare count classifies the same way as the subjects it stands for
        let counted = Signals::with_activity(String::new(), 3);
        let err = run_daily(&site.config, &catalog, &counted, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap_err();
        assert!(matches!(err, QuireError::MissingAsset(ref p) if p.ends_with("working-at-laptop.jpg")));

        let mut config = site.config.clone();
        config.paths.image_bank_dir = site.tmp.path().join("nope");
        let err = run_daily(&config, &catalog, &busy, &midnight(), DailyOptions::default(), &mut never_skip()).unwrap_err();
        assert!(matches!(err, QuireError::MissingAsset(_)));
    }
}
