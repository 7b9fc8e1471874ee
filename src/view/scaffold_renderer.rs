use std::fs;
use std::path::Path;

use ramhorns::Template;
use spdlog::debug;

use crate::error::{QuireError, Result};

/// Body scaffolds for new entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaffold {
    Writing,
    Now,
    DailyMood,
}

impl Scaffold {
    pub fn file_name(&self) -> &'static str {
        match self {
            Scaffold::Writing => "writing.md",
            Scaffold::Now => "now.md",
            Scaffold::DailyMood => "daily-mood.md",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            Scaffold::Writing => include_str!("../../res/templates/writing.md"),
            Scaffold::Now => include_str!("../../res/templates/now.md"),
            Scaffold::DailyMood => include_str!("../../res/templates/daily-mood.md"),
        }
    }

    /// A file with the same name in `template_dir` wins over the embedded one.
    pub fn source(&self, template_dir: Option<&Path>) -> Result<String> {
        if let Some(dir) = template_dir {
            let path = dir.join(self.file_name());
            if path.is_file() {
                debug!("Using template {}", path.display());
                return fs::read_to_string(&path)
                    .map_err(|e| QuireError::Template(format!("Error loading {}: {}", path.display(), e)));
            }
        }
        Ok(self.embedded().to_string())
    }
}

#[derive(ramhorns::Content)]
pub struct EntryScaffold<'a> {
    pub title: &'a str,
    pub date: &'a str,
}

#[derive(ramhorns::Content)]
pub struct MoodScaffold<'a> {
    pub author: &'a str,
    pub label: &'a str,
    pub one_liner: &'a str,
    pub extra: &'a str,
}

pub struct ScaffoldRenderer<'a> {
    pub template: Template<'a>,
}

impl<'a> ScaffoldRenderer<'a> {
    pub fn new(tpl_src: &'a str) -> Result<ScaffoldRenderer<'a>> {
        let template = match Template::new(tpl_src) {
            Ok(x) => x,
            Err(e) => {
                return Err(QuireError::Template(format!("Error parsing scaffold template: {}", e)));
            }
        };

        Ok(ScaffoldRenderer {
            template,
        })
    }

    pub fn render<C: ramhorns::Content>(&self, content: &C) -> String {
        self.template.render(content)
    }
}

/// Loads the scaffold and renders it in one go.
pub fn render_scaffold<C: ramhorns::Content>(scaffold: Scaffold, template_dir: Option<&Path>, content: &C) -> Result<String> {
    let src = scaffold.source(template_dir)?;
    let renderer = ScaffoldRenderer::new(&src)?;
    Ok(renderer.render(content))
}
