use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuireError>;

/// Exit code for validation and precondition failures.
pub const EXIT_PRECONDITION: i32 = 2;
/// Exit code for everything else that went wrong.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Error, Debug)]
pub enum QuireError {
    #[error("Entry not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Entry already exists: {}", .0.display())]
    EntryExists(PathBuf),

    #[error("Unexpected draft state in {}: expected draft: {expected}, found {}", .path.display(), describe_draft(.found))]
    DraftState {
        path: PathBuf,
        expected: bool,
        found: Option<bool>,
    },

    #[error("Frontmatter not found (expected --- ... ---) - file={}", .0.display())]
    MissingFrontmatter(PathBuf),

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Missing --{0}")]
    MissingArgument(String),

    #[error("Could not find a free slug for {base} after {attempts} attempts")]
    SlugExhausted { base: String, attempts: usize },

    #[error("{0} is destructive and needs confirmation. Pass --yes to run it non-interactively")]
    ConfirmationRequired(String),

    #[error("{0} aborted")]
    ConfirmationRefused(String),

    #[error("Missing asset: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Markdown error: {0}")]
    Markdown(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_draft(found: &Option<bool>) -> String {
    match found {
        Some(value) => format!("draft: {}", value),
        None => "no draft flag".to_string(),
    }
}

impl QuireError {
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        QuireError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            QuireError::NotFound(_)
            | QuireError::EntryExists(_)
            | QuireError::DraftState { .. }
            | QuireError::MissingFrontmatter(_)
            | QuireError::InvalidField { .. }
            | QuireError::MissingArgument(_)
            | QuireError::SlugExhausted { .. }
            | QuireError::ConfirmationRequired(_)
            | QuireError::MissingAsset(_)
            | QuireError::Config(_) => EXIT_PRECONDITION,
            QuireError::ConfirmationRefused(_)
            | QuireError::Template(_)
            | QuireError::Markdown(_)
            | QuireError::Io(_)
            | QuireError::Json(_) => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let err = QuireError::DraftState { path: PathBuf::from("a/index.md"), expected: true, found: Some(false) };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Unexpected draft state in a/index.md: expected draft: true, found draft: false");

        let err = QuireError::ConfirmationRefused("Asset cleanup".to_string());
        assert_eq!(err.exit_code(), 1);

        let err: QuireError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_draft_flag_message() {
        let err = QuireError::DraftState { path: PathBuf::from("x.md"), expected: true, found: None };
        assert!(err.to_string().ends_with("found no draft flag"));
    }
}
