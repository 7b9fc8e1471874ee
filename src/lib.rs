pub mod config;
pub mod error;
pub mod logger;
pub mod collection;
pub mod content;
pub mod slug;
pub mod text_utils;
pub mod prompt;
pub mod authoring;
pub mod publish;
pub mod backfill;
pub mod assets;
pub mod gallery;
pub mod mood;
pub mod daily;
pub mod check;
pub mod util;
mod view;
mod test_data;
