use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use spdlog::{error, info, warn};

use quire::collection::Collection;
use quire::config::{open_config, Config, LogLevel};
use quire::error::QuireError;
use quire::logger::configure_logger;
use quire::publish::Stage;

use crate::entry::{new_cmd, publish_cmd, touch_cmd};
use crate::site::{backfill_cmd, check_cmd, gallery_cmd, rewrite_cmd, sync_cmd};

mod entry;
mod site;

#[derive(Parser, Debug)]
#[command(version, about = "Authoring, publishing and asset tooling for the site", long_about = None)]
struct Cli {
    /// Config path. Defaults to quire.toml next to the binary, in the
    /// current dir or in the user config dir
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug output on the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a new entry
    New(NewArgs),
    /// Sets updatedDate of an entry to now
    Touch(EntryArgs),
    /// Draft lifecycle of an entry
    #[command(subcommand)]
    Publish(PublishCommand),
    /// Mirrors entry assets into the public tree
    Sync(SyncArgs),
    /// Gives date-only pubDates a time of day
    Backfill(BackfillArgs),
    /// Prints an entry with its relative asset links made site-absolute
    Rewrite(RewriteArgs),
    /// Builds the gallery JSON from writing covers and the image bank
    Gallery,
    /// Validates the metadata of every entry
    Check,
}

#[derive(Args, Debug)]
struct NewArgs {
    collection: Collection,

    /// Title of the entry. Asked for on a terminal when missing
    #[arg(short, long)]
    title: Option<String>,

    /// Directory name to use instead of the timestamp slug
    #[arg(short, long)]
    slug: Option<String>,

    /// Comma separated tags
    #[arg(long)]
    tags: Option<String>,

    /// Publication day of a writing entry, YYYY-MM-DD
    #[arg(short, long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct EntryArgs {
    slug: String,

    #[arg(long, default_value = "writing")]
    collection: Collection,
}

#[derive(Subcommand, Debug)]
enum PublishCommand {
    /// draft: true -> false
    Confirm(EntryArgs),
    /// draft: false -> true
    Retract(EntryArgs),
    /// Fails unless the entry is at the given stage
    Check {
        #[command(flatten)]
        entry: EntryArgs,

        #[arg(long)]
        stage: Stage,
    },
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Removes published assets that are gone from the entry
    #[arg(long)]
    clean: bool,

    /// Does not ask before cleaning
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct BackfillArgs {
    #[arg(long, default_value = "writing")]
    collection: Collection,

    /// Reports the new dates without writing them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct RewriteArgs {
    file: PathBuf,

    /// Renders HTML instead of markdown
    #[arg(long)]
    html: bool,
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<QuireError>()
        .map(QuireError::exit_code)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    let (config, config_path) = open_config(cli.config.as_deref())?;

    let console_level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    if let Err(err) = configure_logger(config.log.as_ref(), console_level) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    match &config_path {
        Some(path) => info!("Reading config from {}", path.display()),
        None => info!("No {} found, using defaults", quire::config::CFG_FILE_NAME),
    }

    dispatch(&config, cli.command)
}

fn dispatch(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::New(args) => new_cmd(config, args),
        Command::Touch(args) => touch_cmd(config, args),
        Command::Publish(cmd) => publish_cmd(config, cmd),
        Command::Sync(args) => sync_cmd(config, args),
        Command::Backfill(args) => backfill_cmd(config, args),
        Command::Rewrite(args) => rewrite_cmd(args),
        Command::Gallery => gallery_cmd(config),
        Command::Check => check_cmd(config),
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            error!("{:#}", err);
            exit_code(&err)
        }
    };

    spdlog::default_logger().flush();
    process::exit(code);
}
