use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use spdlog::{error, info, warn};

use quire::config::{open_config, LogLevel};
use quire::daily::{read_notes, run_daily, DailyOptions, DailyOutcome, Signals};
use quire::error::QuireError;
use quire::logger::configure_logger;
use quire::mood::Catalog;
use quire::text_utils::yesterday_range;

/// Writes yesterday's mood entry into the `now` collection
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Posts even when yesterday was blank
    #[arg(short, long)]
    force: bool,

    /// Prints the choice without writing anything
    #[arg(long)]
    dry_run: bool,

    /// File with one activity subject per line, e.g. `git log --format=%s`
    #[arg(long, conflicts_with = "activity")]
    subjects: Option<PathBuf>,

    /// Activity count when no subjects file is given
    #[arg(long)]
    activity: Option<usize>,
}

fn read_signals(args: &Args, notes: String) -> Result<Signals> {
    match &args.subjects {
        Some(path) => {
            let subjects = fs::read_to_string(path)
                .with_context(|| format!("Error reading subjects from {}", path.display()))?;
            Ok(Signals::new(notes, &subjects))
        }
        None => Ok(Signals::with_activity(notes, args.activity.unwrap_or(0))),
    }
}

fn run(args: Args) -> Result<()> {
    let (config, _) = open_config(args.config.as_deref())?;
    if let Err(err) = configure_logger(config.log.as_ref(), LogLevel::Info) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    let catalog = match &config.mood.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::embedded()?,
    };

    let now = Utc::now();
    let notes = read_notes(&config.paths.notes_dir, &yesterday_range(&now).date);
    let signals = read_signals(&args, notes)?;
    let options = DailyOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    match run_daily(&config, &catalog, &signals, &now, options, &mut rand::thread_rng())? {
        DailyOutcome::Skipped { activity } => {
            info!("Nothing posted (activity={})", activity);
        }
        DailyOutcome::DryRun { index, choice } => {
            println!("{}", index.display());
            println!("mood: {} ({})", choice.key, choice.image);
            println!("one-liner: {}", choice.one_liner);
            println!("extra: {}", choice.extra);
        }
        DailyOutcome::Created { index, .. } => {
            println!("{}", index.display());
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    let code = match run(args) {
        Ok(()) => 0,
        Err(err) => {
            error!("{:#}", err);
            err.downcast_ref::<QuireError>().map(QuireError::exit_code).unwrap_or(1)
        }
    };

    spdlog::default_logger().flush();
    process::exit(code);
}
