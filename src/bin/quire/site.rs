use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use spdlog::{error, info, warn};

use quire::assets::sync_assets;
use quire::backfill::backfill_pub_dates;
use quire::check::check_entries;
use quire::config::Config;
use quire::content::asset_rewriter::render_html;
use quire::content::AssetRewriter;
use quire::error::QuireError;
use quire::gallery::{build_gallery, write_gallery};
use quire::prompt::{AssumeYes, Confirm, TerminalPrompt};

use crate::{BackfillArgs, RewriteArgs, SyncArgs};

pub fn sync_cmd(config: &Config, args: SyncArgs) -> Result<()> {
    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt)
    };

    let report = sync_assets(&config.paths.content_dir, &config.paths.public_dir, args.clean, confirm.as_mut())?;
    info!("{} entries, {} assets copied, {} removed", report.entries, report.copied, report.removed.len());
    Ok(())
}

pub fn backfill_cmd(config: &Config, args: BackfillArgs) -> Result<()> {
    let changes = backfill_pub_dates(&config.paths.content_dir, args.collection, args.dry_run)?;
    info!("{} entries {}", changes.len(), if args.dry_run { "would change" } else { "changed" });
    Ok(())
}

pub fn rewrite_cmd(args: RewriteArgs) -> Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Error reading {}", args.file.display()))?;

    let output = match AssetRewriter::for_file(&args.file) {
        Some(rewriter) if args.html => rewriter.render_html(&source)?,
        Some(rewriter) => rewriter.rewrite_markdown(&source)?,
        None => {
            warn!("{} is not inside a collection entry, links are left as they are", args.file.display());
            if args.html { render_html(&source)? } else { source }
        }
    };

    print!("{}", output);
    Ok(())
}

pub fn gallery_cmd(config: &Config) -> Result<()> {
    let paths = &config.paths;
    let gallery = build_gallery(&paths.public_dir, &paths.image_bank_dir, &paths.gallery_public_dir, &Utc::now())?;
    write_gallery(&gallery, &paths.gallery_json)?;
    Ok(())
}

pub fn check_cmd(config: &Config) -> Result<()> {
    let report = check_entries(&config.paths.content_dir)?;
    for failure in &report.failures {
        error!("{}: {}", failure.index.display(), failure.reason);
    }

    info!("Checked {} entries, {} failed, {} with a missing cover",
        report.checked, report.failures.len(), report.missing_covers.len());

    if !report.is_ok() {
        let reason = format!("{} of {} entries failed validation", report.failures.len(), report.checked);
        return Err(QuireError::invalid_field("entries", reason).into());
    }
    Ok(())
}
