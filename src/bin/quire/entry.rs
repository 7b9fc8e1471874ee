use anyhow::Result;
use chrono::Utc;

use quire::authoring::{create_entry, prompt_optional_fields, NewEntry};
use quire::config::Config;
use quire::content::entry_meta::parse_tag_list;
use quire::prompt::{ask_required, LinePrompt};
use quire::publish::{check_stage, confirm_publish, retract, touch_updated};

use crate::{EntryArgs, NewArgs, PublishCommand};

pub fn new_cmd(config: &Config, args: NewArgs) -> Result<()> {
    let interactive = args.title.is_none();
    let title = match args.title {
        Some(title) => title,
        None => ask_required("title")?,
    };

    let mut request = NewEntry {
        collection: args.collection,
        title,
        slug: args.slug,
        tags: args.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        date: args.date,
    };

    // Asked on a terminal only, since a missing title fails without one
    if interactive {
        prompt_optional_fields(&mut LinePrompt::stdio(), &mut request)?;
    }

    let created = create_entry(config, &request, &Utc::now())?;
    println!("{}", created.index.display());
    Ok(())
}

pub fn touch_cmd(config: &Config, args: EntryArgs) -> Result<()> {
    touch_updated(&config.paths.content_dir, args.collection, &args.slug, &Utc::now())?;
    Ok(())
}

pub fn publish_cmd(config: &Config, cmd: PublishCommand) -> Result<()> {
    let root = &config.paths.content_dir;
    match cmd {
        PublishCommand::Confirm(args) => {
            confirm_publish(root, args.collection, &args.slug)?;
        }
        PublishCommand::Retract(args) => {
            retract(root, args.collection, &args.slug)?;
        }
        PublishCommand::Check { entry, stage } => {
            let index = check_stage(root, entry.collection, &entry.slug, stage)?;
            println!("{} is {}", index.display(), stage);
        }
    }
    Ok(())
}
