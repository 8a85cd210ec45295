//! Subcommand dispatch.

pub mod run_plan;

use anyhow::Result;

use crate::{
    cli::{Cli, Commands},
    config::Plan,
};

/// Run the parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let options = run_plan::RunOptions {
        dry_run: cli.dry_run,
        json: cli.json,
    };
    match cli.command {
        Commands::Gelbooru {
            db_path,
        } => run_plan::run(Plan::Gelbooru, &db_path, &[], options),
        Commands::Mangadex {
            db_path,
        } => run_plan::run(Plan::Mangadex, &db_path, &[], options),
        Commands::MangadexV5 {
            db_path,
            manga_map,
            chapter_map,
        } => run_plan::run(Plan::MangadexV5, &db_path, &[manga_map, chapter_map], options),
    }
}
