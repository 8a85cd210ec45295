//! Command line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level arguments.
#[derive(Parser)]
#[command(
    name = "aw-rss-migrate",
    version,
    about = "Rewrite aw-rss feed and item URLs for rss-scrapers"
)]
pub struct Cli {
    /// Roll the batch back instead of committing it.
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Print the run report as JSON after the diagnostics.
    #[arg(long, global = true)]
    pub json: bool,
    /// Migration to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// One subcommand per built-in migration plan.
#[derive(Subcommand)]
pub enum Commands {
    /// Move `!gelbooru-rss` feeds to `!rss-scrapers gelbooru`.
    Gelbooru {
        /// aw-rss SQLite database path.
        db_path: PathBuf,
    },
    /// Move `!mangadex-rss` feeds and chapter item keys to
    /// `!rss-scrapers mangadex`.
    Mangadex {
        /// aw-rss SQLite database path.
        db_path: PathBuf,
    },
    /// Remap legacy mangadex manga and chapter ids to v5 ids.
    #[command(name = "mangadex-v5")]
    MangadexV5 {
        /// aw-rss SQLite database path.
        db_path: PathBuf,
        /// Manga id map (`_,legacy_id,new_id` per line).
        manga_map: PathBuf,
        /// Chapter id map (`_,legacy_id,new_id` per line).
        chapter_map: PathBuf,
    },
}
