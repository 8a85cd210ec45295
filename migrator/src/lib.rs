//! Rewrites feed and item identifiers in an aw-rss SQLite database so they
//! follow the `rss-scrapers` naming scheme.
//!
//! A run selects candidate rows per [`config::RecordKind`], cuts a lookup key
//! out of each stored value, resolves it to a replacement, and applies all
//! resulting updates in a single transaction.

pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod migrate;
pub mod strategy;

pub use config::{MigrationConfig, Plan};
pub use db::FeedStore;
pub use error::MigrateError;
pub use migrate::{run_migration, MigrationReport};
