//! Load mappings, open the store, migrate, report.

use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::{
    config::{MigrationConfig, Plan},
    db::FeedStore,
    mapping::load_mapping,
    migrate::run_migration,
};

/// Flags shared by every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Roll back instead of committing.
    pub dry_run: bool,
    /// Print the report as JSON.
    pub json: bool,
}

/// Build the config for `plan` from `mapping_paths`, given in the order of
/// [`Plan::required_mappings`].
pub fn build_config(plan: Plan, mapping_paths: &[PathBuf]) -> Result<MigrationConfig> {
    let names = plan.required_mappings();
    if names.len() != mapping_paths.len() {
        bail!(
            "{plan:?} needs {} mapping file(s), got {}",
            names.len(),
            mapping_paths.len()
        );
    }

    let mut mappings = BTreeMap::new();
    for (name, path) in names.iter().zip(mapping_paths) {
        let table =
            load_mapping(path).with_context(|| format!("failed to load {name} mapping"))?;
        mappings.insert(*name, table);
    }
    Ok(MigrationConfig::new(plan.kinds(), mappings)?)
}

/// Run `plan` against the database at `db_path`.
pub fn run(
    plan: Plan,
    db_path: &Path,
    mapping_paths: &[PathBuf],
    options: RunOptions,
) -> Result<()> {
    let config = build_config(plan, mapping_paths)?;
    let mut store = FeedStore::open(db_path)
        .with_context(|| format!("failed to open record store {}", db_path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = run_migration(&mut store, &config, &mut out, options.dry_run)
        .with_context(|| format!("{plan:?} migration failed"))?;

    if report.dry_run {
        tracing::info!(
            "Dry run: {} update(s) would change {} row(s); nothing committed",
            report.batch.applied,
            report.batch.rows_changed
        );
    } else {
        tracing::info!(
            "Committed {} update(s), {} row(s) changed; {} unmatched, {} malformed",
            report.batch.applied,
            report.batch.rows_changed,
            report.unmatched(),
            report.malformed()
        );
    }

    if options.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    }
    Ok(())
}
