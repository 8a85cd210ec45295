//! The record migrator: derive, resolve, build, then apply as one batch.

use std::io::Write;

use serde::Serialize;

use crate::{
    config::{Lookup, MigrationConfig, RecordKind, UpdateTemplate},
    db::{BatchOutcome, FeedStore, Record, UpdateOperation},
    error::{MigrateError, Result},
    strategy::derive_lookup_key,
};

/// Per-kind counters collected while planning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    /// Record kind label.
    pub label: &'static str,
    /// Records selected by the kind's pattern.
    pub candidates: usize,
    /// Updates built for this kind.
    pub planned: usize,
    /// Lookup keys with no mapping, in selection order.
    pub unmatched: Vec<String>,
    /// Stored values without the expected delimiter or prefix.
    pub malformed: Vec<String>,
}

/// Summary of one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// One entry per record kind, in config order.
    pub kinds: Vec<KindReport>,
    /// Outcome of the single update batch.
    pub batch: BatchOutcome,
    /// Whether the run rolled back instead of committing.
    pub dry_run: bool,
}

impl MigrationReport {
    /// Updates built across all kinds.
    pub fn planned(&self) -> usize {
        self.kinds.iter().map(|kind| kind.planned).sum()
    }

    /// Unmatched records across all kinds.
    pub fn unmatched(&self) -> usize {
        self.kinds.iter().map(|kind| kind.unmatched.len()).sum()
    }

    /// Malformed records across all kinds.
    pub fn malformed(&self) -> usize {
        self.kinds.iter().map(|kind| kind.malformed.len()).sum()
    }
}

/// Replacement for `key`, or `None` when the mapping has no entry.
///
/// A missing entry means the referenced entity no longer exists upstream.
pub fn resolve<'a>(
    lookup: &Lookup,
    key: &'a str,
    config: &'a MigrationConfig,
) -> Option<&'a str> {
    match lookup {
        Lookup::Identity => Some(key),
        Lookup::Table(name) => config.mapping(name)?.get(key),
    }
}

/// Update rewriting every row whose match column equals `record.old_value`.
pub fn build_update(
    table: &'static str,
    record: &Record,
    replacement: &str,
    template: &UpdateTemplate,
) -> UpdateOperation {
    let new_value = format!("{}{replacement}", template.value_prefix);
    UpdateOperation {
        table,
        assignments: template
            .set_columns
            .iter()
            .map(|column| (*column, new_value.clone()))
            .collect(),
        match_column: template.match_column,
        old_value: record.old_value.clone(),
    }
}

fn plan_record(
    kind: &RecordKind,
    record: &Record,
    config: &MigrationConfig,
) -> Result<UpdateOperation> {
    let key =
        derive_lookup_key(&record.old_value, &kind.strategy, kind.table, kind.source_column)?;
    let replacement = resolve(&kind.lookup, key, config).ok_or_else(|| {
        MigrateError::UnmappedKey {
            key: key.to_string(),
        }
    })?;
    Ok(build_update(kind.table, record, replacement, &kind.update))
}

/// Build updates for `records` of one kind.
///
/// Unmatched keys are written to `out` as one diagnostic line each. Malformed
/// values are logged and skipped.
pub fn plan_updates(
    kind: &RecordKind,
    records: &[Record],
    config: &MigrationConfig,
    out: &mut dyn Write,
) -> Result<(Vec<UpdateOperation>, KindReport)> {
    let mut operations = Vec::with_capacity(records.len());
    let mut report = KindReport {
        label: kind.label,
        candidates: records.len(),
        ..KindReport::default()
    };

    for record in records {
        match plan_record(kind, record, config) {
            Ok(op) => operations.push(op),
            Err(MigrateError::UnmappedKey {
                key,
            }) => {
                writeln!(out, "Unmatched {} ID, was likely deleted: {key}", kind.noun)
                    .map_err(MigrateError::Diagnostics)?;
                report.unmatched.push(key);
            },
            Err(err @ MigrateError::MalformedRecord { .. }) => {
                tracing::warn!("Skipping {} record: {err}", kind.label);
                report.malformed.push(record.old_value.clone());
            },
            Err(err) => return Err(err),
        }
    }

    report.planned = operations.len();
    Ok((operations, report))
}

/// Run every kind in `config` against `store` and apply the result as one
/// batch.
///
/// All kinds are selected and planned before anything is written, so the
/// candidate sets are not affected by this run's own updates.
pub fn run_migration(
    store: &mut FeedStore,
    config: &MigrationConfig,
    out: &mut dyn Write,
    dry_run: bool,
) -> Result<MigrationReport> {
    let mut operations = Vec::new();
    let mut report = MigrationReport {
        dry_run,
        ..MigrationReport::default()
    };

    for kind in config.kinds() {
        let records = store.select_candidates(kind)?;
        let (kind_ops, kind_report) = plan_updates(kind, &records, config, out)?;
        tracing::info!(
            "{}: {} candidate(s), {} update(s), {} unmatched, {} malformed",
            kind.label,
            kind_report.candidates,
            kind_report.planned,
            kind_report.unmatched.len(),
            kind_report.malformed.len()
        );
        operations.extend(kind_ops);
        report.kinds.push(kind_report);
    }

    report.batch = store.apply_batch(&operations, dry_run)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rusqlite::Connection;

    use super::*;
    use crate::{
        config::{Plan, CHAPTER_MAPPING, MANGA_MAPPING},
        mapping::MappingTable,
    };

    fn store() -> FeedStore {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "CREATE TABLE feeds (url TEXT NOT NULL);
             CREATE TABLE items (url TEXT NOT NULL, key TEXT);",
        )
        .expect("create tables");
        FeedStore::from_connection(conn)
    }

    fn v5_config(chapters: &[(&str, &str)]) -> MigrationConfig {
        let mut mappings = BTreeMap::new();
        mappings.insert(MANGA_MAPPING, MappingTable::default());
        mappings.insert(CHAPTER_MAPPING, chapters.iter().copied().collect());
        MigrationConfig::new(Plan::MangadexV5.kinds(), mappings).expect("config")
    }

    #[test]
    fn build_update_writes_prefix_and_replacement_to_each_column() {
        let template = UpdateTemplate {
            set_columns: vec!["url", "key"],
            match_column: "url",
            value_prefix: "https://mangadex.org/chapter/",
        };
        let record = Record {
            old_value: "https://mangadex.org/chapter/abc123".to_string(),
        };
        let op = build_update("items", &record, "def456", &template);
        assert_eq!(op.table, "items");
        assert_eq!(
            op.assignments,
            vec![
                ("url", "https://mangadex.org/chapter/def456".to_string()),
                ("key", "https://mangadex.org/chapter/def456".to_string()),
            ]
        );
        assert_eq!(op.match_column, "url");
        assert_eq!(op.old_value, record.old_value);
    }

    #[test]
    fn resolve_identity_and_table_lookups() {
        let config = v5_config(&[("abc123", "def456")]);
        assert_eq!(resolve(&Lookup::Identity, "12345", &config), Some("12345"));
        assert_eq!(resolve(&Lookup::Table(CHAPTER_MAPPING), "abc123", &config), Some("def456"));
        assert_eq!(resolve(&Lookup::Table(CHAPTER_MAPPING), "gone", &config), None);
        assert_eq!(resolve(&Lookup::Table("unknown"), "abc123", &config), None);
    }

    #[test]
    fn plan_updates_reports_unmatched_and_malformed() {
        let config = v5_config(&[("abc123", "def456")]);
        let kind = &config.kinds()[0];
        let records = ["https://mangadex.org/chapter/abc123", "https://mangadex.org/chapter/zzz"]
            .into_iter()
            .chain(std::iter::once("HTTPS://MANGADEX.ORG/CHAPTER/abc123"))
            .map(|value| Record {
                old_value: value.to_string(),
            })
            .collect::<Vec<_>>();

        let mut out = Vec::new();
        let (ops, report) = plan_updates(kind, &records, &config, &mut out).expect("plan");

        assert_eq!(ops.len(), 1);
        assert_eq!(report.candidates, 3);
        assert_eq!(report.planned, 1);
        assert_eq!(report.unmatched, vec!["zzz".to_string()]);
        assert_eq!(report.malformed, vec!["HTTPS://MANGADEX.ORG/CHAPTER/abc123".to_string()]);
        assert_eq!(
            String::from_utf8(out).expect("utf8 diagnostics"),
            "Unmatched chapter ID, was likely deleted: zzz\n"
        );
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let mut store = store();
        store
            .connection()
            .execute("INSERT INTO feeds (url) VALUES ('!gelbooru-rss 12345')", [])
            .expect("insert feed");
        let config = MigrationConfig::new(Plan::Gelbooru.kinds(), BTreeMap::new()).expect("config");

        let report =
            run_migration(&mut store, &config, &mut std::io::sink(), true).expect("dry run");
        assert!(report.dry_run);
        assert!(!report.batch.committed);
        assert_eq!(report.batch.rows_changed, 1);

        let url: String = store
            .connection()
            .query_row("SELECT url FROM feeds", [], |row| row.get(0))
            .expect("read feed");
        assert_eq!(url, "!gelbooru-rss 12345");
    }
}
