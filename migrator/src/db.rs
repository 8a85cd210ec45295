//! SQLite record store holding the aggregator's `feeds` and `items` tables.

use std::path::Path;

use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde::Serialize;

use crate::{config::RecordKind, error::Result};

/// A stored value selected for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Value as currently stored in the kind's source column.
    pub old_value: String,
}

/// One update-by-value statement.
///
/// Every row whose `match_column` equals `old_value` is rewritten, not just
/// the row the value was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOperation {
    /// Target table.
    pub table: &'static str,
    /// Columns and the values written to them.
    pub assignments: Vec<(&'static str, String)>,
    /// Column compared against `old_value`.
    pub match_column: &'static str,
    /// Value identifying the rows to rewrite.
    pub old_value: String,
}

impl UpdateOperation {
    fn sql(&self) -> String {
        let set = self
            .assignments
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {set} WHERE {} = ?{}",
            self.table,
            self.match_column,
            self.assignments.len() + 1
        )
    }

    fn params(&self) -> impl Iterator<Item = &str> {
        self.assignments
            .iter()
            .map(|(_, value)| value.as_str())
            .chain(std::iter::once(self.old_value.as_str()))
    }
}

/// Result of applying one batch of updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Statements executed.
    pub applied: usize,
    /// Rows changed across all statements.
    pub rows_changed: usize,
    /// Whether the transaction was committed.
    pub committed: bool,
}

/// Connection to the aggregator's SQLite database.
///
/// The connection closes when the store is dropped.
pub struct FeedStore {
    conn: Connection,
}

impl FeedStore {
    /// Open an existing database read-write. Missing files are an error.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        tracing::debug!("Opened record store at {}", path.display());
        Ok(Self {
            conn,
        })
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
        }
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Values of `kind.source_column` starting with `kind.pattern`, compared
    /// case-sensitively.
    ///
    /// Order follows SQLite's scan order. NULLs are skipped.
    pub fn select_candidates(&self, kind: &RecordKind) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE {column} LIKE ?1 ESCAPE '\\'",
            column = kind.source_column,
            table = kind.table,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([like_prefix(kind.pattern)], |row| {
            row.get::<_, Option<String>>(0)
        })?;

        // LIKE ignores ASCII case; the prefix is literal.
        let mut records = Vec::new();
        for row in rows {
            if let Some(old_value) = row? {
                if old_value.starts_with(kind.pattern) {
                    records.push(Record {
                        old_value,
                    });
                }
            }
        }
        tracing::debug!(
            "Selected {} candidate(s) from {}.{} matching {:?}",
            records.len(),
            kind.table,
            kind.source_column,
            kind.pattern
        );
        Ok(records)
    }

    /// Run every operation in one transaction and commit once.
    ///
    /// With `dry_run` the transaction is rolled back instead, so the returned
    /// row counts describe what a real run would change. Any error drops the
    /// transaction, which rolls it back.
    pub fn apply_batch(
        &mut self,
        operations: &[UpdateOperation],
        dry_run: bool,
    ) -> Result<BatchOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = BatchOutcome::default();
        for op in operations {
            let mut stmt = tx.prepare_cached(&op.sql())?;
            outcome.rows_changed += stmt.execute(params_from_iter(op.params()))?;
            outcome.applied += 1;
        }

        if dry_run {
            tx.rollback()?;
        } else {
            tx.commit()?;
            outcome.committed = true;
        }
        Ok(outcome)
    }
}

/// `LIKE` pattern matching values that start with `prefix` literally.
pub fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("!gelbooru-rss "), "!gelbooru-rss %");
        assert_eq!(like_prefix("a_b%c\\"), "a\\_b\\%c\\\\%");
    }

    #[test]
    fn update_sql_binds_assignments_before_predicate() {
        let op = UpdateOperation {
            table: "items",
            assignments: vec![("url", "new".to_string()), ("key", "new".to_string())],
            match_column: "url",
            old_value: "old".to_string(),
        };
        assert_eq!(op.sql(), "UPDATE items SET url = ?1, key = ?2 WHERE url = ?3");
        assert_eq!(op.params().collect::<Vec<_>>(), vec!["new", "new", "old"]);
    }
}
