//! Error taxonomy for the migrator.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading mappings, deriving keys, or touching the store.
///
/// `MalformedRecord` and `UnmappedKey` are per-record and never abort a run;
/// the migrator skips the record and keeps going. Everything else is fatal.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A stored value lacks the delimiter or prefix its kind expects.
    #[error("malformed value in {table}.{column}: {value:?} ({reason})")]
    MalformedRecord {
        /// Table the value was read from.
        table: &'static str,
        /// Column the value was read from.
        column: &'static str,
        /// The offending stored value.
        value: String,
        /// What was missing.
        reason: &'static str,
    },

    /// The lookup key has no entry in its mapping table.
    #[error("no mapping for lookup key {key:?}")]
    UnmappedKey {
        /// The unresolved lookup key.
        key: String,
    },

    /// A mapping file row has fewer than three comma separated fields.
    #[error("{}:{line}: expected at least 3 comma separated fields, found {fields}", path.display())]
    MalformedMapping {
        /// Mapping file path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Number of fields found on the line.
        fields: usize,
    },

    /// A mapping file could not be read.
    #[error("failed to read mapping file {}", path.display())]
    MappingIo {
        /// Mapping file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A record kind refers to a mapping table that was never loaded.
    #[error("record kind `{kind}` needs mapping table `{table}`, which was not loaded")]
    MissingMapping {
        /// Label of the record kind.
        kind: &'static str,
        /// Name of the missing mapping table.
        table: &'static str,
    },

    /// Unmatched-record diagnostics could not be written.
    #[error("failed to write diagnostics")]
    Diagnostics(#[source] std::io::Error),

    /// Any failure opening, reading, or committing to the record store.
    #[error("record store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Crate-wide result alias.
pub type Result<T, E = MigrateError> = std::result::Result<T, E>;
