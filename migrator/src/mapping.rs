//! Lookup tables loaded from comma separated mapping files.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::error::{MigrateError, Result};

/// Old identifier fragment to new identifier fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<String, String>,
    overridden: usize,
}

impl MappingTable {
    /// Parse mapping rows from `reader`.
    ///
    /// Each non-blank line is trimmed, then split on `,`. Field 1 is the
    /// lookup key and field 2 the replacement; field 0 and anything after
    /// field 2 are ignored. A repeated key replaces the earlier entry.
    /// `path` is only used for error messages.
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut table = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| MigrateError::MappingIo {
                path: path.to_path_buf(),
                source,
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields = line.split(',').collect::<Vec<_>>();
            if fields.len() < 3 {
                return Err(MigrateError::MalformedMapping {
                    path: path.to_path_buf(),
                    line: index + 1,
                    fields: fields.len(),
                });
            }
            table.insert(fields[1], fields[2]);
        }
        Ok(table)
    }

    /// Add one entry, replacing any earlier value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, replacement: impl Into<String>) {
        if self
            .entries
            .insert(key.into(), replacement.into())
            .is_some()
        {
            self.overridden += 1;
        }
    }

    /// Replacement for `key`, if mapped.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many rows replaced an earlier row with the same key.
    pub fn overridden(&self) -> usize {
        self.overridden
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (key, replacement) in iter {
            table.insert(key, replacement);
        }
        table
    }
}

/// Load a mapping table from the file at `path`.
pub fn load_mapping(path: &Path) -> Result<MappingTable> {
    let file = File::open(path).map_err(|source| MigrateError::MappingIo {
        path: path.to_path_buf(),
        source,
    })?;
    let table = MappingTable::from_reader(BufReader::new(file), path)?;

    if table.overridden() > 0 {
        tracing::warn!(
            "Mapping file {} repeats {} key(s); the last occurrence of each wins",
            path.display(),
            table.overridden()
        );
    }
    tracing::info!("Loaded {} mapping entries from {}", table.len(), path.display());
    Ok(table)
}
