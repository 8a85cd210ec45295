//! Migration configuration: record kinds, their update templates, and the
//! built-in plans for moving feeds over to `rss-scrapers`.

use std::collections::BTreeMap;

use crate::{
    error::{MigrateError, Result},
    mapping::MappingTable,
    strategy::DelimiterStrategy,
};

/// Table holding subscribed feeds.
pub const FEEDS_TABLE: &str = "feeds";
/// Table holding feed entries.
pub const ITEMS_TABLE: &str = "items";

/// Mapping table name for mangadex series ids.
pub const MANGA_MAPPING: &str = "manga";
/// Mapping table name for mangadex chapter ids.
pub const CHAPTER_MAPPING: &str = "chapter";

const MANGADEX_CHAPTER_PREFIX: &str = "https://mangadex.org/chapter/";
const MANGADEX_LEGACY_FEED_PREFIX: &str = "https://mangadex.org/rss/";

/// Where the replacement for a lookup key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The lookup key is its own replacement.
    Identity,
    /// The replacement is looked up in the named mapping table.
    Table(&'static str),
}

/// Shape of the `UPDATE` emitted for one record.
///
/// The new value is `value_prefix` followed by the replacement and is written
/// to every column in `set_columns`. Rows are matched by value on
/// `match_column`, not by row id, so duplicate old values are all rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTemplate {
    /// Columns receiving the new value (one or two).
    pub set_columns: Vec<&'static str>,
    /// Column compared against the old value.
    pub match_column: &'static str,
    /// Text placed before the replacement.
    pub value_prefix: &'static str,
}

/// One kind of record to migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKind {
    /// Short name used in logs and reports.
    pub label: &'static str,
    /// Noun used in the unmatched-record diagnostic, e.g. "chapter".
    pub noun: &'static str,
    /// Table holding the records.
    pub table: &'static str,
    /// Column read and matched against `pattern`.
    pub source_column: &'static str,
    /// Literal prefix selecting candidate records.
    pub pattern: &'static str,
    /// How the lookup key is cut out of the old value.
    pub strategy: DelimiterStrategy,
    /// Where the replacement comes from.
    pub lookup: Lookup,
    /// Shape of the resulting update.
    pub update: UpdateTemplate,
}

/// Everything a migration run needs, built before the store is touched.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    kinds: Vec<RecordKind>,
    mappings: BTreeMap<&'static str, MappingTable>,
}

impl MigrationConfig {
    /// Build a config, checking that every table lookup has a loaded mapping.
    pub fn new(
        kinds: Vec<RecordKind>,
        mappings: BTreeMap<&'static str, MappingTable>,
    ) -> Result<Self> {
        for kind in &kinds {
            if let Lookup::Table(name) = kind.lookup {
                if !mappings.contains_key(name) {
                    return Err(MigrateError::MissingMapping {
                        kind: kind.label,
                        table: name,
                    });
                }
            }
        }
        Ok(Self {
            kinds,
            mappings,
        })
    }

    /// Record kinds in the order they are processed.
    pub fn kinds(&self) -> &[RecordKind] {
        &self.kinds
    }

    /// Mapping table registered under `name`.
    pub fn mapping(&self, name: &str) -> Option<&MappingTable> {
        self.mappings.get(name)
    }
}

/// Built-in migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// `!gelbooru-rss` feeds to `!rss-scrapers gelbooru`.
    Gelbooru,
    /// `!mangadex-rss` feeds and chapter item keys to `!rss-scrapers mangadex`.
    Mangadex,
    /// Legacy mangadex ids to v5 ids, driven by manga and chapter maps.
    MangadexV5,
}

impl Plan {
    /// Mapping tables this plan needs loaded.
    pub fn required_mappings(self) -> &'static [&'static str] {
        match self {
            Self::Gelbooru | Self::Mangadex => &[],
            Self::MangadexV5 => &[MANGA_MAPPING, CHAPTER_MAPPING],
        }
    }

    /// Record kinds processed by this plan.
    pub fn kinds(self) -> Vec<RecordKind> {
        match self {
            Self::Gelbooru => vec![scraper_feed(
                "gelbooru",
                "!gelbooru-rss ",
                "!rss-scrapers gelbooru ",
                "post",
            )],
            Self::Mangadex => vec![
                RecordKind {
                    label: "mangadex-chapter-keys",
                    noun: "chapter",
                    table: ITEMS_TABLE,
                    source_column: "key",
                    pattern: MANGADEX_CHAPTER_PREFIX,
                    strategy: DelimiterStrategy::PrefixStrip(MANGADEX_CHAPTER_PREFIX),
                    lookup: Lookup::Identity,
                    update: UpdateTemplate {
                        set_columns: vec!["key"],
                        match_column: "url",
                        value_prefix: "",
                    },
                },
                scraper_feed("mangadex", "!mangadex-rss ", "!rss-scrapers mangadex ", "manga"),
            ],
            Self::MangadexV5 => vec![
                RecordKind {
                    label: "mangadex-v5-chapters",
                    noun: "chapter",
                    table: ITEMS_TABLE,
                    source_column: "url",
                    pattern: MANGADEX_CHAPTER_PREFIX,
                    strategy: DelimiterStrategy::PrefixStrip(MANGADEX_CHAPTER_PREFIX),
                    lookup: Lookup::Table(CHAPTER_MAPPING),
                    update: UpdateTemplate {
                        set_columns: vec!["url", "key"],
                        match_column: "url",
                        value_prefix: MANGADEX_CHAPTER_PREFIX,
                    },
                },
                RecordKind {
                    label: "mangadex-v5-feeds",
                    noun: "manga",
                    table: FEEDS_TABLE,
                    source_column: "url",
                    pattern: MANGADEX_LEGACY_FEED_PREFIX,
                    strategy: DelimiterStrategy::LastSlash,
                    lookup: Lookup::Table(MANGA_MAPPING),
                    update: UpdateTemplate {
                        set_columns: vec!["url"],
                        match_column: "url",
                        value_prefix: "!mangadex-rss ",
                    },
                },
            ],
        }
    }
}

// `!<site>-rss <id>` -> `!rss-scrapers <site> <id>`
fn scraper_feed(
    label: &'static str,
    pattern: &'static str,
    value_prefix: &'static str,
    noun: &'static str,
) -> RecordKind {
    RecordKind {
        label,
        noun,
        table: FEEDS_TABLE,
        source_column: "url",
        pattern,
        strategy: DelimiterStrategy::LastSpace,
        lookup: Lookup::Identity,
        update: UpdateTemplate {
            set_columns: vec!["url"],
            match_column: "url",
            value_prefix,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookups_need_loaded_mappings() {
        let err = MigrationConfig::new(Plan::MangadexV5.kinds(), BTreeMap::new())
            .expect_err("mappings missing");
        assert!(matches!(
            err,
            MigrateError::MissingMapping {
                table: CHAPTER_MAPPING,
                ..
            }
        ));

        let mappings = Plan::MangadexV5
            .required_mappings()
            .iter()
            .map(|name| (*name, MappingTable::default()))
            .collect();
        let config = MigrationConfig::new(Plan::MangadexV5.kinds(), mappings).expect("config");
        assert_eq!(config.kinds().len(), 2);
        assert!(config.mapping(MANGA_MAPPING).is_some());
    }

    #[test]
    fn identity_plans_need_no_mappings() {
        for plan in [Plan::Gelbooru, Plan::Mangadex] {
            assert!(plan.required_mappings().is_empty());
            assert!(MigrationConfig::new(plan.kinds(), BTreeMap::new()).is_ok());
        }
    }

    #[test]
    fn every_kind_writes_one_or_two_columns() {
        for plan in [Plan::Gelbooru, Plan::Mangadex, Plan::MangadexV5] {
            for kind in plan.kinds() {
                let count = kind.update.set_columns.len();
                assert!((1..=2).contains(&count), "{} sets {count} columns", kind.label);
            }
        }
    }
}
