//! Configuration for font subsetting.

use crate::fonts::Tag;
use std::collections::HashSet;

/// Font subsetting configuration.
#[derive(Debug, Clone, Default)]
pub struct SubsetOptions {
    /// Optional tables to emit. `None` keeps every table the source font has.
    ///
    /// The rebuilt core tables (`head`, `hhea`, `maxp`, `loca`, `glyf`,
    /// `hmtx`) are always written.
    pub keep_tables: Option<HashSet<Tag>>,

    /// Prefix prepended to the PostScript name (name ID 6).
    pub prefix: Option<String>,
}

impl SubsetOptions {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the optional tables written to the subset.
    pub fn with_keep_tables<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = Tag>,
    {
        self.keep_tables = Some(tags.into_iter().collect());
        self
    }

    /// Set the PostScript name prefix, usually `"ABCDEF+"`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Whether an optional table passes the keep list.
    pub fn keeps(&self, tag: Tag) -> bool {
        match &self.keep_tables {
            Some(tags) => tags.contains(&tag),
            None => true,
        }
    }
}
