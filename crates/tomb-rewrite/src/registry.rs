//! Registry of soft-delete tables.

use std::collections::HashSet;

use tomb_core::SoftDeleteConfig;

use crate::lexer::QUOTE_CHARS;

/// The set of tables whose rows carry a soft-delete flag.
///
/// Membership is exact and case-sensitive. Quote characters around the name
/// are ignored, but schema prefixes are not: `db.hist_a` is a different name
/// from `hist_a`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftDeleteRegistry {
    tables: HashSet<String>,
}

impl SoftDeleteRegistry {
    /// Create a registry holding the given table names.
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a registry from the `soft_delete` configuration section.
    pub fn from_config(config: &SoftDeleteConfig) -> Self {
        Self::new(config.tables.iter().cloned())
    }

    /// Whether `table_name` participates in soft deletion.
    pub fn is_soft_delete_table(&self, table_name: &str) -> bool {
        if table_name.contains(QUOTE_CHARS) {
            let bare: String = table_name
                .chars()
                .filter(|c| !QUOTE_CHARS.contains(c))
                .collect();
            self.tables.contains(&bare)
        } else {
            self.tables.contains(table_name)
        }
    }

    /// Registered table names in sorted order.
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self.tables.iter().map(String::as_str).collect();
        tables.sort_unstable();
        tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
