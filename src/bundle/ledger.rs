//! Column ledger - side record of which columns belong to which group
//!
//! The ledger is a decoding aid, never a correctness requirement: a
//! missing or malformed ledger file degrades the decoder to prefix routing
//! plus shape inference, it never fails an import.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Result;

/// The three independent key/value groups a run carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnGroup {
    /// String-valued, write-once configuration settings.
    Parameter,
    /// Numeric measurements, latest value only.
    Metric,
    /// Mutable string-valued annotations.
    Tag,
}

impl ColumnGroup {
    /// Column name prefix for the group.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Parameter => "param",
            Self::Metric => "metric",
            Self::Tag => "tag",
        }
    }

    /// Build the prefixed column name for a key of this group.
    #[must_use]
    pub fn column_name(self, name: &str) -> String {
        format!("{}:{name}", self.prefix())
    }
}

/// Ordered, duplicate-free lists of column names per group, accumulated
/// across all runs of one export.
///
/// Serialized as `{"parameters": [...], "metrics": [...], "tags": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLedger {
    parameters: Vec<String>,
    metrics: Vec<String>,
    tags: Vec<String>,
}

impl ColumnLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no column has been observed in any group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.metrics.is_empty() && self.tags.is_empty()
    }

    /// Record a column name in its group's list if not already present.
    /// Insertion order is preserved.
    pub fn observe(&mut self, group: ColumnGroup, column: &str) {
        let list = self.group_mut(group);
        if !list.iter().any(|c| c == column) {
            list.push(column.to_string());
        }
    }

    /// Column names recorded for a group, in observation order.
    #[must_use]
    pub fn columns(&self, group: ColumnGroup) -> &[String] {
        match group {
            ColumnGroup::Parameter => &self.parameters,
            ColumnGroup::Metric => &self.metrics,
            ColumnGroup::Tag => &self.tags,
        }
    }

    /// Which group a column name was recorded under, if any.
    #[must_use]
    pub fn group_of(&self, column: &str) -> Option<ColumnGroup> {
        for group in [ColumnGroup::Parameter, ColumnGroup::Metric, ColumnGroup::Tag] {
            if self.columns(group).iter().any(|c| c == column) {
                return Some(group);
            }
        }
        None
    }

    /// Write the ledger document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or serialized.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a ledger document from `path`.
    ///
    /// A missing or malformed file yields an empty ledger with a warning;
    /// the decoder then falls back to prefixes and inference.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger file unavailable, decoding without it");
                return Self::default();
            }
        };
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger file malformed, decoding without it");
                Self::default()
            }
        }
    }

    fn group_mut(&mut self, group: ColumnGroup) -> &mut Vec<String> {
        match group {
            ColumnGroup::Parameter => &mut self.parameters,
            ColumnGroup::Metric => &mut self.metrics,
            ColumnGroup::Tag => &mut self.tags,
        }
    }
}
