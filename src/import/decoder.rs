//! Record decoder - one flat row back into typed run data
//!
//! Each column passes through a prioritized chain of resolvers; the first
//! one that recognizes it wins:
//!
//! 1. system columns are never data;
//! 2. a recognized `param:` / `metric:` / `tag:` prefix routes directly;
//! 3. the ledger's group lists cover prefix-less columns from older or
//!    hand-edited tables;
//! 4. shape inference classifies whatever is left, with a warning per
//!    guess so operators can audit it.
//!
//! Inference is a pure function of the cell text: the same value always
//! lands in the same group.

use std::collections::BTreeMap;

use tracing::warn;

use crate::bundle::{is_system_column, ColumnGroup, ColumnLedger, FlatRow};

/// Inferred integer-like values below this magnitude are treated as
/// categorical parameters rather than metrics. An arbitrary boundary: a
/// genuine metric that happens to be a small integer (an epoch count, a
/// class id) will be misfiled as a parameter. Prefixes or a ledger avoid
/// the heuristic entirely.
pub const INFERRED_PARAM_MAX_MAGNITUDE: f64 = 1000.0;

/// One row's recovered parameters, metrics, and tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRun {
    params: BTreeMap<String, String>,
    metrics: BTreeMap<String, f64>,
    tags: BTreeMap<String, String>,
}

impl DecodedRun {
    /// Get the recovered parameters.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Get the recovered metrics.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    /// Get the recovered tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    fn assign(&mut self, group: ColumnGroup, name: String, value: &str) {
        match group {
            ColumnGroup::Parameter => {
                self.params.insert(name, value.to_string());
            }
            ColumnGroup::Tag => {
                self.tags.insert(name, value.to_string());
            }
            ColumnGroup::Metric => match value.parse::<f64>() {
                Ok(parsed) => {
                    self.metrics.insert(name, parsed);
                }
                // Dropped, never defaulted to zero
                Err(_) => warn!(column = %name, value, "metric cell does not parse as a float, dropping"),
            },
        }
    }
}

/// What one resolver decided about a column, if it recognized it.
enum Resolution {
    /// Not run data; contributes nothing to any group.
    Skip,
    /// Route to a group under the given key name.
    Assign(ColumnGroup, String),
}

type Resolver = fn(&str, &str, &ColumnLedger) -> Option<Resolution>;

/// Resolution order per column; first match wins. The inference resolver
/// is total, so every column resolves.
const RESOLVERS: [Resolver; 4] = [
    resolve_system,
    resolve_prefix,
    resolve_ledger,
    resolve_inferred,
];

fn resolve_system(column: &str, _value: &str, _ledger: &ColumnLedger) -> Option<Resolution> {
    is_system_column(column).then_some(Resolution::Skip)
}

fn resolve_prefix(column: &str, _value: &str, _ledger: &ColumnLedger) -> Option<Resolution> {
    for group in [ColumnGroup::Parameter, ColumnGroup::Metric, ColumnGroup::Tag] {
        if let Some(name) = column.strip_prefix(group.prefix()).and_then(|rest| rest.strip_prefix(':')) {
            return Some(Resolution::Assign(group, name.to_string()));
        }
    }
    None
}

fn resolve_ledger(column: &str, _value: &str, ledger: &ColumnLedger) -> Option<Resolution> {
    ledger
        .group_of(column)
        .map(|group| Resolution::Assign(group, column.to_string()))
}

fn resolve_inferred(column: &str, value: &str, _ledger: &ColumnLedger) -> Option<Resolution> {
    let group = match value.parse::<f64>() {
        Ok(parsed) if parsed.fract() == 0.0 && parsed.abs() < INFERRED_PARAM_MAX_MAGNITUDE => {
            warn!(column, value, "inferring column as parameter from integer-like value");
            ColumnGroup::Parameter
        }
        Ok(_) => {
            warn!(column, value, "inferring column as metric from numeric value");
            ColumnGroup::Metric
        }
        Err(_) => {
            warn!(column, value, "inferring column as parameter from non-numeric value");
            ColumnGroup::Parameter
        }
    };
    Some(Resolution::Assign(group, column.to_string()))
}

/// Decode one flat row into its three group mappings.
///
/// The ledger may be empty; prefix routing and inference alone still
/// recover every prefixed or classifiable column. Absent cells never
/// appear in the output.
#[must_use]
pub fn decode_row(row: &FlatRow, ledger: &ColumnLedger) -> DecodedRun {
    let mut decoded = DecodedRun::default();
    for (column, value) in row.cells() {
        if value.is_empty() {
            continue;
        }
        let resolution = RESOLVERS
            .iter()
            .find_map(|resolve| resolve(column, value, ledger));
        match resolution {
            Some(Resolution::Assign(group, name)) => decoded.assign(group, name, value),
            Some(Resolution::Skip) | None => {}
        }
    }
    decoded
}
