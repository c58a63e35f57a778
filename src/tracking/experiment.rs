//! Experiment record - named container grouping related runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LifecycleStage;

/// A named container grouping related runs.
///
/// Experiments are soft-deleted: deletion flips the lifecycle stage so a
/// later restore can bring the experiment back with its runs intact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    experiment_id: String,
    name: String,
    created_at: DateTime<Utc>,
    lifecycle_stage: LifecycleStage,
}

impl ExperimentRecord {
    /// Create a new active experiment with the current timestamp.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            lifecycle_stage: LifecycleStage::Active,
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Soft-delete the experiment.
    pub fn delete(&mut self) {
        self.lifecycle_stage = LifecycleStage::Deleted;
    }

    /// Restore a soft-deleted experiment.
    pub fn restore(&mut self) {
        self.lifecycle_stage = LifecycleStage::Active;
    }
}
