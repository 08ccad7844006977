//! Output surfaces: the per-day risk table and the cluster export.
//!
//! Rows are plain serializable records; visualization and privacy analysis
//! are external collaborators that consume these as-is.

use serde::{Deserialize, Serialize};

use crate::codec::MessageKey;

/// One `(day, human)` observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub day: i64,
    pub human: String,
    pub risk: f64,
    /// Ground truth, recorded for evaluation only.
    pub is_infectious: bool,
}

/// Accumulated per-day, per-human risk observations, in replay order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskTable {
    rows: Vec<RiskRow>,
}

impl RiskTable {
    pub(crate) fn record(&mut self, row: RiskRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[RiskRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for a single day, in replay order.
    pub fn day(&self, day: i64) -> impl Iterator<Item = &RiskRow> + '_ {
        self.rows.iter().filter(move |r| r.day == day)
    }
}

/// Exported cluster row for one inferred contact sighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    /// Encoded form of the most recent message that hit this entry.
    pub key: MessageKey,
    pub assignment: u32,
    pub previous_risk: f64,
    pub carry_over_transmission_proba: f64,
}

/// Final cluster table of one human, for offline privacy analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanClusters {
    pub human: String,
    pub clusters: Vec<ClusterRow>,
}
