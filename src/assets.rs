//! Per-asset outcomes for container strategies.
//!
//! A document or PDF compresses what it can: every embedded image ends up
//! either recompressed or skipped with a reason, never failing the container.

use serde::{Deserialize, Serialize};

/// What happened to one embedded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Recompressed { original_bytes: u64, compressed_bytes: u64 },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOutcome {
    /// Archive entry name or PDF object reference
    pub name: String,
    #[serde(flatten)]
    pub status: AssetStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub outcomes: Vec<AssetOutcome>,
}

impl AssetSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_recompressed(&mut self, name: impl Into<String>, original_bytes: u64, compressed_bytes: u64) {
        self.outcomes.push(AssetOutcome {
            name: name.into(),
            status: AssetStatus::Recompressed { original_bytes, compressed_bytes },
        });
    }

    pub fn record_skipped(&mut self, name: impl Into<String>, reason: impl ToString) {
        self.outcomes.push(AssetOutcome {
            name: name.into(),
            status: AssetStatus::Skipped { reason: reason.to_string() },
        });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn recompressed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, AssetStatus::Recompressed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.total() - self.recompressed()
    }

    /// "N of M assets recompressed"
    pub fn describe(&self) -> String {
        format!("{} of {} assets recompressed", self.recompressed(), self.total())
    }
}
