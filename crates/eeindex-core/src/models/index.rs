use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// How an upsert treats records whose id already exists in the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Skip records that are already indexed
    #[default]
    InsertOnly,
    /// Replace records that are already indexed
    Overwrite,
}

/// Per-call result of an upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl UpsertOutcome {
    /// Records that changed the index (new rows plus replaced rows)
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

impl AddAssign for UpsertOutcome {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}
