//! Merge phase of synchronization.
//!
//! Given entities pulled from the remote store, this module reconciles them
//! into local state deterministically. The strategy is last-write-wins keyed
//! by per-record update timestamps: a pulled entity replaces the local copy
//! unless the local copy is strictly newer. After a completed push the local
//! copy can never be newer than the pulled one, so the comparison is a
//! safety net that also makes merging idempotent.
//!
//! Remote tombstones are stored, not dropped: they must stay observable so a
//! later pull on another replica still sees the deletion. Reads filter them
//! out. [`Store::compact_tombstones`] is the explicit garbage-collection
//! step; the sync engine invokes it with a retention window after every
//! successful pass.

use crate::{
    entity::{Entity, EntityData},
    store::Store,
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// What a merge pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Live remote entities upserted into the store
    pub applied: usize,
    /// Remote tombstones recorded
    pub tombstones: usize,
    /// Pulled entities ignored because the local copy was strictly newer
    pub skipped: usize,
}

impl MergeSummary {
    /// Total number of pulled entities that changed local state.
    pub fn changed(&self) -> usize {
        self.applied + self.tombstones
    }
}

impl Store {
    /// Reconcile pulled remote entities into local state.
    ///
    /// Upserts by identifier, last-write-wins on `updated_at` with the
    /// remote copy winning ties. Running the same merge twice produces the
    /// same state.
    pub fn merge_remote(&mut self, pulled: Vec<EntityData>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for data in pulled {
            let local_updated_at = match &data {
                EntityData::Member(m) => self.members.get(&m.id).map(|x| x.meta.updated_at),
                EntityData::Reason(r) => self.reasons.get(&r.id).map(|x| x.meta.updated_at),
                EntityData::Entry(e) => self.entries.get(&e.id).map(|x| x.meta.updated_at),
            };

            if let Some(local) = local_updated_at {
                if local > data.meta().updated_at {
                    summary.skipped += 1;
                    continue;
                }
            }

            if data.meta().deleted {
                summary.tombstones += 1;
            } else {
                summary.applied += 1;
            }

            match data {
                EntityData::Member(m) => self.members.insert(m),
                EntityData::Reason(r) => self.reasons.insert(r),
                EntityData::Entry(e) => self.entries.insert(e),
            }
        }

        summary
    }

    /// Drop tombstones whose last update is older than `older_than`.
    ///
    /// Returns the number of tombstones removed. Live entities are never
    /// touched.
    pub fn compact_tombstones(&mut self, older_than: Timestamp) -> usize {
        let before =
            self.members.total_len() + self.reasons.total_len() + self.entries.total_len();

        self.members
            .retain(|m| m.is_active() || m.meta().updated_at >= older_than);
        self.reasons
            .retain(|r| r.is_active() || r.meta().updated_at >= older_than);
        self.entries
            .retain(|e| e.is_active() || e.meta().updated_at >= older_than);

        before - (self.members.total_len() + self.reasons.total_len() + self.entries.total_len())
    }
}
