//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory Store and persistent
//! storage. They are designed for deterministic serialization: collections
//! are BTreeMaps so the same state always serializes to the same bytes.

use crate::{
    entity::{Entity, Entry, Member, Reason},
    error::{Error, Result},
    queue::{PendingOp, PendingQueue},
    store::Store,
    EntityId, OwnerId, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the store state.
///
/// This is the primary type for persisting store state to disk: the three
/// entity collections, the pending operation queue, and the last-sync
/// watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Owner the state belongs to
    pub owner_id: OwnerId,
    /// Members by ID, tombstones included
    pub members: BTreeMap<EntityId, Member>,
    /// Reasons by ID, tombstones included
    pub reasons: BTreeMap<EntityId, Reason>,
    /// Entries by ID, tombstones included
    pub entries: BTreeMap<EntityId, Entry>,
    /// Operations pending sync, oldest first
    pub pending_ops: Vec<PendingOp>,
    /// Timestamp of the last successful sync pass
    pub watermark: Option<Timestamp>,
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            owner_id: owner_id.into(),
            members: BTreeMap::new(),
            reasons: BTreeMap::new(),
            entries: BTreeMap::new(),
            pending_ops: Vec::new(),
            watermark: None,
        }
    }

    /// Count total entities across all collections, tombstones included.
    pub fn record_count(&self) -> usize {
        self.members.len() + self.reasons.len() + self.entries.len()
    }

    /// Count active (non-deleted) entities.
    pub fn active_record_count(&self) -> usize {
        self.members.values().filter(|m| m.is_active()).count()
            + self.reasons.values().filter(|r| r.is_active()).count()
            + self.entries.values().filter(|e| e.is_active()).count()
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl Store {
    /// Export the current store state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new(self.owner_id.clone());

        for member in self.members.all() {
            snapshot.members.insert(member.id.clone(), member.clone());
        }
        for reason in self.reasons.all() {
            snapshot.reasons.insert(reason.id.clone(), reason.clone());
        }
        for entry in self.entries.all() {
            snapshot.entries.insert(entry.id.clone(), entry.clone());
        }
        snapshot.pending_ops = self.pending.ops().to_vec();
        snapshot.watermark = self.watermark;

        snapshot
    }

    /// Import state from a snapshot, replacing the current state.
    ///
    /// The snapshot's owner must match the store's owner.
    pub fn import_state(&mut self, snapshot: StoreSnapshot) -> Result<()> {
        if snapshot.owner_id != self.owner_id {
            return Err(Error::InvalidSnapshot(format!(
                "owner mismatch: expected '{}', got '{}'",
                self.owner_id, snapshot.owner_id
            )));
        }

        self.members.clear();
        self.reasons.clear();
        self.entries.clear();

        for (_, member) in snapshot.members {
            self.members.insert(member);
        }
        for (_, reason) in snapshot.reasons {
            self.reasons.insert(reason);
        }
        for (_, entry) in snapshot.entries {
            self.entries.insert(entry);
        }
        self.pending = PendingQueue::from(snapshot.pending_ops);
        self.watermark = snapshot.watermark;

        Ok(())
    }

    /// Get snapshot metadata without a full export.
    pub fn snapshot_metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: SNAPSHOT_FORMAT_VERSION,
            owner_id: self.owner_id.clone(),
            member_count: self.members.total_len(),
            reason_count: self.reasons.total_len(),
            entry_count: self.entries.total_len(),
            pending_count: self.pending.len(),
            watermark: self.watermark,
        }
    }
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub owner_id: OwnerId,
    pub member_count: usize,
    pub reason_count: usize,
    pub entry_count: usize,
    pub pending_count: usize,
    pub watermark: Option<Timestamp>,
}

impl From<&StoreSnapshot> for SnapshotMetadata {
    fn from(snapshot: &StoreSnapshot) -> Self {
        Self {
            format_version: snapshot.format_version,
            owner_id: snapshot.owner_id.clone(),
            member_count: snapshot.members.len(),
            reason_count: snapshot.reasons.len(),
            entry_count: snapshot.entries.len(),
            pending_count: snapshot.pending_ops.len(),
            watermark: snapshot.watermark,
        }
    }
}
