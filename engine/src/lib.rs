//! # Cuentas Engine
//!
//! The deterministic core of an offline-first finance tracker.
//!
//! This crate provides the local state and merge logic for tracking financial
//! movements attributed to members and categorized by reasons. It handles the
//! entity store, optimistic mutations, the pending operation queue, and the
//! merge step of synchronization with guaranteed determinism - the same
//! inputs always produce the same outputs.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: same inputs always produce same outputs; identifiers
//!   and timestamps are supplied by the caller
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! Three entity kinds, each scoped to an owner and carrying creation/update
//! timestamps plus a soft-delete flag (tombstone):
//! - [`Member`] - a person financial entries are attributed to
//! - [`Reason`] - a category for an entry's purpose
//! - [`Entry`] - one dated movement (income, expense, or investment)
//!
//! Members and reasons can be marked *protected*: protected entities reject
//! updates and deletes and survive bulk replace imports.
//!
//! ### Operations
//!
//! Changes are expressed as operations, not direct mutations:
//! - [`CreateOp`] - create a new entity (full payload)
//! - [`UpdateOp`] - partially update an entity via a [`Patch`]
//! - [`DeleteOp`] - soft-delete an entity (tombstone)
//!
//! [`Store::apply`] is the single mutation entry point. It normalizes input
//! (uppercase names, amount sign per movement type), validates invariants
//! (uniqueness, referential integrity, protection), applies the change
//! optimistically, and appends the operation to the pending queue for later
//! replay against a remote store.
//!
//! ### Merge
//!
//! [`Store::merge_remote`] reconciles entities pulled from a remote store
//! into local state using last-write-wins on per-record update timestamps.
//! Tombstones are retained so deletions propagate across replicas, filtered
//! from all reads, and removed by an explicit compaction step.
//!
//! ## Quick Start
//!
//! ```rust
//! use cuentas_engine::{CreateOp, EntityData, Member, Operation, Store};
//!
//! let mut store = Store::new("owner_1");
//!
//! let member = Member::new("m_1", "owner_1", "Ana", false, 1_706_745_600_000);
//! let op = Operation::Create(CreateOp::new("op_1", EntityData::Member(member), 1_706_745_600_000));
//! store.apply(op).unwrap();
//!
//! assert_eq!(store.members().count(), 1);
//! assert_eq!(store.pending_count(), 1);
//! ```
//!
//! ## Persistence
//!
//! Use [`Store::export_state`] and [`Store::import_state`] with
//! [`StoreSnapshot`] for persistence. Snapshots are serializable to JSON with
//! deterministic ordering.

pub mod csv;
pub mod entity;
pub mod error;
pub mod merge;
pub mod operation;
pub mod queue;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use csv::{EntryRow, MemberRow, ReasonRow, CSV_DATE_FORMAT};
pub use entity::{Entity, EntityData, EntityKind, Entry, Member, Meta, MovementType, Reason};
pub use error::{Error, Result, RowError};
pub use merge::MergeSummary;
pub use operation::{
    CreateOp, DeleteOp, EntryPatch, MemberPatch, Operation, OperationId, Patch, ReasonPatch,
    UpdateOp,
};
pub use queue::{PendingOp, PendingQueue};
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{Collection, EntryFilter, ImportBatch, ImportMode, ImportOutcome, Store};

/// Type aliases for clarity
pub type EntityId = String;
pub type OwnerId = String;
pub type Timestamp = u64;

/// Longest accepted free-text description on entries and reasons.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Source of fresh identifiers for bulk operations.
///
/// The engine never mints identifiers itself; callers inject a generator so
/// the engine stays deterministic under test.
pub trait IdGen {
    fn next_id(&mut self) -> EntityId;
}

/// Deterministic identifier source for tests and benchmarks.
#[derive(Debug, Clone)]
pub struct SeqIdGen {
    prefix: String,
    counter: u64,
}

impl SeqIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl IdGen for SeqIdGen {
    fn next_id(&mut self) -> EntityId {
        self.counter += 1;
        format!("{}_{}", self.prefix, self.counter)
    }
}
