//! Pending operation queue.
//!
//! Every local mutation is recorded here in the exact order performed, so a
//! sync pass can replay it deterministically against the remote store. The
//! queue survives process restarts as part of the store snapshot.

use crate::{
    operation::{Operation, OperationId},
    Timestamp,
};
use serde::{Deserialize, Serialize};

/// A queued operation waiting to be replayed remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOp {
    /// The operation
    pub operation: Operation,
    /// When it was applied locally
    pub enqueued_at: Timestamp,
    /// Remote replay attempts that ended in rejection
    #[serde(default)]
    pub attempts: u32,
}

/// Strictly ordered log of not-yet-synced operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQueue {
    ops: Vec<PendingOp>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation. Ordering is enqueue order, always.
    pub fn enqueue(&mut self, operation: Operation, now: Timestamp) {
        self.ops.push(PendingOp {
            operation,
            enqueued_at: now,
            attempts: 0,
        });
    }

    /// All queued operations, oldest first. Sync drains them in this order.
    pub fn ops(&self) -> &[PendingOp] {
        &self.ops
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Remove exactly the named operations after their remote replay was
    /// durably confirmed. The relative order of the rest is untouched.
    pub fn acknowledge(&mut self, op_ids: &[OperationId]) {
        self.ops.retain(|p| !op_ids.contains(p.operation.op_id()));
    }

    /// Record a rejected replay attempt. Returns the new attempt count, or
    /// `None` if the operation is no longer queued.
    pub fn note_attempt(&mut self, op_id: &str) -> Option<u32> {
        let pending = self
            .ops
            .iter_mut()
            .find(|p| p.operation.op_id().as_str() == op_id)?;
        pending.attempts += 1;
        Some(pending.attempts)
    }

    /// Drop a permanently rejected operation without acknowledging it.
    pub fn discard(&mut self, op_id: &str) -> bool {
        let before = self.ops.len();
        self.ops.retain(|p| p.operation.op_id().as_str() != op_id);
        self.ops.len() < before
    }

    /// Remove every queued operation.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl From<Vec<PendingOp>> for PendingQueue {
    fn from(ops: Vec<PendingOp>) -> Self {
        Self { ops }
    }
}
