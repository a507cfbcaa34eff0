//! Synchronization engine: push, pull, merge.
//!
//! One pass reconciles local optimistic state with the remote store:
//!
//! 1. **Push** - drain the pending queue in FIFO order, one atomic batch
//!    per chunk. Pushing first guarantees the device's own unsynced
//!    mutations cannot be clobbered by a pull that does not know about
//!    them.
//! 2. **Pull** - fetch, per entity kind, everything updated after the
//!    last-sync watermark (everything on first sync).
//! 3. **Merge** - upsert pulled entities into the store (engine-side
//!    last-write-wins), then advance the watermark and compact expired
//!    tombstones.
//!
//! A failed push aborts the pass before pull: pulling against a remote the
//! device could not finish writing would merge stale state over newer
//! local intent. The queue and watermark are left untouched on any
//! failure, so the next pass retries exactly the operations that did not
//! complete.
//!
//! Passes never overlap: the engine holds `&mut Store` for the whole pass
//! and reports [`SyncError::SyncInProgress`] if re-entered while active.

use crate::error::SyncError;
use crate::remote::{RemoteError, RemoteStore};
use cuentas_engine::{
    EntityData, EntityKind, MergeSummary, Operation, OperationId, Store, Timestamp,
};

/// How long tombstones survive after their final update before the
/// post-merge compaction drops them: 30 days.
pub const TOMBSTONE_RETENTION_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Phase of the current (or last) sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Pushing,
    Pulling,
    Merging,
    Failed,
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Operations pushed and acknowledged
    pub pushed: usize,
    /// Operations dropped after exhausting their retry budget
    pub dropped: Vec<OperationId>,
    /// Entities pulled past the watermark
    pub pulled: usize,
    /// What the merge did with the pulled entities
    pub merge: MergeSummary,
    /// The watermark recorded by this pass
    pub watermark: Timestamp,
}

/// The synchronization engine. Owns the remote handle and the pass state;
/// the store is borrowed per pass.
pub struct SyncEngine<R> {
    remote: R,
    batch_limit: usize,
    max_push_attempts: u32,
    state: SyncState,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, batch_limit: usize, max_push_attempts: u32) -> Self {
        Self {
            remote,
            batch_limit: batch_limit.max(1),
            max_push_attempts: max_push_attempts.max(1),
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Run one full sync pass.
    ///
    /// `now` becomes the new watermark if the pass completes; passing the
    /// same `now` twice with no intervening changes leaves the store
    /// byte-identical (sync is idempotent).
    pub async fn sync(&mut self, store: &mut Store, now: Timestamp) -> Result<SyncReport, SyncError> {
        if matches!(
            self.state,
            SyncState::Pushing | SyncState::Pulling | SyncState::Merging
        ) {
            return Err(SyncError::SyncInProgress);
        }

        match self.run_pass(store, now).await {
            Ok(report) => {
                self.state = SyncState::Idle;
                Ok(report)
            }
            Err(e) => {
                self.state = SyncState::Failed;
                Err(e)
            }
        }
    }

    async fn run_pass(&mut self, store: &mut Store, now: Timestamp) -> Result<SyncReport, SyncError> {
        tracing::info!(
            owner = %store.owner_id(),
            pending = store.pending_count(),
            watermark = ?store.watermark(),
            "sync pass started"
        );

        self.state = SyncState::Pushing;
        let (pushed, dropped) = self.push(store).await?;

        self.state = SyncState::Pulling;
        let pulled = self.pull(store).await?;
        let pulled_count = pulled.len();

        self.state = SyncState::Merging;
        let merge = store.merge_remote(pulled);
        store.set_watermark(now);
        let compacted = store.compact_tombstones(now.saturating_sub(TOMBSTONE_RETENTION_MS));

        tracing::info!(
            pushed,
            dropped = dropped.len(),
            pulled = pulled_count,
            applied = merge.applied,
            tombstones = merge.tombstones,
            compacted,
            "sync pass finished"
        );

        Ok(SyncReport {
            pushed,
            dropped,
            pulled: pulled_count,
            merge,
            watermark: now,
        })
    }

    /// Drain the pending queue in order, one atomic chunk at a time.
    async fn push(&mut self, store: &mut Store) -> Result<(usize, Vec<OperationId>), SyncError> {
        let mut pushed = 0;
        let mut dropped = Vec::new();

        while store.pending_count() > 0 {
            let batch: Vec<Operation> = store
                .pending_ops()
                .iter()
                .take(self.batch_limit)
                .map(|p| p.operation.clone())
                .collect();

            match self.remote.batch_write(store.owner_id(), &batch).await {
                Ok(()) => {
                    let op_ids: Vec<OperationId> =
                        batch.iter().map(|op| op.op_id().clone()).collect();
                    store.acknowledge(&op_ids);
                    pushed += op_ids.len();
                }
                Err(RemoteError::Rejected { op_id, reason }) => {
                    match store.note_push_attempt(&op_id) {
                        Some(attempts) if attempts >= self.max_push_attempts => {
                            store.discard_pending(&op_id);
                            tracing::warn!(
                                %op_id,
                                %reason,
                                attempts,
                                "dropping permanently rejected operation"
                            );
                            dropped.push(op_id);
                            // Retry the remaining queue without it.
                            continue;
                        }
                        Some(attempts) => {
                            // Below the retry cap the pass aborts: pushing
                            // the ops queued after the rejected one would
                            // reorder replay.
                            tracing::warn!(
                                %op_id,
                                %reason,
                                attempts,
                                "push rejected, will retry next pass"
                            );
                            return Err(SyncError::RemoteRejected { op_id, reason });
                        }
                        // The rejected id is not ours to manage; abort
                        // rather than spin on an unchangeable batch.
                        None => return Err(SyncError::RemoteRejected { op_id, reason }),
                    }
                }
                Err(RemoteError::Unavailable(message)) => {
                    tracing::warn!(error = %message, "remote unavailable, aborting pass");
                    return Err(SyncError::RemoteUnavailable(message));
                }
            }
        }

        Ok((pushed, dropped))
    }

    /// Fetch, per kind, everything owned by this store past the watermark.
    async fn pull(&mut self, store: &Store) -> Result<Vec<EntityData>, SyncError> {
        let mut pulled = Vec::new();
        for kind in EntityKind::ALL {
            let batch = self
                .remote
                .query_by_owner(kind, store.owner_id(), store.watermark())
                .await
                .map_err(|e| match e {
                    RemoteError::Unavailable(message) => SyncError::RemoteUnavailable(message),
                    RemoteError::Rejected { op_id, reason } => {
                        SyncError::RemoteRejected { op_id, reason }
                    }
                })?;
            pulled.extend(batch);
        }
        Ok(pulled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use cuentas_engine::{CreateOp, EntityData, Member, Operation};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with_members(count: usize) -> Store {
        let mut store = Store::new("owner");
        for i in 0..count {
            store
                .apply(Operation::Create(CreateOp::new(
                    format!("op_{i}"),
                    EntityData::Member(Member::new(
                        format!("m_{i}"),
                        "owner",
                        &format!("N{i}"),
                        false,
                        1000 + i as u64,
                    )),
                    1000 + i as u64,
                )))
                .unwrap();
        }
        store
    }

    /// Counts batch_write calls, delegating to a MemoryRemote.
    struct CountingRemote {
        inner: MemoryRemote,
        batches: AtomicUsize,
    }

    impl CountingRemote {
        fn new() -> Self {
            Self {
                inner: MemoryRemote::new(),
                batches: AtomicUsize::new(0),
            }
        }
    }

    impl RemoteStore for CountingRemote {
        async fn create(
            &self,
            owner_id: &str,
            entity: &EntityData,
        ) -> Result<cuentas_engine::EntityId, RemoteError> {
            self.inner.create(owner_id, entity).await
        }

        async fn update(
            &self,
            kind: EntityKind,
            id: &str,
            patch: &cuentas_engine::Patch,
            now: Timestamp,
        ) -> Result<(), RemoteError> {
            self.inner.update(kind, id, patch, now).await
        }

        async fn soft_delete(
            &self,
            kind: EntityKind,
            id: &str,
            now: Timestamp,
        ) -> Result<(), RemoteError> {
            self.inner.soft_delete(kind, id, now).await
        }

        async fn query_by_owner(
            &self,
            kind: EntityKind,
            owner_id: &str,
            updated_after: Option<Timestamp>,
        ) -> Result<Vec<EntityData>, RemoteError> {
            self.inner.query_by_owner(kind, owner_id, updated_after).await
        }

        async fn batch_write(
            &self,
            owner_id: &str,
            batch: &[Operation],
        ) -> Result<(), RemoteError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.inner.batch_write(owner_id, batch).await
        }
    }

    #[tokio::test]
    async fn push_chunks_to_batch_limit() {
        let mut store = store_with_members(5);
        let mut engine = SyncEngine::new(CountingRemote::new(), 2, 5);

        let report = engine.sync(&mut store, 9000).await.unwrap();

        assert_eq!(report.pushed, 5);
        assert_eq!(engine.remote().batches.load(Ordering::SeqCst), 3);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn successful_pass_advances_watermark() {
        let mut store = store_with_members(1);
        let mut engine = SyncEngine::new(MemoryRemote::new(), 500, 5);

        let report = engine.sync(&mut store, 9000).await.unwrap();

        assert_eq!(report.watermark, 9000);
        assert_eq!(store.watermark(), Some(9000));
        // The echoed pull of our own push merges identically.
        assert_eq!(store.members().count(), 1);
    }

    #[tokio::test]
    async fn empty_queue_still_pulls() {
        let remote = MemoryRemote::new();
        remote.insert(EntityData::Member(Member::new(
            "m_remote",
            "owner",
            "Remota",
            false,
            500,
        )));

        let mut store = Store::new("owner");
        let mut engine = SyncEngine::new(remote, 500, 5);

        let report = engine.sync(&mut store, 9000).await.unwrap();

        assert_eq!(report.pushed, 0);
        assert_eq!(report.pulled, 1);
        assert!(store.member("m_remote").is_some());
    }
}
