//! Remote store contract and the in-process implementation.
//!
//! The hosted document database is an external collaborator; only its
//! contract matters here. [`RemoteStore`] captures it: per-collection
//! query-by-owner with an `updated_after` cursor, single-document writes
//! with partial-merge semantics, and atomic batched writes (the caller
//! chunks to the provider's batch limit).
//!
//! [`MemoryRemote`] implements the contract in process. It backs tests and
//! local development, and enforces the remote side of the protected-entity
//! rule so rejection handling can be exercised.

use cuentas_engine::{
    EntityData, EntityId, EntityKind, Operation, OperationId, Patch, Timestamp,
};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors surfaced by a remote store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network-level failure; nothing was written. Retryable.
    #[error("remote unreachable: {0}")]
    Unavailable(String),

    /// The store refused one specific write (validation, protection).
    /// Retrying without changing the operation will fail again.
    #[error("write rejected for {op_id}: {reason}")]
    Rejected { op_id: OperationId, reason: String },
}

/// Contract of the hosted document store.
///
/// `batch_write` is atomic all-or-nothing within one call; its size is
/// limited by the provider, so callers submit bounded chunks.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn create(&self, owner_id: &str, entity: &EntityData) -> Result<EntityId, RemoteError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &Patch,
        now: Timestamp,
    ) -> Result<(), RemoteError>;

    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        now: Timestamp,
    ) -> Result<(), RemoteError>;

    /// All entities of one kind owned by `owner_id` whose `updated_at`
    /// strictly exceeds `updated_after` (everything when `None`).
    async fn query_by_owner(
        &self,
        kind: EntityKind,
        owner_id: &str,
        updated_after: Option<Timestamp>,
    ) -> Result<Vec<EntityData>, RemoteError>;

    /// Replay a chunk of operations atomically, in order.
    async fn batch_write(&self, owner_id: &str, batch: &[Operation]) -> Result<(), RemoteError>;
}

impl<T: RemoteStore> RemoteStore for &T {
    async fn create(&self, owner_id: &str, entity: &EntityData) -> Result<EntityId, RemoteError> {
        (**self).create(owner_id, entity).await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &Patch,
        now: Timestamp,
    ) -> Result<(), RemoteError> {
        (**self).update(kind, id, patch, now).await
    }

    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        now: Timestamp,
    ) -> Result<(), RemoteError> {
        (**self).soft_delete(kind, id, now).await
    }

    async fn query_by_owner(
        &self,
        kind: EntityKind,
        owner_id: &str,
        updated_after: Option<Timestamp>,
    ) -> Result<Vec<EntityData>, RemoteError> {
        (**self).query_by_owner(kind, owner_id, updated_after).await
    }

    async fn batch_write(&self, owner_id: &str, batch: &[Operation]) -> Result<(), RemoteError> {
        (**self).batch_write(owner_id, batch).await
    }
}

type RecordKey = (EntityKind, EntityId);

/// In-process remote store.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    records: Mutex<HashMap<RecordKey, EntityData>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a record directly, bypassing the contract. Meant
    /// for tests simulating writes from other replicas.
    pub fn insert(&self, entity: EntityData) {
        let mut records = self.records.lock().expect("remote state poisoned");
        records.insert((entity.kind(), entity.id().clone()), entity);
    }

    /// Fetch one record, tombstones included.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<EntityData> {
        let records = self.records.lock().expect("remote state poisoned");
        records.get(&(kind, id.to_string())).cloned()
    }

    /// Count of active (non-deleted) records of one kind.
    pub fn active_count(&self, kind: EntityKind) -> usize {
        let records = self.records.lock().expect("remote state poisoned");
        records
            .values()
            .filter(|e| e.kind() == kind && e.is_active())
            .count()
    }

    /// Count of all records, tombstones included.
    pub fn total_count(&self) -> usize {
        let records = self.records.lock().expect("remote state poisoned");
        records.len()
    }

    fn is_protected(entity: &EntityData) -> bool {
        match entity {
            EntityData::Member(m) => m.protected,
            EntityData::Reason(r) => r.protected,
            EntityData::Entry(_) => false,
        }
    }

    fn apply_op(records: &mut HashMap<RecordKey, EntityData>, op: &Operation) -> Result<(), RemoteError> {
        match op {
            Operation::Create(create) => {
                let key = (create.entity.kind(), create.entity.id().clone());
                // Re-pushed batches whose acknowledgement was lost must
                // converge, not fail: upsert keyed by update timestamp.
                match records.get(&key) {
                    Some(existing)
                        if existing.meta().updated_at > create.entity.meta().updated_at => {}
                    _ => {
                        records.insert(key, create.entity.clone());
                    }
                }
                Ok(())
            }
            Operation::Update(update) => {
                let key = (update.patch.kind(), update.id.clone());
                let existing = records.get_mut(&key).ok_or_else(|| RemoteError::Rejected {
                    op_id: update.op_id.clone(),
                    reason: format!("{} not found: {}", update.patch.kind(), update.id),
                })?;
                if Self::is_protected(existing) {
                    return Err(RemoteError::Rejected {
                        op_id: update.op_id.clone(),
                        reason: format!("{} is protected: {}", update.patch.kind(), update.id),
                    });
                }
                update.patch.apply_to(existing, update.timestamp);
                Ok(())
            }
            Operation::Delete(delete) => {
                let key = (delete.kind, delete.id.clone());
                let existing = records.get_mut(&key).ok_or_else(|| RemoteError::Rejected {
                    op_id: delete.op_id.clone(),
                    reason: format!("{} not found: {}", delete.kind, delete.id),
                })?;
                if Self::is_protected(existing) {
                    return Err(RemoteError::Rejected {
                        op_id: delete.op_id.clone(),
                        reason: format!("{} is protected: {}", delete.kind, delete.id),
                    });
                }
                existing.meta_mut().mark_deleted(delete.timestamp);
                Ok(())
            }
        }
    }
}

impl RemoteStore for MemoryRemote {
    async fn create(&self, _owner_id: &str, entity: &EntityData) -> Result<EntityId, RemoteError> {
        let mut records = self.records.lock().expect("remote state poisoned");
        let id = entity.id().clone();
        records.insert((entity.kind(), id.clone()), entity.clone());
        Ok(id)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: &Patch,
        now: Timestamp,
    ) -> Result<(), RemoteError> {
        let mut records = self.records.lock().expect("remote state poisoned");
        let existing = records
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| RemoteError::Rejected {
                op_id: String::new(),
                reason: format!("{kind} not found: {id}"),
            })?;
        if Self::is_protected(existing) {
            return Err(RemoteError::Rejected {
                op_id: String::new(),
                reason: format!("{kind} is protected: {id}"),
            });
        }
        patch.apply_to(existing, now);
        Ok(())
    }

    async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        now: Timestamp,
    ) -> Result<(), RemoteError> {
        let mut records = self.records.lock().expect("remote state poisoned");
        let existing = records
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| RemoteError::Rejected {
                op_id: String::new(),
                reason: format!("{kind} not found: {id}"),
            })?;
        if Self::is_protected(existing) {
            return Err(RemoteError::Rejected {
                op_id: String::new(),
                reason: format!("{kind} is protected: {id}"),
            });
        }
        existing.meta_mut().mark_deleted(now);
        Ok(())
    }

    async fn query_by_owner(
        &self,
        kind: EntityKind,
        owner_id: &str,
        updated_after: Option<Timestamp>,
    ) -> Result<Vec<EntityData>, RemoteError> {
        let records = self.records.lock().expect("remote state poisoned");
        let mut result: Vec<EntityData> = records
            .values()
            .filter(|e| e.kind() == kind && e.owner_id() == owner_id)
            .filter(|e| updated_after.map_or(true, |w| e.meta().updated_at > w))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            a.meta()
                .updated_at
                .cmp(&b.meta().updated_at)
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(result)
    }

    async fn batch_write(&self, _owner_id: &str, batch: &[Operation]) -> Result<(), RemoteError> {
        let mut records = self.records.lock().expect("remote state poisoned");
        // All-or-nothing: validate and apply against a copy, commit on success.
        let mut staged = records.clone();
        for op in batch {
            Self::apply_op(&mut staged, op)?;
        }
        *records = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuentas_engine::{CreateOp, DeleteOp, Member, MemberPatch, UpdateOp};

    fn member(id: &str, name: &str, protected: bool, now: u64) -> EntityData {
        EntityData::Member(Member::new(id, "owner", name, protected, now))
    }

    fn create_op(op_id: &str, entity: EntityData, now: u64) -> Operation {
        Operation::Create(CreateOp::new(op_id, entity, now))
    }

    #[tokio::test]
    async fn batch_write_is_atomic() {
        let remote = MemoryRemote::new();

        // Second op targets a missing record, so nothing may land.
        let batch = vec![
            create_op("op_1", member("m_1", "ANA", false, 1000), 1000),
            Operation::Delete(DeleteOp::new("op_2", EntityKind::Member, "m_ghost", 2000)),
        ];

        let result = remote.batch_write("owner", &batch).await;
        assert!(matches!(result, Err(RemoteError::Rejected { .. })));
        assert_eq!(remote.total_count(), 0);
    }

    #[tokio::test]
    async fn batch_write_applies_in_order() {
        let remote = MemoryRemote::new();

        let batch = vec![
            create_op("op_1", member("m_1", "ANA", false, 1000), 1000),
            Operation::Update(UpdateOp::new(
                "op_2",
                "m_1",
                Patch::Member(MemberPatch {
                    name: Some("BETO".into()),
                    ..Default::default()
                }),
                2000,
            )),
            Operation::Delete(DeleteOp::new("op_3", EntityKind::Member, "m_1", 3000)),
        ];

        remote.batch_write("owner", &batch).await.unwrap();

        let stored = remote.get(EntityKind::Member, "m_1").unwrap();
        assert!(!stored.is_active());
        assert_eq!(remote.active_count(EntityKind::Member), 0);
    }

    #[tokio::test]
    async fn protected_record_rejects_writes() {
        let remote = MemoryRemote::new();
        remote.insert(member("m_1", "JEFA", true, 1000));

        let update = Operation::Update(UpdateOp::new(
            "op_1",
            "m_1",
            Patch::Member(MemberPatch {
                name: Some("OTRA".into()),
                ..Default::default()
            }),
            2000,
        ));
        let result = remote.batch_write("owner", &[update]).await;
        assert!(matches!(result, Err(RemoteError::Rejected { op_id, .. }) if op_id == "op_1"));

        // Unchanged.
        let stored = remote.get(EntityKind::Member, "m_1").unwrap();
        assert_eq!(stored.meta().updated_at, 1000);
    }

    #[tokio::test]
    async fn repushed_create_converges() {
        let remote = MemoryRemote::new();

        let op = create_op("op_1", member("m_1", "ANA", false, 1000), 1000);
        remote.batch_write("owner", &[op.clone()]).await.unwrap();
        remote.batch_write("owner", &[op]).await.unwrap();

        assert_eq!(remote.total_count(), 1);
    }

    #[tokio::test]
    async fn single_document_update_and_soft_delete() {
        let remote = MemoryRemote::new();
        remote.insert(member("m_1", "ANA", false, 1000));

        remote
            .update(
                EntityKind::Member,
                "m_1",
                &Patch::Member(MemberPatch {
                    name: Some("BETO".into()),
                    ..Default::default()
                }),
                2000,
            )
            .await
            .unwrap();

        let stored = remote.get(EntityKind::Member, "m_1").unwrap();
        assert_eq!(stored.meta().updated_at, 2000);

        remote
            .soft_delete(EntityKind::Member, "m_1", 3000)
            .await
            .unwrap();
        assert_eq!(remote.active_count(EntityKind::Member), 0);
        assert!(remote.get(EntityKind::Member, "m_1").is_some());
    }

    #[tokio::test]
    async fn query_filters_by_watermark() {
        let remote = MemoryRemote::new();
        remote.insert(member("m_1", "ANA", false, 1000));
        remote.insert(member("m_2", "BETO", false, 5000));

        let all = remote
            .query_by_owner(EntityKind::Member, "owner", None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let recent = remote
            .query_by_owner(EntityKind::Member, "owner", Some(1000))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id(), "m_2");

        let other_owner = remote
            .query_by_owner(EntityKind::Member, "somebody_else", None)
            .await
            .unwrap();
        assert!(other_owner.is_empty());
    }
}
