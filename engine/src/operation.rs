//! Operation types for expressing changes.
//!
//! Changes are expressed as operations, not direct mutations. This enables
//! offline-first behavior: every applied operation is also queued for later
//! replay against the remote store.

use crate::{
    entity::{canonical, EntityData, EntityKind, Entry, Member, MovementType, Reason},
    EntityId, Timestamp,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier for an operation.
pub type OperationId = String;

/// A create operation, carrying the full entity payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOp {
    /// Operation ID
    pub op_id: OperationId,
    /// The entity to create
    pub entity: EntityData,
    /// Timestamp of operation
    pub timestamp: Timestamp,
}

/// An update operation, carrying only the changed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOp {
    /// Operation ID
    pub op_id: OperationId,
    /// Entity ID to update
    pub id: EntityId,
    /// The partial fields to apply; its variant determines the target kind
    pub patch: Patch,
    /// Timestamp of operation
    pub timestamp: Timestamp,
}

/// A delete operation (soft delete, tombstone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOp {
    /// Operation ID
    pub op_id: OperationId,
    /// Target entity kind
    pub kind: EntityKind,
    /// Entity ID to delete
    pub id: EntityId,
    /// Timestamp of operation
    pub timestamp: Timestamp,
}

/// An operation that can be applied to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Create(CreateOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}

impl Operation {
    /// Get the operation ID.
    pub fn op_id(&self) -> &OperationId {
        match self {
            Operation::Create(op) => &op.op_id,
            Operation::Update(op) => &op.op_id,
            Operation::Delete(op) => &op.op_id,
        }
    }

    /// Get the entity ID this operation targets.
    pub fn entity_id(&self) -> &EntityId {
        match self {
            Operation::Create(op) => op.entity.id(),
            Operation::Update(op) => &op.id,
            Operation::Delete(op) => &op.id,
        }
    }

    /// Get the entity kind this operation targets.
    pub fn kind(&self) -> EntityKind {
        match self {
            Operation::Create(op) => op.entity.kind(),
            Operation::Update(op) => op.patch.kind(),
            Operation::Delete(op) => op.kind,
        }
    }

    /// Get the timestamp of this operation.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Operation::Create(op) => op.timestamp,
            Operation::Update(op) => op.timestamp,
            Operation::Delete(op) => op.timestamp,
        }
    }
}

impl CreateOp {
    pub fn new(op_id: impl Into<OperationId>, entity: EntityData, timestamp: Timestamp) -> Self {
        Self {
            op_id: op_id.into(),
            entity,
            timestamp,
        }
    }
}

impl UpdateOp {
    pub fn new(
        op_id: impl Into<OperationId>,
        id: impl Into<EntityId>,
        patch: Patch,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            op_id: op_id.into(),
            id: id.into(),
            patch,
            timestamp,
        }
    }
}

impl DeleteOp {
    pub fn new(
        op_id: impl Into<OperationId>,
        kind: EntityKind,
        id: impl Into<EntityId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            op_id: op_id.into(),
            kind,
            id: id.into(),
            timestamp,
        }
    }
}

/// Partial fields for an update, one variant per entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Patch {
    Member(MemberPatch),
    Reason(ReasonPatch),
    Entry(EntryPatch),
}

impl Patch {
    pub fn kind(&self) -> EntityKind {
        match self {
            Patch::Member(_) => EntityKind::Member,
            Patch::Reason(_) => EntityKind::Reason,
            Patch::Entry(_) => EntityKind::Entry,
        }
    }

    /// Apply this patch to an entity payload of the matching kind.
    ///
    /// Returns `false` if the payload kind does not match the patch kind,
    /// leaving the payload untouched.
    pub fn apply_to(&self, data: &mut EntityData, now: Timestamp) -> bool {
        match (self, data) {
            (Patch::Member(p), EntityData::Member(m)) => {
                p.apply_to(m, now);
                true
            }
            (Patch::Reason(p), EntityData::Reason(r)) => {
                p.apply_to(r, now);
                true
            }
            (Patch::Entry(p), EntityData::Entry(e)) => {
                p.apply_to(e, now);
                true
            }
            _ => false,
        }
    }
}

/// Changed fields for a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub name: Option<String>,
    pub protected: Option<bool>,
}

impl MemberPatch {
    pub fn apply_to(&self, member: &mut Member, now: Timestamp) {
        if let Some(name) = &self.name {
            member.name = canonical(name);
        }
        if let Some(protected) = self.protected {
            member.protected = protected;
        }
        member.meta.touch(now);
    }
}

/// Changed fields for a reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonPatch {
    pub description: Option<String>,
    pub quick_reason: Option<bool>,
    pub protected: Option<bool>,
}

impl ReasonPatch {
    pub fn apply_to(&self, reason: &mut Reason, now: Timestamp) {
        if let Some(description) = &self.description {
            reason.description = canonical(description);
        }
        if let Some(quick) = self.quick_reason {
            reason.quick_reason = quick;
        }
        if let Some(protected) = self.protected {
            reason.protected = protected;
        }
        reason.meta.touch(now);
    }
}

/// Changed fields for an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub member_id: Option<EntityId>,
    pub reason_id: Option<EntityId>,
    pub movement: Option<MovementType>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

impl EntryPatch {
    pub fn apply_to(&self, entry: &mut Entry, now: Timestamp) {
        if let Some(date) = self.date {
            entry.date = date;
        }
        if let Some(member_id) = &self.member_id {
            entry.member_id = member_id.clone();
        }
        if let Some(reason_id) = &self.reason_id {
            entry.reason_id = reason_id.clone();
        }
        if let Some(movement) = self.movement {
            entry.movement = movement;
        }
        if let Some(amount) = self.amount {
            entry.amount = amount;
        }
        if let Some(description) = &self.description {
            entry.description = description.trim().to_string();
        }
        // The sign invariant must hold after every write path.
        entry.amount = entry.movement.normalize_amount(entry.amount);
        entry.meta.touch(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        Member::new("m_1", "owner", "Ana", false, 1000)
    }

    #[test]
    fn operation_accessors() {
        let create = Operation::Create(CreateOp::new("op_1", EntityData::Member(member()), 1000));
        assert_eq!(create.op_id(), "op_1");
        assert_eq!(create.entity_id(), "m_1");
        assert_eq!(create.kind(), EntityKind::Member);
        assert_eq!(create.timestamp(), 1000);

        let update = Operation::Update(UpdateOp::new(
            "op_2",
            "m_1",
            Patch::Member(MemberPatch {
                name: Some("Beto".into()),
                ..Default::default()
            }),
            2000,
        ));
        assert_eq!(update.kind(), EntityKind::Member);
        assert_eq!(update.entity_id(), "m_1");

        let delete = Operation::Delete(DeleteOp::new("op_3", EntityKind::Entry, "e_1", 3000));
        assert_eq!(delete.kind(), EntityKind::Entry);
    }

    #[test]
    fn member_patch_canonicalizes_name() {
        let mut m = member();
        let patch = MemberPatch {
            name: Some("  beto ".into()),
            protected: None,
        };
        patch.apply_to(&mut m, 2000);
        assert_eq!(m.name, "BETO");
        assert_eq!(m.meta.updated_at, 2000);
        assert_eq!(m.meta.created_at, 1000);
    }

    #[test]
    fn entry_patch_renormalizes_sign() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut entry = Entry::new(
            "e_1",
            "owner",
            date,
            "m_1",
            "r_1",
            MovementType::Income,
            Decimal::from(100),
            "sueldo",
            1000,
        );
        assert_eq!(entry.amount, Decimal::from(100));

        // Flipping the movement alone must flip the sign.
        let patch = EntryPatch {
            movement: Some(MovementType::Expense),
            ..Default::default()
        };
        patch.apply_to(&mut entry, 2000);
        assert_eq!(entry.amount, Decimal::from(-100));

        // A new amount is normalized against the current movement.
        let patch = EntryPatch {
            amount: Some(Decimal::from(250)),
            ..Default::default()
        };
        patch.apply_to(&mut entry, 3000);
        assert_eq!(entry.amount, Decimal::from(-250));
    }

    #[test]
    fn patch_kind_mismatch_is_a_no_op() {
        let mut data = EntityData::Member(member());
        let patch = Patch::Entry(EntryPatch::default());
        assert!(!patch.apply_to(&mut data, 2000));
        assert_eq!(data.meta().updated_at, 1000);
    }

    #[test]
    fn serialization_tagging() {
        let op = Operation::Create(CreateOp::new("op_1", EntityData::Member(member()), 1000));
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"create\""));

        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);

        let op = Operation::Update(UpdateOp::new(
            "op_2",
            "m_1",
            Patch::Member(MemberPatch::default()),
            2000,
        ));
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"update\""));
        assert!(json.contains("\"kind\":\"member\""));

        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);

        let op = Operation::Delete(DeleteOp::new("op_3", EntityKind::Reason, "r_1", 3000));
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"delete\""));

        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);
    }
}
