//! Entity types for the finance-tracking domain.

use crate::{EntityId, OwnerId, Timestamp};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three entity kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Member,
    Reason,
    Entry,
}

impl EntityKind {
    /// All kinds, in the order sync pulls them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Member, EntityKind::Reason, EntityKind::Entry];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Member => write!(f, "member"),
            EntityKind::Reason => write!(f, "reason"),
            EntityKind::Entry => write!(f, "entry"),
        }
    }
}

/// Direction of a financial movement.
///
/// The movement type fully determines the sign of an entry's amount:
/// income is non-negative, expenses and investments are non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    Income,
    Expense,
    Investment,
}

impl MovementType {
    /// Restore the sign invariant for an amount under this movement type.
    pub fn normalize_amount(self, amount: Decimal) -> Decimal {
        match self {
            MovementType::Income => amount.abs(),
            MovementType::Expense | MovementType::Investment => -amount.abs(),
        }
    }

    /// Parse from the serialized form, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("INCOME") {
            Some(MovementType::Income)
        } else if s.eq_ignore_ascii_case("EXPENSE") {
            Some(MovementType::Expense)
        } else if s.eq_ignore_ascii_case("INVESTMENT") {
            Some(MovementType::Investment)
        } else {
            None
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::Income => write!(f, "INCOME"),
            MovementType::Expense => write!(f, "EXPENSE"),
            MovementType::Investment => write!(f, "INVESTMENT"),
        }
    }
}

/// Metadata shared by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// When the entity was first created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the entity was last updated (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// Soft delete flag (tombstone)
    pub deleted: bool,
}

impl Meta {
    /// Metadata for a freshly created entity.
    pub fn new(now: Timestamp) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    /// Bump the update timestamp. Never moves backwards.
    pub fn touch(&mut self, now: Timestamp) {
        self.updated_at = self.updated_at.max(now);
    }

    /// Mark as deleted (tombstone) and bump the update timestamp.
    pub fn mark_deleted(&mut self, now: Timestamp) {
        self.deleted = true;
        self.touch(now);
    }
}

/// Canonical form for names and reason descriptions: trimmed, uppercase.
///
/// Uniqueness checks compare canonical forms, which makes them
/// case-insensitive by construction.
pub(crate) fn canonical(s: &str) -> String {
    s.trim().to_uppercase()
}

/// A person financial entries are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: EntityId,
    pub owner_id: OwnerId,
    /// Display name, canonicalized to uppercase on every write
    pub name: String,
    /// Protected members reject edits and survive replace imports
    pub protected: bool,
    pub meta: Meta,
}

impl Member {
    pub fn new(
        id: impl Into<EntityId>,
        owner_id: impl Into<OwnerId>,
        name: &str,
        protected: bool,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: canonical(name),
            protected,
            meta: Meta::new(now),
        }
    }
}

/// A category for an entry's purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    pub id: EntityId,
    pub owner_id: OwnerId,
    /// Category label, canonicalized to uppercase on every write
    pub description: String,
    /// Surfaced by clients as a shortcut; no invariant impact
    pub quick_reason: bool,
    /// Protected reasons reject edits and survive replace imports
    pub protected: bool,
    pub meta: Meta,
}

impl Reason {
    pub fn new(
        id: impl Into<EntityId>,
        owner_id: impl Into<OwnerId>,
        description: &str,
        quick_reason: bool,
        protected: bool,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            description: canonical(description),
            quick_reason,
            protected,
            meta: Meta::new(now),
        }
    }
}

/// One dated financial movement tied to a member and a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntityId,
    pub owner_id: OwnerId,
    /// Calendar day, no time component
    pub date: NaiveDate,
    pub member_id: EntityId,
    pub reason_id: EntityId,
    pub movement: MovementType,
    /// Signed amount; the sign always agrees with `movement`
    pub amount: Decimal,
    pub description: String,
    pub meta: Meta,
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<EntityId>,
        owner_id: impl Into<OwnerId>,
        date: NaiveDate,
        member_id: impl Into<EntityId>,
        reason_id: impl Into<EntityId>,
        movement: MovementType,
        amount: Decimal,
        description: &str,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            date,
            member_id: member_id.into(),
            reason_id: reason_id.into(),
            movement,
            amount: movement.normalize_amount(amount),
            description: description.trim().to_string(),
            meta: Meta::new(now),
        }
    }
}

/// Common surface over the three entity kinds.
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> &EntityId;
    fn meta(&self) -> &Meta;
    fn meta_mut(&mut self) -> &mut Meta;

    /// Protected entities reject edits; only members and reasons can be.
    fn protected(&self) -> bool {
        false
    }

    /// Check if the entity is active (not a tombstone).
    fn is_active(&self) -> bool {
        !self.meta().deleted
    }
}

impl Entity for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

impl Entity for Reason {
    const KIND: EntityKind = EntityKind::Reason;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn protected(&self) -> bool {
        self.protected
    }
}

impl Entity for Entry {
    const KIND: EntityKind = EntityKind::Entry;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }
}

/// A full entity payload of any kind, as carried by create operations and
/// pulled from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityData {
    Member(Member),
    Reason(Reason),
    Entry(Entry),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Member(_) => EntityKind::Member,
            EntityData::Reason(_) => EntityKind::Reason,
            EntityData::Entry(_) => EntityKind::Entry,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            EntityData::Member(m) => &m.id,
            EntityData::Reason(r) => &r.id,
            EntityData::Entry(e) => &e.id,
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        match self {
            EntityData::Member(m) => &m.owner_id,
            EntityData::Reason(r) => &r.owner_id,
            EntityData::Entry(e) => &e.owner_id,
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            EntityData::Member(m) => &m.meta,
            EntityData::Reason(r) => &r.meta,
            EntityData::Entry(e) => &e.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            EntityData::Member(m) => &mut m.meta,
            EntityData::Reason(r) => &mut r.meta,
            EntityData::Entry(e) => &mut e.meta,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.meta().deleted
    }
}
