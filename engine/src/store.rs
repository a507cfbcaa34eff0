//! Store - the in-memory state container and mutation entry point.
//!
//! The Store holds the three entity collections, the pending operation queue,
//! and the last-sync watermark. [`Store::apply`] is the only way entities are
//! created, modified, or removed: it normalizes input, enforces the domain
//! invariants, applies the change optimistically, and queues the operation
//! for later replay against the remote store.

use crate::{
    csv::{EntryRow, MemberRow, ReasonRow},
    entity::{canonical, Entity, EntityData, EntityKind, Entry, Member, Meta, MovementType, Reason},
    error::{Error, Result, RowError},
    operation::{CreateOp, DeleteOp, Operation, OperationId, Patch},
    queue::{PendingOp, PendingQueue},
    EntityId, IdGen, OwnerId, Timestamp, MAX_DESCRIPTION_LEN,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A collection of entities of one kind, keyed by identifier.
///
/// Tombstones (soft-deleted entities) stay in the collection so deletions can
/// propagate through sync; every read path filters them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    records: HashMap<EntityId, T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entity by ID, including tombstones.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.get(id)
    }

    /// Get an active entity by ID.
    pub fn get_active(&self, id: &str) -> Option<&T> {
        self.records.get(id).filter(|r| r.is_active())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.records.get_mut(id)
    }

    /// Insert or replace an entity.
    pub fn insert(&mut self, entity: T) {
        self.records.insert(entity.id().clone(), entity);
    }

    /// Check if an entity exists (including tombstones).
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// All active (non-deleted) entities.
    pub fn active(&self) -> impl Iterator<Item = &T> {
        self.records.values().filter(|r| r.is_active())
    }

    /// All entities including tombstones.
    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }

    /// Count of active entities.
    pub fn len(&self) -> usize {
        self.active().count()
    }

    /// Count of all entities including tombstones.
    pub fn total_len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        self.records.retain(|_, v| keep(v));
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}

/// The main store holding all local state for one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub(crate) owner_id: OwnerId,
    pub(crate) members: Collection<Member>,
    pub(crate) reasons: Collection<Reason>,
    pub(crate) entries: Collection<Entry>,
    pub(crate) pending: PendingQueue,
    /// Timestamp of the last successful sync pass; scopes delta pulls
    pub(crate) watermark: Option<Timestamp>,
}

impl Store {
    /// Create an empty store scoped to one owner.
    pub fn new(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            members: Collection::new(),
            reasons: Collection::new(),
            entries: Collection::new(),
            pending: PendingQueue::new(),
            watermark: None,
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn watermark(&self) -> Option<Timestamp> {
        self.watermark
    }

    /// Advance the last-sync watermark. Called by the sync engine only after
    /// a merge completed successfully.
    pub fn set_watermark(&mut self, now: Timestamp) {
        self.watermark = Some(now);
    }

    // ------------------------------------------------------------------
    // Mutation API
    // ------------------------------------------------------------------

    /// Apply an operation to the store.
    ///
    /// Normalizes the payload (uppercase names, amount sign), validates the
    /// domain invariants, applies the change optimistically, and appends the
    /// normalized operation to the pending queue.
    pub fn apply(&mut self, mut op: Operation) -> Result<()> {
        match &mut op {
            Operation::Create(create) => {
                let timestamp = create.timestamp;
                self.apply_create(&mut create.entity, timestamp)?;
            }
            Operation::Update(update) => {
                let timestamp = update.timestamp;
                let id = update.id.clone();
                self.apply_update(&id, &mut update.patch, timestamp)?;
            }
            Operation::Delete(delete) => {
                let id = delete.id.clone();
                self.apply_delete(delete.kind, &id, delete.timestamp)?;
            }
        }

        let now = op.timestamp();
        self.pending.enqueue(op, now);
        Ok(())
    }

    fn apply_create(&mut self, entity: &mut EntityData, now: Timestamp) -> Result<()> {
        if entity.owner_id() != &self.owner_id {
            return Err(Error::Validation(format!(
                "entity owner '{}' does not match store owner '{}'",
                entity.owner_id(),
                self.owner_id
            )));
        }

        match entity {
            EntityData::Member(member) => {
                member.name = canonical(&member.name);
                if member.name.is_empty() {
                    return Err(Error::Validation("member name must not be empty".into()));
                }
                if self.members.contains(&member.id) {
                    return Err(Error::EntityAlreadyExists {
                        kind: EntityKind::Member,
                        id: member.id.clone(),
                    });
                }
                if self.members.active().any(|m| m.name == member.name) {
                    return Err(Error::DuplicateName {
                        kind: EntityKind::Member,
                        name: member.name.clone(),
                    });
                }
                member.meta = Meta::new(now);
                self.members.insert(member.clone());
            }
            EntityData::Reason(reason) => {
                reason.description = canonical(&reason.description);
                if reason.description.is_empty() {
                    return Err(Error::Validation(
                        "reason description must not be empty".into(),
                    ));
                }
                if reason.description.chars().count() > MAX_DESCRIPTION_LEN {
                    return Err(Error::Validation(format!(
                        "reason description longer than {MAX_DESCRIPTION_LEN} characters"
                    )));
                }
                if self.reasons.contains(&reason.id) {
                    return Err(Error::EntityAlreadyExists {
                        kind: EntityKind::Reason,
                        id: reason.id.clone(),
                    });
                }
                if self
                    .reasons
                    .active()
                    .any(|r| r.description == reason.description)
                {
                    return Err(Error::DuplicateName {
                        kind: EntityKind::Reason,
                        name: reason.description.clone(),
                    });
                }
                reason.meta = Meta::new(now);
                self.reasons.insert(reason.clone());
            }
            EntityData::Entry(entry) => {
                entry.description = entry.description.trim().to_string();
                if entry.description.chars().count() > MAX_DESCRIPTION_LEN {
                    return Err(Error::Validation(format!(
                        "entry description longer than {MAX_DESCRIPTION_LEN} characters"
                    )));
                }
                if self.members.get_active(&entry.member_id).is_none() {
                    return Err(Error::EntityNotFound {
                        kind: EntityKind::Member,
                        id: entry.member_id.clone(),
                    });
                }
                if self.reasons.get_active(&entry.reason_id).is_none() {
                    return Err(Error::EntityNotFound {
                        kind: EntityKind::Reason,
                        id: entry.reason_id.clone(),
                    });
                }
                if self.entries.contains(&entry.id) {
                    return Err(Error::EntityAlreadyExists {
                        kind: EntityKind::Entry,
                        id: entry.id.clone(),
                    });
                }
                entry.amount = entry.movement.normalize_amount(entry.amount);
                entry.meta = Meta::new(now);
                self.entries.insert(entry.clone());
            }
        }

        Ok(())
    }

    fn apply_update(&mut self, id: &EntityId, patch: &mut Patch, now: Timestamp) -> Result<()> {
        match patch {
            Patch::Member(p) => {
                if let Some(name) = &mut p.name {
                    *name = canonical(name);
                    if name.is_empty() {
                        return Err(Error::Validation("member name must not be empty".into()));
                    }
                }
                {
                    let member = self.members.get(id).ok_or_else(|| Error::EntityNotFound {
                        kind: EntityKind::Member,
                        id: id.clone(),
                    })?;
                    if member.meta.deleted {
                        return Err(Error::EntityDeleted {
                            kind: EntityKind::Member,
                            id: id.clone(),
                        });
                    }
                    if member.protected {
                        return Err(Error::Protected {
                            kind: EntityKind::Member,
                            id: id.clone(),
                        });
                    }
                }
                if let Some(name) = &p.name {
                    if self.members.active().any(|m| m.id != *id && m.name == *name) {
                        return Err(Error::DuplicateName {
                            kind: EntityKind::Member,
                            name: name.clone(),
                        });
                    }
                }
                let member = self.members.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind: EntityKind::Member,
                    id: id.clone(),
                })?;
                p.apply_to(member, now);
            }
            Patch::Reason(p) => {
                if let Some(description) = &mut p.description {
                    *description = canonical(description);
                    if description.is_empty() {
                        return Err(Error::Validation(
                            "reason description must not be empty".into(),
                        ));
                    }
                    if description.chars().count() > MAX_DESCRIPTION_LEN {
                        return Err(Error::Validation(format!(
                            "reason description longer than {MAX_DESCRIPTION_LEN} characters"
                        )));
                    }
                }
                {
                    let reason = self.reasons.get(id).ok_or_else(|| Error::EntityNotFound {
                        kind: EntityKind::Reason,
                        id: id.clone(),
                    })?;
                    if reason.meta.deleted {
                        return Err(Error::EntityDeleted {
                            kind: EntityKind::Reason,
                            id: id.clone(),
                        });
                    }
                    if reason.protected {
                        return Err(Error::Protected {
                            kind: EntityKind::Reason,
                            id: id.clone(),
                        });
                    }
                }
                if let Some(description) = &p.description {
                    if self
                        .reasons
                        .active()
                        .any(|r| r.id != *id && r.description == *description)
                    {
                        return Err(Error::DuplicateName {
                            kind: EntityKind::Reason,
                            name: description.clone(),
                        });
                    }
                }
                let reason = self.reasons.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind: EntityKind::Reason,
                    id: id.clone(),
                })?;
                p.apply_to(reason, now);
            }
            Patch::Entry(p) => {
                if let Some(description) = &p.description {
                    if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
                        return Err(Error::Validation(format!(
                            "entry description longer than {MAX_DESCRIPTION_LEN} characters"
                        )));
                    }
                }
                if let Some(member_id) = &p.member_id {
                    if self.members.get_active(member_id).is_none() {
                        return Err(Error::EntityNotFound {
                            kind: EntityKind::Member,
                            id: member_id.clone(),
                        });
                    }
                }
                if let Some(reason_id) = &p.reason_id {
                    if self.reasons.get_active(reason_id).is_none() {
                        return Err(Error::EntityNotFound {
                            kind: EntityKind::Reason,
                            id: reason_id.clone(),
                        });
                    }
                }
                {
                    let entry = self.entries.get(id).ok_or_else(|| Error::EntityNotFound {
                        kind: EntityKind::Entry,
                        id: id.clone(),
                    })?;
                    if entry.meta.deleted {
                        return Err(Error::EntityDeleted {
                            kind: EntityKind::Entry,
                            id: id.clone(),
                        });
                    }
                }
                let entry = self.entries.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind: EntityKind::Entry,
                    id: id.clone(),
                })?;
                p.apply_to(entry, now);
            }
        }

        Ok(())
    }

    fn apply_delete(&mut self, kind: EntityKind, id: &EntityId, now: Timestamp) -> Result<()> {
        match kind {
            EntityKind::Member => {
                {
                    let member = self.members.get(id).ok_or_else(|| Error::EntityNotFound {
                        kind,
                        id: id.clone(),
                    })?;
                    if member.meta.deleted {
                        return Err(Error::EntityDeleted {
                            kind,
                            id: id.clone(),
                        });
                    }
                    if member.protected {
                        return Err(Error::Protected {
                            kind,
                            id: id.clone(),
                        });
                    }
                }
                let count = self
                    .entries
                    .active()
                    .filter(|e| e.member_id == *id)
                    .count();
                if count > 0 {
                    return Err(Error::ReferencedByEntries {
                        kind,
                        id: id.clone(),
                        count,
                    });
                }
                let member = self.members.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind,
                    id: id.clone(),
                })?;
                member.meta.mark_deleted(now);
            }
            EntityKind::Reason => {
                {
                    let reason = self.reasons.get(id).ok_or_else(|| Error::EntityNotFound {
                        kind,
                        id: id.clone(),
                    })?;
                    if reason.meta.deleted {
                        return Err(Error::EntityDeleted {
                            kind,
                            id: id.clone(),
                        });
                    }
                    if reason.protected {
                        return Err(Error::Protected {
                            kind,
                            id: id.clone(),
                        });
                    }
                }
                let count = self
                    .entries
                    .active()
                    .filter(|e| e.reason_id == *id)
                    .count();
                if count > 0 {
                    return Err(Error::ReferencedByEntries {
                        kind,
                        id: id.clone(),
                        count,
                    });
                }
                let reason = self.reasons.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind,
                    id: id.clone(),
                })?;
                reason.meta.mark_deleted(now);
            }
            EntityKind::Entry => {
                let entry = self.entries.get_mut(id).ok_or_else(|| Error::EntityNotFound {
                    kind,
                    id: id.clone(),
                })?;
                if entry.meta.deleted {
                    return Err(Error::EntityDeleted {
                        kind,
                        id: id.clone(),
                    });
                }
                entry.meta.mark_deleted(now);
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Get an active member by ID.
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.get_active(id)
    }

    /// Get a member including tombstones.
    pub fn member_any(&self, id: &str) -> Option<&Member> {
        self.members.get(id)
    }

    /// All active members.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.active()
    }

    /// Get an active reason by ID.
    pub fn reason(&self, id: &str) -> Option<&Reason> {
        self.reasons.get_active(id)
    }

    /// Get a reason including tombstones.
    pub fn reason_any(&self, id: &str) -> Option<&Reason> {
        self.reasons.get(id)
    }

    /// All active reasons.
    pub fn reasons(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.active()
    }

    /// Get an active entry by ID.
    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.get_active(id)
    }

    /// Get an entry including tombstones.
    pub fn entry_any(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// All active entries.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.active()
    }

    /// Case-insensitive lookup of an active member by name.
    pub fn find_member_by_name(&self, name: &str) -> Option<&Member> {
        let key = canonical(name);
        self.members.active().find(|m| m.name == key)
    }

    /// Case-insensitive lookup of an active reason by description.
    pub fn find_reason_by_description(&self, description: &str) -> Option<&Reason> {
        let key = canonical(description);
        self.reasons.active().find(|r| r.description == key)
    }

    /// Derived index: every calendar day carrying at least one active entry.
    pub fn entry_dates(&self) -> BTreeSet<NaiveDate> {
        self.entries.active().map(|e| e.date).collect()
    }

    /// Query active entries with filtering and pagination.
    ///
    /// Results are ordered newest date first; ties break on creation time,
    /// then ID, so pagination is deterministic.
    pub fn query_entries(&self, filter: &EntryFilter) -> Vec<&Entry> {
        let mut rows: Vec<&Entry> = self
            .entries
            .active()
            .filter(|e| filter.matches(e))
            .collect();

        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.meta.created_at.cmp(&a.meta.created_at))
                .then(a.id.cmp(&b.id))
        });

        let rows = rows.into_iter().skip(filter.offset);
        match filter.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }

    // ------------------------------------------------------------------
    // Pending queue access
    // ------------------------------------------------------------------

    /// All queued operations, oldest first.
    pub fn pending_ops(&self) -> &[PendingOp] {
        self.pending.ops()
    }

    /// Count of queued operations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Acknowledge operations whose remote replay was durably confirmed.
    pub fn acknowledge(&mut self, op_ids: &[OperationId]) {
        self.pending.acknowledge(op_ids);
    }

    /// Record a rejected replay attempt for a queued operation.
    pub fn note_push_attempt(&mut self, op_id: &str) -> Option<u32> {
        self.pending.note_attempt(op_id)
    }

    /// Drop a permanently rejected operation from the queue.
    pub fn discard_pending(&mut self, op_id: &str) -> bool {
        self.pending.discard(op_id)
    }

    /// Remove every queued operation.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    // ------------------------------------------------------------------
    // Bulk import
    // ------------------------------------------------------------------

    /// Bulk-import one kind of entity.
    ///
    /// The import is staged on a clone of the store and committed only if
    /// every operation succeeds, so a failed import leaves no partial state.
    /// Every create and delete performed by the import is queued for sync
    /// like any other mutation.
    pub fn import(
        &mut self,
        batch: ImportBatch,
        mode: ImportMode,
        now: Timestamp,
        ids: &mut dyn IdGen,
    ) -> Result<ImportOutcome> {
        let mut staged = self.clone();
        let outcome = match batch {
            ImportBatch::Members(rows) => staged.import_members(rows, mode, now, ids)?,
            ImportBatch::Reasons(rows) => staged.import_reasons(rows, mode, now, ids)?,
            ImportBatch::Entries(rows) => staged.import_entries(rows, mode, now, ids)?,
        };
        *self = staged;
        Ok(outcome)
    }

    fn import_members(
        &mut self,
        rows: Vec<MemberRow>,
        mode: ImportMode,
        now: Timestamp,
        ids: &mut dyn IdGen,
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();

        if mode == ImportMode::Replace {
            let victims: Vec<EntityId> = self
                .members
                .active()
                .filter(|m| !m.protected)
                .map(|m| m.id.clone())
                .collect();
            for id in victims {
                self.apply(Operation::Delete(DeleteOp::new(
                    ids.next_id(),
                    EntityKind::Member,
                    id,
                    now,
                )))?;
                outcome.removed += 1;
            }
        }

        for row in rows {
            let name = canonical(&row.name);
            if self.members.active().any(|m| m.name == name) {
                outcome.skipped += 1;
                continue;
            }
            let member = Member::new(
                ids.next_id(),
                self.owner_id.clone(),
                &name,
                row.protected,
                now,
            );
            self.apply(Operation::Create(CreateOp::new(
                ids.next_id(),
                EntityData::Member(member),
                now,
            )))?;
            outcome.created += 1;
        }

        Ok(outcome)
    }

    fn import_reasons(
        &mut self,
        rows: Vec<ReasonRow>,
        mode: ImportMode,
        now: Timestamp,
        ids: &mut dyn IdGen,
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();

        if mode == ImportMode::Replace {
            let victims: Vec<EntityId> = self
                .reasons
                .active()
                .filter(|r| !r.protected)
                .map(|r| r.id.clone())
                .collect();
            for id in victims {
                self.apply(Operation::Delete(DeleteOp::new(
                    ids.next_id(),
                    EntityKind::Reason,
                    id,
                    now,
                )))?;
                outcome.removed += 1;
            }
        }

        for row in rows {
            let description = canonical(&row.description);
            if self
                .reasons
                .active()
                .any(|r| r.description == description)
            {
                outcome.skipped += 1;
                continue;
            }
            let reason = Reason::new(
                ids.next_id(),
                self.owner_id.clone(),
                &description,
                row.quick_reason,
                row.protected,
                now,
            );
            self.apply(Operation::Create(CreateOp::new(
                ids.next_id(),
                EntityData::Reason(reason),
                now,
            )))?;
            outcome.created += 1;
        }

        Ok(outcome)
    }

    fn import_entries(
        &mut self,
        rows: Vec<EntryRow>,
        mode: ImportMode,
        now: Timestamp,
        ids: &mut dyn IdGen,
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();

        // Resolve every row before touching state; all problems are
        // collected and reported together.
        let mut errors = Vec::new();
        let mut resolved = Vec::new();
        for row in rows {
            let member_id = self
                .find_member_by_name(&row.member_name)
                .map(|m| m.id.clone());
            let reason_id = self
                .find_reason_by_description(&row.reason_description)
                .map(|r| r.id.clone());

            if member_id.is_none() {
                errors.push(RowError::new(
                    row.line,
                    format!("unknown member: {}", row.member_name),
                ));
            }
            if reason_id.is_none() {
                errors.push(RowError::new(
                    row.line,
                    format!("unknown reason: {}", row.reason_description),
                ));
            }
            if row.description.trim().chars().count() > MAX_DESCRIPTION_LEN {
                errors.push(RowError::new(
                    row.line,
                    format!("description longer than {MAX_DESCRIPTION_LEN} characters"),
                ));
                continue;
            }

            if let (Some(member_id), Some(reason_id)) = (member_id, reason_id) {
                resolved.push((row, member_id, reason_id));
            }
        }
        if !errors.is_empty() {
            return Err(Error::ImportParse(errors));
        }

        if mode == ImportMode::Replace {
            let victims: Vec<EntityId> = self.entries.active().map(|e| e.id.clone()).collect();
            for id in victims {
                self.apply(Operation::Delete(DeleteOp::new(
                    ids.next_id(),
                    EntityKind::Entry,
                    id,
                    now,
                )))?;
                outcome.removed += 1;
            }
        }

        for (row, member_id, reason_id) in resolved {
            let entry = Entry::new(
                ids.next_id(),
                self.owner_id.clone(),
                row.date,
                member_id,
                reason_id,
                row.movement,
                row.amount,
                &row.description,
                now,
            );
            self.apply(Operation::Create(CreateOp::new(
                ids.next_id(),
                EntityData::Entry(entry),
                now,
            )))?;
            outcome.created += 1;
        }

        Ok(outcome)
    }
}

/// How a bulk import treats existing entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Create what is new; silently skip unique-key duplicates.
    Add,
    /// Soft-delete every non-protected entity of the kind, then create the
    /// imported set. Protected entities survive untouched.
    Replace,
}

/// A bulk-import input, one entity kind at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportBatch {
    Members(Vec<MemberRow>),
    Reasons(Vec<ReasonRow>),
    Entries(Vec<EntryRow>),
}

/// What a bulk import actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// Entities created
    pub created: usize,
    /// Rows skipped as unique-key duplicates
    pub skipped: usize,
    /// Existing entities soft-deleted by replace mode
    pub removed: usize,
}

/// Filter and pagination for browsing entries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    member_id: Option<EntityId>,
    reason_id: Option<EntityId>,
    movement: Option<MovementType>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    text: Option<String>,
    offset: usize,
    limit: Option<usize>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only entries attributed to this member.
    pub fn for_member(mut self, id: impl Into<EntityId>) -> Self {
        self.member_id = Some(id.into());
        self
    }

    /// Only entries categorized by this reason.
    pub fn for_reason(mut self, id: impl Into<EntityId>) -> Self {
        self.reason_id = Some(id.into());
        self
    }

    pub fn with_movement(mut self, movement: MovementType) -> Self {
        self.movement = Some(movement);
        self
    }

    /// Inclusive lower bound on the entry date.
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self
    }

    /// Inclusive upper bound on the entry date.
    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.to = Some(date);
        self
    }

    /// Case-insensitive fragment of the description.
    pub fn matching(mut self, text: &str) -> Self {
        self.text = Some(text.trim().to_uppercase());
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &Entry) -> bool {
        if let Some(member_id) = &self.member_id {
            if entry.member_id != *member_id {
                return false;
            }
        }
        if let Some(reason_id) = &self.reason_id {
            if entry.reason_id != *reason_id {
                return false;
            }
        }
        if let Some(movement) = self.movement {
            if entry.movement != movement {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.date > to {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if !entry.description.to_uppercase().contains(text.as_str()) {
                return false;
            }
        }
        true
    }
}
