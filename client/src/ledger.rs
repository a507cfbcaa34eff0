//! Ledger - the application facade over store, persistence, and sync.
//!
//! This is the surface the UI layer consumes. The ledger is the only place
//! identifiers and wall-clock timestamps are minted; every mutation goes
//! through the engine's mutation API and is persisted immediately, so a
//! crash between user actions never loses accepted work.

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::persist::FileStorage;
use crate::remote::RemoteStore;
use crate::sync::{SyncEngine, SyncReport};
use chrono::{NaiveDate, Utc};
use cuentas_engine::{
    CreateOp, DeleteOp, EntityData, EntityId, EntityKind, Entry, EntryFilter, EntryPatch, IdGen,
    ImportMode, ImportOutcome, Member, MemberPatch, MovementType, Operation, Patch, Reason,
    ReasonPatch, Store, Timestamp, UpdateOp,
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use uuid::Uuid;

/// UUID v4 identifier source.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGen;

impl IdGen for UuidGen {
    fn next_id(&mut self) -> EntityId {
        Uuid::new_v4().to_string()
    }
}

/// The application facade: local store + persistence + sync engine.
pub struct Ledger<R> {
    config: Config,
    store: Store,
    storage: FileStorage,
    engine: SyncEngine<R>,
}

impl<R: RemoteStore> Ledger<R> {
    /// Open the ledger: load persisted state (or start empty) and wire the
    /// sync engine to the given remote.
    pub fn open(config: Config, remote: R) -> Result<Self> {
        let storage = FileStorage::new(&config.data_dir)?;
        let store = storage.load_store(&config.owner_id);
        let engine = SyncEngine::new(remote, config.batch_limit, config.max_push_attempts);

        tracing::debug!(
            owner = %config.owner_id,
            members = store.members().count(),
            reasons = store.reasons().count(),
            entries = store.entries().count(),
            pending = store.pending_count(),
            "ledger opened"
        );

        Ok(Self {
            config,
            store,
            storage,
            engine,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn now() -> Timestamp {
        Utc::now().timestamp_millis().max(0) as Timestamp
    }

    fn new_id() -> EntityId {
        Uuid::new_v4().to_string()
    }

    fn persist(&self) -> Result<()> {
        self.storage.save_store(&self.store)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_member(&mut self, name: &str, protected: bool) -> Result<EntityId> {
        let now = Self::now();
        let id = Self::new_id();
        let member = Member::new(
            id.clone(),
            self.config.owner_id.clone(),
            name,
            protected,
            now,
        );
        self.store.apply(Operation::Create(CreateOp::new(
            Self::new_id(),
            EntityData::Member(member),
            now,
        )))?;
        self.persist()?;
        Ok(id)
    }

    pub fn add_reason(
        &mut self,
        description: &str,
        quick_reason: bool,
        protected: bool,
    ) -> Result<EntityId> {
        let now = Self::now();
        let id = Self::new_id();
        let reason = Reason::new(
            id.clone(),
            self.config.owner_id.clone(),
            description,
            quick_reason,
            protected,
            now,
        );
        self.store.apply(Operation::Create(CreateOp::new(
            Self::new_id(),
            EntityData::Reason(reason),
            now,
        )))?;
        self.persist()?;
        Ok(id)
    }

    pub fn add_entry(
        &mut self,
        date: NaiveDate,
        member_id: &str,
        reason_id: &str,
        movement: MovementType,
        amount: Decimal,
        description: &str,
    ) -> Result<EntityId> {
        let now = Self::now();
        let id = Self::new_id();
        let entry = Entry::new(
            id.clone(),
            self.config.owner_id.clone(),
            date,
            member_id,
            reason_id,
            movement,
            amount,
            description,
            now,
        );
        self.store.apply(Operation::Create(CreateOp::new(
            Self::new_id(),
            EntityData::Entry(entry),
            now,
        )))?;
        self.persist()?;
        Ok(id)
    }

    pub fn update_member(&mut self, id: &str, patch: MemberPatch) -> Result<()> {
        self.update(id, Patch::Member(patch))
    }

    pub fn update_reason(&mut self, id: &str, patch: ReasonPatch) -> Result<()> {
        self.update(id, Patch::Reason(patch))
    }

    pub fn update_entry(&mut self, id: &str, patch: EntryPatch) -> Result<()> {
        self.update(id, Patch::Entry(patch))
    }

    fn update(&mut self, id: &str, patch: Patch) -> Result<()> {
        self.store.apply(Operation::Update(UpdateOp::new(
            Self::new_id(),
            id,
            patch,
            Self::now(),
        )))?;
        self.persist()
    }

    pub fn delete_member(&mut self, id: &str) -> Result<()> {
        self.delete(EntityKind::Member, id)
    }

    pub fn delete_reason(&mut self, id: &str) -> Result<()> {
        self.delete(EntityKind::Reason, id)
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<()> {
        self.delete(EntityKind::Entry, id)
    }

    fn delete(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.store.apply(Operation::Delete(DeleteOp::new(
            Self::new_id(),
            kind,
            id,
            Self::now(),
        )))?;
        self.persist()
    }

    // ------------------------------------------------------------------
    // Bulk import / export
    // ------------------------------------------------------------------

    pub fn import_members_csv(&mut self, text: &str, mode: ImportMode) -> Result<ImportOutcome> {
        let mut ids = UuidGen;
        let outcome = self
            .store
            .import_members_csv(text, mode, Self::now(), &mut ids)?;
        self.persist()?;
        Ok(outcome)
    }

    pub fn import_reasons_csv(&mut self, text: &str, mode: ImportMode) -> Result<ImportOutcome> {
        let mut ids = UuidGen;
        let outcome = self
            .store
            .import_reasons_csv(text, mode, Self::now(), &mut ids)?;
        self.persist()?;
        Ok(outcome)
    }

    pub fn import_entries_csv(&mut self, text: &str, mode: ImportMode) -> Result<ImportOutcome> {
        let mut ids = UuidGen;
        let outcome = self
            .store
            .import_entries_csv(text, mode, Self::now(), &mut ids)?;
        self.persist()?;
        Ok(outcome)
    }

    pub fn export_members_csv(&self) -> String {
        self.store.export_members_csv()
    }

    pub fn export_reasons_csv(&self) -> String {
        self.store.export_reasons_csv()
    }

    pub fn export_entries_csv(&self) -> String {
        self.store.export_entries_csv()
    }

    // ------------------------------------------------------------------
    // Browsing
    // ------------------------------------------------------------------

    pub fn query_entries(&self, filter: &EntryFilter) -> Vec<&Entry> {
        self.store.query_entries(filter)
    }

    pub fn entry_dates(&self) -> BTreeSet<NaiveDate> {
        self.store.entry_dates()
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Run one sync pass against the remote store.
    ///
    /// Rejected when the configuration carries no remote (the capability
    /// flag). State is persisted afterwards whether the pass succeeded or
    /// not: a failed pass still updated retry counters, and the queue must
    /// survive a restart either way.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        if !self.config.remote_enabled {
            return Err(SyncError::RemoteUnavailable(
                "remote sync disabled by configuration".into(),
            ));
        }

        let result = self.engine.sync(&mut self.store, Self::now()).await;
        self.persist()?;
        result
    }
}
