//! Invariant tests for cuentas-engine
//!
//! These tests exercise the domain rules end to end through the public API:
//! sign normalization, protection, referential integrity, import semantics,
//! and the derived indexes.

use chrono::NaiveDate;
use cuentas_engine::{
    CreateOp, DeleteOp, EntityData, EntityKind, Entry, EntryFilter, Error, ImportMode, Member,
    MemberPatch, MovementType, Operation, Patch, Reason, SeqIdGen, Store, UpdateOp,
};
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create(store: &mut Store, op_id: &str, entity: EntityData, now: u64) {
    store
        .apply(Operation::Create(CreateOp::new(op_id, entity, now)))
        .unwrap();
}

// ============================================================================
// Sign Normalization
// ============================================================================

#[test]
fn expense_amount_stored_negative() {
    let mut store = Store::new("owner");
    create(
        &mut store,
        "op_m",
        EntityData::Member(Member::new("m_1", "owner", "Beto", false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_r",
        EntityData::Reason(Reason::new("r_1", "owner", "Renta", false, false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_e",
        EntityData::Entry(Entry::new(
            "e_1",
            "owner",
            date(2024, 6, 1),
            "m_1",
            "r_1",
            MovementType::Expense,
            Decimal::from(150),
            "renta",
            2000,
        )),
        2000,
    );

    assert_eq!(store.entry("e_1").unwrap().amount, Decimal::from(-150));
}

#[test]
fn sign_restored_on_every_update_path() {
    let mut store = Store::new("owner");
    create(
        &mut store,
        "op_m",
        EntityData::Member(Member::new("m_1", "owner", "Beto", false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_r",
        EntityData::Reason(Reason::new("r_1", "owner", "Renta", false, false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_e",
        EntityData::Entry(Entry::new(
            "e_1",
            "owner",
            date(2024, 6, 1),
            "m_1",
            "r_1",
            MovementType::Income,
            Decimal::from(100),
            "sueldo",
            2000,
        )),
        2000,
    );

    // Amount-only update against an income entry.
    store
        .apply(Operation::Update(UpdateOp::new(
            "op_u1",
            "e_1",
            Patch::Entry(cuentas_engine::EntryPatch {
                amount: Some(Decimal::from(-75)),
                ..Default::default()
            }),
            3000,
        )))
        .unwrap();
    assert_eq!(store.entry("e_1").unwrap().amount, Decimal::from(75));

    // Movement-only update flips the sign.
    store
        .apply(Operation::Update(UpdateOp::new(
            "op_u2",
            "e_1",
            Patch::Entry(cuentas_engine::EntryPatch {
                movement: Some(MovementType::Investment),
                ..Default::default()
            }),
            4000,
        )))
        .unwrap();
    assert_eq!(store.entry("e_1").unwrap().amount, Decimal::from(-75));
}

// ============================================================================
// Protection
// ============================================================================

#[test]
fn protected_entity_survives_update_and_delete() {
    let mut store = Store::new("owner");
    create(
        &mut store,
        "op_r",
        EntityData::Reason(Reason::new("r_1", "owner", "Sueldo", false, true, 1000)),
        1000,
    );
    let before = store.reason("r_1").unwrap().clone();

    let update = store.apply(Operation::Update(UpdateOp::new(
        "op_u",
        "r_1",
        Patch::Reason(cuentas_engine::ReasonPatch {
            description: Some("Otro".into()),
            ..Default::default()
        }),
        2000,
    )));
    assert!(matches!(update, Err(Error::Protected { .. })));

    let delete = store.apply(Operation::Delete(DeleteOp::new(
        "op_d",
        EntityKind::Reason,
        "r_1",
        2000,
    )));
    assert!(matches!(delete, Err(Error::Protected { .. })));

    assert_eq!(store.reason("r_1").unwrap(), &before);
}

// ============================================================================
// Referential Integrity
// ============================================================================

#[test]
fn referenced_member_cannot_be_deleted_until_entries_go() {
    let mut store = Store::new("owner");
    create(
        &mut store,
        "op_m",
        EntityData::Member(Member::new("m_1", "owner", "Beto", false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_r",
        EntityData::Reason(Reason::new("r_1", "owner", "Renta", false, false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_e",
        EntityData::Entry(Entry::new(
            "e_1",
            "owner",
            date(2024, 6, 1),
            "m_1",
            "r_1",
            MovementType::Expense,
            Decimal::from(10),
            "x",
            2000,
        )),
        2000,
    );

    let blocked = store.apply(Operation::Delete(DeleteOp::new(
        "op_d1",
        EntityKind::Member,
        "m_1",
        3000,
    )));
    assert!(matches!(blocked, Err(Error::ReferencedByEntries { .. })));

    store
        .apply(Operation::Delete(DeleteOp::new(
            "op_d2",
            EntityKind::Entry,
            "e_1",
            4000,
        )))
        .unwrap();
    store
        .apply(Operation::Delete(DeleteOp::new(
            "op_d3",
            EntityKind::Member,
            "m_1",
            5000,
        )))
        .unwrap();

    assert!(store.member("m_1").is_none());
}

// ============================================================================
// Import Semantics
// ============================================================================

#[test]
fn replace_import_preserves_protected_set() {
    let mut store = Store::new("owner");
    let mut ids = SeqIdGen::new("gen");

    // M = 2 protected, 1 disposable.
    store
        .import_reasons_csv(
            "descripcion,isprotected\nSueldo,true\nAhorro,true\nViejo,false\n",
            ImportMode::Add,
            1000,
            &mut ids,
        )
        .unwrap();
    let protected_before: Vec<Reason> = store
        .reasons()
        .filter(|r| r.protected)
        .cloned()
        .collect();

    // N = 3 imported in replace mode.
    let outcome = store
        .import_reasons_csv(
            "descripcion\nRenta\nMercado\nTransporte\n",
            ImportMode::Replace,
            2000,
            &mut ids,
        )
        .unwrap();

    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.removed, 1);
    assert_eq!(store.reasons().count(), 5); // N + M

    for reason in &protected_before {
        let survivor = store.reason(&reason.id).unwrap();
        assert_eq!(survivor, reason);
    }
}

#[test]
fn add_import_dedups_case_insensitively() {
    let mut store = Store::new("owner");
    let mut ids = SeqIdGen::new("gen");

    store
        .import_members_csv("nombre\nANA\n", ImportMode::Add, 1000, &mut ids)
        .unwrap();

    let outcome = store
        .import_members_csv("nombre\nana\n", ImportMode::Add, 2000, &mut ids)
        .unwrap();

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(store.members().count(), 1);
}

#[test]
fn failed_import_leaves_no_partial_state() {
    let mut store = Store::new("owner");
    let mut ids = SeqIdGen::new("gen");
    store
        .import_members_csv("nombre\nBeto\n", ImportMode::Add, 1000, &mut ids)
        .unwrap();
    store
        .import_reasons_csv("descripcion\nRenta\n", ImportMode::Add, 1000, &mut ids)
        .unwrap();
    let pending_before = store.pending_count();

    // Second row references a member that does not exist.
    let csv = "fecha,integranteNombre,movimiento,razonDescripcion,descripcion,monto\n\
               01/06/2024,Beto,EXPENSE,Renta,ok,100\n\
               02/06/2024,Fantasma,EXPENSE,Renta,bad,100\n";
    let result = store.import_entries_csv(csv, ImportMode::Add, 2000, &mut ids);

    assert!(matches!(result, Err(Error::ImportParse(_))));
    assert_eq!(store.entries().count(), 0);
    assert_eq!(store.pending_count(), pending_before);
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[test]
fn beto_renta_scenario() {
    let mut store = Store::new("owner");

    create(
        &mut store,
        "op_m",
        EntityData::Member(Member::new("m_beto", "owner", "Beto", false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_r",
        EntityData::Reason(Reason::new("r_renta", "owner", "Renta", false, false, 1100)),
        1100,
    );
    create(
        &mut store,
        "op_e",
        EntityData::Entry(Entry::new(
            "e_1",
            "owner",
            date(2024, 6, 1),
            "m_beto",
            "r_renta",
            MovementType::Expense,
            Decimal::from(200),
            "renta junio",
            1200,
        )),
        1200,
    );

    let entry = store.entry("e_1").unwrap();
    assert_eq!(entry.amount, Decimal::from(-200));

    let dates = store.entry_dates();
    assert!(dates.contains(&date(2024, 6, 1)));

    // The entry is attributed to Beto and browsable through the filter.
    let rows = store.query_entries(&EntryFilter::new().for_member("m_beto"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "e_1");
}

// ============================================================================
// Uniqueness Across Rename
// ============================================================================

#[test]
fn rename_onto_deleted_name_is_allowed() {
    let mut store = Store::new("owner");
    create(
        &mut store,
        "op_1",
        EntityData::Member(Member::new("m_1", "owner", "Ana", false, 1000)),
        1000,
    );
    create(
        &mut store,
        "op_2",
        EntityData::Member(Member::new("m_2", "owner", "Beto", false, 1000)),
        1000,
    );
    store
        .apply(Operation::Delete(DeleteOp::new(
            "op_3",
            EntityKind::Member,
            "m_1",
            2000,
        )))
        .unwrap();

    // "ANA" only exists as a tombstone now; the rename must pass.
    store
        .apply(Operation::Update(UpdateOp::new(
            "op_4",
            "m_2",
            Patch::Member(MemberPatch {
                name: Some("ana".into()),
                ..Default::default()
            }),
            3000,
        )))
        .unwrap();

    assert_eq!(store.member("m_2").unwrap().name, "ANA");
}
