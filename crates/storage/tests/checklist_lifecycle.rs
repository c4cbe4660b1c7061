#![forbid(unsafe_code)]

use qc_core::{
    AccessError, ChecklistEntry, LockState, MissingField, Principal, ProductionEntry, Role,
    UnlockEntry,
};
use qc_storage::{ChecklistBook, ChecklistError, Collection, JsonFileStore, RecordStore};
use std::sync::Arc;

fn principal(user_id: &str, name: &str, role: Role, customer_id: Option<&str>) -> Principal {
    Principal {
        user_id: user_id.to_string(),
        name: name.to_string(),
        role,
        customer_id: customer_id.map(str::to_string),
    }
}

fn quality() -> Principal {
    principal("quality", "Priya Sharma", Role::Quality, None)
}

fn admin() -> Principal {
    principal("admin", "Senior Engineer", Role::Admin, None)
}

fn production() -> Principal {
    principal("production", "Amit Singh", Role::Production, None)
}

fn entry(wo: &str, stage: &str, row_id: &str, actual_value: &str) -> ChecklistEntry {
    ChecklistEntry {
        wo: Some(wo.to_string()),
        customer_id: Some("CUST001".to_string()),
        customer: Some("UPPTCL".to_string()),
        stage: Some(stage.to_string()),
        item_number: Some(row_id.to_string()),
        row_id: Some(row_id.to_string()),
        actual_value: Some(actual_value.to_string()),
        technician: Some("Ravi".to_string()),
        ..ChecklistEntry::default()
    }
}

fn unlock_entry(wo: &str, stage: &str, row_id: &str, reason: Option<&str>) -> UnlockEntry {
    serde_json::from_value(serde_json::json!({
        "wo": wo,
        "stage": stage,
        "rowId": row_id,
        "reason": reason,
    }))
    .expect("unlock entry")
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<JsonFileStore>,
    book: ChecklistBook,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(JsonFileStore::open(dir.path()).expect("open store"));
    let book = ChecklistBook::new(store.clone());
    Fixture {
        _dir: dir,
        store,
        book,
    }
}

#[test]
fn save_unlock_resave_archives_the_unlock() {
    let fx = fixture();
    let quality = quality();
    let admin = admin();

    let first = fx
        .book
        .save(Some(&quality), entry("W1", "stage1", "r1", "5"))
        .expect("first save");
    assert!(first.is_locked());
    assert_eq!(
        first.lock,
        Some(LockState::Locked {
            by: "quality".to_string(),
            at: first.created_at.clone(),
        })
    );

    let unlocked = fx
        .book
        .unlock(Some(&admin), unlock_entry("W1", "stage1", "r1", Some("typo")))
        .expect("unlock");
    let audit = unlocked.unlock_audit().expect("unlock audit").clone();
    assert_eq!(audit.unlocked_by, "admin");
    assert_eq!(audit.unlock_reason, "typo");

    let resaved = fx
        .book
        .save(Some(&quality), entry("W1", "stage1", "r1", "6"))
        .expect("second save");
    assert!(resaved.is_locked());
    assert_eq!(resaved.id, first.id);
    assert_eq!(resaved.created_at, first.created_at);
    assert_eq!(resaved.previous_unlock, Some(audit));
    assert_eq!(
        resaved.inspection.as_ref().map(|record| record.actual_value.as_str()),
        Some("6")
    );

    let listed = fx
        .book
        .list(Some(&quality), "stage1", "W1")
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], resaved);
}

#[test]
fn repeated_saves_upsert_a_single_item() {
    let fx = fixture();
    let quality = quality();
    for value in ["1", "2", "3"] {
        fx.book
            .save(Some(&quality), entry("W1", "stage1", "r1", value))
            .expect("save");
    }
    let listed = fx.book.list(None, "stage1", "W1").expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0].inspection.as_ref().map(|record| record.actual_value.as_str()),
        Some("3")
    );
}

#[test]
fn failed_validation_writes_nothing() {
    let fx = fixture();
    let quality = quality();

    let mut missing_value = entry("W1", "stage1", "r1", "   ");
    let err = fx
        .book
        .save(Some(&quality), missing_value.clone())
        .expect_err("blank actual value");
    assert!(matches!(err, ChecklistError::MissingField(MissingField::ActualValue)));

    missing_value.actual_value = Some("5".to_string());
    missing_value.technician = None;
    let err = fx
        .book
        .save(Some(&quality), missing_value)
        .expect_err("missing technician");
    assert!(matches!(err, ChecklistError::MissingField(MissingField::Technician)));

    let mut no_identity = entry("W1", "stage1", "r1", "");
    no_identity.wo = None;
    no_identity.technician = None;
    let err = fx
        .book
        .save(Some(&quality), no_identity)
        .expect_err("missing identity");
    assert!(matches!(err, ChecklistError::MissingField(MissingField::Identity)));

    let stored = fx.store.load_all(Collection::Checklists).expect("load");
    assert!(stored.is_empty());
}

#[test]
fn gate_runs_before_validation() {
    let fx = fixture();
    let customer = principal("customer1", "UPPTCL", Role::Customer, Some("CUST001"));

    let err = fx
        .book
        .save(None, ChecklistEntry::default())
        .expect_err("anonymous save");
    assert!(matches!(err, ChecklistError::Access(AccessError::Unauthenticated)));

    let err = fx
        .book
        .save(Some(&customer), ChecklistEntry::default())
        .expect_err("customer save");
    assert!(matches!(err, ChecklistError::Access(AccessError::Forbidden { .. })));

    let err = fx
        .book
        .unlock(Some(&quality()), unlock_entry("W1", "stage1", "r1", None))
        .expect_err("quality unlock");
    assert!(matches!(
        err,
        ChecklistError::Access(AccessError::Forbidden {
            role: Role::Quality,
            required: Role::Admin,
        })
    ));

    let err = fx
        .book
        .clear(Some(&production()), "stage1", "W1")
        .expect_err("production clear");
    assert!(matches!(err, ChecklistError::Access(AccessError::Forbidden { .. })));
}

#[test]
fn production_role_may_save() {
    let fx = fixture();
    let item = fx
        .book
        .save(Some(&production()), entry("W1", "stage1", "r1", "5"))
        .expect("production save via main path");
    let inspection = item.inspection.expect("inspection");
    assert_eq!(inspection.user_id, "production");
    assert_eq!(inspection.user_role, "production");
}

#[test]
fn unlock_of_missing_item_is_not_found() {
    let fx = fixture();
    let err = fx
        .book
        .unlock(Some(&admin()), unlock_entry("W1", "stage1", "nope", None))
        .expect_err("missing item");
    assert!(matches!(err, ChecklistError::NotFound));
    assert_eq!(err.to_string(), "Checklist item not found");
}

#[test]
fn unlock_without_reason_uses_default() {
    let fx = fixture();
    fx.book
        .save(Some(&quality()), entry("W1", "stage1", "r1", "5"))
        .expect("save");
    let unlocked = fx
        .book
        .unlock(Some(&admin()), unlock_entry("W1", "stage1", "r1", None))
        .expect("unlock");
    assert_eq!(
        unlocked.unlock_audit().map(|audit| audit.unlock_reason.as_str()),
        Some("No reason provided")
    );
    assert!(!unlocked.is_locked());
}

#[test]
fn customers_only_list_their_own_items() {
    let fx = fixture();
    let quality = quality();
    fx.book
        .save(Some(&quality), entry("W1", "stage1", "r1", "5"))
        .expect("own item");
    let mut foreign = entry("W1", "stage1", "r2", "5");
    foreign.customer_id = Some("CUST002".to_string());
    fx.book.save(Some(&quality), foreign).expect("foreign item");

    let own = principal("customer1", "UPPTCL", Role::Customer, Some("CUST001"));
    let listed = fx.book.list(Some(&own), "stage1", "W1").expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].row_id, "r1");

    let unscoped = principal("customer9", "Nobody", Role::Customer, None);
    let listed = fx.book.list(Some(&unscoped), "stage1", "W1").expect("list");
    assert!(listed.is_empty());

    let listed = fx.book.list(None, "stage1", "W1").expect("anonymous list");
    assert_eq!(listed.len(), 2);
}

#[test]
fn list_keeps_stored_order_and_filters_by_stage_and_wo() {
    let fx = fixture();
    let quality = quality();
    for (wo, stage, row) in [
        ("W1", "stage1", "r3"),
        ("W1", "stage2", "r1"),
        ("W1", "stage1", "r1"),
        ("W2", "stage1", "r2"),
        ("W1", "stage1", "r2"),
    ] {
        fx.book
            .save(Some(&quality), entry(wo, stage, row, "5"))
            .expect("save");
    }
    let rows = fx
        .book
        .list(None, "stage1", "W1")
        .expect("list")
        .into_iter()
        .map(|item| item.row_id)
        .collect::<Vec<_>>();
    assert_eq!(rows, ["r3", "r1", "r2"]);
}

#[test]
fn clear_removes_only_the_requested_checklist() {
    let fx = fixture();
    let quality = quality();
    for (wo, stage, row) in [
        ("W1", "stage1", "r1"),
        ("W1", "stage1", "r2"),
        ("W1", "stage2", "r1"),
        ("W2", "stage1", "r1"),
    ] {
        fx.book
            .save(Some(&quality), entry(wo, stage, row, "5"))
            .expect("save");
    }
    fx.book
        .unlock(Some(&admin()), unlock_entry("W1", "stage1", "r2", Some("redo")))
        .expect("unlock");

    let deleted = fx
        .book
        .clear(Some(&admin()), "stage1", "W1")
        .expect("clear");
    assert_eq!(deleted, 2);
    assert!(fx.book.list(None, "stage1", "W1").expect("list").is_empty());
    assert_eq!(fx.book.list(None, "stage2", "W1").expect("list").len(), 1);
    assert_eq!(fx.book.list(None, "stage1", "W2").expect("list").len(), 1);

    let again = fx
        .book
        .clear(Some(&admin()), "stage1", "W1")
        .expect("clear again");
    assert_eq!(again, 0);
}

#[test]
fn production_save_merges_without_touching_the_lock() {
    let fx = fixture();
    let production = production();
    let header = |notes: &str| ProductionEntry {
        wo: Some("W1".to_string()),
        stage: Some("stage1".to_string()),
        item_number: Some("1".to_string()),
        row_id: Some("r1".to_string()),
        production_notes: Some(notes.to_string()),
        ..ProductionEntry::default()
    };

    let created = fx
        .book
        .save_production(Some(&production), header("wound"))
        .expect("production save");
    assert_eq!(created.lock, None);
    let record = created.production.clone().expect("production fields");
    assert_eq!(record.status, "completed");
    assert_eq!(record.engineer, "Amit Singh");
    assert_eq!(record.shift, "Morning");
    assert_eq!(record.notes, "wound");

    let locked = fx
        .book
        .save(Some(&quality()), entry("W1", "stage1", "r1", "5"))
        .expect("main save");
    assert!(locked.is_locked());
    assert_eq!(locked.id, created.id);
    assert_eq!(locked.production, created.production);

    let merged = fx
        .book
        .save_production(Some(&production), header("rewound"))
        .expect("second production save");
    assert!(merged.is_locked());
    assert_eq!(merged.inspection, locked.inspection);
    assert_eq!(
        merged.production.map(|record| record.notes),
        Some("rewound".to_string())
    );
    assert_eq!(fx.book.list(None, "stage1", "W1").expect("list").len(), 1);
}

#[test]
fn production_save_requires_identity() {
    let fx = fixture();
    let err = fx
        .book
        .save_production(Some(&production()), ProductionEntry::default())
        .expect_err("missing identity");
    assert!(matches!(err, ChecklistError::MissingField(MissingField::Identity)));
}

#[test]
fn stored_rows_use_the_flat_wire_shape() {
    let fx = fixture();
    fx.book
        .save(Some(&quality()), entry("W1", "stage1", "r1", "5"))
        .expect("save");
    fx.book
        .unlock(Some(&admin()), unlock_entry("W1", "stage1", "r1", Some("typo")))
        .expect("unlock");

    let rows = fx.store.load_all(Collection::Checklists).expect("load");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["locked"], serde_json::json!(false));
    assert_eq!(row["unlockedBy"], "admin");
    assert_eq!(row["unlockReason"], "typo");
    assert_eq!(row["actualValue"], "5");
    assert!(row.get("lockedBy").is_none());
    assert!(row.get("lockedAt").is_none());
}

#[test]
fn concurrent_saves_of_distinct_items_are_all_kept() {
    let fx = fixture();
    let book = Arc::new(fx.book);
    let handles = (0..8)
        .map(|n| {
            let book = Arc::clone(&book);
            std::thread::spawn(move || {
                let quality = quality();
                for row in 0..5 {
                    book.save(
                        Some(&quality),
                        entry("W1", "stage1", &format!("r{n}-{row}"), "5"),
                    )
                    .expect("save");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("join");
    }
    assert_eq!(book.list(None, "stage1", "W1").expect("list").len(), 40);
}
