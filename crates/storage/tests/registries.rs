#![forbid(unsafe_code)]

use qc_core::{Principal, Role};
use qc_storage::{
    AttachmentKind, AttachmentMeta, AttachmentRegistry, Collection, JsonFileStore, RecordStore,
    TransformerRegistry, UploadSink, UserDirectory, default_users,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

fn open_store(dir: &tempfile::TempDir) -> Arc<JsonFileStore> {
    Arc::new(JsonFileStore::open(dir.path()).expect("open store"))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn quality() -> Principal {
    Principal {
        user_id: "quality".to_string(),
        name: "Priya Sharma".to_string(),
        role: Role::Quality,
        customer_id: None,
    }
}

fn customer(customer_id: &str) -> Principal {
    Principal {
        user_id: "customer1".to_string(),
        name: "UPPTCL".to_string(),
        role: Role::Customer,
        customer_id: Some(customer_id.to_string()),
    }
}

#[test]
fn seeding_only_happens_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let users = UserDirectory::new(open_store(&dir));

    assert_eq!(users.seed_defaults().expect("seed"), default_users().len());
    assert_eq!(users.seed_defaults().expect("seed again"), 0);

    let admin = users
        .authenticate("admin", "admin123")
        .expect("lookup")
        .expect("admin account");
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.department.as_deref(), Some("Management"));

    assert!(users.authenticate("admin", "wrong").expect("lookup").is_none());
    assert!(users.authenticate("ghost", "admin123").expect("lookup").is_none());
}

#[test]
fn existing_users_are_not_replaced() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = open_store(&dir);
    store
        .save_all(
            Collection::Users,
            &[json!({
                "userId": "lead",
                "password": "pw",
                "name": "Line Lead",
                "role": "production",
            })],
        )
        .expect("seed file");

    let users = UserDirectory::new(store);
    assert_eq!(users.seed_defaults().expect("seed"), 0);
    assert!(users.authenticate("admin", "admin123").expect("lookup").is_none());

    let lead = users
        .principal("lead")
        .expect("lookup")
        .expect("lead principal");
    assert_eq!(lead.role, Role::Production);
    assert_eq!(lead.customer_id, None);
}

#[test]
fn customers_lists_customer_accounts_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    let users = UserDirectory::new(open_store(&dir));
    users.seed_defaults().expect("seed");

    let customers = users.customers().expect("customers");
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].customer_id.as_deref(), Some("CUST001"));
    assert_eq!(customers[0].name, "UPPTCL");

    let principal = users
        .principal("customer1")
        .expect("lookup")
        .expect("customer principal");
    assert!(principal.is_customer());
    assert_eq!(principal.customer_id.as_deref(), Some("CUST001"));
}

#[test]
fn transformer_lifecycle_keeps_client_fields() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = TransformerRegistry::new(open_store(&dir));
    let quality = quality();

    let created = registry
        .create(
            object(json!({
                "id": "client-chosen",
                "wo": "W1",
                "customerId": "CUST001",
                "rating": "100 kVA",
                "createdBy": "spoofed",
            })),
            &quality,
        )
        .expect("create");
    let id = created.id().expect("id").to_string();
    assert_ne!(id, "client-chosen");
    assert_eq!(created.get("createdBy"), Some(&json!("quality")));
    assert_eq!(created.get("rating"), Some(&json!("100 kVA")));

    let updated = registry
        .update(
            &id,
            object(json!({"id": "other", "rating": "250 kVA", "phase": 3})),
            &quality,
        )
        .expect("update")
        .expect("existing transformer");
    assert_eq!(updated.id(), Some(id.as_str()));
    assert_eq!(updated.wo(), Some("W1"));
    assert_eq!(updated.get("rating"), Some(&json!("250 kVA")));
    assert_eq!(updated.get("phase"), Some(&json!(3)));
    assert_eq!(updated.get("updatedBy"), Some(&json!("quality")));
    assert!(updated.get("createdAt").is_some());

    assert!(
        registry
            .update("missing", Map::new(), &quality)
            .expect("update missing")
            .is_none()
    );

    assert!(registry.delete(&id).expect("delete"));
    assert!(!registry.delete(&id).expect("delete again"));
    assert!(registry.list(None).expect("list").is_empty());
}

#[test]
fn transformer_listing_is_customer_scoped() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = TransformerRegistry::new(open_store(&dir));
    let quality = quality();
    for (wo, customer_id) in [("W1", "CUST001"), ("W2", "CUST002"), ("W3", "CUST001")] {
        registry
            .create(object(json!({"wo": wo, "customerId": customer_id})), &quality)
            .expect("create");
    }

    assert_eq!(registry.list(None).expect("anonymous").len(), 3);
    assert_eq!(registry.list(Some(&quality)).expect("quality").len(), 3);
    let own = registry
        .list(Some(&customer("CUST001")))
        .expect("customer")
        .iter()
        .filter_map(|transformer| transformer.wo().map(str::to_string))
        .collect::<Vec<_>>();
    assert_eq!(own, ["W1", "W3"]);
}

#[test]
fn attachments_are_recorded_per_kind() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = open_store(&dir);
    let sink = UploadSink::open(dir.path().join("uploads"), 1024).expect("sink");
    let boms = AttachmentRegistry::new(store.clone(), AttachmentKind::Bom);
    let documents = AttachmentRegistry::new(store, AttachmentKind::Document);
    let quality = quality();

    let upload = sink.store("bom.csv", b"part,qty\ncore,1\n").expect("store");
    let bom = boms
        .add(
            AttachmentMeta {
                wo: Some("W1".to_string()),
                customer_id: Some("CUST001".to_string()),
                doc_type: Some("ignored".to_string()),
            },
            upload.clone(),
            &quality,
        )
        .expect("add bom");
    assert_eq!(bom.filename, "bom.csv");
    assert_eq!(bom.doc_type, None);
    assert_eq!(bom.stored_name.as_deref(), Some(upload.stored_name.as_str()));
    assert_eq!(bom.size, Some(upload.size));
    assert_eq!(bom.uploaded_by, "quality");

    let report = sink.store("report.pdf", b"%PDF").expect("store");
    let document = documents
        .add(
            AttachmentMeta {
                wo: Some("W1".to_string()),
                customer_id: Some("CUST002".to_string()),
                doc_type: Some("test-report".to_string()),
            },
            report,
            &quality,
        )
        .expect("add document");
    assert_eq!(document.doc_type.as_deref(), Some("test-report"));

    assert_eq!(boms.list_for_wo("W1", None).expect("boms").len(), 1);
    assert!(boms.list_for_wo("W2", None).expect("boms").is_empty());
    assert!(
        documents
            .list_for_wo("W1", Some(&customer("CUST001")))
            .expect("documents")
            .is_empty()
    );
    assert_eq!(
        documents
            .list_for_wo("W1", Some(&customer("CUST002")))
            .expect("documents")
            .len(),
        1
    );

    let removed = boms.remove(&bom.id).expect("remove").expect("removed bom");
    assert!(sink.remove(&removed.filepath).expect("remove file"));
    assert!(boms.remove(&bom.id).expect("remove again").is_none());
    assert!(sink.resolve(&upload.stored_name).is_err());
}

#[test]
fn legacy_attachment_rows_decode() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = open_store(&dir);
    store
        .save_all(
            Collection::Documents,
            &[json!({
                "id": "1712345678901",
                "wo": "W1",
                "type": "drawing",
                "customerId": "CUST001",
                "filename": "ga.pdf",
                "filepath": "uploads/1712345678901-ga.pdf",
                "uploadedBy": "quality",
                "uploadedAt": "2024-04-05T10:00:00.000Z",
            })],
        )
        .expect("seed");

    let documents = AttachmentRegistry::new(store, AttachmentKind::Document);
    let listed = documents.list_for_wo("W1", None).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].doc_type.as_deref(), Some("drawing"));
    assert_eq!(listed[0].sha256, None);
}
