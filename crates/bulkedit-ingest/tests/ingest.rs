use std::fs;

use bulkedit_core::{MemoryRecord, MemoryStore, StaticCatalog};
use bulkedit_ingest::{LoaderRegistry, load_catalog, load_snapshot, save_snapshot, write_json};
use bulkedit_model::{FieldKey, ImportOptions, RelationshipType};

#[test]
fn registry_loads_csv_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.csv");
    fs::write(
        &path,
        "id,collection,dc.title,relation.isAuthorOf\n\
         +,123/1,Paper A,\n\
         ,123/1,Person B,dc.title:Paper A\n",
    )
    .expect("write csv");

    let rows = LoaderRegistry::standard()
        .load(&path, None, &ImportOptions::default())
        .expect("load");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].first("relation.isAuthorOf"), Some("dc.title:Paper A"));
    assert_eq!(rows[0].get("relation.isAuthorOf"), Some(&[][..]));
}

#[test]
fn explicit_content_type_overrides_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch.txt");
    fs::write(&path, r#"[{"values": {"dc.title": "A"}}]"#).expect("write json");

    let rows = LoaderRegistry::standard()
        .load(&path, Some("application/json"), &ImportOptions::default())
        .expect("load");
    assert_eq!(rows[0].first("dc.title"), Some("A"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = LoaderRegistry::standard()
        .load(&dir.path().join("absent.csv"), None, &ImportOptions::default())
        .expect_err("missing");
    assert!(err.to_string().starts_with("failed to read"));
}

#[test]
fn snapshot_survives_save_and_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let mut store = MemoryStore::new();
    let container = store.add_container("123/1", "Articles");
    let id = store.seed_record(
        MemoryRecord::new(container).with_value(FieldKey::new("dc", "title", None), "A"),
    );

    save_snapshot(&path, store.snapshot()).expect("save");
    let loaded = load_snapshot(&path).expect("load");

    assert_eq!(&loaded, store.snapshot());
    assert!(loaded.record(id).is_some());
    assert!(!dir.path().join("store.json.tmp").exists());
}

#[test]
fn catalog_is_a_plain_array() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("catalog.json");
    let catalog = StaticCatalog::default().with_type(RelationshipType {
        id: 7,
        left_type: "Person".to_string(),
        right_type: "Publication".to_string(),
        leftward_name: "isAuthorOf".to_string(),
        rightward_name: "hasAuthor".to_string(),
    });
    write_json(&path, &catalog).expect("write");

    let text = fs::read_to_string(&path).expect("read");
    assert!(text.trim_start().starts_with('['));
    assert_eq!(load_catalog(&path).expect("load").types(), catalog.types());
}
