use bulkedit_core::{MemoryRecord, MemoryStore, StaticCatalog, scan};
use bulkedit_model::{
    Identifier, ImportError, ImportOptions, RelationDiagnostic, RelationDirection,
    RelationshipType, Row, RowNumber,
};
use bulkedit_validate::validate;

fn row(number: usize) -> Row {
    Row::new(RowNumber::new(number).expect("row number"))
}

fn catalog() -> StaticCatalog {
    StaticCatalog::default().with_type(RelationshipType {
        id: 1,
        left_type: "Person".to_string(),
        right_type: "Publication".to_string(),
        leftward_name: "isAuthorOf".to_string(),
        rightward_name: "hasAuthor".to_string(),
    })
}

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_container("col1", "Articles");
    store
}

fn publication(number: usize, title: &str) -> Row {
    row(number)
        .with_value("dc.title", title)
        .with_value("dspace.entity.type", "Publication")
        .with_value("collection", "col1")
}

fn person(number: usize, name: &str) -> Row {
    row(number)
        .with_value("dc.title", name)
        .with_value("dspace.entity.type", "Person")
        .with_value("collection", "col1")
}

#[test]
fn typed_relation_is_planned_with_orientation() {
    let store = store();
    let rows = vec![
        publication(1, "Paper A"),
        person(2, "Person B").with_value("relation.isAuthorOf", "dc.title:Paper A"),
    ];
    let scanned = scan(&store, &ImportOptions::default(), rows).expect("scan");
    let validated = validate(scanned, &store, &catalog()).expect("validate");

    let origin = Identifier::Placeholder(RowNumber::new(2).expect("row"));
    let target = Identifier::Placeholder(RowNumber::FIRST);
    let planned = validated
        .plan
        .get(origin, "relation.isAuthorOf", target)
        .expect("planned relation");
    assert_eq!(planned.type_id, 1);
    assert_eq!(planned.direction, RelationDirection::OriginIsLeft);
    assert!(!validated.report.has_errors());
    assert_eq!(validated.change_sets.len(), 2);
}

#[test]
fn every_failure_is_reported_together() {
    let store = store();
    let rows = vec![
        row(1)
            .with_value("rowName", "untyped")
            .with_value("collection", "col1"),
        publication(2, "Paper").with_value("rowName", "paper"),
        person(3, "Author").with_value("relation.isAuthorOf", "rowName:untyped"),
        person(4, "Filler 4"),
        person(5, "Filler 5"),
        person(6, "Filler 6"),
        publication(7, "Other paper").with_value("relation.isAuthorOf", "rowName:paper"),
    ];
    let scanned = scan(&store, &ImportOptions::default(), rows).expect("scan");
    let err = validate(scanned, &store, &catalog()).expect_err("invalid batch");

    let ImportError::RelationshipTypeMismatch { diagnostics } = &err else {
        panic!("unexpected error {err:?}");
    };
    let rows: Vec<_> = diagnostics.iter().filter_map(RelationDiagnostic::row).collect();
    assert_eq!(rows, vec![RowNumber::new(3).expect("row"), RowNumber::new(7).expect("row")]);
    insta::assert_snapshot!(err.to_string(), @r"
    relationship validation failed with 2 error(s):
    - row 3: cannot resolve entity type for target placeholder:1
    - row 7: no relationship type for relation.isAuthorOf from origin type Publication to target type Publication
    ");
}

#[test]
fn persisted_records_contribute_their_stored_type() {
    let mut store = store();
    let container = store
        .staged()
        .container_by_handle("col1")
        .map(|container| container.id)
        .expect("container");
    let paper = store.seed_record(MemoryRecord::new(container).with_entity_type("Publication"));
    let author = store.seed_record(MemoryRecord::new(container).with_entity_type("Person"));

    let rows = vec![row(1)
        .with_id(author)
        .with_value("relation.isAuthorOf", paper.to_string())];
    let scanned = scan(&store, &ImportOptions::default(), rows).expect("scan");
    let validated = validate(scanned, &store, &catalog()).expect("validate");
    assert!(validated
        .plan
        .get(
            Identifier::Persisted(author),
            "relation.isAuthorOf",
            Identifier::Persisted(paper)
        )
        .is_some());
}

#[test]
fn origin_without_type_is_reported() {
    let store = store();
    let rows = vec![
        publication(1, "Paper A"),
        row(2)
            .with_value("relation.isAuthorOf", "dc.title:Paper A")
            .with_value("collection", "col1"),
    ];
    let scanned = scan(&store, &ImportOptions::default(), rows).expect("scan");
    let err = validate(scanned, &store, &catalog()).expect_err("invalid batch");
    let ImportError::RelationshipTypeMismatch { diagnostics } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert!(matches!(
        diagnostics.as_slice(),
        [RelationDiagnostic::UnresolvedOriginType { row: Some(_), .. }]
    ));
}

#[test]
fn unknown_role_name_is_a_mismatch() {
    let store = store();
    let rows = vec![
        publication(1, "Paper A"),
        person(2, "Person B").with_value("relation.isEditorOf", "dc.title:Paper A"),
    ];
    let scanned = scan(&store, &ImportOptions::default(), rows).expect("scan");
    let err = validate(scanned, &store, &catalog()).expect_err("invalid batch");
    assert!(matches!(err, ImportError::RelationshipTypeMismatch { .. }));
}
