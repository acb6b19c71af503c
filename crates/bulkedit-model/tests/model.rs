use bulkedit_model::{
    ChangeSet, FieldKey, Identifier, ImportOptions, MetadataValue, PolicyFlags, RecordId,
    RelationDiagnostic, Row, RowNumber,
};

fn row(number: usize) -> RowNumber {
    RowNumber::new(number).expect("row number")
}

#[test]
fn import_options_deserialize_with_defaults() {
    let options: ImportOptions =
        serde_json::from_str(r#"{"checkpoint_size": 2, "policy": {"use_workflow": true}}"#)
            .expect("options");
    assert_eq!(options.checkpoint_size, 2);
    assert_eq!(options.authority_separator, "::");
    assert_eq!(options.value_separator, "||");
    assert!(!options.allow_expunge);
    assert!(options.policy.use_workflow);
    assert!(options.policy.archive_immediately);
}

#[test]
fn checkpoint_size_is_clamped() {
    let options = ImportOptions::new().with_checkpoint_size(0);
    assert_eq!(options.effective_checkpoint_size(), 1);
}

#[test]
fn default_policy_archives_without_workflow() {
    let policy = PolicyFlags::default();
    assert!(policy.archive_immediately);
    assert!(!policy.use_workflow);
    assert!(!policy.use_template);
}

#[test]
fn identifier_serializes_tagged() {
    let placeholder = Identifier::Placeholder(row(4));
    let json = serde_json::to_string(&placeholder).expect("serialize");
    assert_eq!(json, r#"{"kind":"placeholder","value":4}"#);
    let round: Identifier = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(round, placeholder);
}

#[test]
fn distinct_rows_give_distinct_placeholders() {
    let a = Identifier::Placeholder(row(1));
    let b = Identifier::Placeholder(row(2));
    assert_ne!(a, b);
    assert_ne!(a, Identifier::Persisted(RecordId::new_v4()));
}

#[test]
fn row_deserializes_without_optional_columns() {
    let json = r#"{"number": 3, "id": null, "values": {"dc.title": ["Paper A"]}}"#;
    let parsed: Row = serde_json::from_str(json).expect("row");
    assert_eq!(parsed.number, row(3));
    assert!(parsed.is_new());
    assert_eq!(parsed.action, "");
    assert_eq!(parsed.first("dc.title"), Some("Paper A"));
}

#[test]
fn field_groups_follow_first_appearance() {
    let title = FieldKey::new("dc", "title", None);
    let subject = FieldKey::new("dc", "subject", None);
    let mut change = ChangeSet::existing(row(1), RecordId::new_v4());
    change.register_add(MetadataValue::plain(subject.clone(), "x"));
    change.register_constant(MetadataValue::plain(title.clone(), "T"));
    change.register_remove(MetadataValue::plain(subject.clone(), "y"));
    let groups = change.field_groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, &subject);
    assert_eq!(groups[0].1.len(), 2);
    assert_eq!(groups[1].0, &title);
}

#[test]
fn diagnostics_name_row_key_and_types() {
    let diagnostic = RelationDiagnostic::TypeMismatch {
        row: Some(row(7)),
        relation_key: "relation.isAuthorOf".to_string(),
        target_type: "Person".to_string(),
        origin_type: "Person".to_string(),
    };
    let text = diagnostic.to_string();
    assert!(text.starts_with("row 7:"));
    assert!(text.contains("relation.isAuthorOf"));
    assert!(text.contains("origin type Person"));
    assert!(text.contains("target type Person"));
}
