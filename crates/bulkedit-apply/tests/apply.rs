use std::cell::RefCell;

use bulkedit_apply::{
    ChangeApplier, CollectingProgress, RecordOutcome, StandardPolicy, SubmissionPolicy, apply,
    apply_with_policy,
};
use bulkedit_core::{
    MemoryRecord, MemoryStore, RecordStore, StaticCatalog, StoreResult, StoredRelationship,
    SubmissionState, scan,
};
use bulkedit_model::{
    ChangeSet, ContainerId, FieldKey, ImportError, ImportOptions, MetadataValue, RecordId,
    RelationshipType, Row, RowNumber,
};
use bulkedit_validate::{RelationPlan, validate};

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

fn store() -> (MemoryStore, ContainerId) {
    let mut store = MemoryStore::new();
    let container = store.add_container("col1", "Articles");
    (store, container)
}

fn person(number: usize, name: &str) -> Row {
    row(number)
        .with_value("dc.title", name)
        .with_value("dspace.entity.type", "Person")
        .with_value("collection", "col1")
}

fn title() -> FieldKey {
    FieldKey::new("dc", "title", None)
}

fn author_of() -> FieldKey {
    FieldKey::new("relation", "isAuthorOf", None)
}

fn run(
    store: &mut MemoryStore,
    options: &ImportOptions,
    rows: Vec<Row>,
    progress: &mut CollectingProgress,
) -> bulkedit_model::Result<bulkedit_apply::ApplyReport> {
    let catalog = catalog();
    let scanned = scan(&*store, options, rows)?;
    let validated = validate(scanned, &*store, &catalog)?;
    apply(&validated, store, &catalog, options, progress)
}

#[test]
fn commits_every_checkpoint_and_after_the_last_record() {
    let (mut store, _) = store();
    let options = ImportOptions::default().with_checkpoint_size(2);
    let rows = (1..=5).map(|n| person(n, &format!("Person {n}"))).collect();
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &options, rows, &mut progress).expect("apply");

    assert_eq!(report.commits, 3);
    assert_eq!(store.commit_count(), 3);
    let ranges: Vec<(usize, usize, usize)> = progress
        .commits
        .iter()
        .map(|commit| (commit.first_row.get(), commit.last_row.get(), commit.total_commits))
        .collect();
    assert_eq!(ranges, vec![(1, 2, 3), (3, 4, 3), (5, 5, 3)]);
    assert_eq!(store.evicted().len(), 5);
    assert!(store.cached().is_empty());
    assert_eq!(progress.records.len(), 5);
}

#[test]
fn forward_reference_becomes_typed_relationship() {
    let (mut store, _) = store();
    let rows = vec![
        row(1)
            .with_value("dc.title", "Paper A")
            .with_value("dspace.entity.type", "Publication")
            .with_value("collection", "col1"),
        person(2, "Person B").with_value("relation.isAuthorOf", "dc.title:Paper A"),
    ];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    assert_eq!(report.count(RecordOutcome::Created), 2);
    let paper = report.placeholders[&RowNumber::FIRST];
    let author = report.placeholders[&RowNumber::new(2).expect("row")];
    let snapshot = store.snapshot();
    assert_eq!(
        snapshot.relationships,
        vec![StoredRelationship {
            type_id: 1,
            left: author,
            right: paper,
        }]
    );
    let stored: Vec<&str> = snapshot
        .record(author)
        .expect("author")
        .values(&author_of())
        .map(|value| value.value.as_str())
        .collect();
    assert_eq!(stored, vec![paper.to_string().as_str()]);
    assert_eq!(
        snapshot.record(paper).expect("paper").state,
        SubmissionState::Archived
    );
}

#[test]
fn changed_field_is_rewritten_and_other_fields_kept() {
    let (mut store, container) = store();
    let subject = FieldKey::new("dc", "subject", None);
    let id = store.seed_record(
        MemoryRecord::new(container)
            .with_value(title(), "Old")
            .with_value(subject.clone(), "keep"),
    );
    let rows = vec![row(1).with_id(id).with_value("dc.title", "New")];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    assert_eq!(report.records[0].outcome, RecordOutcome::Updated);
    let record = store.snapshot().record(id).expect("record");
    let titles: Vec<&str> = record.values(&title()).map(|v| v.value.as_str()).collect();
    assert_eq!(titles, vec!["New"]);
    assert_eq!(record.values(&subject).count(), 1);
}

#[test]
fn replaced_relation_drops_old_relationship() {
    let (mut store, container) = store();
    let old_paper =
        store.seed_record(MemoryRecord::new(container).with_entity_type("Publication"));
    let new_paper =
        store.seed_record(MemoryRecord::new(container).with_entity_type("Publication"));
    let author = store.seed_record(
        MemoryRecord::new(container)
            .with_entity_type("Person")
            .with_value(author_of(), old_paper.to_string()),
    );
    store.seed_relationship(StoredRelationship {
        type_id: 1,
        left: author,
        right: old_paper,
    });
    let rows = vec![row(1)
        .with_id(author)
        .with_value("relation.isAuthorOf", new_paper.to_string())];
    let mut progress = CollectingProgress::default();

    run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    assert_eq!(
        store.relationships(author).expect("relationships"),
        vec![StoredRelationship {
            type_id: 1,
            left: author,
            right: new_paper,
        }]
    );
}

#[test]
fn lifecycle_actions() {
    let (mut store, container) = store();
    let active = store.seed_record(MemoryRecord::new(container).with_value(title(), "A"));
    let withdrawn = store.seed_record(MemoryRecord::new(container).with_value(title(), "B").withdrawn());
    let doomed = store.seed_record(MemoryRecord::new(container).with_value(title(), "C"));
    let rows = vec![
        row(1).with_id(active).with_action("withdraw"),
        row(2).with_id(withdrawn).with_action("withdraw"),
        row(3).with_id(doomed).with_action("expunge"),
    ];
    let options = ImportOptions::default().with_allow_expunge(true);
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &options, rows, &mut progress).expect("apply");

    let outcomes: Vec<(usize, RecordOutcome)> = report
        .records
        .iter()
        .map(|record| (record.row.get(), record.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![(1, RecordOutcome::Withdrawn), (3, RecordOutcome::Deleted)]
    );
    let snapshot = store.snapshot();
    assert!(snapshot.record(active).expect("active").withdrawn);
    assert!(snapshot.record(withdrawn).expect("withdrawn").withdrawn);
    assert!(snapshot.record(doomed).is_none());
}

#[test]
fn failure_keeps_earlier_checkpoints() {
    let (seeded, _) = store();
    let mut store = seeded.with_failing_create(3);
    let options = ImportOptions::default().with_checkpoint_size(2);
    let rows = (1..=4).map(|n| person(n, &format!("Person {n}"))).collect();
    let mut progress = CollectingProgress::default();

    let err = run(&mut store, &options, rows, &mut progress).expect_err("create fails");
    store.abort().expect("abort");

    assert!(matches!(
        err,
        ImportError::Persistence { row: Some(row), .. } if row.get() == 3
    ));
    assert_eq!(store.commit_count(), 1);
    assert_eq!(store.snapshot().records.len(), 2);
    assert_eq!(store.staged().records.len(), 2);
    assert_eq!(progress.commits.len(), 1);
}

#[test]
fn workflow_policy_is_applied_to_new_records() {
    let (mut store, _) = store();
    let options = ImportOptions::default().with_policy(bulkedit_model::PolicyFlags {
        use_workflow: true,
        ..bulkedit_model::PolicyFlags::default()
    });
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &options, vec![person(1, "A")], &mut progress).expect("apply");

    let id = report.records[0].record;
    assert_eq!(
        store.snapshot().record(id).expect("record").state,
        SubmissionState::InWorkflow
    );
}

fn author() -> FieldKey {
    FieldKey::new("dc", "contributor", Some("author"))
}

fn stored_values(store: &MemoryStore, id: RecordId, field: &FieldKey) -> Vec<String> {
    let mut values: Vec<String> = store
        .snapshot()
        .record(id)
        .expect("record")
        .values(field)
        .map(|value| value.value.clone())
        .collect();
    values.sort();
    values
}

#[test]
fn plain_and_feed_columns_for_one_field_are_stored_once() {
    let (mut store, container) = store();
    let id = store.seed_record(
        MemoryRecord::new(container)
            .with_value(author(), "Smith, J")
            .with_value(author(), "Old, B"),
    );
    let rows = vec![row(1)
        .with_id(id)
        .with_value("dc.contributor.author", "Smith, J")
        .with_value("ORCID:dc.contributor.author", "Doe, A")];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    assert_eq!(report.records[0].outcome, RecordOutcome::Updated);
    assert_eq!(
        stored_values(&store, id, &author()),
        vec!["Doe, A".to_string(), "Smith, J".to_string()]
    );
}

#[test]
fn rewrite_skips_repeated_values() {
    let (mut store, container) = store();
    let id = store.seed_record(MemoryRecord::new(container).with_value(author(), "Smith, J"));
    let mut change = ChangeSet::existing(RowNumber::FIRST, id);
    change.register_add(MetadataValue::plain(author(), "Doe, A"));
    change.register_constant(MetadataValue::plain(author(), "Smith, J"));
    change.register_constant(MetadataValue::plain(author(), " Smith, J\n"));
    let catalog = catalog();
    let policy = StandardPolicy::default();
    let plan = RelationPlan::default();

    let mut applier = ChangeApplier::new(&mut store, &catalog, &policy, &plan);
    let applied = applier.apply_change(&change).expect("apply");

    assert_eq!(applied.outcome, RecordOutcome::Updated);
    assert_eq!(
        stored_values(&store, id, &author()),
        vec!["Doe, A".to_string(), "Smith, J".to_string()]
    );
}

#[test]
fn update_points_relation_at_record_created_earlier() {
    let (mut store, container) = store();
    let author = store.seed_record(MemoryRecord::new(container).with_entity_type("Person"));
    let rows = vec![
        row(1)
            .with_value("rowName", "p")
            .with_value("dc.title", "Paper P")
            .with_value("dspace.entity.type", "Publication")
            .with_value("collection", "col1"),
        row(2)
            .with_id(author)
            .with_value("relation.isAuthorOf", "rowName:p"),
    ];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    let paper = report.placeholders[&RowNumber::FIRST];
    assert_eq!(report.records[1].outcome, RecordOutcome::Updated);
    assert_eq!(
        store.relationships(author).expect("relationships"),
        vec![StoredRelationship {
            type_id: 1,
            left: author,
            right: paper,
        }]
    );
    assert_eq!(stored_values(&store, author, &author_of()), vec![paper.to_string()]);
}

#[test]
fn container_changes_move_and_remap_existing_record() {
    let (mut store, old_owner) = store();
    let old_mapped = store.add_container("col2", "Theses");
    let new_owner = store.add_container("col3", "Reports");
    let new_mapped = store.add_container("col4", "Datasets");
    let id = store.seed_record(
        MemoryRecord::new(old_owner)
            .with_value(title(), "Kept")
            .with_mapped(old_mapped),
    );
    let rows = vec![row(1).with_id(id).with_values("collection", ["col3", "col4"])];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    assert_eq!(report.records[0].outcome, RecordOutcome::Updated);
    let record = store.snapshot().record(id).expect("record");
    assert_eq!(record.owning_container, Some(new_owner));
    assert_eq!(record.mapped_containers, vec![new_mapped]);
    assert_eq!(record.values(&title()).count(), 1);
}

#[test]
fn reinstate_and_repeated_withdraw() {
    let (mut store, container) = store();
    let withdrawn =
        store.seed_record(MemoryRecord::new(container).with_value(title(), "A").withdrawn());
    let active = store.seed_record(MemoryRecord::new(container).with_value(title(), "B"));
    let rows = vec![
        row(1).with_id(withdrawn).with_action("reinstate"),
        row(2).with_id(active).with_action("withdraw"),
        row(3).with_id(active).with_action("withdraw"),
    ];
    let mut progress = CollectingProgress::default();

    let report = run(&mut store, &ImportOptions::default(), rows, &mut progress).expect("apply");

    let outcomes: Vec<RecordOutcome> = report.records.iter().map(|record| record.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            RecordOutcome::Reinstated,
            RecordOutcome::Withdrawn,
            RecordOutcome::Unchanged,
        ]
    );
    let snapshot = store.snapshot();
    assert!(!snapshot.record(withdrawn).expect("reinstated").withdrawn);
    assert!(snapshot.record(active).expect("withdrawn").withdrawn);
}

/// Archives and remembers how many mapped containers the record had.
#[derive(Default)]
struct MappedAtFinish {
    seen: RefCell<Vec<usize>>,
}

impl SubmissionPolicy for MappedAtFinish {
    fn use_template(&self) -> bool {
        false
    }

    fn finish(&self, store: &mut dyn RecordStore, id: RecordId) -> StoreResult<()> {
        if let Some(record) = store.find(id)? {
            self.seen.borrow_mut().push(record.mapped_containers.len());
        }
        store.archive(id)
    }
}

#[test]
fn new_record_is_mapped_after_policy_runs() {
    let (mut store, owner) = store();
    let mapped = store.add_container("col2", "Theses");
    let rows = vec![person(1, "A").with_values("collection", ["col1", "col2"])];
    let options = ImportOptions::default();
    let catalog = catalog();
    let policy = MappedAtFinish::default();
    let mut progress = CollectingProgress::default();

    let scanned = scan(&store, &options, rows).expect("scan");
    let validated = validate(scanned, &store, &catalog).expect("validate");
    let report = apply_with_policy(&validated, &mut store, &catalog, &policy, &options, &mut progress)
        .expect("apply");

    assert_eq!(*policy.seen.borrow(), vec![0]);
    let record = store
        .snapshot()
        .record(report.records[0].record)
        .expect("record");
    assert_eq!(record.owning_container, Some(owner));
    assert_eq!(record.mapped_containers, vec![mapped]);
    assert_eq!(record.state, SubmissionState::Archived);
}
