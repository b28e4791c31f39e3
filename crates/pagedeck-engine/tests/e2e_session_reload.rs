#![forbid(unsafe_code)]

//! End-to-end session lifecycle: edit, persist, reload, keep undoing.
//!
//! Validates:
//! - A realistic editing session (import, reorder, rotate, redact, split,
//!   batch import) producing one consistent snapshot.
//! - The snapshot surviving a JSON round trip, as it would through
//!   IndexedDB.
//! - A restored session whose history undoes/redoes identically without
//!   any command being re-executed during restore.
//! - Partial restoration when an envelope in stored history is corrupt.

use pagedeck_engine::{
    AddPages, AddRedaction, BatchCommand, Command, CommandKind, CommandRegistry, DeletePages,
    DuplicatePages, HistoryConfig, MemorySink, ReorderPages, RotatePages, Session, SessionConfig,
    SplitGroup, commands::annotate::ROTATE_CLOCKWISE, serialize,
};
use pagedeck_engine::{ProjectSnapshot, SerializedCommand};
use pagedeck_model::{DocumentModel, PageEntry, PageReference, RedactionMark, SourceFile};
use serde_json::json;

fn source(id: &str, filename: &str, pages: u32) -> SourceFile {
    let mut source = SourceFile::new(filename, pages, 1024 * u64::from(pages));
    source.id = id.to_string();
    source
}

fn page(id: &str, source_id: &str, index: u32) -> PageReference {
    let mut page = PageReference::new(source_id, index);
    page.id = id.to_string();
    page
}

fn entry_ids(doc: &DocumentModel) -> Vec<&str> {
    doc.pages().iter().map(PageEntry::id).collect()
}

/// Runs a realistic editing session and returns it with 6 history entries.
fn edited_session() -> Session<MemorySink> {
    let mut session = Session::new(MemorySink::new());

    // 1. Import a three-page report.
    let import = AddPages::new(
        session.document(),
        source("report", "report.pdf", 3),
        vec![
            page("a", "report", 0),
            page("b", "report", 1),
            page("c", "report", 2),
        ],
        0,
    )
    .unwrap();
    session.apply(Command::new(CommandKind::AddPages(import)));

    // 2. Reorder [a,b,c] -> [c,b,a].
    let previous = session.document().pages().to_vec();
    let next: Vec<PageEntry> = ["c", "b", "a"]
        .iter()
        .map(|id| session.document().entry(id).cloned().unwrap())
        .collect();
    session.apply(Command::new(CommandKind::ReorderPages(
        ReorderPages::new(previous, next).unwrap(),
    )));

    // 3. Rotate the new first page.
    session.apply(Command::new(CommandKind::RotatePages(
        RotatePages::new(vec!["c".into()], ROTATE_CLOCKWISE).unwrap(),
    )));

    // 4. Redact something on page b.
    let mut mark = RedactionMark::new(72.0, 72.0, 144.0, 24.0, "#000000");
    mark.id = "m1".into();
    session.apply(Command::new(CommandKind::AddRedaction(
        AddRedaction::new("b", mark).unwrap(),
    )));

    // 5. Split the output after the first page.
    session.apply(Command::new(CommandKind::SplitGroup(SplitGroup::new(1))));

    // 6. Batch-import a scanned appendix: source + pages as one entry.
    let doc = session.document();
    let appendix = AddPages::new(
        doc,
        source("scan", "appendix.png", 1),
        vec![page("s0", "scan", 0)],
        doc.len(),
    )
    .unwrap();
    let duplicate = DuplicatePages::new(vec!["s0".into()]).unwrap();
    let batch = BatchCommand::new(vec![
        Command::new(CommandKind::AddPages(appendix)),
        Command::new(CommandKind::DuplicatePages(duplicate)),
    ])
    .unwrap();
    session.apply(Command::new(CommandKind::Batch(batch)).with_label("Import appendix"));

    session
}

#[test]
fn session_edits_accumulate_into_one_consistent_snapshot() {
    let session = edited_session();
    let doc = session.document();

    // [divider shifts]: c, divider, b, a, s0, s0-copy
    assert_eq!(doc.len(), 6);
    assert_eq!(entry_ids(doc)[0], "c");
    assert!(doc.pages()[1].is_divider());
    assert_eq!(doc.page("c").unwrap().rotation, 90);
    assert_eq!(doc.page("b").unwrap().redactions.len(), 1);
    assert_eq!(doc.sources().len(), 2);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.serialized_history.len(), 6);
    assert_eq!(snapshot.history_pointer, 5);
}

#[test]
fn snapshot_reloads_into_an_equivalent_session() {
    let session = edited_session();
    let snapshot = session.snapshot();

    // Through the wire, as IndexedDB would store it.
    let stored = serde_json::to_string(&snapshot).unwrap();
    let loaded: ProjectSnapshot = serde_json::from_str(&stored).unwrap();
    assert_eq!(loaded, snapshot);

    let registry = CommandRegistry::with_builtins();
    let (restored, report) = Session::restore(
        loaded,
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );
    assert_eq!(report.restored, 6);
    assert_eq!(report.skipped, 0);

    // Restore materialized the document without executing anything.
    assert_eq!(restored.document(), session.document());
    assert_eq!(restored.history().pointer(), 5);
}

#[test]
fn restored_history_undoes_all_the_way_back_and_redoes_forward() {
    let session = edited_session();
    let final_doc = session.document().clone();

    let registry = CommandRegistry::with_builtins();
    let (mut restored, _) = Session::restore(
        session.snapshot(),
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );

    // Walk all six entries back: the document empties out completely.
    assert_eq!(restored.undo().as_deref(), Some("Import appendix"));
    assert_eq!(restored.document().len(), 4);
    assert!(restored.document().source("scan").is_none());

    for _ in 0..5 {
        assert!(restored.undo().is_some());
    }
    assert!(restored.undo().is_none());
    assert!(restored.document().is_empty());
    assert!(restored.document().sources().is_empty());

    // And forward again to the exact final state.
    restored.jump_to(Some(5));
    assert_eq!(restored.document(), &final_doc);
}

#[test]
fn undo_between_snapshot_and_reload_is_preserved_by_pointer() {
    let mut session = edited_session();
    let full_doc = session.document().clone();
    session.undo();
    session.undo();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.serialized_history.len(), 6);
    assert_eq!(snapshot.history_pointer, 3);

    let registry = CommandRegistry::with_builtins();
    let (mut restored, _) = Session::restore(
        snapshot,
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );

    // The two undone entries are redoable after reload.
    assert_eq!(restored.history().redo_labels(10).len(), 2);
    restored.redo();
    restored.redo();
    assert_eq!(restored.document(), &full_doc);
}

#[test]
fn corrupt_history_entry_degrades_to_partial_restore() {
    let session = edited_session();
    let mut snapshot = session.snapshot();

    // Corrupt the rotate entry the way a half-written store would.
    snapshot.serialized_history[2] = SerializedCommand {
        type_tag: "rotatePages".into(),
        payload: json!({ "id": "c3", "pageIds": 17 }),
        timestamp: 0,
        version: 2,
    };

    let registry = CommandRegistry::with_builtins();
    let (restored, report) = Session::restore(
        snapshot,
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );

    assert_eq!(report.restored, 5);
    assert_eq!(report.skipped, 1);
    // Pointer shifted down past the dropped entry.
    assert_eq!(restored.history().pointer(), 4);
    // The document itself is untouched by the bad entry.
    assert_eq!(restored.document(), session.document());
}

#[test]
fn delete_survives_reload_then_restores_exact_indices() {
    // Delete pages at positions [1,3,5], persist mid-undo-cycle, reload,
    // and verify the ascending-index restore still lands exactly.
    let mut session = Session::new(MemorySink::new());
    let import = AddPages::new(
        session.document(),
        source("s", "six.pdf", 6),
        (0..6).map(|i| page(&format!("p{i}"), "s", i)).collect(),
        0,
    )
    .unwrap();
    session.apply(Command::new(CommandKind::AddPages(import)));
    session.apply(Command::new(CommandKind::DeletePages(
        DeletePages::new(vec!["p1".into(), "p3".into(), "p5".into()]).unwrap(),
    )));
    assert_eq!(entry_ids(session.document()), ["p0", "p2", "p4"]);

    let registry = CommandRegistry::with_builtins();
    let (mut restored, _) = Session::restore(
        session.snapshot(),
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );

    restored.undo();
    assert_eq!(
        entry_ids(restored.document()),
        ["p0", "p1", "p2", "p3", "p4", "p5"]
    );
    restored.redo();
    assert_eq!(entry_ids(restored.document()), ["p0", "p2", "p4"]);
}

#[test]
fn history_cap_applies_to_rehydrated_stacks_too() {
    let mut session = Session::with_config(
        MemorySink::new(),
        SessionConfig {
            history: HistoryConfig::unlimited(),
            ..SessionConfig::default()
        },
    );
    for _ in 0..60 {
        session.apply(Command::new(CommandKind::SplitGroup(SplitGroup::new(0))));
    }
    let snapshot = session.snapshot();
    assert_eq!(snapshot.serialized_history.len(), 60);

    let registry = CommandRegistry::with_builtins();
    let (restored, _) = Session::restore(
        snapshot,
        &registry,
        MemorySink::new(),
        SessionConfig::default(),
    );
    assert_eq!(restored.history().len(), 50);
    assert_eq!(restored.history().pointer(), 49);
}

#[test]
fn every_envelope_round_trips_through_its_own_serialization() {
    let session = edited_session();
    let registry = CommandRegistry::with_builtins();
    for entry in session.history().entries() {
        let envelope = serialize(&entry.command).unwrap();
        let decoded = registry.decode(&envelope).unwrap();
        assert_eq!(&decoded, &entry.command);
    }
}
