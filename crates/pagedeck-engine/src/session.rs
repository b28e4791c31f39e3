#![forbid(unsafe_code)]

//! Editing session: document + history + debounced persistence.
//!
//! [`Session`] is the explicit object that owns one document's
//! [`DocumentModel`] and [`HistoryStack`] — no module-level singletons, so
//! multiple independent documents can coexist. It feeds a
//! [`PersistenceSink`] with whole [`ProjectSnapshot`]s on a debounce
//! window: every edit restarts the window, the latest snapshot wins, and a
//! crash inside the window loses at most the most recent edits — never the
//! consistency between document and history, because both are written
//! together in one snapshot.
//!
//! The engine is single-threaded and cooperative: `apply`/`undo`/`redo`
//! run synchronously to completion with no suspension points. The only
//! asynchronous effect is the sink write, and the engine treats it as
//! fire-and-forget.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use pagedeck_model::{DocumentModel, OutlineNode, PageEntry, SourceFile};
use serde::{Deserialize, Serialize};
use tracing::debug;
use web_time::Instant;

use crate::command::Command;
use crate::envelope::SerializedCommand;
use crate::history::{HistoryConfig, HistoryStack, RehydrateReport};
use crate::registry::CommandRegistry;

/// One full persisted state: document and history together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub page_list: Vec<PageEntry>,
    pub source_map: BTreeMap<String, SourceFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<OutlineNode>,
    #[serde(default)]
    pub outline_dirty: bool,
    pub serialized_history: Vec<SerializedCommand>,
    /// Index of the most recently executed history entry; `-1` for none.
    pub history_pointer: i64,
}

/// Where snapshots go. Fire-and-forget from the engine's point of view;
/// the implementation owns queuing, IndexedDB plumbing, retries.
pub trait PersistenceSink {
    fn persist(&mut self, snapshot: &ProjectSnapshot);
}

/// A sink that keeps every snapshot in memory. Test double.
#[derive(Debug, Default)]
pub struct MemorySink {
    snapshots: Vec<ProjectSnapshot>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent snapshot, if any was persisted.
    #[must_use]
    pub fn last(&self) -> Option<&ProjectSnapshot> {
        self.snapshots.last()
    }

    /// How many snapshots were persisted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True when nothing was persisted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&mut self, snapshot: &ProjectSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after the last edit before a snapshot is written.
    pub save_delay: Duration,
    /// History stack limits.
    pub history: HistoryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_delay: Duration::from_millis(2000),
            history: HistoryConfig::default(),
        }
    }
}

/// One document's editing state: model, history, and the debounced sink.
pub struct Session<S> {
    document: DocumentModel,
    history: HistoryStack,
    sink: S,
    config: SessionConfig,
    dirty_since: Option<Instant>,
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pages", &self.document.len())
            .field("history", &self.history)
            .field("dirty", &self.dirty_since.is_some())
            .finish()
    }
}

impl<S: PersistenceSink> Session<S> {
    /// Start an empty session.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, SessionConfig::default())
    }

    /// Start an empty session with custom tuning.
    #[must_use]
    pub fn with_config(sink: S, config: SessionConfig) -> Self {
        Self {
            document: DocumentModel::new(),
            history: HistoryStack::new(config.history.clone()),
            sink,
            config,
            dirty_since: None,
        }
    }

    /// Rebuild a session from a persisted snapshot (reload path).
    ///
    /// The document comes back from its own coarse snapshot; history is
    /// rehydrated through `registry` without re-running any command.
    #[must_use]
    pub fn restore(
        snapshot: ProjectSnapshot,
        registry: &CommandRegistry,
        sink: S,
        config: SessionConfig,
    ) -> (Self, RehydrateReport) {
        let document = DocumentModel::from_parts(
            snapshot.page_list,
            snapshot.source_map,
            snapshot.outline,
            snapshot.outline_dirty,
        );
        let (history, report) = HistoryStack::rehydrate(
            &snapshot.serialized_history,
            snapshot.history_pointer,
            registry,
            config.history.clone(),
        );
        let session = Self {
            document,
            history,
            sink,
            config,
            dirty_since: None,
        };
        (session, report)
    }

    /// The document model.
    #[must_use]
    pub fn document(&self) -> &DocumentModel {
        &self.document
    }

    /// The history stack.
    #[must_use]
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Whether edits are waiting for the debounce window.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// The persistence sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Execute `command` through the history stack.
    pub fn apply(&mut self, command: Command) {
        self.history.apply(command, &mut self.document);
        self.mark_dirty();
    }

    /// Undo the most recent entry. Returns its label.
    pub fn undo(&mut self) -> Option<String> {
        let label = self.history.undo(&mut self.document);
        if label.is_some() {
            self.mark_dirty();
        }
        label
    }

    /// Redo the next entry. Returns its label.
    pub fn redo(&mut self) -> Option<String> {
        let label = self.history.redo(&mut self.document);
        if label.is_some() {
            self.mark_dirty();
        }
        label
    }

    /// Walk the history cursor to `target`.
    pub fn jump_to(&mut self, target: Option<usize>) {
        let before = self.history.pointer();
        self.history.jump_to(target, &mut self.document);
        if self.history.pointer() != before {
            self.mark_dirty();
        }
    }

    fn mark_dirty(&mut self) {
        // Every edit restarts the window: the save fires after the *last*
        // edit of a burst, and a later burst supersedes an earlier pending
        // save (last-write-wins over full snapshots).
        self.dirty_since = Some(Instant::now());
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Build the full persisted state of this session.
    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot {
        let (serialized_history, history_pointer) = self.history.serialize_entries();
        ProjectSnapshot {
            page_list: self.document.pages().to_vec(),
            source_map: self.document.sources().clone(),
            outline: self.document.outline().to_vec(),
            outline_dirty: self.document.outline_dirty(),
            serialized_history,
            history_pointer,
        }
    }

    /// Flush a snapshot if the debounce window has elapsed at `now`.
    /// Returns whether a snapshot was written.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.dirty_since {
            Some(since) if now.saturating_duration_since(since) >= self.config.save_delay => {
                self.flush();
                true
            }
            _ => false,
        }
    }

    /// Write a snapshot immediately, regardless of the window.
    pub fn flush(&mut self) {
        let snapshot = self.snapshot();
        debug!(
            entries = snapshot.serialized_history.len(),
            pointer = snapshot.history_pointer,
            "persisting project snapshot"
        );
        self.sink.persist(&snapshot);
        self.dirty_since = None;
    }
}
