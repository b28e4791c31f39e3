#![forbid(unsafe_code)]

//! Structural page-list commands.
//!
//! These are the commands whose inverses depend on *position*, not just
//! presence. Two ordering rules carry the correctness of the whole engine:
//!
//! - **Restore ascending**: deleted entries go back lowest-index first, so
//!   later insertions land at their recorded index without being shifted by
//!   earlier ones. Restoring descending silently corrupts positions whenever
//!   two or more non-adjacent entries were removed.
//! - **Insert descending**: duplication processes targets highest-index
//!   first, so inserting a copy never shifts the index of a target that has
//!   not been processed yet.

use pagedeck_model::{
    DividerReference, DocumentModel, PageEntry, PageReference, SourceFile,
};
use serde::{Deserialize, Serialize};

use crate::command::CommandError;

use super::PageSnapshot;

// ---------------------------------------------------------------------------
// AddPages
// ---------------------------------------------------------------------------

/// Insert imported page references (and their source metadata) at an index.
///
/// The source record is only registered if it was absent when the command
/// was constructed; `adds_source` remembers that decision so undo removes
/// the metadata exactly when this command created it, and pages can be
/// appended to an already-registered source without duplicating metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPages {
    pub source: SourceFile,
    pub pages: Vec<PageReference>,
    pub index: usize,
    adds_source: bool,
}

impl AddPages {
    /// Stage `pages` of `source` for insertion at `index`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::EmptyTargets`] if `pages` is empty.
    /// - [`CommandError::SourceMismatch`] if a page references a different
    ///   source than the metadata record supplied.
    pub fn new(
        doc: &DocumentModel,
        source: SourceFile,
        pages: Vec<PageReference>,
        index: usize,
    ) -> Result<Self, CommandError> {
        if pages.is_empty() {
            return Err(CommandError::EmptyTargets { command: "add pages" });
        }
        if let Some(page) = pages.iter().find(|page| page.source_file_id != source.id) {
            return Err(CommandError::SourceMismatch {
                expected: source.id.clone(),
                found: page.source_file_id.clone(),
            });
        }
        let adds_source = doc.source(&source.id).is_none();
        Ok(Self {
            source,
            pages,
            index,
            adds_source,
        })
    }

    /// Whether this command registers the source metadata itself.
    #[must_use]
    pub fn adds_source(&self) -> bool {
        self.adds_source
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        if self.adds_source {
            doc.add_source_metadata(self.source.clone());
        }
        let entries = self.pages.iter().cloned().map(PageEntry::from).collect();
        doc.insert_at(self.index, entries);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        let ids: Vec<String> = self.pages.iter().map(|page| page.id.clone()).collect();
        doc.delete_by_ids(&ids);
        if self.adds_source {
            doc.remove_source_metadata_only(&self.source.id);
        }
    }
}

// ---------------------------------------------------------------------------
// DeletePages
// ---------------------------------------------------------------------------

/// Remove entries by id, restorable to their exact original indices.
///
/// Snapshots are captured on the *first* execute only; the buffer staying
/// non-empty is what distinguishes redo from first run, with no external
/// flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePages {
    pub page_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    snapshots: Vec<PageSnapshot>,
}

impl DeletePages {
    /// Stage the entries in `page_ids` for deletion.
    ///
    /// # Errors
    ///
    /// [`CommandError::EmptyTargets`] if `page_ids` is empty.
    pub fn new(page_ids: Vec<String>) -> Result<Self, CommandError> {
        if page_ids.is_empty() {
            return Err(CommandError::EmptyTargets {
                command: "delete pages",
            });
        }
        Ok(Self {
            page_ids,
            snapshots: Vec::new(),
        })
    }

    /// Captured `{entry, index}` snapshots, in ascending-index order.
    #[must_use]
    pub fn snapshots(&self) -> &[PageSnapshot] {
        &self.snapshots
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        if self.snapshots.is_empty() {
            // One scan, in list order — the captures come out ascending.
            for (index, entry) in doc.pages().iter().enumerate() {
                if self.page_ids.iter().any(|id| id == entry.id()) {
                    self.snapshots.push(PageSnapshot {
                        index,
                        entry: entry.clone(),
                    });
                }
            }
        }
        doc.delete_by_ids(&self.page_ids);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        // Ascending restore: lowest index first.
        for snapshot in &self.snapshots {
            doc.insert_at(snapshot.index, vec![snapshot.entry.clone()]);
        }
    }
}

// ---------------------------------------------------------------------------
// DuplicatePages
// ---------------------------------------------------------------------------

/// Record of one duplicated page: which original it copies, the id the copy
/// was created under, and where it landed on first execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCopy {
    pub original_id: String,
    pub new_id: String,
    pub inserted_at: usize,
}

/// Insert a copy of each targeted page immediately after its original.
///
/// Copy ids are generated once, on first execute, and persisted in `copies`
/// so redo re-creates the exact same entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePages {
    pub page_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    copies: Vec<PageCopy>,
}

impl DuplicatePages {
    /// Stage the pages in `page_ids` for duplication.
    ///
    /// # Errors
    ///
    /// [`CommandError::EmptyTargets`] if `page_ids` is empty.
    pub fn new(page_ids: Vec<String>) -> Result<Self, CommandError> {
        if page_ids.is_empty() {
            return Err(CommandError::EmptyTargets {
                command: "duplicate pages",
            });
        }
        Ok(Self {
            page_ids,
            copies: Vec::new(),
        })
    }

    /// The copies this command created, in original relative order.
    #[must_use]
    pub fn copies(&self) -> &[PageCopy] {
        &self.copies
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        if self.copies.is_empty() {
            // First run: locate targets, then process highest index first so
            // insertions never shift a not-yet-processed target.
            let mut located: Vec<(usize, PageReference)> = self
                .page_ids
                .iter()
                .filter_map(|id| {
                    doc.index_of(id)
                        .and_then(|index| doc.page(id).cloned().map(|page| (index, page)))
                })
                .collect();
            located.sort_by(|a, b| b.0.cmp(&a.0));

            for (index, page) in located {
                let new_id = uuid::Uuid::new_v4().to_string();
                doc.insert_at(index + 1, vec![page.duplicate_with_id(&new_id).into()]);
                self.copies.push(PageCopy {
                    original_id: page.id,
                    new_id,
                    inserted_at: index + 1,
                });
            }
            // Collected in descending-processing order; one reversal reports
            // them in original relative order.
            self.copies.reverse();
        } else {
            // Redo: reuse the persisted ids, same descending discipline.
            let mut located: Vec<(usize, PageReference, String)> = self
                .copies
                .iter()
                .filter_map(|copy| {
                    doc.index_of(&copy.original_id).and_then(|index| {
                        doc.page(&copy.original_id)
                            .cloned()
                            .map(|page| (index, page, copy.new_id.clone()))
                    })
                })
                .collect();
            located.sort_by(|a, b| b.0.cmp(&a.0));

            for (index, page, new_id) in located {
                doc.insert_at(index + 1, vec![page.duplicate_with_id(new_id).into()]);
            }
        }
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        // Id-based deletion is index-order-agnostic.
        let ids: Vec<String> = self.copies.iter().map(|copy| copy.new_id.clone()).collect();
        doc.delete_by_ids(&ids);
    }
}

// ---------------------------------------------------------------------------
// ReorderPages
// ---------------------------------------------------------------------------

/// Replace the whole page-list order.
///
/// Stores both full snapshots rather than a diff: any reordering strategy
/// (drag-drop, move-to-position, keyboard move) reduces to "compute the new
/// full order, construct this command", and the inverse is trivially exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPages {
    previous: Vec<PageEntry>,
    next: Vec<PageEntry>,
}

impl ReorderPages {
    /// Stage a whole-list reorder from `previous` to `next`.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotAPermutation`] if the two orders do not hold the
    /// same entry ids.
    pub fn new(previous: Vec<PageEntry>, next: Vec<PageEntry>) -> Result<Self, CommandError> {
        let mut previous_ids: Vec<&str> = previous.iter().map(PageEntry::id).collect();
        let mut next_ids: Vec<&str> = next.iter().map(PageEntry::id).collect();
        previous_ids.sort_unstable();
        next_ids.sort_unstable();
        if previous_ids != next_ids {
            return Err(CommandError::NotAPermutation);
        }
        Ok(Self { previous, next })
    }

    /// The order this command applies.
    #[must_use]
    pub fn next_order(&self) -> &[PageEntry] {
        &self.next
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        doc.replace_all(self.next.clone());
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        doc.replace_all(self.previous.clone());
    }
}

// ---------------------------------------------------------------------------
// SplitGroup
// ---------------------------------------------------------------------------

/// Insert an export-split divider at an index.
///
/// The divider id is generated once, at construction, so undo (and any
/// later "remove this exact divider") always targets the same instance, and
/// redo never mints a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitGroup {
    pub index: usize,
    divider_id: String,
}

impl SplitGroup {
    /// Stage a divider insertion at `index` (clamped to the list length).
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            divider_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// The id of the divider this command inserts.
    #[must_use]
    pub fn divider_id(&self) -> &str {
        &self.divider_id
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        let divider = DividerReference::with_id(self.divider_id.clone());
        doc.insert_at(self.index, vec![divider.into()]);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        doc.delete_by_ids(&[self.divider_id.clone()]);
    }
}

// ---------------------------------------------------------------------------
// RemoveSource
// ---------------------------------------------------------------------------

/// Remove a source and every page that references it.
///
/// Construction captures `{page, index}` snapshots for the whole source, so
/// execute deletes precisely those ids and then drops only the metadata
/// entry — never a mass delete-by-source sweep. Reconstruction from storage
/// supplies the same snapshots through the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSource {
    pub source_id: String,
    source: SourceFile,
    snapshots: Vec<PageSnapshot>,
}

impl RemoveSource {
    /// Stage removal of `source_id` and its referencing pages.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnknownSource`] if the source is not registered.
    pub fn new(doc: &DocumentModel, source_id: impl Into<String>) -> Result<Self, CommandError> {
        let source_id = source_id.into();
        let source = doc
            .source(&source_id)
            .cloned()
            .ok_or_else(|| CommandError::UnknownSource {
                source_id: source_id.clone(),
            })?;
        let snapshots = doc
            .pages_for_source(&source_id)
            .into_iter()
            .map(|(index, page)| PageSnapshot {
                index,
                entry: page.into(),
            })
            .collect();
        Ok(Self {
            source_id,
            source,
            snapshots,
        })
    }

    /// Captured `{page, index}` snapshots, in ascending-index order.
    #[must_use]
    pub fn snapshots(&self) -> &[PageSnapshot] {
        &self.snapshots
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        let ids: Vec<String> = self
            .snapshots
            .iter()
            .map(|snapshot| snapshot.entry.id().to_string())
            .collect();
        doc.delete_by_ids(&ids);
        doc.remove_source_metadata_only(&self.source_id);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        if doc.source(&self.source_id).is_none() {
            doc.add_source_metadata(self.source.clone());
        }
        for snapshot in &self.snapshots {
            doc.insert_at(snapshot.index, vec![snapshot.entry.clone()]);
        }
    }
}
