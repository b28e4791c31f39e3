#![forbid(unsafe_code)]

//! The canonical document state: page list, source map, outline.
//!
//! [`DocumentModel`] exposes primitive operations only — insert, delete,
//! replace, per-page field setters. The primitives are intentionally dumb:
//! they know nothing about undo, and they are **total** over their inputs.
//! Operating on a missing id is a no-op, not an error; the command layer
//! relies on that for idempotent redo after external drift.
//!
//! # Invariants
//!
//! - Page-list order is the export order.
//! - `rotation` stays normalized in {0, 90, 180, 270} through every setter.
//! - The source map is keyed by `SourceFile::id`.

use std::collections::BTreeMap;

use crate::page::{PageDimensions, PageEntry, PageReference, RedactionMark, normalize_rotation};
use crate::source::{OutlineNode, SourceFile};

/// The canonical page list, source registry, and output outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentModel {
    pages: Vec<PageEntry>,
    sources: BTreeMap<String, SourceFile>,
    outline: Vec<OutlineNode>,
    outline_dirty: bool,
}

impl DocumentModel {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a document from persisted parts (reload path).
    #[must_use]
    pub fn from_parts(
        pages: Vec<PageEntry>,
        sources: BTreeMap<String, SourceFile>,
        outline: Vec<OutlineNode>,
        outline_dirty: bool,
    ) -> Self {
        Self {
            pages,
            sources,
            outline,
            outline_dirty,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The ordered page list.
    #[must_use]
    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    /// Number of entries (pages and dividers).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when the page list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Current index of the entry with `id`.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.pages.iter().position(|entry| entry.id() == id)
    }

    /// The entry with `id`, page or divider.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|entry| entry.id() == id)
    }

    /// The page reference with `id`, if present and not a divider.
    #[must_use]
    pub fn page(&self, id: &str) -> Option<&PageReference> {
        self.entry(id).and_then(PageEntry::as_page)
    }

    /// All pages referencing `source_id`, with their indices, in list order.
    #[must_use]
    pub fn pages_for_source(&self, source_id: &str) -> Vec<(usize, PageReference)> {
        self.pages
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry
                    .as_page()
                    .filter(|page| page.source_file_id == source_id)
                    .map(|page| (index, page.clone()))
            })
            .collect()
    }

    /// The source registry.
    #[must_use]
    pub fn sources(&self) -> &BTreeMap<String, SourceFile> {
        &self.sources
    }

    /// The source with `id`.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&SourceFile> {
        self.sources.get(id)
    }

    /// The editable outline of the assembled document.
    #[must_use]
    pub fn outline(&self) -> &[OutlineNode] {
        &self.outline
    }

    /// True when the outline has unexported edits.
    #[must_use]
    pub fn outline_dirty(&self) -> bool {
        self.outline_dirty
    }

    /// The redaction mark `mark_id` on page `page_id`.
    #[must_use]
    pub fn redaction(&self, page_id: &str, mark_id: &str) -> Option<&RedactionMark> {
        self.page(page_id)
            .and_then(|page| page.redactions.iter().find(|mark| mark.id == mark_id))
    }

    // ========================================================================
    // List primitives
    // ========================================================================

    /// Insert `entries` starting at `index` (clamped to the list length).
    pub fn insert_at(&mut self, index: usize, entries: Vec<PageEntry>) {
        let index = index.min(self.pages.len());
        self.pages.splice(index..index, entries);
    }

    /// Remove every entry whose id is in `ids`, preserving the order of the
    /// rest. Absent ids are ignored. Returns the number removed.
    pub fn delete_by_ids(&mut self, ids: &[String]) -> usize {
        let before = self.pages.len();
        self.pages
            .retain(|entry| !ids.iter().any(|id| id == entry.id()));
        before - self.pages.len()
    }

    /// Replace the whole page list.
    pub fn replace_all(&mut self, entries: Vec<PageEntry>) {
        self.pages = entries;
    }

    // ========================================================================
    // Source primitives
    // ========================================================================

    /// Register source metadata. Keeps the existing record if the id is
    /// already registered.
    pub fn add_source_metadata(&mut self, source: SourceFile) {
        self.sources.entry(source.id.clone()).or_insert(source);
    }

    /// Remove the metadata entry for `id` only — never touches pages.
    /// Returns whether an entry was removed.
    pub fn remove_source_metadata_only(&mut self, id: &str) -> bool {
        self.sources.remove(id).is_some()
    }

    // ========================================================================
    // Per-page setters
    // ========================================================================

    fn page_mut(&mut self, id: &str) -> Option<&mut PageReference> {
        self.pages
            .iter_mut()
            .find(|entry| entry.id() == id)
            .and_then(PageEntry::as_page_mut)
    }

    /// Set a page's rotation (normalized into {0,90,180,270}).
    pub fn set_rotation(&mut self, id: &str, degrees: i32) {
        if let Some(page) = self.page_mut(id) {
            page.rotation = normalize_rotation(degrees);
        }
    }

    /// Add `delta` degrees to a page's rotation, wrapping modulo 360.
    pub fn apply_rotation_delta(&mut self, id: &str, delta: i32) {
        if let Some(page) = self.page_mut(id) {
            page.rotation = normalize_rotation(i32::from(page.rotation) + delta);
        }
    }

    /// Set or clear a page's output-size override.
    pub fn set_target_dimensions(&mut self, id: &str, dimensions: Option<PageDimensions>) {
        if let Some(page) = self.page_mut(id) {
            page.target_dimensions = dimensions;
        }
    }

    /// Fill in a page's cached natural size.
    pub fn set_cached_size(&mut self, id: &str, width: f64, height: f64) {
        if let Some(page) = self.page_mut(id) {
            page.width = Some(width);
            page.height = Some(height);
        }
    }

    /// Add a redaction mark to a page. No-op if the page is missing or a
    /// mark with the same id is already present.
    pub fn add_redaction(&mut self, page_id: &str, mark: RedactionMark) {
        if let Some(page) = self.page_mut(page_id) {
            if !page.redactions.iter().any(|existing| existing.id == mark.id) {
                page.redactions.push(mark);
            }
        }
    }

    /// Replace the mark with `mark.id` on a page. No-op if absent.
    pub fn update_redaction(&mut self, page_id: &str, mark: RedactionMark) {
        if let Some(page) = self.page_mut(page_id) {
            if let Some(existing) = page.redactions.iter_mut().find(|m| m.id == mark.id) {
                *existing = mark;
            }
        }
    }

    /// Remove the mark `mark_id` from a page. Returns whether it was present.
    pub fn remove_redaction(&mut self, page_id: &str, mark_id: &str) -> bool {
        match self.page_mut(page_id) {
            Some(page) => {
                let before = page.redactions.len();
                page.redactions.retain(|mark| mark.id != mark_id);
                page.redactions.len() != before
            }
            None => false,
        }
    }

    // ========================================================================
    // Outline
    // ========================================================================

    /// Replace the whole outline tree and its dirty flag.
    pub fn set_outline(&mut self, outline: Vec<OutlineNode>, dirty: bool) {
        self.outline = outline;
        self.outline_dirty = dirty;
    }
}
