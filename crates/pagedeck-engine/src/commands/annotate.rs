#![forbid(unsafe_code)]

//! Per-page field edits: rotation, resize, redactions, outline.
//!
//! These commands never move entries; their inverses are either a negated
//! delta (rotate), a captured previous value (resize, redaction delete), or
//! a stored previous/next pair (redaction update, outline).

use pagedeck_model::{DocumentModel, OutlineNode, PageDimensions, RedactionMark};
use serde::{Deserialize, Serialize};

use crate::command::CommandError;

/// Clockwise quarter-turn delta.
pub const ROTATE_CLOCKWISE: i32 = 90;
/// Counter-clockwise quarter-turn delta.
pub const ROTATE_COUNTER_CLOCKWISE: i32 = -90;

// ---------------------------------------------------------------------------
// RotatePages
// ---------------------------------------------------------------------------

/// Apply a quarter-turn to each targeted page, wrapping modulo 360.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatePages {
    pub page_ids: Vec<String>,
    pub degrees: i32,
}

impl RotatePages {
    /// Stage a rotation of `degrees` for every page in `page_ids`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::EmptyTargets`] if `page_ids` is empty.
    /// - [`CommandError::InvalidRotation`] unless `degrees` is exactly
    ///   [`ROTATE_CLOCKWISE`] or [`ROTATE_COUNTER_CLOCKWISE`] — this command
    ///   does not support arbitrary angles.
    pub fn new(page_ids: Vec<String>, degrees: i32) -> Result<Self, CommandError> {
        if page_ids.is_empty() {
            return Err(CommandError::EmptyTargets {
                command: "rotate pages",
            });
        }
        if degrees != ROTATE_CLOCKWISE && degrees != ROTATE_COUNTER_CLOCKWISE {
            return Err(CommandError::InvalidRotation { degrees });
        }
        Ok(Self { page_ids, degrees })
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        for id in &self.page_ids {
            doc.apply_rotation_delta(id, self.degrees);
        }
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        for id in &self.page_ids {
            doc.apply_rotation_delta(id, -self.degrees);
        }
    }
}

// ---------------------------------------------------------------------------
// ResizePages
// ---------------------------------------------------------------------------

/// A page's dimension override as it was before the resize.
///
/// `dimensions` stays on the wire even when `None`: "no override" is a
/// restorable state, not an omission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedDimensions {
    pub page_id: String,
    pub dimensions: Option<PageDimensions>,
}

/// Set (or clear) the output-size override of each targeted page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePages {
    pub page_ids: Vec<String>,
    pub dimensions: Option<PageDimensions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    previous: Vec<CapturedDimensions>,
}

impl ResizePages {
    /// Stage a resize to `dimensions` (`None` clears the override).
    ///
    /// # Errors
    ///
    /// - [`CommandError::EmptyTargets`] if `page_ids` is empty.
    /// - [`CommandError::InvalidDimensions`] if the new size is not finite
    ///   and strictly positive.
    pub fn new(
        page_ids: Vec<String>,
        dimensions: Option<PageDimensions>,
    ) -> Result<Self, CommandError> {
        if page_ids.is_empty() {
            return Err(CommandError::EmptyTargets {
                command: "resize pages",
            });
        }
        if let Some(dims) = dimensions {
            let valid = dims.width.is_finite()
                && dims.height.is_finite()
                && dims.width > 0.0
                && dims.height > 0.0;
            if !valid {
                return Err(CommandError::InvalidDimensions {
                    width: dims.width,
                    height: dims.height,
                });
            }
        }
        Ok(Self {
            page_ids,
            dimensions,
            previous: Vec::new(),
        })
    }

    /// Captured previous overrides, one per page found on first execute.
    #[must_use]
    pub fn previous(&self) -> &[CapturedDimensions] {
        &self.previous
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        if self.previous.is_empty() {
            for id in &self.page_ids {
                if let Some(page) = doc.page(id) {
                    self.previous.push(CapturedDimensions {
                        page_id: id.clone(),
                        dimensions: page.target_dimensions,
                    });
                }
            }
        }
        for id in &self.page_ids {
            doc.set_target_dimensions(id, self.dimensions);
        }
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        for captured in &self.previous {
            doc.set_target_dimensions(&captured.page_id, captured.dimensions);
        }
    }
}

// ---------------------------------------------------------------------------
// Redactions
// ---------------------------------------------------------------------------

/// Add one redaction mark to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRedaction {
    pub page_id: String,
    pub mark: RedactionMark,
}

impl AddRedaction {
    /// Stage `mark` for addition to `page_id`.
    ///
    /// # Errors
    ///
    /// [`CommandError::InvalidDimensions`] if the mark rectangle is not
    /// finite and strictly positive.
    pub fn new(page_id: impl Into<String>, mark: RedactionMark) -> Result<Self, CommandError> {
        let valid = mark.width.is_finite()
            && mark.height.is_finite()
            && mark.width > 0.0
            && mark.height > 0.0;
        if !valid {
            return Err(CommandError::InvalidDimensions {
                width: mark.width,
                height: mark.height,
            });
        }
        Ok(Self {
            page_id: page_id.into(),
            mark,
        })
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        doc.add_redaction(&self.page_id, self.mark.clone());
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        doc.remove_redaction(&self.page_id, &self.mark.id);
    }
}

/// Replace a redaction mark, keeping both versions for symmetric undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRedaction {
    pub page_id: String,
    previous: RedactionMark,
    next: RedactionMark,
}

impl UpdateRedaction {
    /// Stage the change of `previous` into `next` on `page_id`.
    ///
    /// # Errors
    ///
    /// [`CommandError::RedactionIdMismatch`] if the two marks do not share
    /// an id — an update may not change mark identity.
    pub fn new(
        page_id: impl Into<String>,
        previous: RedactionMark,
        next: RedactionMark,
    ) -> Result<Self, CommandError> {
        if previous.id != next.id {
            return Err(CommandError::RedactionIdMismatch {
                previous: previous.id,
                next: next.id,
            });
        }
        Ok(Self {
            page_id: page_id.into(),
            previous,
            next,
        })
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        doc.update_redaction(&self.page_id, self.next.clone());
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        doc.update_redaction(&self.page_id, self.previous.clone());
    }
}

/// Remove a redaction mark, capturing it on first execute for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRedaction {
    pub page_id: String,
    pub mark_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    removed: Option<RedactionMark>,
}

impl DeleteRedaction {
    /// Stage removal of `mark_id` from `page_id`.
    #[must_use]
    pub fn new(page_id: impl Into<String>, mark_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            mark_id: mark_id.into(),
            removed: None,
        }
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        if self.removed.is_none() {
            self.removed = doc.redaction(&self.page_id, &self.mark_id).cloned();
        }
        doc.remove_redaction(&self.page_id, &self.mark_id);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        if let Some(mark) = &self.removed {
            doc.add_redaction(&self.page_id, mark.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateOutline
// ---------------------------------------------------------------------------

/// Replace the document outline tree, whole-snapshot, dirty flag included.
///
/// Mirrors the reorder pattern: no tree diffing, just both snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutline {
    previous: Vec<OutlineNode>,
    next: Vec<OutlineNode>,
    previous_dirty: bool,
    next_dirty: bool,
}

impl UpdateOutline {
    /// Stage the outline change from `(previous, previous_dirty)` to
    /// `(next, next_dirty)`.
    #[must_use]
    pub fn new(
        previous: Vec<OutlineNode>,
        previous_dirty: bool,
        next: Vec<OutlineNode>,
        next_dirty: bool,
    ) -> Self {
        Self {
            previous,
            next,
            previous_dirty,
            next_dirty,
        }
    }

    pub(crate) fn execute(&mut self, doc: &mut DocumentModel) {
        doc.set_outline(self.next.clone(), self.next_dirty);
    }

    pub(crate) fn undo(&mut self, doc: &mut DocumentModel) {
        doc.set_outline(self.previous.clone(), self.previous_dirty);
    }
}
