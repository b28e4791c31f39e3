#![forbid(unsafe_code)]

//! Page-list entry types.
//!
//! The document's page list is an ordered `Vec<PageEntry>`. An entry is
//! either a [`PageReference`] — a pointer-like record naming one page of an
//! imported source plus its display transforms — or a [`DividerReference`],
//! a virtual entry with no backing page that marks where export splits the
//! stream into separate output files.
//!
//! # Invariants
//!
//! - Entry ids are unique for the lifetime of the document. Commands that
//!   re-create entries on redo persist their generated ids, so an id may
//!   reappear only as the *same* logical entry.
//! - `rotation` is always one of 0/90/180/270; deltas wrap modulo 360.
//! - List order is the literal export order.

use serde::{Deserialize, Serialize};

/// Normalize a rotation value in degrees into `0..360`.
///
/// Accepts negative and over-rotated inputs (`-90` → `270`, `450` → `90`).
#[must_use]
pub fn normalize_rotation(degrees: i32) -> u16 {
    degrees.rem_euclid(360) as u16
}

/// Explicit output dimensions for a page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

/// A redaction rectangle in page space.
///
/// Coordinates are relative to the unrotated page, in PDF points. The
/// `color` tag mirrors whatever swatch the UI drew the mark with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionMark {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
}

impl RedactionMark {
    /// Create a mark with a fresh id.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64, color: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            x,
            y,
            width,
            height,
            color: color.into(),
        }
    }
}

/// A reference to one page of an imported source document.
///
/// The reference carries display transforms (rotation, target dimensions)
/// and annotations (redactions) but no pixel data; rendering resolves
/// `source_file_id`/`source_page_index` against the source registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReference {
    /// Unique, stable for the page's lifetime in this document.
    pub id: String,
    /// Foreign key into the source-file map.
    pub source_file_id: String,
    /// 0-based page index in the original source document.
    pub source_page_index: u32,
    /// Additive rotation, one of 0/90/180/270.
    #[serde(default)]
    pub rotation: u16,
    /// Opaque batch tag for pages imported together. Not identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Explicit output-size override, if the user resized the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dimensions: Option<PageDimensions>,
    /// Redaction marks drawn on this page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redactions: Vec<RedactionMark>,
    /// Cached natural width in points, filled in by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Cached natural height in points, filled in by the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl PageReference {
    /// Create a reference to `source_page_index` of `source_file_id` with a
    /// fresh id and no transforms.
    #[must_use]
    pub fn new(source_file_id: impl Into<String>, source_page_index: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_file_id: source_file_id.into(),
            source_page_index,
            rotation: 0,
            group_id: None,
            target_dimensions: None,
            redactions: Vec::new(),
            width: None,
            height: None,
        }
    }

    /// Set the import batch tag.
    #[must_use]
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Set the initial rotation (normalized).
    #[must_use]
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotation = normalize_rotation(degrees);
        self
    }

    /// Clone this reference under a caller-supplied id.
    ///
    /// Duplication commands persist their generated ids and pass them back
    /// through here so redo re-creates the exact same entries.
    #[must_use]
    pub fn duplicate_with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self.clone()
        }
    }
}

/// A virtual boundary entry marking an export split point.
///
/// Dividers partition the page list into export segments and carry no other
/// page semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividerReference {
    pub id: String,
    /// Wire-format discriminant; always `true`.
    pub is_divider: bool,
}

impl DividerReference {
    /// Create a divider with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a divider reusing a previously-generated id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_divider: true,
        }
    }
}

impl Default for DividerReference {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of the document's ordered page list.
///
/// Serialized untagged: dividers are `{id, isDivider: true}`, pages carry
/// their full reference record. `isDivider` is required on the divider arm,
/// so a page object can never decode as a divider and vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageEntry {
    Divider(DividerReference),
    Page(PageReference),
}

impl PageEntry {
    /// The entry's id, page or divider alike.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Page(page) => &page.id,
            Self::Divider(divider) => &divider.id,
        }
    }

    /// True for divider entries.
    #[must_use]
    pub fn is_divider(&self) -> bool {
        matches!(self, Self::Divider(_))
    }

    /// The page reference, if this entry is a page.
    #[must_use]
    pub fn as_page(&self) -> Option<&PageReference> {
        match self {
            Self::Page(page) => Some(page),
            Self::Divider(_) => None,
        }
    }

    /// Mutable access to the page reference, if this entry is a page.
    pub fn as_page_mut(&mut self) -> Option<&mut PageReference> {
        match self {
            Self::Page(page) => Some(page),
            Self::Divider(_) => None,
        }
    }
}

impl From<PageReference> for PageEntry {
    fn from(page: PageReference) -> Self {
        Self::Page(page)
    }
}

impl From<DividerReference> for PageEntry {
    fn from(divider: DividerReference) -> Self {
        Self::Divider(divider)
    }
}
