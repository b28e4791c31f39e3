#![forbid(unsafe_code)]

//! Source-file registry records.
//!
//! A [`SourceFile`] is the metadata record for one imported document; many
//! page references may point at one source. Identity is `id` —
//! `page_count` and `file_size` are immutable once imported, and replacing
//! a source means importing it again under a new id.

use serde::{Deserialize, Serialize};

use crate::now_ms;

/// Document-info metadata carried over from the imported file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Per-page metadata captured at import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Natural width in PDF points.
    pub width: f64,
    /// Natural height in PDF points.
    pub height: f64,
    /// Page label ("iv", "A-2", ...) if the source defines one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One node of an outline (bookmark) tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineNode {
    pub id: String,
    pub title: String,
    /// Target page entry, if the bookmark points into the page list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Create a leaf node with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            page_id: None,
            children: Vec::new(),
        }
    }

    /// Point this node at a page entry.
    #[must_use]
    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    /// Attach a child node.
    #[must_use]
    pub fn with_child(mut self, child: OutlineNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Metadata record for one imported source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: String,
    pub filename: String,
    pub page_count: u32,
    pub file_size: u64,
    /// Milliseconds since the Unix epoch.
    pub added_at: u64,
    /// UI color tag.
    pub color: String,
    /// Outline imported from the source, read-only after import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SourceMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_meta_data: Vec<PageMeta>,
    /// True when the source is an imported image wrapped as a one-page doc.
    #[serde(default)]
    pub is_image_source: bool,
}

impl SourceFile {
    /// Register a newly imported file with a fresh id, stamped now.
    #[must_use]
    pub fn new(filename: impl Into<String>, page_count: u32, file_size: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            page_count,
            file_size,
            added_at: now_ms(),
            color: String::new(),
            outline: None,
            metadata: None,
            page_meta_data: Vec::new(),
            is_image_source: false,
        }
    }

    /// Set the UI color tag.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Mark the source as a wrapped image import.
    #[must_use]
    pub fn as_image_source(mut self) -> Self {
        self.is_image_source = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_file_defaults() {
        let src = SourceFile::new("report.pdf", 12, 40_960);
        assert_eq!(src.page_count, 12);
        assert_eq!(src.file_size, 40_960);
        assert!(!src.is_image_source);
        assert!(src.added_at > 0);
    }

    #[test]
    fn outline_builder_nests() {
        let node = OutlineNode::new("Chapter 1")
            .with_page("p1")
            .with_child(OutlineNode::new("Section 1.1"));
        assert_eq!(node.page_id.as_deref(), Some("p1"));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].title, "Section 1.1");
    }

    #[test]
    fn wire_format_skips_empty_optionals() {
        let src = SourceFile::new("scan.png", 1, 512).as_image_source();
        let json = serde_json::to_value(&src).unwrap();
        assert_eq!(json["isImageSource"], true);
        assert!(json.get("outline").is_none());
        assert!(json.get("pageMetaData").is_none());
        assert!(json.get("addedAt").is_some());
    }
}
