// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Tablewerk table extractor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one processed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub Uuid);

impl DocId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input PDF and its identity for the duration of a run.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    pub doc_id: DocId,
    pub path: PathBuf,
    /// Base name of `path`, used in every output record.
    pub filename: String,
}

impl DocumentJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            doc_id: DocId::new(),
            path,
            filename,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Closed set of layout categories, resolved once from the external
/// classifier's category string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Title,
    Paragraph,
    Table,
    Image,
    Footer,
    Unknown,
}

impl ElementKind {
    /// Map a classifier category (`"NarrativeText"`, `"Table"`, ...) to a kind.
    /// Matching is case-insensitive; unrecognised categories are `Unknown`.
    pub fn from_category(category: &str) -> Self {
        match category.trim().to_ascii_lowercase().as_str() {
            "title" => Self::Title,
            "narrativetext" | "uncategorizedtext" | "listitem" | "paragraph" => Self::Paragraph,
            "table" => Self::Table,
            "image" | "figurecaption" => Self::Image,
            "footer" | "header" => Self::Footer,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name used in output records and statistics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Paragraph => "paragraph",
            Self::Table => "table",
            Self::Image => "image",
            Self::Footer => "footer",
            Self::Unknown => "unknown",
        }
    }
}

/// Axis-aligned region `[x0, y0, x1, y1]` in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl BoundingBox {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from classifier corner points. Points 0 (top-left) and 2
    /// (bottom-right) define the box; coordinates are truncated toward zero.
    pub fn from_points(points: &[[f64; 2]]) -> Option<Self> {
        let top_left = points.first()?;
        let bottom_right = points.get(2)?;
        Some(Self::new(
            top_left[0] as i64,
            top_left[1] as i64,
            bottom_right[0] as i64,
            bottom_right[1] as i64,
        ))
    }

    pub fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from([x0, y0, x1, y1]: [i64; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x0, bbox.y0, bbox.x1, bbox.y1]
    }
}

/// A classified page region supplied by the external layout model.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutElement {
    pub kind: ElementKind,
    /// 1-based page number; 0 when the classifier gave none.
    pub page_number: u32,
    pub bbox: Option<BoundingBox>,
    pub text: Option<String>,
}

impl LayoutElement {
    pub fn is_table(&self) -> bool {
        self.kind == ElementKind::Table
    }

    /// 0-based page index as written to output records.
    pub fn page_index(&self) -> u32 {
        self.page_number.saturating_sub(1)
    }
}

/// Candidate cell rectangle in table-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Row-major arrangement of cell boxes.
///
/// Rows are ordered top-to-bottom and each row left-to-right. Every row is
/// non-empty; rows may differ in length (ragged rows are not padded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<CellBox>>,
}

impl Grid {
    /// Build a grid, dropping any empty rows.
    pub fn from_rows(rows: Vec<Vec<CellBox>>) -> Self {
        Self {
            rows: rows.into_iter().filter(|row| !row.is_empty()).collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<CellBox>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn n_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One extracted table, persisted as a line of `tables.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub doc_id: DocId,
    pub filename: String,
    pub page_index: u32,
    pub table_index: u32,
    pub bbox: BoundingBox,
    pub n_rows: usize,
    pub n_cols: usize,
    /// Row-major cell texts; rows may be ragged.
    pub cells: Vec<Vec<String>>,
}

/// Per-document table statistics, persisted to `tables_summary.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: DocId,
    pub filename: String,
    pub n_tables: usize,
    /// Sorted, deduplicated 0-based indices of pages with at least one table.
    pub pages_with_tables: Vec<u32>,
}

/// One layout element as written to `layout.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub doc_id: DocId,
    pub filename: String,
    pub page_index: u32,
    pub block_index: usize,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub bbox: Option<BoundingBox>,
    pub text: Option<String>,
}

/// Per-document layout statistics, persisted to `layout_summary.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub doc_id: DocId,
    pub filename: String,
    /// Highest page number referenced by any element.
    pub n_pages: u32,
    /// Element count per kind, keyed by the kind's lowercase name.
    pub stats: BTreeMap<String, usize>,
}

/// Ingestion metadata, persisted to `metadata.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_id: DocId,
    pub filename: String,
    /// 0 when the page tree could not be read.
    pub n_pages: usize,
    pub filesize: u64,
    /// SHA-256 digest of the file bytes, lowercase hex.
    pub sha256: String,
}

/// Aggregate counts reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub documents_seen: usize,
    pub documents_processed: usize,
    pub documents_failed: usize,
    pub tables_extracted: usize,
    pub tables_failed: usize,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            documents_seen: 0,
            documents_processed: 0,
            documents_failed: 0,
            tables_extracted: 0,
            tables_failed: 0,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} document(s): {} processed, {} failed; {} table(s) extracted, {} failed",
            self.documents_seen,
            self.documents_processed,
            self.documents_failed,
            self.tables_extracted,
            self.tables_failed
        )
    }
}
