// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table assembly and per-document summary accumulation.

use tablewerk_core::{BoundingBox, DocId, DocumentJob, DocumentSummary, Grid, TableRecord};

/// Builds the table records of one document and tracks its summary.
#[derive(Debug)]
pub struct TableAssembler {
    doc_id: DocId,
    filename: String,
    n_tables: usize,
    pages: Vec<u32>,
}

impl TableAssembler {
    pub fn new(job: &DocumentJob) -> Self {
        Self {
            doc_id: job.doc_id,
            filename: job.filename.clone(),
            n_tables: 0,
            pages: Vec::new(),
        }
    }

    /// Record one successfully extracted table.
    ///
    /// `cells` must have the row lengths of `grid`.
    pub fn assemble(
        &mut self,
        page_index: u32,
        table_index: u32,
        bbox: BoundingBox,
        grid: &Grid,
        cells: Vec<Vec<String>>,
    ) -> TableRecord {
        debug_assert_eq!(cells.len(), grid.n_rows());
        self.n_tables += 1;
        self.pages.push(page_index);

        TableRecord {
            doc_id: self.doc_id,
            filename: self.filename.clone(),
            page_index,
            table_index,
            bbox,
            n_rows: grid.n_rows(),
            n_cols: grid.n_cols(),
            cells,
        }
    }

    pub fn n_tables(&self) -> usize {
        self.n_tables
    }

    /// Close the document. Pages are sorted and deduplicated.
    pub fn finish(mut self) -> DocumentSummary {
        self.pages.sort_unstable();
        self.pages.dedup();
        DocumentSummary {
            doc_id: self.doc_id,
            filename: self.filename,
            n_tables: self.n_tables,
            pages_with_tables: self.pages,
        }
    }
}
