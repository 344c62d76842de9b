// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tablewerk-pipeline — Per-document orchestration and the batch driver.
//
// Ties layout consumption, the repair fallback, rasterization, grid detection
// and cell OCR together, and streams every result through a single JSONL
// writer task.

pub mod assembler;
pub mod batch;
pub mod document;
pub mod fallback;
pub mod layout;
pub mod sink;

use std::sync::Arc;

use tablewerk_core::PipelineConfig;
use tablewerk_document::{
    CellRecognizer, CellTextExtractor, GridDetector, PageRasterizer, PdfRepairer,
    RowColumnClusterer,
};

pub use assembler::TableAssembler;
pub use batch::{BatchRunner, discover_pdfs};
pub use document::{DocumentOutcome, process_document};
pub use fallback::{LayoutOutcome, RepairFallback, RepairState};
pub use layout::{CommandLayoutSource, LayoutSource};
pub use sink::{OutputRecord, OutputSink, RecordSender};

/// Read-only collaborators shared by every document of a run.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    pub layout: Arc<dyn LayoutSource>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub repairer: Arc<dyn PdfRepairer>,
    pub detector: GridDetector,
    pub clusterer: RowColumnClusterer,
    pub cells: CellTextExtractor,
}

impl PipelineContext {
    /// Build the grid stages from `config`; the row tolerance follows
    /// `table_dpi`.
    pub fn new(
        config: PipelineConfig,
        layout: Arc<dyn LayoutSource>,
        rasterizer: Arc<dyn PageRasterizer>,
        repairer: Arc<dyn PdfRepairer>,
        recognizer: Arc<dyn CellRecognizer>,
    ) -> Self {
        let detector = GridDetector::new(config.grid.clone());
        let clusterer = RowColumnClusterer::new(config.row_tolerance());
        Self {
            config: Arc::new(config),
            layout,
            rasterizer,
            repairer,
            detector,
            clusterer,
            cells: CellTextExtractor::new(recognizer),
        }
    }
}
