// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-document pass: metadata, layout (with repair retry), rasterization,
// and the per-table grid -> rows -> OCR -> record chain.
//
// Blocking; the batch driver runs it on a blocking thread.

use std::sync::atomic::{AtomicBool, Ordering};

use image::GrayImage;
use tablewerk_core::{DocumentJob, DocumentSummary, Grid, Result, TablewerkError};
use tablewerk_document::image::crop_region;
use tablewerk_document::pdf::inspect;
use tracing::{debug, error, info, instrument, warn};

use crate::PipelineContext;
use crate::assembler::TableAssembler;
use crate::fallback::RepairFallback;
use crate::layout::{TableRegion, layout_blocks, layout_summary, tables_on_page};
use crate::sink::{OutputRecord, RecordSender};

/// Result of a completed document pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub summary: DocumentSummary,
    /// Tables skipped because of a table-scoped error.
    pub tables_failed: usize,
}

/// Process one document end to end, streaming every record to `sink`.
///
/// Table-scoped failures are logged and counted; anything else aborts the
/// document and is returned. `cancel` is checked before each table, before
/// each table record is sent and before the summary, so a cancelled document
/// never emits a summary.
#[instrument(skip_all, fields(file = %job.filename, doc_id = %job.doc_id))]
pub fn process_document(
    ctx: &PipelineContext,
    job: &DocumentJob,
    sink: &RecordSender,
    cancel: &AtomicBool,
) -> Result<DocumentOutcome> {
    info!("Processing document");

    match inspect(job) {
        Ok(metadata) => sink.send(OutputRecord::Metadata(metadata)),
        Err(err) => warn!(error = %err, "Could not collect metadata"),
    }

    let fallback = RepairFallback::new(
        ctx.layout.as_ref(),
        ctx.repairer.as_ref(),
        ctx.config.repair_dir(),
    );
    let layout = fallback.run(job.path())?;

    for block in layout_blocks(job, &layout.elements) {
        sink.send(OutputRecord::Layout(block));
    }
    sink.send(OutputRecord::LayoutSummary(layout_summary(job, &layout.elements)));

    let pages = ctx
        .rasterizer
        .rasterize(&layout.source, ctx.config.table_dpi)?;
    debug!(pages = pages.len(), dpi = ctx.config.table_dpi, "Pages rasterized");

    let mut assembler = TableAssembler::new(job);
    let mut tables_failed = 0usize;

    for (page_index, page) in pages.iter().enumerate() {
        let page_index = page_index as u32;
        for region in tables_on_page(&layout.elements, page_index) {
            ensure_live(ctx, cancel, page_index)?;

            match extract_table(ctx, page, &region) {
                Ok((grid, cells)) => {
                    ensure_live(ctx, cancel, page_index)?;
                    let record = assembler.assemble(
                        page_index,
                        region.table_index,
                        region.bbox,
                        &grid,
                        cells,
                    );
                    debug!(
                        page_index,
                        table_index = region.table_index,
                        n_rows = record.n_rows,
                        n_cols = record.n_cols,
                        "Table extracted"
                    );
                    sink.send(OutputRecord::Table(record));
                }
                Err(err) => {
                    tables_failed += 1;
                    error!(
                        file = %job.filename,
                        page_index,
                        table_index = region.table_index,
                        error = %err,
                        "Table extraction failed"
                    );
                }
            }
        }
    }

    ensure_live(ctx, cancel, pages.len() as u32)?;
    let summary = assembler.finish();
    info!(
        n_tables = summary.n_tables,
        tables_failed,
        "Saved tables for document"
    );
    sink.send(OutputRecord::TableSummary(summary.clone()));

    Ok(DocumentOutcome {
        summary,
        tables_failed,
    })
}

/// `Timeout` once the batch driver has given up on this document.
fn ensure_live(ctx: &PipelineContext, cancel: &AtomicBool, page_index: u32) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        warn!(page_index, "Document cancelled");
        return Err(TablewerkError::Timeout(ctx.config.document_timeout_secs));
    }
    Ok(())
}

/// Crop, detect, cluster and read one table region.
fn extract_table(
    ctx: &PipelineContext,
    page: &GrayImage,
    region: &TableRegion,
) -> Result<(Grid, Vec<Vec<String>>)> {
    let (_, crop) = crop_region(page, &region.bbox).ok_or_else(|| {
        TablewerkError::ImageError(format!("table region {:?} lies outside the page", region.bbox))
    })?;

    let boxes = ctx.detector.detect(&crop)?;
    let grid = ctx.clusterer.cluster(boxes);
    let cells = ctx.cells.extract_grid(&crop, &grid);
    Ok((grid, cells))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use image::Luma;
    use tablewerk_core::{BoundingBox, ElementKind, LayoutElement, PipelineConfig, TableRecord};
    use tablewerk_document::{CellRecognizer, LopdfRepairer, PageRasterizer};
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::layout::LayoutSource;

    /// Reads a digit drawn as that many dots: counts dark blobs that do not
    /// touch the crop edge (the edge carries the cell's own ruling).
    pub(crate) struct TallyRecognizer;

    impl CellRecognizer for TallyRecognizer {
        fn recognize(&self, cell: &GrayImage) -> Result<String> {
            let (w, h) = cell.dimensions();
            let mut seen = vec![false; (w * h) as usize];
            let mut blobs = 0;

            for start_y in 0..h {
                for start_x in 0..w {
                    let idx = (start_y * w + start_x) as usize;
                    if seen[idx] || cell.get_pixel(start_x, start_y).0[0] >= 128 {
                        continue;
                    }
                    seen[idx] = true;
                    let mut stack = vec![(start_x, start_y)];
                    let mut touches_edge = false;
                    while let Some((x, y)) = stack.pop() {
                        if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                            touches_edge = true;
                        }
                        let neighbours = [
                            (x.wrapping_sub(1), y),
                            (x + 1, y),
                            (x, y.wrapping_sub(1)),
                            (x, y + 1),
                        ];
                        for (nx, ny) in neighbours {
                            if nx >= w || ny >= h {
                                continue;
                            }
                            let n = (ny * w + nx) as usize;
                            if !seen[n] && cell.get_pixel(nx, ny).0[0] < 128 {
                                seen[n] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                    if !touches_edge {
                        blobs += 1;
                    }
                }
            }

            Ok(if blobs == 0 {
                String::new()
            } else {
                blobs.to_string()
            })
        }
    }

    /// Hands back prepared page bitmaps regardless of the input file.
    pub(crate) struct FixedRasterizer(pub Vec<GrayImage>);

    impl PageRasterizer for FixedRasterizer {
        fn rasterize(&self, _pdf: &Path, _dpi: u32) -> Result<Vec<GrayImage>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRasterizer;

    impl PageRasterizer for FailingRasterizer {
        fn rasterize(&self, pdf: &Path, _dpi: u32) -> Result<Vec<GrayImage>> {
            Err(TablewerkError::Rasterization(format!("cannot render {}", pdf.display())))
        }
    }

    pub(crate) struct FixedLayout(pub Option<Vec<LayoutElement>>);

    impl LayoutSource for FixedLayout {
        fn elements(&self, _pdf: &Path) -> Result<Vec<LayoutElement>> {
            self.0
                .clone()
                .ok_or_else(|| TablewerkError::LayoutParse("classifier crashed".into()))
        }
    }

    pub(crate) const GRID_BBOX: BoundingBox = BoundingBox {
        x0: 100,
        y0: 200,
        x1: 440,
        y1: 420,
    };

    /// Page with a 2x3 ruled table inside [`GRID_BBOX`]; cell `(r, c)` holds
    /// digit `3r + c + 1` drawn as that many 4px dots.
    pub(crate) fn ruled_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(800, 600, Luma([255u8]));
        let xs = [110u32, 210, 310, 410];
        let ys = [210u32, 300, 390];

        for &y in &ys {
            for x in xs[0]..=xs[3] + 1 {
                page.put_pixel(x, y, Luma([0u8]));
                page.put_pixel(x, y + 1, Luma([0u8]));
            }
        }
        for &x in &xs {
            for y in ys[0]..=ys[2] + 1 {
                page.put_pixel(x, y, Luma([0u8]));
                page.put_pixel(x + 1, y, Luma([0u8]));
            }
        }

        for row in 0..2 {
            for col in 0..3 {
                let digit = (row * 3 + col + 1) as u32;
                for dot in 0..digit {
                    let x0 = xs[col] + 15 + dot * 12;
                    let y0 = ys[row] + 40;
                    for y in y0..y0 + 4 {
                        for x in x0..x0 + 4 {
                            page.put_pixel(x, y, Luma([0u8]));
                        }
                    }
                }
            }
        }
        page
    }

    /// Page whose table region carries text-sized strokes but no ruling.
    pub(crate) fn unruled_page() -> GrayImage {
        let mut page = GrayImage::from_pixel(800, 600, Luma([255u8]));
        for word in 0..6u32 {
            for x in 0..30 {
                for y in 0..3 {
                    page.put_pixel(120 + word * 50 + x, 250 + (word % 2) * 60 + y, Luma([0u8]));
                }
            }
        }
        page
    }

    pub(crate) fn table_element(page_number: u32, bbox: BoundingBox) -> LayoutElement {
        LayoutElement {
            kind: ElementKind::Table,
            page_number,
            bbox: Some(bbox),
            text: None,
        }
    }

    pub(crate) fn context(
        layout: impl LayoutSource + 'static,
        rasterizer: impl PageRasterizer + 'static,
        repair_dir: PathBuf,
    ) -> PipelineContext {
        let config = PipelineConfig {
            output_dir: repair_dir,
            ..Default::default()
        };
        PipelineContext::new(
            config,
            Arc::new(layout),
            Arc::new(rasterizer),
            Arc::new(LopdfRepairer),
            Arc::new(TallyRecognizer),
        )
    }

    fn drain(rx: &mut UnboundedReceiver<OutputRecord>) -> Vec<OutputRecord> {
        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        records
    }

    fn tables(records: &[OutputRecord]) -> Vec<TableRecord> {
        records
            .iter()
            .filter_map(|record| match record {
                OutputRecord::Table(table) => Some(table.clone()),
                _ => None,
            })
            .collect()
    }

    fn input_file(dir: &Path) -> DocumentJob {
        let path = dir.join("statement.pdf");
        std::fs::write(&path, b"placeholder bytes, not a PDF").expect("write input");
        DocumentJob::new(path)
    }

    #[test]
    fn ruled_two_by_three_table_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![table_element(1, GRID_BBOX)])),
            FixedRasterizer(vec![ruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        let outcome = process_document(&ctx, &job, &sink, &AtomicBool::new(false))
            .expect("document processed");
        let records = drain(&mut rx);

        let tables = tables(&records);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!((table.n_rows, table.n_cols), (2, 3));
        assert_eq!(table.cells, vec![vec!["1", "2", "3"], vec!["4", "5", "6"]]);
        assert_eq!(table.bbox, GRID_BBOX);
        assert_eq!((table.page_index, table.table_index), (0, 0));
        assert_eq!(table.doc_id, job.doc_id);

        assert_eq!(outcome.summary.n_tables, 1);
        assert_eq!(outcome.summary.pages_with_tables, vec![0]);
        assert_eq!(outcome.tables_failed, 0);
    }

    #[test]
    fn unruled_region_is_excluded_from_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![
                table_element(1, GRID_BBOX),
                table_element(2, GRID_BBOX),
            ])),
            FixedRasterizer(vec![ruled_page(), unruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        let outcome = process_document(&ctx, &job, &sink, &AtomicBool::new(false))
            .expect("document processed");
        let records = drain(&mut rx);

        assert_eq!(tables(&records).len(), 1);
        assert!(tables(&records).iter().all(|t| t.page_index == 0));
        assert_eq!(outcome.summary.n_tables, 1);
        assert_eq!(outcome.summary.pages_with_tables, vec![0]);
        assert_eq!(outcome.tables_failed, 1);
    }

    #[test]
    fn record_order_is_metadata_layout_tables_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![table_element(1, GRID_BBOX)])),
            FixedRasterizer(vec![ruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();
        process_document(&ctx, &job, &sink, &AtomicBool::new(false)).expect("processed");

        let kinds: Vec<&str> = drain(&mut rx).iter().map(OutputRecord::file_name).collect();
        assert_eq!(
            kinds,
            vec![
                "metadata.jsonl",
                "layout.jsonl",
                "layout_summary.jsonl",
                "tables.jsonl",
                "tables_summary.jsonl"
            ]
        );
    }

    #[test]
    fn region_outside_page_fails_only_that_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![
                table_element(1, BoundingBox::new(5000, 5000, 6000, 6000)),
                table_element(1, GRID_BBOX),
            ])),
            FixedRasterizer(vec![ruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        let outcome =
            process_document(&ctx, &job, &sink, &AtomicBool::new(false)).expect("processed");
        let tables = tables(&drain(&mut rx));
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table_index, 1);
        assert_eq!(outcome.tables_failed, 1);
    }

    #[test]
    fn rasterization_failure_is_document_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![table_element(1, GRID_BBOX)])),
            FailingRasterizer,
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        let result = process_document(&ctx, &job, &sink, &AtomicBool::new(false));
        assert!(matches!(result, Err(TablewerkError::Rasterization(_))));
        let records = drain(&mut rx);
        assert!(tables(&records).is_empty());
        assert!(
            !records
                .iter()
                .any(|r| matches!(r, OutputRecord::TableSummary(_)))
        );
    }

    #[test]
    fn unrecoverable_layout_skips_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(None),
            FixedRasterizer(vec![ruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        // The placeholder input is not a PDF, so repair fails too.
        let result = process_document(&ctx, &job, &sink, &AtomicBool::new(false));
        assert!(matches!(result, Err(TablewerkError::Repair(_))));

        let records = drain(&mut rx);
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], OutputRecord::Metadata(_)));
    }

    /// Raises the cancel flag from inside the first OCR call, as the batch
    /// driver does when the deadline passes mid-table.
    struct CancellingRecognizer(Arc<AtomicBool>);

    impl CellRecognizer for CancellingRecognizer {
        fn recognize(&self, cell: &GrayImage) -> Result<String> {
            self.0.store(true, Ordering::Relaxed);
            TallyRecognizer.recognize(cell)
        }
    }

    #[test]
    fn cancellation_during_table_sends_neither_table_nor_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let cancel = Arc::new(AtomicBool::new(false));
        let config = PipelineConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = PipelineContext::new(
            config,
            Arc::new(FixedLayout(Some(vec![table_element(1, GRID_BBOX)]))),
            Arc::new(FixedRasterizer(vec![ruled_page()])),
            Arc::new(LopdfRepairer),
            Arc::new(CancellingRecognizer(Arc::clone(&cancel))),
        );
        let (sink, mut rx) = RecordSender::channel();

        let result = process_document(&ctx, &job, &sink, &cancel);
        assert!(matches!(result, Err(TablewerkError::Timeout(_))));

        let records = drain(&mut rx);
        assert!(tables(&records).is_empty());
        assert!(
            !records
                .iter()
                .any(|r| matches!(r, OutputRecord::TableSummary(_)))
        );
    }

    #[test]
    fn cancellation_stops_before_next_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = input_file(dir.path());
        let ctx = context(
            FixedLayout(Some(vec![table_element(1, GRID_BBOX)])),
            FixedRasterizer(vec![ruled_page()]),
            dir.path().to_path_buf(),
        );
        let (sink, mut rx) = RecordSender::channel();

        let result = process_document(&ctx, &job, &sink, &AtomicBool::new(true));
        assert!(matches!(result, Err(TablewerkError::Timeout(_))));
        assert!(tables(&drain(&mut rx)).is_empty());
    }
}
