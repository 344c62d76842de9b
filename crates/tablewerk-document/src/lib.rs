// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tablewerk-document — Pixel and PDF operations for the Tablewerk extractor.
//
// Provides table grid detection (adaptive binarization, directional morphology,
// contour-based cell extraction), row clustering, per-cell OCR, page
// rasterization, and structural PDF repair and inspection.

pub mod grid;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod raster;

// Re-export the primary structs so callers can use `tablewerk_document::GridDetector` etc.
pub use grid::cluster::RowColumnClusterer;
pub use grid::detect::GridDetector;
pub use ocr::{CellRecognizer, CellTextExtractor};
pub use pdf::repair::{LopdfRepairer, PdfRepairer};
pub use raster::PageRasterizer;

#[cfg(feature = "ocr")]
pub use ocr::engine::OcrsRecognizer;

#[cfg(feature = "pdfium")]
pub use raster::pdfium::PdfiumRasterizer;
