// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization seam.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use std::path::Path;

use image::GrayImage;
use tablewerk_core::Result;

/// Renders every page of a PDF to a grayscale bitmap.
///
/// Implementations return all pages in document order or fail with
/// [`TablewerkError::Rasterization`](tablewerk_core::TablewerkError::Rasterization);
/// a partial page list is never returned.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<Vec<GrayImage>>;
}
