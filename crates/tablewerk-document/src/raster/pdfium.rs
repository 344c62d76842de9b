// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfium-backed rasterizer.
//
// pdfium is not thread-safe, so renders are serialized behind a lock and the
// library is bound for the duration of one document.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::GrayImage;
use pdfium_render::prelude::*;
use tablewerk_core::{Result, TablewerkError};
use tracing::{debug, instrument};

use super::PageRasterizer;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// [`PageRasterizer`] using the pdfium shared library.
#[derive(Debug, Default)]
pub struct PdfiumRasterizer {
    /// Directory holding the pdfium library. `None` tries the working
    /// directory and then the system library.
    library_dir: Option<PathBuf>,
    render_lock: Mutex<()>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self {
            library_dir,
            render_lock: Mutex::new(()),
        }
    }

    fn bind(&self) -> Result<Pdfium> {
        let dir = self
            .library_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./"));
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|err| {
                TablewerkError::Rasterization(format!("cannot bind pdfium library: {}", err))
            })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    #[instrument(skip(self), fields(pdf = %pdf.display()))]
    fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<Vec<GrayImage>> {
        let _guard = self
            .render_lock
            .lock()
            .map_err(|_| TablewerkError::Rasterization("pdfium render lock poisoned".into()))?;

        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_file(pdf, None).map_err(|err| {
            TablewerkError::Rasterization(format!("cannot open {}: {}", pdf.display(), err))
        })?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let pixel_width = (page.width().value * scale) as i32;
            let pixel_height = (page.height().value * scale) as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .map_err(|err| {
                    TablewerkError::Rasterization(format!(
                        "page {} failed to render: {}",
                        index, err
                    ))
                })?;

            pages.push(bitmap.as_image().to_luma8());
        }

        debug!(pages = pages.len(), dpi, "Document rasterized");
        Ok(pages)
    }
}
