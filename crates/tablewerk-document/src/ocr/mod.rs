// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cell text extraction.
//
// Each cell is cropped from the table image and handed to a `CellRecognizer`.
// Recognition failures never abort a table: the cell degrades to an empty
// string and the failure is logged.

#[cfg(feature = "ocr")]
pub mod engine;

use std::sync::Arc;

use image::GrayImage;
use tablewerk_core::{CellBox, Grid, Result};
use tracing::warn;

use crate::image::crop_cell;

/// Single-block text recognition over one cell image.
pub trait CellRecognizer: Send + Sync {
    /// Recognize the text of `cell`. Leading and trailing whitespace in the
    /// result is ignored by callers.
    fn recognize(&self, cell: &GrayImage) -> Result<String>;
}

/// Turns a clustered grid into row-major cell texts.
#[derive(Clone)]
pub struct CellTextExtractor {
    recognizer: Arc<dyn CellRecognizer>,
}

impl CellTextExtractor {
    pub fn new(recognizer: Arc<dyn CellRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Text of one cell, trimmed. Empty when the cell lies outside the table
    /// or recognition fails.
    pub fn extract(&self, table: &GrayImage, cell: &CellBox) -> String {
        let Some(crop) = crop_cell(table, cell) else {
            warn!(?cell, "Cell lies outside the table crop");
            return String::new();
        };

        match self.recognizer.recognize(&crop) {
            Ok(text) => text.trim().to_owned(),
            Err(err) => {
                warn!(?cell, error = %err, "Cell recognition failed; using empty text");
                String::new()
            }
        }
    }

    /// Texts for every cell of `grid`, with the same row lengths as the grid.
    pub fn extract_grid(&self, table: &GrayImage, grid: &Grid) -> Vec<Vec<String>> {
        grid.rows()
            .iter()
            .map(|row| row.iter().map(|cell| self.extract(table, cell)).collect())
            .collect()
    }
}

impl std::fmt::Debug for CellTextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellTextExtractor").finish_non_exhaustive()
    }
}
