// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid detector — turns a grayscale table crop into candidate cell boxes.
//
// Text strokes are far shorter than the line structuring elements, so the
// opened masks keep only the ruling. Each enclosed region of that ruling
// (a hole border in the contour hierarchy) is one cell. The outer border of
// the ruling is the table frame itself and is not a cell.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use tablewerk_core::{CellBox, GridConfig, Result, TablewerkError};
use tracing::{debug, instrument};

use super::morphology::{LineOrientation, blend_equal, open_lines};
use super::threshold::adaptive_threshold_inv;

/// A cell box with the area of the contour it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCandidate {
    pub cell: CellBox,
    pub area: f64,
}

/// Recovers cell rectangles from a table crop.
#[derive(Debug, Clone)]
pub struct GridDetector {
    config: GridConfig,
}

impl GridDetector {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Binarize, isolate horizontal and vertical ruling, and blend the two.
    #[instrument(skip(self, crop), fields(width = crop.width(), height = crop.height()))]
    pub fn structural_mask(&self, crop: &GrayImage) -> GrayImage {
        let binary = adaptive_threshold_inv(
            crop,
            self.config.threshold_block_radius,
            self.config.threshold_c,
        );
        let horizontal = open_lines(
            &binary,
            LineOrientation::Horizontal,
            self.config.line_kernel_len,
            self.config.open_iterations,
        );
        let vertical = open_lines(
            &binary,
            LineOrientation::Vertical,
            self.config.line_kernel_len,
            self.config.open_iterations,
        );
        blend_equal(&horizontal, &vertical)
    }

    /// Every enclosed region of the mask with its bounding box and area,
    /// before the area filter.
    pub fn candidate_cells(&self, mask: &GrayImage) -> Vec<CellCandidate> {
        let contours: Vec<Contour<i64>> = find_contours(mask);
        contours
            .iter()
            .filter(|contour| contour.border_type == BorderType::Hole)
            .filter_map(|contour| {
                let points: Vec<(f64, f64)> = contour
                    .points
                    .iter()
                    .map(|p| (p.x as f64, p.y as f64))
                    .collect();
                let cell = bounding_rect(&contour.points)?;
                Some(CellCandidate {
                    cell,
                    area: polygon_area(&points),
                })
            })
            .collect()
    }

    /// Detect the cells of a table crop.
    ///
    /// Returns [`TablewerkError::NoCellsFound`] when no enclosed region is
    /// larger than `min_cell_area`.
    #[instrument(skip(self, crop), fields(width = crop.width(), height = crop.height()))]
    pub fn detect(&self, crop: &GrayImage) -> Result<Vec<CellBox>> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(TablewerkError::NoCellsFound);
        }

        let mask = self.structural_mask(crop);
        let candidates = self.candidate_cells(&mask);
        let total = candidates.len();
        let cells = retain_cells(candidates, self.config.min_cell_area);
        debug!(candidates = total, cells = cells.len(), "Grid contours filtered");

        if cells.is_empty() {
            return Err(TablewerkError::NoCellsFound);
        }
        Ok(cells)
    }
}

/// Keep candidates whose area is strictly greater than `min_area`.
pub fn retain_cells(candidates: Vec<CellCandidate>, min_area: f64) -> Vec<CellBox> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.area > min_area)
        .map(|candidate| candidate.cell)
        .collect()
}

/// Smallest axis-aligned box containing every point (inclusive extents).
fn bounding_rect(points: &[imageproc::point::Point<i64>]) -> Option<CellBox> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(CellBox::new(
        u32::try_from(min_x).ok()?,
        u32::try_from(min_y).ok()?,
        u32::try_from(max_x - min_x + 1).ok()?,
        u32::try_from(max_y - min_y + 1).ok()?,
    ))
}

/// Shoelace formula over a closed polygon.
fn polygon_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].0 * points[j].1;
        area -= points[j].0 * points[i].1;
    }
    area.abs() / 2.0
}
