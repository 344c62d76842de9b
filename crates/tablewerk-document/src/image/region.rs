// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region crops — clip a requested rectangle to the image bounds and copy the
// pixels out. Out-of-range boxes are clipped, never read past the edge.

use image::{GrayImage, imageops};
use tablewerk_core::{BoundingBox, CellBox};
use tracing::debug;

/// A rectangle known to lie inside a particular image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Clip a page-space box to an image of `width` x `height`.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clip(bbox: &BoundingBox, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (i64::from(width), i64::from(height));
        let x0 = bbox.x0.clamp(0, w);
        let y0 = bbox.y0.clamp(0, h);
        let x1 = bbox.x1.clamp(0, w);
        let y1 = bbox.y1.clamp(0, h);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Clip a table-local cell box to an image of `width` x `height`.
    pub fn clip_cell(cell: &CellBox, width: u32, height: u32) -> Option<Self> {
        let bbox = BoundingBox::new(
            i64::from(cell.x),
            i64::from(cell.y),
            i64::from(cell.x) + i64::from(cell.width),
            i64::from(cell.y) + i64::from(cell.height),
        );
        Self::clip(&bbox, width, height)
    }
}

/// Copy the part of `page` covered by `bbox`.
///
/// Returns the clipped rectangle alongside the crop, or `None` if the box lies
/// entirely outside the page or has no area.
pub fn crop_region(page: &GrayImage, bbox: &BoundingBox) -> Option<(PixelRect, GrayImage)> {
    let rect = PixelRect::clip(bbox, page.width(), page.height())?;
    if (rect.width as i64, rect.height as i64) != (bbox.width(), bbox.height()) {
        debug!(
            requested = ?bbox,
            clipped_w = rect.width,
            clipped_h = rect.height,
            "Table region clipped to page bounds"
        );
    }
    let crop = imageops::crop_imm(page, rect.x, rect.y, rect.width, rect.height).to_image();
    Some((rect, crop))
}

/// Copy one cell out of a table crop.
pub fn crop_cell(table: &GrayImage, cell: &CellBox) -> Option<GrayImage> {
    let rect = PixelRect::clip_cell(cell, table.width(), table.height())?;
    Some(imageops::crop_imm(table, rect.x, rect.y, rect.width, rect.height).to_image())
}
