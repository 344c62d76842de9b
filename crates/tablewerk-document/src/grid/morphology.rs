// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-shaped morphology on binary masks.
//
// Openings use `imageproc` grayscale erosion and dilation with a `len x 1`
// (or `1 x len`) mask. On a 0/255 mask these are exactly binary erosion and
// dilation; pixels outside the image never veto a match.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

use super::threshold::FOREGROUND;

/// Longest line element an `imageproc` mask can hold.
pub const MAX_LINE_LEN: u32 = tablewerk_core::MAX_LINE_KERNEL_LEN;

/// Axis of a line-shaped structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrientation {
    /// `len x 1`: keeps horizontal runs.
    Horizontal,
    /// `1 x len`: keeps vertical runs.
    Vertical,
}

/// Line structuring element anchored at its middle pixel. `len` is clamped
/// to `1..=MAX_LINE_LEN`.
pub fn line_element(orientation: LineOrientation, len: u32) -> Mask {
    let len = len.clamp(1, MAX_LINE_LEN);
    let center = (len / 2) as u8;
    let line = Luma([FOREGROUND]);
    match orientation {
        LineOrientation::Horizontal => {
            Mask::from_image(&GrayImage::from_pixel(len, 1, line), center, 0)
        }
        LineOrientation::Vertical => {
            Mask::from_image(&GrayImage::from_pixel(1, len, line), 0, center)
        }
    }
}

/// Morphological opening with a line structuring element.
///
/// Erodes `iterations` times and then dilates `iterations` times. Foreground
/// runs along `orientation` shorter than `iterations * (len - 1) + 1` pixels
/// are removed; longer runs survive unchanged. Any non-zero input pixel is
/// foreground.
pub fn open_lines(
    mask: &GrayImage,
    orientation: LineOrientation,
    len: u32,
    iterations: u32,
) -> GrayImage {
    let mut opened = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    });
    if len <= 1 || iterations == 0 {
        return opened;
    }

    let element = line_element(orientation, len);
    for _ in 0..iterations {
        opened = grayscale_erode(&opened, &element);
    }
    for _ in 0..iterations {
        opened = grayscale_dilate(&opened, &element);
    }
    opened
}

/// Equal-weight blend of two masks: `round(0.5 * a + 0.5 * b)` per pixel.
///
/// Pixels set in only one input come out at half intensity, which still
/// counts as structure for contour extraction.
pub fn blend_equal(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let lhs = u16::from(a.get_pixel(x, y).0[0]);
        let rhs = if x < b.width() && y < b.height() {
            u16::from(b.get_pixel(x, y).0[0])
        } else {
            0
        };
        Luma([((lhs + rhs + 1) / 2) as u8])
    })
}
