// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inverted mean-based adaptive threshold.

use image::{GrayImage, Luma};

/// Foreground value written to binary masks.
pub const FOREGROUND: u8 = 255;

/// Binarize a grayscale crop so that dark ink becomes foreground.
///
/// For each pixel the threshold is the mean intensity of the
/// `(2 * block_radius + 1)` square neighbourhood minus `c`. A pixel at or below
/// its threshold is written as [`FOREGROUND`], everything else as 0. The
/// neighbourhood is clamped at the image edges.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = integral_image(gray);
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let threshold =
                region_mean(&integral, width, height, x, y, block_radius) - f64::from(c);
            let value = f64::from(gray.get_pixel(x, y).0[0]);
            if value <= threshold {
                output.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    output
}

/// Summed-area table with a zero-padded first row and column.
///
/// `table[y * (width + 1) + x]` holds the sum of all pixels in `[0, x) x [0, y)`.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += u64::from(gray.get_pixel(x, y).0[0]);
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

fn region_mean(integral: &[u64], width: u32, height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx as usize + radius as usize + 1).min(width as usize);
    let y2 = (cy as usize + radius as usize + 1).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
        - integral[y1 * stride + x2]
        - integral[y2 * stride + x1];

    sum as f64 / area
}
