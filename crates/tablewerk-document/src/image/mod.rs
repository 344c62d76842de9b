// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — clipped region crops over grayscale page bitmaps.

pub mod region;

pub use region::{PixelRect, crop_cell, crop_region};
