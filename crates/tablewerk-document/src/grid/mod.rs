// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid module — recover the ruled cell structure of a table crop and arrange
// the cells into rows.
//
// Pipeline: adaptive binarization -> horizontal/vertical line opening ->
// equal-weight blend -> contour extraction -> area filter -> row clustering.

pub mod cluster;
pub mod detect;
pub mod morphology;
pub mod threshold;

pub use cluster::RowColumnClusterer;
pub use detect::{CellCandidate, GridDetector};
pub use morphology::LineOrientation;
