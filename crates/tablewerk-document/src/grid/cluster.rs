// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Row clustering — a single top-to-bottom sweep that groups cell boxes whose
// top edges lie close to the first box of the current row.

use tablewerk_core::{CellBox, Grid};
use tracing::debug;

/// Groups unordered cell boxes into reading-order rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowColumnClusterer {
    tolerance: u32,
}

impl RowColumnClusterer {
    /// `tolerance` is the largest top-edge difference, exclusive, that still
    /// counts as the same row.
    pub fn new(tolerance: u32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Arrange `boxes` into rows.
    ///
    /// Boxes are sorted by `(y, x)`. A box joins the open row while
    /// `|y - anchor.y| < tolerance`, where the anchor is the row's first box;
    /// otherwise the row closes and the box starts a new one. Closed rows are
    /// sorted left to right. Rows are not padded to a common length.
    pub fn cluster(&self, mut boxes: Vec<CellBox>) -> Grid {
        boxes.sort_by_key(|b| (b.y, b.x));

        let mut rows: Vec<Vec<CellBox>> = Vec::new();
        let mut current: Vec<CellBox> = Vec::new();

        for cell in boxes {
            let joins = current
                .first()
                .is_some_and(|anchor| cell.y.abs_diff(anchor.y) < self.tolerance);
            if !joins && !current.is_empty() {
                rows.push(close_row(std::mem::take(&mut current)));
            }
            current.push(cell);
        }
        if !current.is_empty() {
            rows.push(close_row(current));
        }

        let grid = Grid::from_rows(rows);
        debug!(
            n_rows = grid.n_rows(),
            n_cols = grid.n_cols(),
            tolerance = self.tolerance,
            "Cells clustered into rows"
        );
        grid
    }
}

fn close_row(mut row: Vec<CellBox>) -> Vec<CellBox> {
    row.sort_by_key(|b| b.x);
    row
}
