// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout parse with a single structural-repair retry.
//
//   Initial -> ParseAttempted -> Success
//                             -> RepairAttempted -> Success | Failed
//                             -> Failed (repair itself failed)
//
// Every path reaches a terminal state after at most two parses and one repair.

use std::path::{Path, PathBuf};

use tablewerk_core::{LayoutElement, Result, TablewerkError};
use tablewerk_document::pdf::{PdfRepairer, repaired_path};
use tracing::{error, info, warn};

use crate::layout::LayoutSource;

/// Elements of a successfully parsed document and the file they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub elements: Vec<LayoutElement>,
    /// The original PDF, or its repaired copy when the retry succeeded.
    pub source: PathBuf,
    pub repaired: bool,
}

#[derive(Debug)]
pub enum RepairState {
    Initial,
    ParseAttempted(Result<Vec<LayoutElement>>),
    RepairAttempted(PathBuf),
    Success(LayoutOutcome),
    Failed(TablewerkError),
}

impl RepairState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failed(_))
    }
}

/// Drives [`RepairState`] for one document.
pub struct RepairFallback<'a> {
    layout: &'a dyn LayoutSource,
    repairer: &'a dyn PdfRepairer,
    repair_dir: &'a Path,
}

impl<'a> RepairFallback<'a> {
    pub fn new(
        layout: &'a dyn LayoutSource,
        repairer: &'a dyn PdfRepairer,
        repair_dir: &'a Path,
    ) -> Self {
        Self {
            layout,
            repairer,
            repair_dir,
        }
    }

    /// Advance one transition. Terminal states are returned unchanged.
    pub fn step(&self, pdf: &Path, state: RepairState) -> RepairState {
        match state {
            RepairState::Initial => RepairState::ParseAttempted(self.layout.elements(pdf)),
            RepairState::ParseAttempted(Ok(elements)) => RepairState::Success(LayoutOutcome {
                elements,
                source: pdf.to_path_buf(),
                repaired: false,
            }),
            RepairState::ParseAttempted(Err(err)) => {
                warn!(pdf = %pdf.display(), error = %err, "Layout parse failed; attempting repair");
                let target = repaired_path(self.repair_dir, pdf);
                match self.repairer.repair(pdf, &target) {
                    Ok(fixed) => RepairState::RepairAttempted(fixed),
                    Err(repair_err) => {
                        error!(pdf = %pdf.display(), error = %repair_err, "Could not repair PDF");
                        RepairState::Failed(repair_err)
                    }
                }
            }
            RepairState::RepairAttempted(fixed) => match self.layout.elements(&fixed) {
                Ok(elements) => {
                    info!(repaired = %fixed.display(), "Layout parsed from repaired copy");
                    RepairState::Success(LayoutOutcome {
                        elements,
                        source: fixed,
                        repaired: true,
                    })
                }
                Err(err) => {
                    error!(
                        repaired = %fixed.display(),
                        error = %err,
                        "Layout parse failed even after repair"
                    );
                    RepairState::Failed(err)
                }
            },
            terminal => terminal,
        }
    }

    /// Run to a terminal state.
    pub fn run(&self, pdf: &Path) -> Result<LayoutOutcome> {
        let mut state = RepairState::Initial;
        loop {
            state = match self.step(pdf, state) {
                RepairState::Success(outcome) => return Ok(outcome),
                RepairState::Failed(err) => return Err(err),
                next => next,
            };
        }
    }
}
