// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tablewerk.

use thiserror::Error;

/// Top-level error type for all Tablewerk operations.
#[derive(Debug, Error)]
pub enum TablewerkError {
    // -- Document errors --
    #[error("could not render PDF pages: {0}")]
    Rasterization(String),

    #[error("layout extraction failed: {0}")]
    LayoutParse(String),

    #[error("PDF repair failed: {0}")]
    Repair(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("document processing timed out after {0}s")]
    Timeout(u64),

    // -- Table errors --
    #[error("no cells found in detected table")]
    NoCellsFound,

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Run errors --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TablewerkError>;

/// The smallest unit of work an error invalidates.
///
/// Failures are isolated to their scope: a table error skips one table, a
/// document error skips one document, and only a run error stops the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorScope {
    Table,
    Document,
    Run,
}

impl TablewerkError {
    /// Classify this error by the unit of work it invalidates.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::NoCellsFound | Self::ImageError(_) | Self::OcrError(_) => ErrorScope::Table,

            Self::Rasterization(_)
            | Self::LayoutParse(_)
            | Self::Repair(_)
            | Self::PdfError(_)
            | Self::Timeout(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorScope::Document,

            Self::Config(_) => ErrorScope::Run,
        }
    }
}
