// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ingestion metadata — size, SHA-256 fingerprint and page count of an input PDF.

use lopdf::Document;
use sha2::{Digest, Sha256};
use tablewerk_core::{DocumentJob, DocumentMetadata, Result};
use tracing::{debug, instrument, warn};

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Number of pages in the page tree, or `None` if lopdf cannot parse the file.
pub fn count_pages(data: &[u8]) -> Option<usize> {
    Document::load_mem(data)
        .map(|document| document.get_pages().len())
        .ok()
}

/// Read `job`'s file and describe it.
///
/// Only an unreadable file is an error. An unparseable PDF is reported with
/// `n_pages = 0`.
#[instrument(skip_all, fields(file = %job.filename))]
pub fn inspect(job: &DocumentJob) -> Result<DocumentMetadata> {
    let data = std::fs::read(job.path())?;
    let n_pages = count_pages(&data).unwrap_or_else(|| {
        warn!("Page tree unreadable; recording 0 pages");
        0
    });
    let metadata = DocumentMetadata {
        doc_id: job.doc_id,
        filename: job.filename.clone(),
        n_pages,
        filesize: data.len() as u64,
        sha256: hash_bytes(&data),
    };
    debug!(n_pages, filesize = metadata.filesize, "Metadata collected");
    Ok(metadata)
}
