// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — structural repair and ingestion metadata via `lopdf`.

pub mod metadata;
pub mod repair;

pub use metadata::{hash_bytes, inspect};
pub use repair::{LopdfRepairer, PdfRepairer, repaired_path};
