// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tablewerk — Core types, configuration and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{GridConfig, LayoutCommand, MAX_LINE_KERNEL_LEN, PipelineConfig};
pub use error::{ErrorScope, Result, TablewerkError};
pub use types::*;
