// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration. Built once per batch run and read-only afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TablewerkError};

/// Longest line structuring element the morphology masks accept.
pub const MAX_LINE_KERNEL_LEN: u32 = 511;

/// Tuning for the grid detector and row clusterer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Radius of the adaptive-threshold neighbourhood (15x15 block = radius 7).
    pub threshold_block_radius: u32,
    /// Constant subtracted from the local mean before comparison.
    pub threshold_c: i32,
    /// Length of the line-shaped structuring elements, in pixels.
    pub line_kernel_len: u32,
    /// Opening iterations applied with each structuring element.
    pub open_iterations: u32,
    /// Contours with an area at or below this are treated as noise.
    pub min_cell_area: f64,
    /// Row tolerance in pixels at `reference_dpi`.
    pub row_tolerance_px: u32,
    /// Resolution `row_tolerance_px` was tuned for.
    pub reference_dpi: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            threshold_block_radius: 7,
            threshold_c: 10,
            line_kernel_len: 40,
            open_iterations: 2,
            min_cell_area: 200.0,
            row_tolerance_px: 20,
            reference_dpi: 200,
        }
    }
}

/// External layout program. The PDF path is appended as the final argument
/// and the program must print a JSON element array on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LayoutCommand {
    /// Split a shell-style command line on whitespace. Returns `None` for an
    /// empty string.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for `*.pdf` files.
    pub input_dir: PathBuf,
    /// Directory receiving the JSONL output streams.
    pub output_dir: PathBuf,
    /// Where repaired copies are written. Defaults to `output_dir`.
    pub repair_dir: Option<PathBuf>,
    /// Rasterization DPI used for table extraction.
    pub table_dpi: u32,
    /// Rasterization DPI used by full-page text extraction consumers.
    pub text_dpi: u32,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Concurrent documents. `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Per-document deadline in seconds.
    pub document_timeout_secs: u64,
    /// External layout classifier.
    pub layout_command: Option<LayoutCommand>,
    /// Directory holding the OCR models. `None` uses the ocrs cache.
    pub ocr_model_dir: Option<PathBuf>,
    /// Directory holding the pdfium shared library. `None` tries the working
    /// directory, then the system library.
    pub pdfium_library_dir: Option<PathBuf>,
    pub grid: GridConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_pdfs"),
            output_dir: PathBuf::from("processed_jsonl"),
            repair_dir: None,
            table_dpi: 200,
            text_dpi: 300,
            log_level: "info".into(),
            workers: None,
            document_timeout_secs: 600,
            layout_command: None,
            ocr_model_dir: None,
            pdfium_library_dir: None,
            grid: GridConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing keys take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            TablewerkError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        serde_json::from_str(&data).map_err(|err| {
            TablewerkError::Config(format!("cannot parse {}: {}", path.display(), err))
        })
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.table_dpi == 0 || self.text_dpi == 0 {
            return Err(TablewerkError::Config(
                "table_dpi and text_dpi must be positive".into(),
            ));
        }
        if self.workers == Some(0) {
            return Err(TablewerkError::Config("workers must be at least 1".into()));
        }
        if self.document_timeout_secs == 0 {
            return Err(TablewerkError::Config(
                "document_timeout_secs must be positive".into(),
            ));
        }
        if self.grid.line_kernel_len == 0 || self.grid.reference_dpi == 0 {
            return Err(TablewerkError::Config(
                "grid.line_kernel_len and grid.reference_dpi must be positive".into(),
            ));
        }
        if self.grid.line_kernel_len > MAX_LINE_KERNEL_LEN {
            return Err(TablewerkError::Config(format!(
                "grid.line_kernel_len must be at most {MAX_LINE_KERNEL_LEN}"
            )));
        }
        if self.grid.min_cell_area < 0.0 {
            return Err(TablewerkError::Config(
                "grid.min_cell_area must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Directory receiving repaired PDF copies.
    pub fn repair_dir(&self) -> &Path {
        self.repair_dir.as_deref().unwrap_or(&self.output_dir)
    }

    /// Number of documents processed concurrently.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Row-grouping tolerance in pixels at the table DPI.
    ///
    /// Scales `grid.row_tolerance_px` linearly from `grid.reference_dpi`, so
    /// 200 DPI yields 20px and 300 DPI yields 30px. Never below 1.
    pub fn row_tolerance(&self) -> u32 {
        let scaled = f64::from(self.grid.row_tolerance_px) * f64::from(self.table_dpi)
            / f64::from(self.grid.reference_dpi);
        (scaled.round() as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_ne!(config.table_dpi, config.text_dpi);
        assert_eq!(config.repair_dir(), Path::new("processed_jsonl"));
    }

    #[test]
    fn tolerance_scales_with_dpi() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.row_tolerance(), 20);
        config.table_dpi = 300;
        assert_eq!(config.row_tolerance(), 30);
        config.table_dpi = 1;
        assert_eq!(config.row_tolerance(), 1);
    }

    #[test]
    fn zero_workers_rejected() {
        let config = PipelineConfig {
            workers: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TablewerkError::Config(_))));
    }

    #[test]
    fn oversized_line_kernel_rejected() {
        let mut config = PipelineConfig::default();
        config.grid.line_kernel_len = MAX_LINE_KERNEL_LEN;
        assert!(config.validate().is_ok());
        config.grid.line_kernel_len = MAX_LINE_KERNEL_LEN + 1;
        assert!(matches!(config.validate(), Err(TablewerkError::Config(_))));
    }

    #[test]
    fn load_fills_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tablewerk.json");
        std::fs::write(
            &path,
            r#"{ "table_dpi": 300, "layout_command": { "program": "layout-cli" } }"#,
        )
        .expect("write config");

        let config = PipelineConfig::load(&path).expect("load");
        assert_eq!(config.table_dpi, 300);
        assert_eq!(config.text_dpi, 300);
        assert_eq!(config.output_dir, PathBuf::from("processed_jsonl"));
        assert_eq!(
            config.layout_command,
            Some(LayoutCommand {
                program: "layout-cli".into(),
                args: Vec::new()
            })
        );
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn load_reports_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write config");
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(TablewerkError::Config(_))
        ));
    }

    #[test]
    fn layout_command_parse_splits_words() {
        let cmd = LayoutCommand::parse("python3 layout.py --hi-res").expect("non-empty");
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["layout.py", "--hi-res"]);
        assert!(LayoutCommand::parse("   ").is_none());
    }
}
