// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tablewerk — batch table extraction from PDFs to JSONL.
//
// Entry point. Resolves configuration (file, then flags), initialises logging,
// wires the pdfium rasterizer, ocrs recognizer and external layout classifier
// into the pipeline, and runs the batch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tablewerk_core::{LayoutCommand, PipelineConfig, Result, TablewerkError};
use tablewerk_document::ocr::engine::OcrConfig;
use tablewerk_document::{LopdfRepairer, OcrsRecognizer, PdfiumRasterizer};
use tablewerk_pipeline::{BatchRunner, CommandLayoutSource, PipelineContext};

/// Reconstruct ruled tables from PDFs and write them as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "tablewerk", version, about)]
struct Cli {
    /// JSON configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for *.pdf files.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving the JSONL output files.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for repaired PDF copies (default: output directory).
    #[arg(long)]
    repair_dir: Option<PathBuf>,

    /// Rasterization DPI for table extraction.
    #[arg(long)]
    table_dpi: Option<u32>,

    /// Rasterization DPI for full-page text extraction.
    #[arg(long)]
    text_dpi: Option<u32>,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "tablewerk=debug").
    #[arg(long)]
    log_level: Option<String>,

    /// Documents processed concurrently.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-document deadline in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Layout classifier command line; the PDF path is appended.
    #[arg(long)]
    layout_cmd: Option<String>,

    /// Directory holding text-detection.rten and text-recognition.rten.
    #[arg(long)]
    ocr_models: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long)]
    pdfium_dir: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(repair_dir) = self.repair_dir {
            config.repair_dir = Some(repair_dir);
        }
        if let Some(dpi) = self.table_dpi {
            config.table_dpi = dpi;
        }
        if let Some(dpi) = self.text_dpi {
            config.text_dpi = dpi;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(timeout) = self.timeout {
            config.document_timeout_secs = timeout;
        }
        if let Some(command_line) = self.layout_cmd {
            config.layout_command = Some(LayoutCommand::parse(&command_line).ok_or_else(|| {
                TablewerkError::Config("--layout-cmd must not be empty".into())
            })?);
        }
        if let Some(dir) = self.ocr_models {
            config.ocr_model_dir = Some(dir);
        }
        if let Some(dir) = self.pdfium_dir {
            config.pdfium_library_dir = Some(dir);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn build_context(config: PipelineConfig) -> Result<PipelineContext> {
    let command = config.layout_command.clone().ok_or_else(|| {
        TablewerkError::Config("no layout classifier configured (use --layout-cmd)".into())
    })?;
    let recognizer = OcrsRecognizer::new(OcrConfig::from_optional_dir(
        config.ocr_model_dir.as_deref(),
    ))?;
    let rasterizer = PdfiumRasterizer::new(config.pdfium_library_dir.clone());
    let layout = CommandLayoutSource::new(command)
        .with_timeout(Duration::from_secs(config.document_timeout_secs));

    Ok(PipelineContext::new(
        config,
        Arc::new(layout),
        Arc::new(rasterizer),
        Arc::new(LopdfRepairer),
        Arc::new(recognizer),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tablewerk: {err}");
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.log_level);
    tracing::info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        table_dpi = config.table_dpi,
        "Tablewerk starting"
    );

    let runner = match build_context(config) {
        Ok(ctx) => BatchRunner::new(ctx),
        Err(err) => {
            tracing::error!(error = %err, "Pipeline could not start");
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Batch aborted");
            ExitCode::FAILURE
        }
    }
}
