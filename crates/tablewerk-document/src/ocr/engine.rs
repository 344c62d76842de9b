// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Neural cell recognizer backed by `ocrs`.
//
// # Feature Gate
//
// Only available with the `ocr` feature:
//
// ```toml
// tablewerk-document = { path = "crates/tablewerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine needs `text-detection.rten` and `text-recognition.rten`. Running
// `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs` (usually
// `~/.cache/ocrs`), which is where the default config looks.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, imageops};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tablewerk_core::{Result, TablewerkError};
use tracing::{debug, info, instrument};

use super::CellRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// White margin added around each cell. Text touching the crop edge is
/// otherwise often missed by the detector.
const CELL_MARGIN: u32 = 8;

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use `dir` when given, else the ocrs cache directory.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        for (label, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(TablewerkError::OcrError(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    label,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// [`CellRecognizer`] running the `ocrs` detection and recognition models.
///
/// Model loading is the expensive step; build one recognizer per run and
/// share it across documents.
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            TablewerkError::OcrError(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                TablewerkError::OcrError(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            TablewerkError::OcrError(format!("failed to initialise OCR engine: {}", err))
        })?;

        Ok(Self { engine })
    }
}

impl CellRecognizer for OcrsRecognizer {
    fn recognize(&self, cell: &GrayImage) -> Result<String> {
        let padded = pad_white(cell, CELL_MARGIN);
        let rgb = DynamicImage::ImageLuma8(padded).to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            TablewerkError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self.engine.prepare_input(source).map_err(|err| {
            TablewerkError::OcrError(format!("OCR preprocessing failed: {}", err))
        })?;
        let text = self.engine.get_text(&input).map_err(|err| {
            TablewerkError::OcrError(format!("OCR text recognition failed: {}", err))
        })?;

        debug!(chars = text.len(), "Cell recognized");
        Ok(text)
    }
}

fn pad_white(cell: &GrayImage, margin: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(
        cell.width() + 2 * margin,
        cell.height() + 2 * margin,
        Luma([255u8]),
    );
    imageops::replace(&mut canvas, cell, i64::from(margin), i64::from(margin));
    canvas
}
