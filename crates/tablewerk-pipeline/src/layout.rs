// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout consumption — run the external classifier, parse its element list,
// and derive table regions, layout blocks and per-document layout statistics.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tablewerk_core::{
    BoundingBox, DocumentJob, ElementKind, LayoutBlock, LayoutCommand, LayoutElement,
    LayoutSummary, Result, TablewerkError,
};
use tracing::{debug, instrument, warn};

/// How often a running classifier is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Supplies classified page regions for a PDF.
pub trait LayoutSource: Send + Sync {
    fn elements(&self, pdf: &Path) -> Result<Vec<LayoutElement>>;
}

/// Runs `program args... <pdf>` and reads a JSON element array from stdout.
///
/// With a timeout set, a classifier still running at the deadline is killed
/// and the call fails with `LayoutParse`.
#[derive(Debug, Clone)]
pub struct CommandLayoutSource {
    command: LayoutCommand,
    timeout: Option<Duration>,
}

impl CommandLayoutSource {
    pub fn new(command: LayoutCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let started = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|err| {
                TablewerkError::LayoutParse(format!(
                    "cannot wait for {}: {}",
                    self.command.program, err
                ))
            })?;
            if let Some(status) = polled {
                return Ok(status);
            }

            if let Some(timeout) = self.timeout.filter(|t| started.elapsed() >= *t) {
                warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    "Layout classifier timed out; killing"
                );
                if let Err(err) = child.kill() {
                    warn!(error = %err, "Could not kill layout classifier");
                }
                let _ = child.wait();
                return Err(TablewerkError::LayoutParse(format!(
                    "{} timed out after {:.1}s",
                    self.command.program,
                    timeout.as_secs_f64()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl LayoutSource for CommandLayoutSource {
    #[instrument(skip(self), fields(program = %self.command.program, pdf = %pdf.display()))]
    fn elements(&self, pdf: &Path) -> Result<Vec<LayoutElement>> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(pdf)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                TablewerkError::LayoutParse(format!(
                    "cannot run {}: {}",
                    self.command.program, err
                ))
            })?;

        // Pipes are drained concurrently so a chatty classifier cannot block
        // on a full pipe. On timeout the readers are left to finish on their own.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child)?;
        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        if !status.success() {
            return Err(TablewerkError::LayoutParse(format!(
                "{} exited with {}: {}",
                self.command.program,
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        let elements = parse_elements(&String::from_utf8_lossy(&stdout))?;
        debug!(elements = elements.len(), "Layout elements parsed");
        Ok(elements)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(err) = pipe.read_to_end(&mut buffer) {
                warn!(error = %err, "Layout classifier output truncated");
            }
        }
        buffer
    })
}

fn join_output(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    reader.join().unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type", alias = "category")]
    category: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    coordinates: Option<RawCoordinates>,
}

#[derive(Debug, Deserialize)]
struct RawCoordinates {
    #[serde(default)]
    points: Vec<[f64; 2]>,
}

/// Parse the classifier's JSON element array.
pub fn parse_elements(json: &str) -> Result<Vec<LayoutElement>> {
    let raw: Vec<RawElement> = serde_json::from_str(json)
        .map_err(|err| TablewerkError::LayoutParse(format!("malformed layout output: {}", err)))?;

    Ok(raw
        .into_iter()
        .map(|element| LayoutElement {
            kind: ElementKind::from_category(&element.category),
            page_number: element.metadata.page_number.unwrap_or(0),
            bbox: element
                .metadata
                .coordinates
                .and_then(|coords| BoundingBox::from_points(&coords.points)),
            text: element.text,
        })
        .collect())
}

/// A table region on one page, numbered in element order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRegion {
    pub table_index: u32,
    pub bbox: BoundingBox,
}

/// Table regions of the page with 0-based `page_index`, in element order.
///
/// Every table element on the page takes a `table_index`, including ones
/// without coordinates, which are then skipped.
pub fn tables_on_page(elements: &[LayoutElement], page_index: u32) -> Vec<TableRegion> {
    elements
        .iter()
        .filter(|element| element.is_table() && element.page_number == page_index + 1)
        .enumerate()
        .filter_map(|(index, element)| match element.bbox {
            Some(bbox) => Some(TableRegion {
                table_index: index as u32,
                bbox,
            }),
            None => {
                debug!(page_index, table_index = index, "Table element has no coordinates");
                None
            }
        })
        .collect()
}

/// One output block per element, indexed in element order.
pub fn layout_blocks(job: &DocumentJob, elements: &[LayoutElement]) -> Vec<LayoutBlock> {
    elements
        .iter()
        .enumerate()
        .map(|(block_index, element)| LayoutBlock {
            doc_id: job.doc_id,
            filename: job.filename.clone(),
            page_index: element.page_index(),
            block_index,
            kind: element.kind,
            bbox: element.bbox,
            text: element.text.clone(),
        })
        .collect()
}

/// Element counts per kind and the highest page number seen.
pub fn layout_summary(job: &DocumentJob, elements: &[LayoutElement]) -> LayoutSummary {
    let mut stats: BTreeMap<String, usize> = BTreeMap::new();
    for element in elements {
        *stats.entry(element.kind.as_str().to_string()).or_default() += 1;
    }
    LayoutSummary {
        doc_id: job.doc_id,
        filename: job.filename.clone(),
        n_pages: elements.iter().map(|e| e.page_number).max().unwrap_or(0),
        stats,
    }
}
