// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output sink — one writer task owns every JSONL file of the run. Producers,
// including blocking worker threads, send records over an unbounded channel;
// each record becomes exactly one appended line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tablewerk_core::{
    DocumentMetadata, DocumentSummary, LayoutBlock, LayoutSummary, Result, TableRecord,
    TablewerkError,
};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub const TABLES_JSONL: &str = "tables.jsonl";
pub const TABLES_SUMMARY_JSONL: &str = "tables_summary.jsonl";
pub const LAYOUT_JSONL: &str = "layout.jsonl";
pub const LAYOUT_SUMMARY_JSONL: &str = "layout_summary.jsonl";
pub const METADATA_JSONL: &str = "metadata.jsonl";

/// Anything written to an output stream.
#[derive(Debug, Clone)]
pub enum OutputRecord {
    Table(TableRecord),
    TableSummary(DocumentSummary),
    Layout(LayoutBlock),
    LayoutSummary(LayoutSummary),
    Metadata(DocumentMetadata),
}

impl OutputRecord {
    /// File (inside the output directory) this record is appended to.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Table(_) => TABLES_JSONL,
            Self::TableSummary(_) => TABLES_SUMMARY_JSONL,
            Self::Layout(_) => LAYOUT_JSONL,
            Self::LayoutSummary(_) => LAYOUT_SUMMARY_JSONL,
            Self::Metadata(_) => METADATA_JSONL,
        }
    }

    /// Serialize as a single newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = match self {
            Self::Table(record) => serde_json::to_string(record)?,
            Self::TableSummary(summary) => serde_json::to_string(summary)?,
            Self::Layout(block) => serde_json::to_string(block)?,
            Self::LayoutSummary(summary) => serde_json::to_string(summary)?,
            Self::Metadata(metadata) => serde_json::to_string(metadata)?,
        };
        line.push('\n');
        Ok(line)
    }
}

/// Cloneable handle for submitting records. Safe to use from blocking threads.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::UnboundedSender<OutputRecord>,
}

impl RecordSender {
    pub fn send(&self, record: OutputRecord) {
        if self.tx.send(record).is_err() {
            warn!("Output sink closed; record dropped");
        }
    }

    /// A sender whose records are collected by the returned receiver instead
    /// of being written to disk.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutputRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Running writer task plus the sender feeding it.
pub struct OutputSink {
    sender: RecordSender,
    handle: JoinHandle<usize>,
}

impl OutputSink {
    /// Create `output_dir` if needed and start the writer.
    pub async fn start(output_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(output_dir).await?;
        let (sender, rx) = RecordSender::channel();
        let handle = tokio::spawn(write_records(output_dir.to_path_buf(), rx));
        Ok(Self { sender, handle })
    }

    pub fn sender(&self) -> RecordSender {
        self.sender.clone()
    }

    /// Close the channel and wait until every queued record is on disk.
    /// Returns the number of lines written.
    ///
    /// All other senders must have been dropped, or this waits for them.
    pub async fn finish(self) -> Result<usize> {
        drop(self.sender);
        self.handle.await.map_err(|err| {
            TablewerkError::Io(std::io::Error::other(format!("output writer failed: {err}")))
        })
    }
}

async fn write_records(dir: PathBuf, mut rx: mpsc::UnboundedReceiver<OutputRecord>) -> usize {
    let mut files: HashMap<&'static str, File> = HashMap::new();
    let mut written = 0usize;

    while let Some(record) = rx.recv().await {
        let name = record.file_name();
        match append_line(&dir, &mut files, name, &record).await {
            Ok(()) => written += 1,
            Err(err) => error!(file = name, error = %err, "Failed to write output record"),
        }
    }

    for (name, file) in files.iter_mut() {
        if let Err(err) = file.flush().await {
            error!(file = *name, error = %err, "Failed to flush output file");
        }
    }
    debug!(written, "Output writer finished");
    written
}

async fn append_line(
    dir: &Path,
    files: &mut HashMap<&'static str, File>,
    name: &'static str,
    record: &OutputRecord,
) -> Result<()> {
    let line = record.to_line()?;
    let file = match files.entry(name) {
        std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
        std::collections::hash_map::Entry::Vacant(entry) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))
                .await?;
            entry.insert(file)
        }
    };
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
