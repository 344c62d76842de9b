// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch driver — scan the input directory and process documents concurrently
// with a bounded worker count and a per-document deadline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tablewerk_core::{DocumentJob, Result, RunReport, TablewerkError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::PipelineContext;
use crate::document::{DocumentOutcome, process_document};
use crate::sink::{OutputSink, RecordSender};

/// Every `*.pdf` file (extension matched case-insensitively) directly inside
/// `dir`, sorted by path.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Runs every PDF of the configured input directory through the pipeline.
#[derive(Clone)]
pub struct BatchRunner {
    ctx: PipelineContext,
}

impl BatchRunner {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Process the whole batch.
    ///
    /// Only run-level problems (unreadable input directory, unwritable output
    /// directory) are errors; document failures are counted in the report.
    #[instrument(skip(self), fields(input = %self.ctx.config.input_dir.display()))]
    pub async fn run(&self) -> Result<RunReport> {
        let config = Arc::clone(&self.ctx.config);
        let mut report = RunReport::new(Utc::now());

        let files = discover_pdfs(&config.input_dir)?;
        report.documents_seen = files.len();
        if files.is_empty() {
            warn!("No PDF files found in {}", config.input_dir.display());
        }

        let sink = OutputSink::start(&config.output_dir).await?;
        let workers = config.worker_count();
        let semaphore = Arc::new(Semaphore::new(workers));
        info!(documents = files.len(), workers, "Batch started");

        let mut tasks = JoinSet::new();
        for path in files {
            let job = DocumentJob::new(path);
            let ctx = self.ctx.clone();
            let sender = sink.sender();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(permit) = semaphore.acquire_owned().await else {
                    return Err(TablewerkError::Config("worker pool closed".into()));
                };
                run_document(ctx, job, sender, permit).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    report.documents_processed += 1;
                    report.tables_extracted += outcome.summary.n_tables;
                    report.tables_failed += outcome.tables_failed;
                }
                Ok(Err(_)) => report.documents_failed += 1,
                Err(err) => {
                    error!(error = %err, "Document task panicked");
                    report.documents_failed += 1;
                }
            }
        }

        let lines = sink.finish().await?;
        report.finished_at = Utc::now();
        info!(lines, %report, "Pipeline completed");
        Ok(report)
    }
}

/// One document on a blocking thread, bounded by the configured deadline.
///
/// The blocking worker owns `permit`, so a document keeps its slot until its
/// thread is really done. Past the deadline the worker is cancelled and then
/// awaited: it either stops at its next check with `Timeout`, or had already
/// passed its last check and completes normally.
async fn run_document(
    ctx: PipelineContext,
    job: DocumentJob,
    sender: RecordSender,
    permit: OwnedSemaphorePermit,
) -> Result<DocumentOutcome> {
    let deadline_secs = ctx.config.document_timeout_secs;
    let filename = job.filename.clone();
    let cancel = Arc::new(AtomicBool::new(false));

    let mut worker = {
        let cancel = Arc::clone(&cancel);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_document(&ctx, &job, &sender, &cancel)
        })
    };

    let deadline = Duration::from_secs(deadline_secs);
    let joined = match tokio::time::timeout(deadline, &mut worker).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!(file = %filename, deadline_secs, "Deadline passed; cancelling document");
            cancel.store(true, Ordering::Relaxed);
            worker.await
        }
    };

    let result = joined.unwrap_or_else(|join_err| {
        Err(TablewerkError::Io(std::io::Error::other(format!(
            "document worker failed: {join_err}"
        ))))
    });

    if let Err(err) = &result {
        error!(file = %filename, scope = ?err.scope(), error = %err, "Document skipped");
    }
    result
}
