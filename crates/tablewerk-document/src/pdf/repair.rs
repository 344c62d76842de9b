// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural PDF repair — reload the file with lopdf's tolerant parser, drop
// unreachable objects, renumber, and write a fresh copy with a rebuilt
// cross-reference table.

use std::path::{Path, PathBuf};

use lopdf::Document;
use tablewerk_core::{Result, TablewerkError};
use tracing::{debug, info, instrument};

/// Writes a structurally repaired copy of a PDF. The source is never modified.
pub trait PdfRepairer: Send + Sync {
    /// Repair `source` into `target` and return the path that was written.
    fn repair(&self, source: &Path, target: &Path) -> Result<PathBuf>;
}

/// Where the repaired copy of `source` goes: `<repair_dir>/<stem>_fixed.<ext>`.
///
/// The source extension is kept as written, so `a.pdf` and `a.PDF` repair into
/// different files.
pub fn repaired_path(repair_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_owned());
    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_owned());
    repair_dir.join(format!("{stem}_fixed.{extension}"))
}

/// [`PdfRepairer`] built on `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfRepairer;

impl PdfRepairer for LopdfRepairer {
    #[instrument(skip_all, fields(source = %source.display(), target = %target.display()))]
    fn repair(&self, source: &Path, target: &Path) -> Result<PathBuf> {
        let mut document = Document::load(source).map_err(|err| {
            TablewerkError::Repair(format!("cannot load {}: {}", source.display(), err))
        })?;

        let pruned = document.prune_objects();
        document.renumber_objects();
        debug!(
            pruned = pruned.len(),
            pages = document.get_pages().len(),
            "PDF object graph rebuilt"
        );

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        document.save(target).map_err(|err| {
            TablewerkError::Repair(format!("cannot write {}: {}", target.display(), err))
        })?;

        info!("Repaired copy written");
        Ok(target.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};

    fn one_page_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        // Unreachable object, dropped by the repair.
        doc.add_object(dictionary! { "Orphan" => true });

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize pdf");
        bytes
    }

    #[test]
    fn repaired_path_uses_fixed_suffix() {
        assert_eq!(
            repaired_path(Path::new("/out"), Path::new("/in/annual report.pdf")),
            PathBuf::from("/out/annual report_fixed.pdf")
        );
    }

    #[test]
    fn repaired_path_keeps_extension_case() {
        let lower = repaired_path(Path::new("/out"), Path::new("/in/a.pdf"));
        let upper = repaired_path(Path::new("/out"), Path::new("/in/a.PDF"));
        assert_eq!(lower, PathBuf::from("/out/a_fixed.pdf"));
        assert_eq!(upper, PathBuf::from("/out/a_fixed.PDF"));
        assert_ne!(lower, upper);
        assert_eq!(
            repaired_path(Path::new("/out"), Path::new("/in/noext")),
            PathBuf::from("/out/noext_fixed.pdf")
        );
    }

    #[test]
    fn repair_writes_loadable_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("scan.pdf");
        std::fs::write(&source, one_page_pdf()).expect("write source");
        let target = repaired_path(&dir.path().join("repaired"), &source);

        let written = LopdfRepairer.repair(&source, &target).expect("repair");
        assert_eq!(written, target);

        let reloaded = Document::load(&target).expect("repaired copy loads");
        assert_eq!(reloaded.get_pages().len(), 1);
        assert!(source.exists());
    }

    #[test]
    fn garbage_input_is_a_repair_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("garbage.pdf");
        std::fs::write(&source, b"this is not a pdf at all").expect("write source");

        let result = LopdfRepairer.repair(&source, &dir.path().join("garbage_fixed.pdf"));
        assert!(matches!(result, Err(TablewerkError::Repair(_))));
    }
}
