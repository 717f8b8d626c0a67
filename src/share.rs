//! Export of a document's bytes to a shareable file.
//!
//! Layout: `{share_root}/{image-file|pdf-file}/{title}.{ext}`, where `ext`
//! comes from sniffing the bytes. Path separators in the title become `_`,
//! so the file always lands directly in its kind directory. A repeat export
//! overwrites the previous file; nothing is cleaned up proactively.
//!
//! The write is atomic: bytes go to a temp file in the target directory,
//! which is then renamed over the target. A failed export leaves no partial
//! file behind.

use crate::sniff::MimeType;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes share files below a root directory.
#[derive(Debug, Clone)]
pub struct ShareExporter {
    root: PathBuf,
}

impl ShareExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` to `{root}/{subdirectory}/{title}.{ext}`.
    ///
    /// Returns `None` on any I/O failure.
    pub fn export(&self, data: &[u8], title: &str, subdirectory: &str) -> Option<PathBuf> {
        let mime = MimeType::detect(data);
        let dir = self.root.join(subdirectory);
        let target = dir.join(format!("{}.{}", file_stem(title), mime.extension()));

        match write_atomic(&dir, &target, data) {
            Ok(()) => {
                debug!("Exported {} ({}) → {}", title, mime, target.display());
                Some(target)
            }
            Err(e) => {
                debug!("Export to {} failed: {}", target.display(), e);
                None
            }
        }
    }
}

fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}

fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;

    if target.exists() {
        std::fs::remove_file(target)?;
    }

    // Created 0600 on unix.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_kind_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        let exporter = ShareExporter::new(root.path());

        let path = exporter
            .export(b"%PDF-1.4 body", "Report", "pdf-file")
            .unwrap();

        assert_eq!(path, root.path().join("pdf-file").join("Report.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 body");
    }

    #[test]
    fn extension_follows_sniffed_bytes() {
        let root = tempfile::tempdir().unwrap();
        let exporter = ShareExporter::new(root.path());

        let png = exporter.export(&[0x89, b'P'], "pic", "image-file").unwrap();
        let jpeg = exporter.export(&[0xFF, 0xD8], "pic", "image-file").unwrap();

        assert_eq!(png.file_name().unwrap(), "pic.png");
        assert_eq!(jpeg.file_name().unwrap(), "pic.jpeg");
    }

    #[test]
    fn unknown_bytes_get_bare_extension() {
        let root = tempfile::tempdir().unwrap();
        let path = ShareExporter::new(root.path())
            .export(&[0x00, 0x01], "blob", "image-file")
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "blob.");
    }

    #[test]
    fn title_cannot_escape_kind_directory() {
        let root = tempfile::tempdir().unwrap();
        let exporter = ShareExporter::new(root.path());

        let path = exporter.export(b"%PDF", "../../x", "pdf-file").unwrap();
        assert_eq!(path, root.path().join("pdf-file").join(".._.._x.pdf"));

        let path = exporter.export(b"%PDF", "a\\b", "pdf-file").unwrap();
        assert_eq!(path.parent().unwrap(), root.path().join("pdf-file"));
        assert_eq!(path.file_name().unwrap(), "a_b.pdf");
    }

    #[test]
    fn repeat_export_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let exporter = ShareExporter::new(root.path());

        exporter.export(b"%PDF old", "doc", "pdf-file").unwrap();
        let path = exporter.export(b"%PDF new", "doc", "pdf-file").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF new");
        let entries = std::fs::read_dir(root.path().join("pdf-file"))
            .unwrap()
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn unwritable_root_yields_none() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        // A regular file where a directory is expected.
        let exporter = ShareExporter::new(&blocker);
        assert!(exporter.export(b"%PDF", "doc", "pdf-file").is_none());
    }
}
