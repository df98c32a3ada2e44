//! Directory scanner for discovering table documents

use crate::error::Result;
use crate::format::Format;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file whose extension names a readable format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Full path to the file
    pub path: PathBuf,
    /// Format implied by the extension
    pub format: Format,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered documents, sorted by path
    pub documents: Vec<Document>,
}

impl ScanResult {
    /// Documents of one format
    pub fn of_format(&self, format: Format) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |d| d.format == format)
    }

    /// Number of documents per format, in extension order
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for document in &self.documents {
            *counts.entry(document.format.extension()).or_default() += 1;
        }
        counts
    }
}

/// Scan one or more directories for documents that can be loaded.
///
/// Typeset exports are skipped since they cannot be read back.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut documents = Vec::new();

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(format) = Format::from_path(path).filter(|f| f.is_readable()) {
                documents.push(Document {
                    path: path.to_path_buf(),
                    format,
                });
            }
        }
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    documents.dedup_by(|a, b| a.path == b.path);
    tracing::debug!(documents = documents.len(), "scanned for documents");

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_finds_readable_documents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("survey");
        fs::create_dir(&nested).unwrap();
        for name in ["a.dex", "b.DAT", "notes.txt", "report.tex"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::write(nested.join("points.dob"), "").unwrap();
        fs::write(nested.join("points.csv"), "").unwrap();

        let result = scan_directory(&[dir.path()]).unwrap();
        let names: Vec<String> = result
            .documents
            .iter()
            .map(|d| d.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.dex", "b.DAT", "points.csv", "points.dob"]);
        assert_eq!(result.of_format(Format::Tagged).count(), 1);
        assert_eq!(result.counts()["dob"], 1);
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_directory(&[dir.path().join("absent")]).is_err());
    }
}
