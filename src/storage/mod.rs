//! On-disk storage for uploads and finished reports.
//!
//! [`UploadStore`] is a request-scoped handle passed explicitly into the
//! API layer — the comparison engine itself never touches the filesystem.
//! The store owns the lifecycle of uploaded files: created on upload,
//! deleted after the processing run completes or fails.

use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::log_warning;
use crate::error::{ServerError, ServerResult};

/// Default directory for uploaded CSV files.
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default directory for generated XLSX reports.
const DEFAULT_PROCESSED_DIR: &str = "processed";

/// Handle over the upload and report directories.
#[derive(Debug, Clone)]
pub struct UploadStore {
    uploads: PathBuf,
    processed: PathBuf,
}

impl UploadStore {
    /// Create a store over the given directories, creating them if needed.
    pub fn new(uploads: impl Into<PathBuf>, processed: impl Into<PathBuf>) -> ServerResult<Self> {
        let store = Self {
            uploads: uploads.into(),
            processed: processed.into(),
        };
        fs::create_dir_all(&store.uploads)?;
        fs::create_dir_all(&store.processed)?;
        Ok(store)
    }

    /// Create a store from `SHEETDIFF_UPLOAD_DIR` / `SHEETDIFF_PROCESSED_DIR`,
    /// falling back to `uploads/` and `processed/`.
    pub fn from_env() -> ServerResult<Self> {
        let uploads =
            std::env::var("SHEETDIFF_UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.into());
        let processed = std::env::var("SHEETDIFF_PROCESSED_DIR")
            .unwrap_or_else(|_| DEFAULT_PROCESSED_DIR.into());
        Self::new(uploads, processed)
    }

    /// Save an uploaded file; returns the sanitized name it was stored under.
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> ServerResult<String> {
        let name = sanitize_filename(filename);
        fs::write(self.uploads.join(&name), bytes)?;
        Ok(name)
    }

    /// Read an uploaded file back.
    pub fn read_upload(&self, filename: &str) -> ServerResult<Vec<u8>> {
        let name = sanitize_filename(filename);
        Ok(fs::read(self.uploads.join(name))?)
    }

    /// Whether an uploaded file exists.
    pub fn has_upload(&self, filename: &str) -> bool {
        self.uploads.join(sanitize_filename(filename)).is_file()
    }

    /// Best-effort deletion of uploaded files after a run. Failures are
    /// logged, never surfaced to the client.
    pub fn remove_uploads(&self, filenames: &[String]) {
        for filename in filenames {
            let path = self.uploads.join(sanitize_filename(filename));
            if path.is_file() {
                if let Err(err) = fs::remove_file(&path) {
                    log_warning(format!("Could not delete upload '{}': {}", filename, err));
                }
            }
        }
    }

    /// Target path for a new report file.
    pub fn report_path(&self, filename: &str) -> PathBuf {
        self.processed.join(filename)
    }

    /// Read a finished report for download. Only `.xlsx` names without
    /// path separators are served.
    pub fn read_report(&self, filename: &str) -> ServerResult<Vec<u8>> {
        if !is_safe_report_name(filename) {
            return Err(ServerError::BadRequest(
                "Invalid or unpermitted filename/filetype".into(),
            ));
        }
        let path = self.processed.join(filename);
        if !path.is_file() {
            return Err(ServerError::NotFound(format!("report '{}'", filename)));
        }
        Ok(fs::read(path)?)
    }
}

/// Strip path components and unusual characters from an upload name.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv");
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim_matches('.').is_empty() {
        "upload.csv".to_string()
    } else {
        safe
    }
}

/// Download names must be plain `.xlsx` files, no traversal.
fn is_safe_report_name(name: &str) -> bool {
    name.ends_with(".xlsx")
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, UploadStore) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            UploadStore::new(dir.path().join("uploads"), dir.path().join("processed")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let (_dir, store) = store();
        let name = store.save_upload("data.csv", b"ID,v\n1,2").unwrap();
        assert_eq!(name, "data.csv");
        assert_eq!(store.read_upload("data.csv").unwrap(), b"ID,v\n1,2");
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("weird name!.csv"), "weird_name_.csv");
        assert_eq!(sanitize_filename(""), "upload.csv");
    }

    #[test]
    fn test_remove_uploads_deletes_files() {
        let (_dir, store) = store();
        store.save_upload("a.csv", b"x").unwrap();
        assert!(store.has_upload("a.csv"));
        store.remove_uploads(&["a.csv".to_string(), "missing.csv".to_string()]);
        assert!(!store.has_upload("a.csv"));
    }

    #[test]
    fn test_read_report_rejects_unsafe_names() {
        let (_dir, store) = store();
        assert!(store.read_report("../secret.xlsx").is_err());
        assert!(store.read_report("report.csv").is_err());
        assert!(store.read_report("missing.xlsx").is_err());
    }

    #[test]
    fn test_read_report_serves_existing_file() {
        let (_dir, store) = store();
        std::fs::write(store.report_path("r.xlsx"), b"bytes").unwrap();
        assert_eq!(store.read_report("r.xlsx").unwrap(), b"bytes");
    }
}
