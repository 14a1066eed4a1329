//! Client-side save of a received report.
//!
//! The artifact is first exposed through a [`TransientHandle`] (a staging file next to
//! the destination), then moved to its final name. The handle is released after the
//! save step whatever its outcome, and `Drop` covers early returns and panics.

use crate::errors::ReportError;
use crate::models::{ReportArtifact, SavedReport};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Give up looking for a free ` (n)` suffix after this many tries.
const MAX_NAME_SUFFIX: u32 = 999;

/// Revocable staging file holding report bytes until they are saved.
#[derive(Debug)]
pub struct TransientHandle {
    path: PathBuf,
    released: bool,
}

impl TransientHandle {
    /// Writes `bytes` to a fresh staging file in `dir`.
    pub async fn acquire(dir: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        let path = dir.join(format!(".report-{}.part", Uuid::new_v4()));
        let handle = Self {
            path,
            released: false,
        };

        let mut file = fs::File::create(&handle.path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;

        Ok(handle)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Revokes the handle, removing the staging file if the save step left it behind.
    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("Released transient handle {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to release transient handle {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for TransientHandle {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Saves reports into a download directory.
#[derive(Debug, Clone)]
pub struct ReportSaver {
    dir: PathBuf,
}

impl ReportSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the artifact under its suggested name, never overwriting an existing file.
    pub async fn save(&self, artifact: &ReportArtifact) -> Result<SavedReport, ReportError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            ReportError::Save(format!(
                "failed to create download directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let handle = TransientHandle::acquire(&self.dir, &artifact.bytes)
            .await
            .map_err(|e| ReportError::Save(format!("failed to stage report: {}", e)))?;

        let result = self.persist(&handle, &artifact.file_name).await;
        handle.release().await;
        let path = result?;

        let saved = SavedReport {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| artifact.file_name.clone()),
            size_bytes: artifact.bytes.len() as u64,
            checksum: compute_checksum(&artifact.bytes),
            saved_at: Utc::now(),
            path,
        };
        tracing::info!(
            "✓ Report saved to {} ({} bytes, sha256 {})",
            saved.path.display(),
            saved.size_bytes,
            saved.checksum
        );
        Ok(saved)
    }

    async fn persist(&self, handle: &TransientHandle, file_name: &str) -> Result<PathBuf, ReportError> {
        let target = self.available_path(file_name).await?;
        fs::rename(handle.path(), &target).await.map_err(|e| {
            ReportError::Save(format!("failed to write {}: {}", target.display(), e))
        })?;
        Ok(target)
    }

    /// First of `name`, `stem (1).ext`, `stem (2).ext`, ... that does not exist yet.
    async fn available_path(&self, file_name: &str) -> Result<PathBuf, ReportError> {
        let candidate = self.dir.join(file_name);
        if !path_exists(&candidate).await {
            return Ok(candidate);
        }

        let name = Path::new(file_name);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let extension = name.extension().map(|e| e.to_string_lossy().into_owned());

        for n in 1..=MAX_NAME_SUFFIX {
            let numbered = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = self.dir.join(numbered);
            if !path_exists(&candidate).await {
                return Ok(candidate);
            }
        }

        Err(ReportError::Save(format!(
            "no free file name for {} in {}",
            file_name,
            self.dir.display()
        )))
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(true)
}

/// Computes SHA-256 checksum of the given bytes (hex encoded).
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str, bytes: &[u8]) -> ReportArtifact {
        ReportArtifact {
            file_name: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: bytes.to_vec(),
        }
    }

    fn staging_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count()
    }

    #[tokio::test]
    async fn test_save_writes_file_and_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ReportSaver::new(dir.path());

        let saved = saver.save(&artifact("Asha_Report.pdf", b"%PDF-1.4")).await.unwrap();

        assert_eq!(saved.file_name, "Asha_Report.pdf");
        assert_eq!(saved.size_bytes, 8);
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"%PDF-1.4");
        assert_eq!(saved.checksum, compute_checksum(b"%PDF-1.4"));
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_save_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ReportSaver::new(dir.path());

        saver.save(&artifact("Report.pdf", b"first")).await.unwrap();
        let second = saver.save(&artifact("Report.pdf", b"second")).await.unwrap();

        assert_eq!(second.file_name, "Report (1).pdf");
        assert_eq!(std::fs::read(dir.path().join("Report.pdf")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_failed_save_still_releases_handle() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ReportSaver::new(dir.path());

        // Target lives in a directory that does not exist, so the move fails after staging.
        let err = saver
            .save(&artifact("missing/Report.pdf", b"bytes"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Save(_)));
        assert_eq!(staging_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let handle = TransientHandle::acquire(dir.path(), b"bytes").await.unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        drop(handle);
        assert!(!path.exists());
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(
            compute_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
