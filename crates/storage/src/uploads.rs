#![forbid(unsafe_code)]

use crate::support::{new_id, sha256_hex};
use std::io::Write as _;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File too large")]
    TooLarge { size: u64, limit: u64 },
    #[error("File not found")]
    NotFound,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredUpload {
    pub original_name: String,
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Flat directory of uploaded files named `<uuid>-<original name>`.
#[derive(Clone, Debug)]
pub struct UploadSink {
    dir: PathBuf,
    max_bytes: u64,
}

impl UploadSink {
    pub fn open(dir: impl AsRef<Path>, max_bytes: u64) -> Result<Self, UploadError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload, UploadError> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let stored_name = format!("{}-{}", new_id(), sanitize_name(original_name));
        let path = self.dir.join(&stored_name);
        let part = self.dir.join(format!("{stored_name}.part"));
        {
            let mut file = std::fs::File::create(&part)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&part, &path)?;
        tracing::debug!(stored_name = %stored_name, size, "stored upload");

        Ok(StoredUpload {
            original_name: original_name.to_string(),
            stored_name,
            path,
            size,
            sha256: sha256_hex(bytes),
        })
    }

    /// Path of an existing upload. Names that could escape the upload
    /// directory resolve to `NotFound`.
    pub fn resolve(&self, stored_name: &str) -> Result<PathBuf, UploadError> {
        if !is_plain_name(stored_name) {
            return Err(UploadError::NotFound);
        }
        let path = self.dir.join(stored_name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(UploadError::NotFound)
        }
    }

    /// Deletes the upload that `filepath` points at. Only the final path
    /// component is used, so records can never reach outside the upload
    /// directory. A file that is already gone is fine.
    pub fn remove(&self, filepath: impl AsRef<Path>) -> Result<bool, UploadError> {
        let Some(name) = filepath.as_ref().file_name().and_then(|name| name.to_str()) else {
            return Ok(false);
        };
        if !is_plain_name(name) {
            return Ok(false);
        }
        match std::fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains(['/', '\\']) && !name.contains("..")
}

fn sanitize_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace("..", "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
