//! Local artifact saving
//!
//! Recovery material and restored files are "downloaded" through an
//! [`ArtifactSink`]. The default sink writes into the download directory with
//! a temp-file-then-rename so a failed write never leaves a partial file.
//! The final name is claimed up front, so saves never overwrite each other.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Save `bytes` under `file_name`, returning where it landed
    async fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

pub struct DownloadDirSink {
    dir: PathBuf,
}

impl DownloadDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Claim `name`, `name (1)`, `name (2)`... so earlier downloads are never overwritten
    ///
    /// The name is reserved by creating an empty file with `create_new`, so two
    /// concurrent saves can never land on the same path.
    async fn claim_unique_path(&self, file_name: &str) -> io::Result<PathBuf> {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.to_string());
        let ext = path.extension().map(|e| e.to_string_lossy().to_string());

        let mut counter = 0u32;
        loop {
            let name = match (counter, &ext) {
                (0, _) => file_name.to_string(),
                (n, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
                (n, None) => format!("{} ({})", stem, n),
            };
            let candidate = self.dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Keep only the final path component so server-supplied names cannot escape the directory
fn sanitize_file_name(file_name: &str) -> io::Result<String> {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid file name: {:?}", file_name)))
}

#[async_trait]
impl ArtifactSink for DownloadDirSink {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let file_name = sanitize_file_name(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.claim_unique_path(&file_name).await?;
        let temp = self.dir.join(format!(".{}.{}.part", file_name, uuid::Uuid::new_v4()));

        // Replaces the empty placeholder; on failure both files are removed
        let written = match tokio::fs::write(&temp, bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            let _ = tokio::fs::remove_file(&target).await;
            return Err(e);
        }

        tracing::info!("[Download] Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(target)
    }
}
