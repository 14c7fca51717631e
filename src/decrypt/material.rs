use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

use crate::error::DecryptionError;
use crate::intake::extension_of;

/// Which recovery material a pipeline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    /// Symmetric key for per-zone image ciphertexts
    Key,
    /// Cryptographic context for document ciphertexts
    Context,
}

impl RecoveryKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Context => "ctx",
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        extension_of(file_name).eq_ignore_ascii_case(self.extension())
    }
}

impl std::fmt::Display for RecoveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// Material the user supplied
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Asks the user for recovery material
///
/// `Ok(None)` means the picker was dismissed. A file that was chosen but
/// could not be read is an error.
#[async_trait]
pub trait RecoveryMaterialProvider: Send + Sync {
    async fn request(&self, kind: RecoveryKind) -> Result<Option<RecoveryFile>, DecryptionError>;
}

/// Reads material from a path chosen up front (e.g. a CLI argument)
pub struct PathMaterialProvider {
    path: Option<PathBuf>,
}

impl PathMaterialProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RecoveryMaterialProvider for PathMaterialProvider {
    async fn request(&self, kind: RecoveryKind) -> Result<Option<RecoveryFile>, DecryptionError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(None);
        };
        let unreadable = |source| DecryptionError::MaterialUnreadable {
            path: path.clone(),
            source,
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| unreadable(io::Error::new(io::ErrorKind::InvalidInput, "not a file")))?;
        let bytes = tokio::fs::read(path).await.map_err(unreadable)?;

        tracing::debug!("[Decrypt] Read {} material from {}", kind, path.display());
        Ok(Some(RecoveryFile { file_name, bytes }))
    }
}
