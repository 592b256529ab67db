//! Access-token persistence.
//!
//! The gateway is the only writer: tokens are saved when a session is applied
//! and cleared when it ends, so the stored token always matches the published
//! session state.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::io::AsyncWriteExt;

use crate::error::AuthError;

#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the backing store cannot be read.
    async fn load(&self) -> Result<Option<String>, AuthError>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the backing store cannot be written.
    async fn save(&self, token: &str) -> Result<(), AuthError>;

    /// Remove the stored token. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the backing store cannot be written.
    async fn clear(&self) -> Result<(), AuthError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(Some(token.into())) }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, AuthError> {
        Ok(self.slot().clone())
    }

    async fn save(&self, token: &str) -> Result<(), AuthError> {
        *self.slot() = Some(token.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        *self.slot() = None;
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Single-file store. The file holds the bare token, nothing else.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_err(err: &std::io::Error) -> AuthError {
    AuthError::Storage(err.to_string())
}

/// Token file permissions: owner read/write only.
#[cfg(unix)]
const TOKEN_FILE_MODE: u32 = 0o600;

/// Write `contents` readable by the owner only. A file that already exists
/// with wider permissions is narrowed before the token lands in it.
async fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        options.mode(TOKEN_FILE_MODE);
        if tokio::fs::try_exists(path).await? {
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(TOKEN_FILE_MODE)).await?;
        }
    }

    let mut file = options.open(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, AuthError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_owned()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(&e)),
        }
    }

    async fn save(&self, token: &str) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| storage_err(&e))?;
        }
        write_private(&self.path, token).await.map_err(|e| storage_err(&e))
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(storage_err(&e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
