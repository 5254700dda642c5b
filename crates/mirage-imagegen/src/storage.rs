use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{ImageGenError, Result};

/// Length of a generated name: 32 hex digits plus `.png`
const NAME_LEN: usize = 36;

/// Flat directory of generated PNG files
///
/// Files are addressed only by their random name; nothing is indexed.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write the bytes under a fresh random name and return the name
    pub async fn save(&self, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            tracing::error!(directory = %self.directory.display(), error = %e, "cannot create output directory");
            ImageGenError::InternalError(None)
        })?;

        let name = format!("{}.png", uuid::Uuid::new_v4().simple());
        let path = self.directory.join(&name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| write_error(&path, &e))?;

        file.write_all(bytes).await.map_err(|e| write_error(&path, &e))?;
        file.flush().await.map_err(|e| write_error(&path, &e))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored generated image");

        Ok(name)
    }

    /// Read a stored file; anything not shaped like a generated name is not found
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        if !is_generated_name(name) {
            return Err(ImageGenError::FileNotFound);
        }

        match tokio::fs::read(self.directory.join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ImageGenError::FileNotFound),
            Err(e) => {
                tracing::error!(name, error = %e, "cannot read stored image");
                Err(ImageGenError::InternalError(None))
            }
        }
    }
}

fn write_error(path: &Path, e: &std::io::Error) -> ImageGenError {
    tracing::error!(path = %path.display(), error = %e, "cannot write generated image");
    ImageGenError::InternalError(None)
}

/// `<32 lowercase hex>.png`
pub(crate) fn is_generated_name(name: &str) -> bool {
    name.len() == NAME_LEN
        && name.strip_suffix(".png").is_some_and(|stem| {
            stem.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
}
