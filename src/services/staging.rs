use crate::utils::codec::decode_base64;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scratch directory holding per-request uploads and results.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create scratch dir {}", self.root.display()))
    }

    /// A fresh, unused path in the scratch dir.
    pub fn unique_path(&self) -> PathBuf {
        self.root.join(format!("{}.jpg", Uuid::new_v4()))
    }

    /// Starts tracking files for one request.
    pub fn session(&self) -> StagedFiles {
        StagedFiles {
            scratch: self.clone(),
            paths: Vec::new(),
        }
    }
}

/// Decodes a base64 payload (data-URL header allowed) and writes it to `path`.
/// Failures are logged and reported as `false`.
pub async fn save_base64_image(payload: &str, path: &Path) -> bool {
    match write_base64_image(payload, path).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Error saving base64 image to {}: {:#}", path.display(), e);
            false
        }
    }
}

async fn write_base64_image(payload: &str, path: &Path) -> Result<()> {
    let bytes = decode_base64(payload).context("Malformed base64 payload")?;
    tokio::fs::write(path, bytes)
        .await
        .context("Failed to write staged file")?;
    Ok(())
}

/// Files staged for a single request. Every path handed out here is removed
/// by [`StagedFiles::cleanup`], whether or not it was ever written.
#[derive(Debug)]
pub struct StagedFiles {
    scratch: ScratchDir,
    paths: Vec<PathBuf>,
}

impl StagedFiles {
    /// Reserves a new path that will be cleaned up with the session.
    pub fn reserve(&mut self) -> PathBuf {
        let path = self.scratch.unique_path();
        self.paths.push(path.clone());
        path
    }

    /// Decodes `payload` into a fresh staged file. `None` when the payload
    /// could not be decoded or written.
    pub async fn stage(&mut self, payload: &str) -> Option<PathBuf> {
        let path = self.reserve();
        if save_base64_image(payload, &path).await {
            Some(path)
        } else {
            None
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Best-effort removal of every reserved file. Errors are logged only.
    pub async fn cleanup(self) {
        for path in &self.paths {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!("Removed scratch file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Error removing temporary file {}: {}", path.display(), e)
                }
            }
        }
    }
}
