//! Startup refresh of the severity model weights.
//!
//! A flag row in DynamoDB marks that newer weights were uploaded to S3. When
//! set, the weights are downloaded, swapped into place and the flag cleared.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::db::{RepositoryError, WeightFlagStore};
use crate::storage::{ObjectSource, S3ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum WeightRefreshError {
    #[error("weight flag lookup failed: {0}")]
    Repository(#[from] RepositoryError),
    #[error("weight download failed: {0}")]
    Download(#[from] S3ServiceError),
    #[error("failed to install weights: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    UpToDate,
    Installed { path: PathBuf, bytes: usize },
}

pub struct WeightRefresher {
    flags: Arc<dyn WeightFlagStore>,
    storage: Arc<dyn ObjectSource>,
    s3_key: String,
    destination: PathBuf,
}

impl WeightRefresher {
    pub fn new(
        flags: Arc<dyn WeightFlagStore>,
        storage: Arc<dyn ObjectSource>,
        s3_key: String,
        destination: PathBuf,
    ) -> Self {
        Self {
            flags,
            storage,
            s3_key,
            destination,
        }
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, WeightRefreshError> {
        let flag = match self.flags.weight_flag().await? {
            Some(flag) if flag.new_weight => flag,
            _ => {
                info!("Model weights are up to date");
                return Ok(RefreshOutcome::UpToDate);
            }
        };

        info!("New weights flagged, downloading {}", self.s3_key);
        let bytes = self.storage.fetch_object(&self.s3_key).await?;
        let size = bytes.len();
        let destination = self.destination.clone();
        tokio::task::spawn_blocking(move || install_weights(&bytes, &destination))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;

        // Cleared only after the new file is in place, so a failed install is retried next start.
        self.flags.clear(&flag).await?;
        info!(
            "Installed {} bytes of weights at {}",
            size,
            self.destination.display()
        );
        Ok(RefreshOutcome::Installed {
            path: self.destination.clone(),
            bytes: size,
        })
    }
}

/// Writes `bytes` beside `destination` and renames over it, so readers never
/// see a partially written file.
pub fn install_weights(bytes: &[u8], destination: &Path) -> std::io::Result<()> {
    let dir = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}
