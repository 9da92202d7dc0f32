use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use super::Credentials;
use crate::{config::Config, constants::CACHE_SAFETY_MARGIN, error::CacheError};

/// On-disk record of the most recently obtained MFA session credentials
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cached credentials that are still usable right now
    pub async fn load(&self) -> Result<Option<Credentials>, CacheError> {
        self.load_at(Utc::now()).await
    }

    /// Load cached credentials, treating expired or soon-to-expire records as absent
    pub async fn load_at(&self, now: DateTime<Utc>) -> Result<Option<Credentials>, CacheError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No credential cache at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let creds: Credentials =
            serde_json::from_slice(&contents).map_err(|source| CacheError::Decode {
                path: self.path.clone(),
                source,
            })?;

        if creds.expiration <= now {
            info!("Cached credentials expired.");
            return Ok(None);
        }

        if !creds.is_usable_at(now, CACHE_SAFETY_MARGIN) {
            info!("Cached credentials expire in less than 1 hour, refreshing.");
            return Ok(None);
        }

        debug!("Using cached credentials from {}", self.path.display());
        Ok(Some(creds))
    }

    /// Overwrite the cache with `creds`
    pub async fn save(&self, creds: &Credentials) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut contents = serde_json::to_vec(creds).map_err(CacheError::Encode)?;
        contents.push(b'\n');

        let write_error = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await.map_err(write_error)?;

        // `mode` only applies on creation; tighten a pre-existing file before writing secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_error)?;
        }

        file.write_all(&contents).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)?;

        info!("Credentials cached at {}", self.path.display());
        Ok(())
    }
}
