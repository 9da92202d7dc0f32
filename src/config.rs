use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::constants::{
    self, DEFAULT_PINENTRY_PROGRAM, HOME_ENV, MFA_SERIAL_ENV, PINENTRY_PROGRAM_ENV, ROLE_ARN_ENV,
    ROLE_SESSION_NAME_ENV,
};

/// Settings read once from the process environment at startup.
///
/// Role ARN, session name and MFA serial are opaque: empty or malformed values
/// are passed through to STS, which reports the problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub role_arn: String,
    pub role_session_name: String,
    pub mfa_serial: String,
    pub home_dir: PathBuf,
    pub pinentry_program: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home_dir = lookup(HOME_ENV)
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .context("Failed to determine home directory. Please set HOME environment variable.")?;

        let config = Self {
            role_arn: lookup(ROLE_ARN_ENV).unwrap_or_default(),
            role_session_name: lookup(ROLE_SESSION_NAME_ENV).unwrap_or_default(),
            mfa_serial: lookup(MFA_SERIAL_ENV).unwrap_or_default(),
            home_dir,
            pinentry_program: lookup(PINENTRY_PROGRAM_ENV)
                .filter(|program| !program.is_empty())
                .unwrap_or_else(|| DEFAULT_PINENTRY_PROGRAM.to_string()),
        };

        if config.mfa_serial.is_empty() {
            warn!("{} is not set", MFA_SERIAL_ENV);
        }
        if config.role_arn.is_empty() {
            warn!("{} is not set", ROLE_ARN_ENV);
        }
        debug!("Role ARN: {}", config.role_arn);
        debug!("Role session name: {}", config.role_session_name);
        debug!("MFA serial: {}", config.mfa_serial);

        Ok(config)
    }

    pub fn cache_path(&self) -> PathBuf {
        constants::cache_path_in(&self.home_dir)
    }
}
