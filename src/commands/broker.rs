use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::{
    aws::{
        self, IdentityProvider, cache::CacheStore, format_remaining, session::SessionAcquirer,
        sts::StsProvider,
    },
    config::Config,
    dispatch::{Dispatcher, ExecLauncher, ProcessLauncher},
    error::AcquireError,
    pinentry::{self, PinPrompt},
};

/// The whole pipeline: acquire session credentials, assume the role, dispatch.
///
/// Only returns on the export path or on failure; a successful exec never comes back.
#[derive(Debug, Clone)]
pub struct BrokerCommand {
    pub command: Vec<String>,
}

impl BrokerCommand {
    pub async fn execute(self) -> Result<()> {
        let config = Config::from_env().context("Failed to load configuration")?;

        let cache = CacheStore::from_config(&config);
        let provider = StsProvider::load().await;
        let prompt = pinentry::default_prompt(&config);
        let launcher = ExecLauncher;
        let dispatcher = Dispatcher::new(io::stdout().lock(), &launcher);

        run(
            &config,
            &cache,
            &provider,
            prompt.as_ref(),
            dispatcher,
            &self.command,
        )
        .await
    }
}

/// Acquire, then assume, then dispatch; each step only runs if the previous one succeeded
pub async fn run<P, W, L>(
    config: &Config,
    cache: &CacheStore,
    provider: &P,
    prompt: &dyn PinPrompt,
    mut dispatcher: Dispatcher<'_, W, L>,
    command: &[String],
) -> Result<()>
where
    P: IdentityProvider,
    W: Write,
    L: ProcessLauncher,
{
    let session = SessionAcquirer::new(cache, provider, prompt, &config.mfa_serial)
        .acquire()
        .await
        .map_err(|e| match e {
            AcquireError::Cancelled => anyhow::Error::new(e),
            other => anyhow::Error::new(other).context("Failed to obtain MFA session credentials"),
        })?;
    info!(
        "Credentials expire in {}",
        format_remaining(session.remaining(Utc::now()))
    );

    let role = aws::role::assume_role(
        provider,
        &session,
        &config.role_arn,
        &config.role_session_name,
    )
    .await
    .context("Failed to assume AWS role")?;
    info!(
        "Role creds expire in {}",
        format_remaining(role.remaining(Utc::now()))
    );

    dispatcher
        .dispatch(&role, command)
        .context("Failed to hand off credentials")?;

    Ok(())
}
