use tracing::info;

use super::{Credentials, IdentityProvider, cache::CacheStore};
use crate::{
    error::AcquireError,
    pinentry::{PinPrompt, PinRequest},
};

/// Obtains MFA session credentials, reusing the cache whenever it is still fresh
pub struct SessionAcquirer<'a, P> {
    cache: &'a CacheStore,
    provider: &'a P,
    prompt: &'a dyn PinPrompt,
    mfa_serial: &'a str,
}

impl<'a, P: IdentityProvider> SessionAcquirer<'a, P> {
    pub fn new(
        cache: &'a CacheStore,
        provider: &'a P,
        prompt: &'a dyn PinPrompt,
        mfa_serial: &'a str,
    ) -> Self {
        Self {
            cache,
            provider,
            prompt,
            mfa_serial,
        }
    }

    /// Return usable session credentials.
    ///
    /// A cache hit skips both the prompt and the network. On a miss the user is
    /// asked for a code, STS is called, and the result is cached before returning;
    /// a failure to cache fails the whole call.
    pub async fn acquire(&self) -> Result<Credentials, AcquireError> {
        if let Some(cached) = self.cache.load().await.map_err(AcquireError::Cache)? {
            info!("Using cached MFA session credentials");
            return Ok(cached);
        }

        let request = PinRequest::for_mfa_device(env!("CARGO_PKG_NAME"), self.mfa_serial);
        let token_code = self.prompt.get_pin(&request)?;

        let creds = self
            .provider
            .get_session_token(self.mfa_serial, &token_code)
            .await
            .map_err(AcquireError::Provider)?;

        self.cache.save(&creds).await.map_err(AcquireError::Save)?;
        Ok(creds)
    }
}
