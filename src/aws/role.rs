use tracing::info;

use super::{Credentials, IdentityProvider};
use crate::{constants::ASSUME_ROLE_DURATION_SECONDS, error::ProviderError};

/// Exchange session credentials for role credentials.
///
/// Always a live call for the maximum duration; role credentials are never cached.
pub async fn assume_role<P: IdentityProvider>(
    provider: &P,
    session: &Credentials,
    role_arn: &str,
    role_session_name: &str,
) -> Result<Credentials, ProviderError> {
    info!("Assuming role {}", role_arn);
    provider
        .assume_role(
            session,
            role_arn,
            role_session_name,
            ASSUME_ROLE_DURATION_SECONDS,
        )
        .await
}
