use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::{
    Client as StsClient,
    config::{Builder as StsConfigBuilder, Credentials as StaticCredentials},
    error::DisplayErrorContext,
    types::Credentials as StsCredentials,
};
use aws_smithy_types::DateTime as SmithyDateTime;
use chrono::{DateTime, Utc};
use std::time::SystemTime;
use tracing::{debug, info};

use super::{Credentials, IdentityProvider};
use crate::{constants::DEFAULT_AWS_REGION, error::ProviderError};

const GET_SESSION_TOKEN: &str = "GetSessionToken";
const ASSUME_ROLE: &str = "AssumeRole";

/// Name reported by the static provider that carries MFA session credentials
const SESSION_PROVIDER_NAME: &str = "mfaexec-session";

/// Identity provider backed by AWS STS
#[derive(Debug, Clone)]
pub struct StsProvider {
    config: SdkConfig,
}

impl StsProvider {
    /// Load AWS config with automatic region fallback
    /// Priority: ENV vars -> Config file -> EC2 metadata -> DEFAULT_AWS_REGION
    pub async fn load() -> Self {
        let loaded = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let config = match loaded.region() {
            Some(region) => {
                info!("Using region: {}", region);
                loaded
            }
            None => {
                info!(
                    "No region configured, using default {} for STS",
                    DEFAULT_AWS_REGION
                );
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(DEFAULT_AWS_REGION))
                    .load()
                    .await
            }
        };

        Self { config }
    }

    /// Client authenticated with the temporary session credentials instead of the ambient identity
    fn session_client(&self, session: &Credentials) -> StsClient {
        let expires_after = SystemTime::from(session.expiration);
        let static_credentials = StaticCredentials::new(
            session.access_key_id.clone(),
            session.secret_access_key.clone(),
            Some(session.session_token.clone()),
            Some(expires_after),
            SESSION_PROVIDER_NAME,
        );

        let config = StsConfigBuilder::from(&self.config)
            .credentials_provider(static_credentials)
            .build();

        StsClient::from_conf(config)
    }
}

#[async_trait]
impl IdentityProvider for StsProvider {
    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
    ) -> Result<Credentials, ProviderError> {
        info!("Calling AWS STS GetSessionToken");
        debug!("MFA serial: {}", serial_number);

        let client = StsClient::new(&self.config);

        let response = client
            .get_session_token()
            .serial_number(serial_number)
            .token_code(token_code)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                operation: GET_SESSION_TOKEN,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let sts_creds = response
            .credentials()
            .ok_or(ProviderError::MissingCredentials {
                operation: GET_SESSION_TOKEN,
            })?;

        let credentials = convert_credentials(sts_creds, GET_SESSION_TOKEN)?;
        info!("Successfully obtained MFA session credentials");
        Ok(credentials)
    }

    async fn assume_role(
        &self,
        session: &Credentials,
        role_arn: &str,
        role_session_name: &str,
        duration_seconds: i32,
    ) -> Result<Credentials, ProviderError> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", role_arn);
        debug!("Role session name: {}", role_session_name);
        debug!("Duration: {} seconds", duration_seconds);

        let response = self
            .session_client(session)
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(role_session_name)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                operation: ASSUME_ROLE,
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let sts_creds = response
            .credentials()
            .ok_or(ProviderError::MissingCredentials {
                operation: ASSUME_ROLE,
            })?;

        let credentials = convert_credentials(sts_creds, ASSUME_ROLE)?;
        info!("Successfully obtained role credentials");
        Ok(credentials)
    }
}

fn convert_credentials(
    sts_creds: &StsCredentials,
    operation: &'static str,
) -> Result<Credentials, ProviderError> {
    Ok(Credentials {
        access_key_id: sts_creds.access_key_id().to_string(),
        secret_access_key: sts_creds.secret_access_key().to_string(),
        session_token: sts_creds.session_token().to_string(),
        expiration: to_chrono(sts_creds.expiration())
            .ok_or(ProviderError::InvalidExpiration { operation })?,
    })
}

fn to_chrono(expiration: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sts_credentials(expiration: SmithyDateTime) -> StsCredentials {
        StsCredentials::builder()
            .access_key_id("ASIAEXAMPLE")
            .secret_access_key("secret")
            .session_token("token")
            .expiration(expiration)
            .build()
            .unwrap()
    }

    #[test]
    fn test_convert_credentials() {
        let expiration = SmithyDateTime::from_secs_and_nanos(1_792_411_200, 500);
        let creds = convert_credentials(&sts_credentials(expiration), ASSUME_ROLE).unwrap();

        assert_eq!(creds.access_key_id, "ASIAEXAMPLE");
        assert_eq!(creds.secret_access_key, "secret");
        assert_eq!(creds.session_token, "token");
        assert_eq!(creds.expiration.timestamp(), 1_792_411_200);
        assert_eq!(creds.expiration.timestamp_subsec_nanos(), 500);
    }

    #[test]
    fn test_to_chrono_matches_utc() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let smithy = SmithyDateTime::from_secs(expected.timestamp());
        assert_eq!(to_chrono(&smithy), Some(expected));
    }
}
