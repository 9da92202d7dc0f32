use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub mod cache;
pub mod role;
pub mod session;
pub mod sts;

/// AWS temporary credentials structure
///
/// Serialized with the STS wire field names (`AccessKeyId`, `Expiration`, ...).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl Credentials {
    /// Time left until expiration; negative once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.expiration - now
    }

    /// Usable iff not yet expired and at least `margin` of lifetime remains
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.expiration > now && self.remaining(now) >= margin
    }
}

// Secrets must never reach the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Token-issuing service the broker exchanges credentials with
#[async_trait]
pub trait IdentityProvider {
    /// Exchange the ambient long-term identity plus an MFA code for session credentials
    async fn get_session_token(
        &self,
        serial_number: &str,
        token_code: &str,
    ) -> Result<Credentials, ProviderError>;

    /// Exchange session credentials for credentials scoped to `role_arn`
    async fn assume_role(
        &self,
        session: &Credentials,
        role_arn: &str,
        role_session_name: &str,
        duration_seconds: i32,
    ) -> Result<Credentials, ProviderError>;
}

/// Human-readable duration such as `11h59m58s`, used in expiry notices
pub fn format_remaining(remaining: TimeDelta) -> String {
    let total = remaining.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    pub fn credentials(prefix: &str, expiration: DateTime<Utc>) -> Credentials {
        Credentials {
            access_key_id: format!("{prefix}-id"),
            secret_access_key: format!("{prefix}-secret"),
            session_token: format!("{prefix}-token"),
            expiration,
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        GetSessionToken {
            serial_number: String,
            token_code: String,
        },
        AssumeRole {
            session_key_id: String,
            role_arn: String,
            role_session_name: String,
            duration_seconds: i32,
        },
    }

    /// Provider double that records every call and answers from fixed results
    pub struct FakeProvider {
        pub session: Result<Credentials, &'static str>,
        pub role: Result<Credentials, &'static str>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeProvider {
        pub fn new(session: Credentials, role: Credentials) -> Self {
            Self {
                session: Ok(session),
                role: Ok(role),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn answer(
            result: &Result<Credentials, &'static str>,
            operation: &'static str,
        ) -> Result<Credentials, ProviderError> {
            result.clone().map_err(|message| ProviderError::Request {
                operation,
                message: message.to_string(),
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn get_session_token(
            &self,
            serial_number: &str,
            token_code: &str,
        ) -> Result<Credentials, ProviderError> {
            self.calls.lock().unwrap().push(Call::GetSessionToken {
                serial_number: serial_number.to_string(),
                token_code: token_code.to_string(),
            });
            Self::answer(&self.session, "GetSessionToken")
        }

        async fn assume_role(
            &self,
            session: &Credentials,
            role_arn: &str,
            role_session_name: &str,
            duration_seconds: i32,
        ) -> Result<Credentials, ProviderError> {
            self.calls.lock().unwrap().push(Call::AssumeRole {
                session_key_id: session.access_key_id.clone(),
                role_arn: role_arn.to_string(),
                role_session_name: role_session_name.to_string(),
                duration_seconds,
            });
            Self::answer(&self.role, "AssumeRole")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Credentials {
        Credentials {
            access_key_id: "ASIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: "FwoGZXIvYXdzEJr".to_string(),
            expiration: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let printed = format!("{:?}", sample());
        assert!(printed.contains("ASIAEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
        assert!(!printed.contains("FwoGZXIvYXdzEJr"));
    }

    #[test]
    fn test_serializes_with_sts_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["AccessKeyId"], "ASIAEXAMPLE");
        assert_eq!(json["SecretAccessKey"], "wJalrXUtnFEMI");
        assert_eq!(json["SessionToken"], "FwoGZXIvYXdzEJr");
        assert_eq!(json["Expiration"], "2026-10-19T12:00:00Z");
    }

    #[test]
    fn test_usable_requires_margin() {
        let creds = sample();
        let margin = TimeDelta::hours(1);

        assert!(creds.is_usable_at(creds.expiration - TimeDelta::hours(2), margin));
        assert!(creds.is_usable_at(creds.expiration - TimeDelta::hours(1), margin));
        assert!(!creds.is_usable_at(creds.expiration - TimeDelta::minutes(59), margin));
        assert!(!creds.is_usable_at(creds.expiration, margin));
        assert!(!creds.is_usable_at(creds.expiration + TimeDelta::seconds(1), margin));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_remaining(TimeDelta::seconds(3599)), "59m59s");
        assert_eq!(format_remaining(TimeDelta::seconds(43_198)), "11h59m58s");
        assert_eq!(format_remaining(TimeDelta::seconds(-90)), "-1m30s");
    }
}
