use std::path::{Path, PathBuf};

use chrono::TimeDelta;

/// Environment variable holding the ARN of the role to assume
pub const ROLE_ARN_ENV: &str = "AWS_ASSUME_ROLE";

/// Environment variable holding the session name attached to the assumed role
pub const ROLE_SESSION_NAME_ENV: &str = "AWS_ASSUME_ROLE_SESSION_NAME";

/// Environment variable holding the serial (or ARN) of the MFA device
pub const MFA_SERIAL_ENV: &str = "AWS_MFA_SERIAL";

/// Environment variable used to locate the user's home directory
pub const HOME_ENV: &str = "HOME";

/// Environment variable selecting the pinentry program
pub const PINENTRY_PROGRAM_ENV: &str = "PINENTRY_PROGRAM";

/// Pinentry program used when `PINENTRY_PROGRAM` is unset
pub const DEFAULT_PINENTRY_PROGRAM: &str = "pinentry";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// Session credential cache file name
pub const CACHE_FILE_NAME: &str = "credcache.json";

/// Variables exported to the shell or the child process
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Cached session credentials closer than this to expiry are refreshed
pub const CACHE_SAFETY_MARGIN: TimeDelta = TimeDelta::hours(1);

/// Duration requested for assumed-role credentials.
/// STS caps role chaining at one hour, so this is also the maximum.
pub const ASSUME_ROLE_DURATION_SECONDS: i32 = 3600;

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Cache file location below the given home directory
pub fn cache_path_in(home: &Path) -> PathBuf {
    home.join(AWS_CONFIG_DIR_NAME).join(CACHE_FILE_NAME)
}
