//! RDS IAM authentication tokens.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::sigv4::{self, PresignRequest, SigningParams};
use crate::{CredentialsError, ProvideCredentials, SigningError};

/// Signing name of the RDS IAM authentication service.
pub const SERVICE_NAME: &str = "rds-db";

/// Action every token authorizes.
pub const DB_ACTION: &str = "connect";

/// Token validity in seconds: 15 minutes.
pub const TOKEN_EXPIRES: u64 = 900;

/// Errors raised while generating a token.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Credentials for the profile could not be resolved.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    /// The presigned request could not be produced.
    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Everything a single token is bound to.
///
/// Built once per connection attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    host: String,
    port: u16,
    user: String,
    region: String,
    profile: String,
    issued_at: DateTime<Utc>,
}

impl SigningContext {
    /// Create a signing context issued at `issued_at`.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        region: impl Into<String>,
        profile: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            region: region.into(),
            profile: profile.into(),
            issued_at,
        }
    }

    /// Database host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Database port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database user the token authenticates.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// AWS profile whose credentials sign the token.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// When the token is issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// When the token stops being accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(TOKEN_EXPIRES as i64)
    }
}

/// A signed authentication token, used as the database password.
///
/// The token reads `host:port/?Action=connect&DBUser=...&X-Amz-Signature=...`.
/// Its `Debug` representation omits the signature-bearing value.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Generates tokens with credentials from a profile-scoped provider.
#[derive(Clone)]
pub struct AuthTokenGenerator {
    credentials: Arc<dyn ProvideCredentials>,
}

impl AuthTokenGenerator {
    /// Sign tokens with credentials resolved by `credentials`.
    pub fn new(credentials: Arc<dyn ProvideCredentials>) -> Self {
        Self { credentials }
    }

    /// Generate a fresh token for `context`.
    pub fn generate(&self, context: &SigningContext) -> Result<AuthToken, TokenError> {
        if context.user.is_empty() {
            return Err(SigningError::InvalidInput("database user is empty".into()).into());
        }
        if context.port == 0 {
            return Err(SigningError::InvalidInput("port is zero".into()).into());
        }

        let credentials = self.credentials.provide_credentials(&context.profile)?;

        let request = PresignRequest {
            method: "GET",
            host: format!("{}:{}", context.host, context.port),
            path: "/".to_string(),
            params: vec![
                ("Action".to_string(), DB_ACTION.to_string()),
                ("DBUser".to_string(), context.user.clone()),
            ],
        };
        let params = SigningParams {
            credentials: &credentials,
            region: &context.region,
            service: SERVICE_NAME,
            time: context.issued_at,
            expires: TOKEN_EXPIRES,
        };

        let url = sigv4::presign(&request, &params)?;
        let token = url
            .strip_prefix("https://")
            .map(str::to_string)
            .unwrap_or(url);

        Ok(AuthToken(token))
    }
}

impl std::fmt::Debug for AuthTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokenGenerator").finish_non_exhaustive()
    }
}
