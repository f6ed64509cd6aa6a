use rds_iam_credentials::{CredentialsError, SigningError, TokenError};
use thiserror::Error;

/// Boxed error raised by a collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The identity field that was missing after merging properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    /// The database user (`user`)
    User,
    /// The AWS profile, passed as `password`
    Profile,
}

impl IdentityField {
    fn message(self) -> &'static str {
        match self {
            Self::User => {
                "User couldn't be automatically determined. Please define `user` in query string or property."
            }
            Self::Profile => {
                "Password/AWS Profile isn't specified. Please define the AWS Profile as `password` in query string or property."
            }
        }
    }
}

/// The error returned by every [`Driver`](crate::Driver) operation.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The descriptor is empty.
    #[error("URL is null or empty")]
    NullDescriptor,

    /// The descriptor does not follow the expected grammar.
    #[error("Malformed connection URL: {0}")]
    MalformedDescriptor(String),

    /// `user` or the AWS profile could not be found in any property source.
    #[error("{}", .0.message())]
    MissingIdentity(IdentityField),

    /// The descriptor names no host.
    #[error(
        "No database host specified. IAM Auth requires that a host be specified in the connection URL."
    )]
    MissingHost,

    /// The descriptor names no port and its scheme has no default.
    #[error(
        "No database port specified for scheme `{0}`. IAM Auth requires that either a default port be pre-configured or a port is specified in the connection URL."
    )]
    MissingPort(String),

    /// No region source produced a region.
    #[error(
        "AWS Region couldn't be automatically determined. Please define `awsRegion` in query string or property, or set default region in the AWS Profile."
    )]
    RegionUnresolved,

    /// No delegate driver identifier could be determined or registered.
    #[error("Driver couldn't be automatically determined: {0}")]
    DelegateUnresolvable(String),

    /// A registered delegate driver failed to load.
    #[error("Unable to load delegate driver `{name}`: {source}")]
    DelegateLoadFailed {
        /// Registry name of the delegate
        name: String,
        /// Failure reported by its factory
        #[source]
        source: BoxError,
    },

    /// Credentials for the AWS profile could not be resolved.
    #[error("{0}")]
    CredentialResolutionFailed(#[source] CredentialsError),

    /// The authentication token could not be signed.
    #[error("{0}")]
    SigningFailed(#[source] SigningError),

    /// The bundled trust store could not be located.
    #[error("Unable to find the embedded trust store {0}")]
    TrustStoreMissing(String),

    /// A delegate driver failed to connect.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The operation is not supported in the current state.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
}

impl DriverError {
    /// A connection failure without an underlying cause.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// A connection failure caused by `source`.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<TokenError> for DriverError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Credentials(error) => DriverError::CredentialResolutionFailed(error),
            TokenError::Signing(error) => DriverError::SigningFailed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn it_explains_missing_identity() {
        assert!(
            DriverError::MissingIdentity(IdentityField::User)
                .to_string()
                .contains("define `user`")
        );
        assert!(
            DriverError::MissingIdentity(IdentityField::Profile)
                .to_string()
                .contains("AWS Profile as `password`")
        );
    }

    #[test]
    fn it_preserves_collaborator_messages() {
        let io = std::io::Error::other("no reactor");
        let error: DriverError = TokenError::Credentials(CredentialsError::Runtime(io)).into();

        assert!(matches!(error, DriverError::CredentialResolutionFailed(_)));
        assert_eq!(
            error.to_string(),
            "could not start credential provider runtime: no reactor"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn it_chains_connection_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = DriverError::connection_with_source("handshake failed", io);

        assert_eq!(error.to_string(), "connection error: handshake failed");
        assert_eq!(error.source().unwrap().to_string(), "refused");
    }
}
