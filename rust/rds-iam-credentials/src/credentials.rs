//! AWS credentials and the providers that resolve them.

use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials as _;
use aws_credential_types::provider::error::CredentialsError as SdkCredentialsError;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

use crate::{Env, ProfileFiles, runtime};

/// AWS credentials used to derive signing keys.
///
/// Secret material is redacted from the `Debug` representation.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// AWS Access Key ID
    access_key_id: String,
    /// AWS Secret Access Key
    secret_access_key: SecretString,
    /// Session token of temporary credentials
    session_token: Option<SecretString>,
}

impl Credentials {
    /// Create long-term credentials from an access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: None,
        }
    }

    /// Attach the session token of temporary credentials.
    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::from(session_token.into()));
        self
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token, if these are temporary credentials.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|token| token.expose_secret())
    }
}

/// Errors raised while resolving credentials for a profile.
#[derive(Error, Debug)]
pub enum CredentialsError {
    /// The AWS provider chain configured for the profile failed.
    #[error("failed to load credentials for profile `{profile}`: {source}")]
    Provider {
        /// The profile that was consulted
        profile: String,
        /// The error reported by the provider chain
        #[source]
        source: SdkCredentialsError,
    },

    /// The runtime driving the provider chain could not be started.
    #[error("could not start credential provider runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Resolves credentials for a named profile.
pub trait ProvideCredentials: Send + Sync {
    /// Resolve credentials for `profile`.
    fn provide_credentials(&self, profile: &str) -> Result<Credentials, CredentialsError>;
}

/// Serves the same credentials for every profile.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider(Credentials);

impl StaticCredentialsProvider {
    /// Serve `credentials` regardless of the requested profile.
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl ProvideCredentials for StaticCredentialsProvider {
    fn provide_credentials(&self, _profile: &str) -> Result<Credentials, CredentialsError> {
        Ok(self.0.clone())
    }
}

impl From<&aws_credential_types::Credentials> for Credentials {
    fn from(credentials: &aws_credential_types::Credentials) -> Self {
        let converted = Self::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
        );
        match credentials.session_token() {
            Some(token) => converted.with_session_token(token),
            None => converted,
        }
    }
}

/// Resolves a profile from the shared profile files the way the AWS CLI does.
///
/// Besides static keys this follows `role_arn` with `source_profile` or
/// `credential_source` through STS, `sso_session` and legacy `sso_*` profiles
/// through the SSO token cache, `credential_process` and web identity
/// profiles. The files are re-read on every call, so edits made while the
/// process runs are picked up by the next connection.
#[derive(Debug, Clone, Default)]
pub struct ProfileCredentialsProvider {
    files: ProfileFiles,
}

impl ProfileCredentialsProvider {
    /// Read profiles from the given files.
    pub fn new(files: ProfileFiles) -> Self {
        Self { files }
    }

    /// Read profiles from the files named by the environment.
    pub fn from_env(env: &Env) -> Self {
        Self::new(ProfileFiles::from_env(env))
    }
}

impl ProvideCredentials for ProfileCredentialsProvider {
    fn provide_credentials(&self, profile: &str) -> Result<Credentials, CredentialsError> {
        let provider = ProfileFileCredentialsProvider::builder()
            .profile_files(self.files.to_sdk())
            .profile_name(profile)
            .build();

        let resolved = runtime::block_on(provider.provide_credentials())
            .map_err(CredentialsError::Runtime)?
            .map_err(|source| CredentialsError::Provider {
                profile: profile.to_string(),
                source,
            })?;

        let credentials = Credentials::from(&resolved);
        debug!(
            %profile,
            access_key_id = %credentials.access_key_id(),
            temporary = credentials.session_token().is_some(),
            "Resolved profile credentials"
        );

        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    fn provider_with(
        config: &str,
        credentials: &str,
    ) -> TestResult<(tempfile::TempDir, ProfileCredentialsProvider)> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("config");
        let credentials_path = dir.path().join("credentials");
        std::fs::write(&config_path, config)?;
        std::fs::write(&credentials_path, credentials)?;
        let provider =
            ProfileCredentialsProvider::new(ProfileFiles::new(config_path, credentials_path));
        Ok((dir, provider))
    }

    fn failed_profile(error: &CredentialsError) -> Option<&str> {
        match error {
            CredentialsError::Provider { profile, .. } => Some(profile),
            CredentialsError::Runtime(_) => None,
        }
    }

    fn error_chain(error: &CredentialsError) -> String {
        let mut chain = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        chain
    }

    #[test]
    fn it_redacts_secrets_from_debug() {
        let credentials =
            Credentials::new("AKIDEXAMPLE", "super-secret").with_session_token("session-value");
        let debug = format!("{credentials:?}");

        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("session-value"));
    }

    #[test]
    fn it_resolves_static_keys() -> TestResult {
        let (_dir, provider) = provider_with(
            "",
            "[prod]\naws_access_key_id = AKIDPROD\naws_secret_access_key = a+b/c\n",
        )?;

        let credentials = provider.provide_credentials("prod")?;

        assert_eq!(credentials.access_key_id(), "AKIDPROD");
        assert_eq!(credentials.secret_access_key(), "a+b/c");
        assert_eq!(credentials.session_token(), None);
        Ok(())
    }

    #[test]
    fn it_resolves_session_tokens() -> TestResult {
        let (_dir, provider) = provider_with(
            "",
            "[temp]\naws_access_key_id = ASIA\naws_secret_access_key = s\naws_session_token = t0k\n",
        )?;

        assert_eq!(provider.provide_credentials("temp")?.session_token(), Some("t0k"));
        Ok(())
    }

    #[test]
    fn it_resolves_config_file_profiles() -> TestResult {
        let (_dir, provider) = provider_with(
            "[profile reporting]\naws_access_key_id = AKIDCONF\naws_secret_access_key = conf\n",
            "",
        )?;

        assert_eq!(provider.provide_credentials("reporting")?.access_key_id(), "AKIDCONF");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn it_runs_credential_processes() -> TestResult {
        let (_dir, provider) = provider_with(
            "[profile broker]\ncredential_process = echo '{\"Version\": 1, \"AccessKeyId\": \"AKIDPROC\", \"SecretAccessKey\": \"proc\", \"SessionToken\": \"tok\"}'\n",
            "",
        )?;

        let credentials = provider.provide_credentials("broker")?;

        assert_eq!(credentials.access_key_id(), "AKIDPROC");
        assert_eq!(credentials.secret_access_key(), "proc");
        assert_eq!(credentials.session_token(), Some("tok"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn it_follows_the_source_profile_of_role_profiles() -> TestResult {
        // The source profile fails locally, so no request reaches STS.
        let (_dir, provider) = provider_with(
            "[profile admin]\nrole_arn = arn:aws:iam::123456789012:role/admin\nsource_profile = base\n\
             [profile base]\ncredential_process = false\n",
            "",
        )?;

        let error = provider.provide_credentials("admin").unwrap_err();

        assert_eq!(failed_profile(&error), Some("admin"));
        assert!(!error_chain(&error).contains("aws_access_key_id"));
        Ok(())
    }

    #[test]
    fn it_fails_on_unknown_profile() -> TestResult {
        let (_dir, provider) = provider_with(
            "",
            "[prod]\naws_access_key_id = A\naws_secret_access_key = B\n",
        )?;

        let error = provider.provide_credentials("staging").unwrap_err();

        assert_eq!(failed_profile(&error), Some("staging"));
        assert!(
            error
                .to_string()
                .starts_with("failed to load credentials for profile `staging`")
        );
        Ok(())
    }

    #[test]
    fn it_serves_static_credentials_for_any_profile() -> TestResult {
        let provider = StaticCredentialsProvider::new(Credentials::new("AKID", "secret"));

        assert_eq!(provider.provide_credentials("anything")?.access_key_id(), "AKID");
        Ok(())
    }
}
