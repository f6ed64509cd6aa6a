//! Locations of the shared AWS config and credentials files.

use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles as SdkProfileFiles};
use std::path::{Path, PathBuf};

use crate::Env;

/// Locations of the shared config and credentials files.
///
/// A location that is not set falls back to the SDK default, `~/.aws/config`
/// or `~/.aws/credentials`, which may be absent. A location that is set must
/// exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFiles {
    config: Option<PathBuf>,
    credentials: Option<PathBuf>,
}

impl ProfileFiles {
    /// Use explicit file locations.
    pub fn new(config: impl Into<PathBuf>, credentials: impl Into<PathBuf>) -> Self {
        Self {
            config: Some(config.into()),
            credentials: Some(credentials.into()),
        }
    }

    /// Resolve the locations from `AWS_CONFIG_FILE` and
    /// `AWS_SHARED_CREDENTIALS_FILE`.
    pub fn from_env(env: &Env) -> Self {
        Self {
            config: env.get("AWS_CONFIG_FILE").map(PathBuf::from),
            credentials: env.get("AWS_SHARED_CREDENTIALS_FILE").map(PathBuf::from),
        }
    }

    /// Explicit path of the config file.
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Explicit path of the credentials file.
    pub fn credentials(&self) -> Option<&Path> {
        self.credentials.as_deref()
    }

    pub(crate) fn to_sdk(&self) -> SdkProfileFiles {
        let mut builder = SdkProfileFiles::builder();
        builder = match &self.config {
            Some(path) => builder.with_file(ProfileFileKind::Config, path),
            None => builder.include_default_config_file(true),
        };
        builder = match &self.credentials {
            Some(path) => builder.with_file(ProfileFileKind::Credentials, path),
            None => builder.include_default_credentials_file(true),
        };
        builder.build()
    }
}
