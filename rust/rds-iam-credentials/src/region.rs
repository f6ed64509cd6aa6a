//! Default signing region lookup.

use aws_config::imds::region::ImdsRegionProvider;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileRegionProvider;
use thiserror::Error;
use tracing::debug;

use crate::{Env, ProfileFiles, runtime};

/// Client-side failure while looking up a default region.
#[derive(Error, Debug)]
pub enum RegionError {
    /// The runtime driving the provider chain could not be started.
    #[error("could not start region provider runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Resolves the default region configured for a profile.
pub trait ProvideRegion: Send + Sync {
    /// Returns the region for `profile`, or `None` when none is configured.
    fn region(&self, profile: &str) -> Result<Option<String>, RegionError>;
}

/// Serves a fixed region, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticRegionProvider(Option<String>);

impl StaticRegionProvider {
    /// Serve `region` for every profile.
    pub fn new(region: impl Into<String>) -> Self {
        Self(Some(region.into()))
    }

    /// Never serve a region.
    pub fn none() -> Self {
        Self(None)
    }
}

impl ProvideRegion for StaticRegionProvider {
    fn region(&self, _profile: &str) -> Result<Option<String>, RegionError> {
        Ok(self.0.clone())
    }
}

/// Looks up a region in `AWS_REGION` and `AWS_DEFAULT_REGION`, then in the
/// profile (following `source_profile`), then in the instance metadata
/// service.
#[derive(Debug, Clone)]
pub struct DefaultRegionProviderChain {
    env: Env,
    files: ProfileFiles,
    instance_metadata: bool,
}

impl DefaultRegionProviderChain {
    /// Build a chain over the given environment and profile files.
    pub fn new(env: Env, files: ProfileFiles) -> Self {
        Self {
            env,
            files,
            instance_metadata: true,
        }
    }

    /// Build a chain over the environment and the profile files it names.
    pub fn from_env(env: Env) -> Self {
        let files = ProfileFiles::from_env(&env);
        Self::new(env, files)
    }

    /// Never ask the instance metadata service.
    pub fn without_instance_metadata(mut self) -> Self {
        self.instance_metadata = false;
        self
    }
}

impl ProvideRegion for DefaultRegionProviderChain {
    fn region(&self, profile: &str) -> Result<Option<String>, RegionError> {
        for var in ["AWS_REGION", "AWS_DEFAULT_REGION"] {
            if let Some(region) = self.env.get(var) {
                debug!(%region, %var, "Using region from environment");
                return Ok(Some(region));
            }
        }

        let mut chain = RegionProviderChain::first_try(
            ProfileFileRegionProvider::builder()
                .profile_files(self.files.to_sdk())
                .profile_name(profile)
                .build(),
        );
        if self.instance_metadata {
            chain = chain.or_else(ImdsRegionProvider::builder().build());
        }

        let region = runtime::block_on(chain.region())?;
        Ok(region.map(|region| region.to_string()))
    }
}
