//! Signing region resolution.

use rds_iam_credentials::ProvideRegion;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::DriverError;
use crate::properties::{AWS_REGION, Properties};

/// Matches the region segment of an RDS endpoint such as
/// `mydb.abc123.eu-west-1.rds.amazonaws.com`.
static REGION_FROM_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.([a-z0-9-]+)\.rds\.amazonaws\.com$").expect("region pattern is valid")
});

/// Extract the region from an RDS endpoint host name.
pub fn region_from_host(host: &str) -> Option<&str> {
    REGION_FROM_HOST
        .captures(host)
        .and_then(|captures| captures.get(1))
        .map(|region| region.as_str())
}

/// Determines the signing region of a connection attempt.
///
/// Sources are tried in order, the first hit wins:
///
/// 1. the `awsRegion` property
/// 2. the region segment of an RDS endpoint host name
/// 3. the default region of the AWS profile
#[derive(Clone)]
pub struct RegionResolver {
    provider: Arc<dyn ProvideRegion>,
}

impl RegionResolver {
    /// Fall back to `provider` when neither property nor host names a region.
    pub fn new(provider: Arc<dyn ProvideRegion>) -> Self {
        Self { provider }
    }

    /// Resolve the region for `host` and `profile`.
    pub fn resolve(
        &self,
        properties: &Properties,
        host: &str,
        profile: &str,
    ) -> Result<String, DriverError> {
        if let Some(region) = properties.get(AWS_REGION).filter(|region| !region.is_empty()) {
            return Ok(region.clone());
        }

        if let Some(region) = region_from_host(host) {
            return Ok(region.to_string());
        }

        match self.provider.region(profile) {
            Ok(Some(region)) => return Ok(region),
            Ok(None) => {}
            Err(error) => debug!(%profile, %error, "Default region provider failed"),
        }

        Err(DriverError::RegionUnresolved)
    }
}

impl std::fmt::Debug for RegionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionResolver").finish_non_exhaustive()
    }
}
