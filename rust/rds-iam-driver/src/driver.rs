use rds_iam_credentials::{
    AuthTokenGenerator, Clock, DefaultRegionProviderChain, Env, ProfileCredentialsProvider,
    ProvideCredentials, ProvideRegion, SigningContext, SystemClock,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::delegate::{Connection, DelegateCache, Driver, DriverPropertyInfo, DriverRegistry};
use crate::descriptor::{self, ParsedUrl};
use crate::error::IdentityField;
use crate::properties::{
    DEFAULT_TLS_PROTOCOLS, ENABLED_TLS_PROTOCOLS, PASSWORD, Properties, REQUIRE_SSL,
    TRUST_STORE_PASSWORD, TRUST_STORE_URL, USE_SSL, USER, VERIFY_SERVER_CERTIFICATE, redacted,
};
use crate::region::RegionResolver;
use crate::trust_store::{BundledTrustStore, LocateTrustStore};
use crate::DriverError;

/// A [`Driver`] that authenticates with a freshly signed RDS IAM token and
/// hands the connection to a delegate driver.
///
/// The `password` of a connection attempt names the AWS profile whose
/// credentials sign the token; the delegate sees the token in its place.
/// The delegate is resolved on first use and kept for the lifetime of the
/// driver.
pub struct IamDriver {
    registry: DriverRegistry,
    delegate: DelegateCache,
    tokens: AuthTokenGenerator,
    regions: RegionResolver,
    trust_store: Arc<dyn LocateTrustStore>,
    clock: Arc<dyn Clock>,
}

impl IamDriver {
    /// Configure a driver. Unset collaborators use the environment defaults.
    pub fn builder() -> IamDriverBuilder {
        IamDriverBuilder::default()
    }

    /// The delegate, if one has been resolved.
    pub fn delegate(&self) -> Option<Arc<dyn Driver>> {
        self.delegate.get()
    }

    /// Resolve the delegate for `url`, or return the one resolved earlier.
    ///
    /// Once a delegate has been resolved it is returned for every later call,
    /// whatever `delegateDriver` those calls carry.
    pub fn resolve_delegate(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Arc<dyn Driver>, DriverError> {
        let parsed = ParsedUrl::parse(url)?;
        let merged = parsed.merge_properties(properties);
        self.resolve(&parsed, &merged)
    }

    fn resolve(
        &self,
        parsed: &ParsedUrl,
        merged: &Properties,
    ) -> Result<Arc<dyn Driver>, DriverError> {
        self.delegate.get_or_resolve(|| self.registry.resolve(parsed.descriptor(), merged))
    }

    /// The delegate for a read-only query, warning when there is none yet.
    fn resolved(&self, operation: &str) -> Option<Arc<dyn Driver>> {
        let delegate = self.delegate.get();
        if delegate.is_none() {
            warn!(%operation, "Delegate driver is not initialized yet");
        }
        delegate
    }

    fn extend_for_delegate(
        &self,
        properties: &Properties,
        merged: &Properties,
        user: &str,
        token: String,
    ) -> Result<Properties, DriverError> {
        let mut extended = properties.clone();
        extended.insert(USER.to_string(), user.to_string());
        extended.insert(PASSWORD.to_string(), token);
        extended.insert(USE_SSL.to_string(), "true".to_string());
        extended.insert(REQUIRE_SSL.to_string(), "true".to_string());

        if !merged.contains_key(ENABLED_TLS_PROTOCOLS) {
            extended.insert(
                ENABLED_TLS_PROTOCOLS.to_string(),
                DEFAULT_TLS_PROTOCOLS.to_string(),
            );
        }
        if !merged.contains_key(VERIFY_SERVER_CERTIFICATE) {
            extended.insert(VERIFY_SERVER_CERTIFICATE.to_string(), "true".to_string());
        }
        if !merged.contains_key(TRUST_STORE_URL) {
            let store = self.trust_store.locate().ok_or_else(|| {
                DriverError::TrustStoreMissing(BundledTrustStore::FILE_NAME.to_string())
            })?;
            extended.insert(TRUST_STORE_URL.to_string(), store.url);
            if let Some(password) = store.password {
                extended.insert(TRUST_STORE_PASSWORD.to_string(), password);
            }
        }

        Ok(extended)
    }
}

impl Driver for IamDriver {
    fn accepts_url(&self, url: &str) -> Result<bool, DriverError> {
        if url.is_empty() {
            return Err(DriverError::NullDescriptor);
        }
        Ok(descriptor::accepts(url))
    }

    fn connect(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Option<Connection>, DriverError> {
        if !self.accepts_url(url)? {
            return Ok(None);
        }

        let parsed = ParsedUrl::parse(url)?;
        let merged = parsed.merge_properties(properties);
        let delegate = self.resolve(&parsed, &merged)?;

        let user = present(&merged, USER).ok_or(DriverError::MissingIdentity(IdentityField::User))?;
        let profile = present(&merged, PASSWORD)
            .ok_or(DriverError::MissingIdentity(IdentityField::Profile))?;

        let descriptor = parsed.descriptor();
        let host = descriptor.host().ok_or(DriverError::MissingHost)?;
        let port = descriptor
            .port_or_default()
            .ok_or_else(|| DriverError::MissingPort(descriptor.scheme().to_string()))?;
        let region = self.regions.resolve(&merged, host, profile)?;

        info!(
            %profile,
            %region,
            %host,
            %port,
            %user,
            "Generating RDS IAM auth token"
        );
        let context = SigningContext::new(host, port, user, region, profile, self.clock.now());
        let token = self.tokens.generate(&context)?;

        let extended = self.extend_for_delegate(properties, &merged, user, token.into_string())?;
        info!(
            url = %parsed.delegate_url(),
            properties = ?redacted(&extended),
            "Connecting through delegate driver"
        );

        delegate.connect(parsed.delegate_url(), &extended)
    }

    fn property_info(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Vec<DriverPropertyInfo>, DriverError> {
        if url.is_empty() {
            return Err(DriverError::NullDescriptor);
        }

        let resolved = ParsedUrl::parse(url).and_then(|parsed| {
            let merged = parsed.merge_properties(properties);
            self.resolve(&parsed, &merged).map(|delegate| (delegate, parsed))
        });

        match resolved {
            Ok((delegate, parsed)) => delegate.property_info(parsed.delegate_url(), properties),
            Err(error) => {
                warn!(%error, "Unable to resolve delegate driver for property info");
                Ok(Vec::new())
            }
        }
    }

    fn major_version(&self) -> i32 {
        self.resolved("major_version")
            .map_or(-1, |delegate| delegate.major_version())
    }

    fn minor_version(&self) -> i32 {
        self.resolved("minor_version")
            .map_or(-1, |delegate| delegate.minor_version())
    }

    fn is_compliant(&self) -> bool {
        self.resolved("is_compliant")
            .is_some_and(|delegate| delegate.is_compliant())
    }

    fn parent_span(&self) -> Result<tracing::Span, DriverError> {
        self.delegate
            .get()
            .ok_or_else(|| {
                DriverError::FeatureNotSupported(
                    "delegate driver is not initialized yet".to_string(),
                )
            })?
            .parent_span()
    }
}

impl std::fmt::Debug for IamDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamDriver")
            .field("registry", &self.registry)
            .field("delegate", &self.delegate)
            .finish_non_exhaustive()
    }
}

/// A property that is set and non-empty.
fn present<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Builder for [`IamDriver`].
#[derive(Default)]
pub struct IamDriverBuilder {
    registry: DriverRegistry,
    env: Env,
    credentials: Option<Arc<dyn ProvideCredentials>>,
    regions: Option<Arc<dyn ProvideRegion>>,
    trust_store: Option<Arc<dyn LocateTrustStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl IamDriverBuilder {
    /// Drivers the adapter may delegate to.
    pub fn registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Environment the default collaborators read from.
    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Source of the credentials that sign tokens.
    pub fn credentials_provider(mut self, provider: impl ProvideCredentials + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    /// Region used when neither property nor host names one.
    pub fn region_provider(mut self, provider: impl ProvideRegion + 'static) -> Self {
        self.regions = Some(Arc::new(provider));
        self
    }

    /// Trust store injected when the caller configured none.
    pub fn trust_store(mut self, locator: impl LocateTrustStore + 'static) -> Self {
        self.trust_store = Some(Arc::new(locator));
        self
    }

    /// Clock that timestamps tokens.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the driver.
    pub fn build(self) -> IamDriver {
        let env = self.env;
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(ProfileCredentialsProvider::from_env(&env)));
        let regions = self
            .regions
            .unwrap_or_else(|| Arc::new(DefaultRegionProviderChain::from_env(env.clone())));
        let trust_store = self
            .trust_store
            .unwrap_or_else(|| Arc::new(BundledTrustStore::from_env(&env)));

        IamDriver {
            registry: self.registry,
            delegate: DelegateCache::new(),
            tokens: AuthTokenGenerator::new(credentials),
            regions: RegionResolver::new(regions),
            trust_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust_store::TrustStore;
    use rds_iam_credentials::{Credentials, StaticCredentialsProvider, StaticRegionProvider};
    use testresult::TestResult;

    fn driver(registry: DriverRegistry) -> IamDriver {
        IamDriver::builder()
            .registry(registry)
            .env(Env::from_slice(&[]))
            .credentials_provider(StaticCredentialsProvider::new(Credentials::new(
                "AKID", "secret",
            )))
            .region_provider(StaticRegionProvider::none())
            .trust_store(TrustStore::new("file:///rds.jks", None))
            .build()
    }

    #[test]
    fn it_rejects_empty_descriptors() {
        let driver = driver(DriverRegistry::new());

        assert!(matches!(
            driver.accepts_url(""),
            Err(DriverError::NullDescriptor)
        ));
        assert!(matches!(
            driver.connect("", &Properties::new()),
            Err(DriverError::NullDescriptor)
        ));
        assert!(matches!(
            driver.property_info("", &Properties::new()),
            Err(DriverError::NullDescriptor)
        ));
    }

    #[test]
    fn it_declines_unmarked_descriptors() -> TestResult {
        let driver = driver(DriverRegistry::new());

        assert!(!driver.accepts_url("rdbc:mysql://db/app")?);
        assert!(driver.connect("rdbc:mysql://db/app", &Properties::new())?.is_none());
        assert!(driver.delegate().is_none());
        Ok(())
    }

    #[test]
    fn it_fails_unresolvable_delegates_before_identity() {
        let driver = driver(DriverRegistry::new());

        assert!(matches!(
            driver.connect("rdbc:iam:mysql://db/app", &Properties::new()),
            Err(DriverError::DelegateUnresolvable(_))
        ));
    }

    #[test]
    fn it_falls_back_while_unresolved() {
        let driver = driver(DriverRegistry::new());

        assert_eq!(driver.major_version(), -1);
        assert_eq!(driver.minor_version(), -1);
        assert!(!driver.is_compliant());
        assert!(matches!(
            driver.parent_span(),
            Err(DriverError::FeatureNotSupported(_))
        ));
        assert!(matches!(
            driver.property_info("rdbc:iam:mysql://db/app", &Properties::new()),
            Ok(info) if info.is_empty()
        ));
    }

    #[test]
    fn it_treats_empty_identity_values_as_missing() {
        assert_eq!(
            present(
                &Properties::from([(USER.to_string(), String::new())]),
                USER
            ),
            None
        );
    }
}
