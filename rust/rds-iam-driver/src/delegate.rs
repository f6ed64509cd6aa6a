//! Delegate drivers: the trait they implement, the registry they are loaded
//! from, and the one-shot cache that holds the adapter's delegate.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::descriptor::{Descriptor, Family};
use crate::error::BoxError;
use crate::properties::{DELEGATE_DRIVER, Properties};
use crate::DriverError;

/// A live connection produced by a driver.
///
/// Callers downcast it to the concrete connection type of the delegate.
pub type Connection = Box<dyn Any + Send>;

/// Describes a property a driver understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverPropertyInfo {
    /// Property name
    pub name: String,
    /// Current value, if known
    pub value: Option<String>,
    /// Human-readable description
    pub description: Option<String>,
    /// Whether a value must be supplied to connect
    pub required: bool,
    /// Allowed values, when the property is an enumeration
    pub choices: Vec<String>,
}

/// A database driver.
///
/// Drivers are selected by URL: [`Driver::connect`] returns `Ok(None)` for a
/// URL the driver does not handle, so a caller can try several drivers in
/// turn.
pub trait Driver: Send + Sync {
    /// Whether this driver handles `url`.
    fn accepts_url(&self, url: &str) -> Result<bool, DriverError>;

    /// Open a connection to `url`, or `Ok(None)` if the URL is not handled.
    fn connect(&self, url: &str, properties: &Properties)
    -> Result<Option<Connection>, DriverError>;

    /// Properties this driver understands for `url`.
    fn property_info(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Vec<DriverPropertyInfo>, DriverError>;

    /// Major version of the driver.
    fn major_version(&self) -> i32;

    /// Minor version of the driver.
    fn minor_version(&self) -> i32;

    /// Whether the driver passes its protocol's compliance tests.
    fn is_compliant(&self) -> bool;

    /// The span the driver records its diagnostics under.
    fn parent_span(&self) -> Result<tracing::Span, DriverError>;
}

type DriverFactory = Arc<dyn Fn() -> Result<Arc<dyn Driver>, BoxError> + Send + Sync>;

/// Named factories for the drivers the adapter may delegate to.
///
/// Populated by the application at startup; the adapter never loads a
/// driver that was not registered.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Driver>, BoxError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Builder-style [`DriverRegistry::register`].
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Driver>, BoxError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Whether a driver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the driver registered under `name`.
    pub fn load(&self, name: &str) -> Result<Arc<dyn Driver>, DriverError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            DriverError::DelegateUnresolvable(format!("no driver is registered as `{name}`"))
        })?;

        factory().map_err(|source| DriverError::DelegateLoadFailed {
            name: name.to_string(),
            source,
        })
    }

    /// Load the delegate for a connection attempt.
    ///
    /// Uses the `delegateDriver` property when present, otherwise the
    /// default driver of the URL's family.
    pub fn resolve(
        &self,
        descriptor: &Descriptor,
        properties: &Properties,
    ) -> Result<Arc<dyn Driver>, DriverError> {
        let name = match properties.get(DELEGATE_DRIVER) {
            Some(name) => name.as_str(),
            None => descriptor
                .family()
                .map(Family::default_driver)
                .ok_or_else(|| {
                    DriverError::DelegateUnresolvable(format!(
                        "scheme `{}` has no default driver. Please define `{DELEGATE_DRIVER}` in query string or property.",
                        descriptor.scheme()
                    ))
                })?,
        };

        debug!(driver = %name, "Try resolving driver");
        self.load(name)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("DriverRegistry")
            .field("drivers", &names)
            .finish()
    }
}

/// Holds the delegate driver once it has been resolved.
///
/// The first successful resolution wins and is kept for the lifetime of the
/// cache; later resolutions are never attempted, whatever properties they
/// would have used. Concurrent first-time resolutions are serialized so the
/// delegate is loaded at most once.
#[derive(Default)]
pub struct DelegateCache {
    handle: OnceLock<Arc<dyn Driver>>,
    resolving: Mutex<()>,
}

impl DelegateCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached delegate, if one has been resolved.
    pub fn get(&self) -> Option<Arc<dyn Driver>> {
        self.handle.get().cloned()
    }

    /// Return the cached delegate, running `resolve` only if there is none.
    pub fn get_or_resolve<F>(&self, resolve: F) -> Result<Arc<dyn Driver>, DriverError>
    where
        F: FnOnce() -> Result<Arc<dyn Driver>, DriverError>,
    {
        if let Some(delegate) = self.handle.get() {
            return Ok(delegate.clone());
        }

        let _guard = self.resolving.lock();
        if let Some(delegate) = self.handle.get() {
            return Ok(delegate.clone());
        }

        let delegate = resolve()?;
        Ok(self.handle.get_or_init(|| delegate).clone())
    }
}

impl std::fmt::Debug for DelegateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateCache")
            .field("resolved", &self.handle.get().is_some())
            .finish()
    }
}
