//! Location of the trust store handed to the delegate for server
//! certificate verification.

use rds_iam_credentials::Env;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Environment variable naming the trust store file explicitly.
pub const TRUST_STORE_ENV: &str = "RDS_IAM_TRUST_STORE";

/// A trust store reference as the delegate consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStore {
    /// Location of the store, usually a `file:` URL.
    pub url: String,
    /// Password protecting the store, if any.
    pub password: Option<String>,
}

impl TrustStore {
    /// A store at `url` protected by `password`.
    pub fn new(url: impl Into<String>, password: Option<String>) -> Self {
        Self {
            url: url.into(),
            password,
        }
    }
}

/// Finds the trust store to inject when the caller configured none.
pub trait LocateTrustStore: Send + Sync {
    /// The trust store, or `None` if it cannot be found.
    fn locate(&self) -> Option<TrustStore>;
}

impl LocateTrustStore for TrustStore {
    fn locate(&self) -> Option<TrustStore> {
        Some(self.clone())
    }
}

/// The RDS root certificate store packaged alongside the application.
///
/// Candidates are checked in order: the path in `RDS_IAM_TRUST_STORE`, then
/// [`BundledTrustStore::FILE_NAME`] next to the running executable and in its
/// `resources` directory.
#[derive(Debug, Clone)]
pub struct BundledTrustStore {
    candidates: Vec<PathBuf>,
}

impl BundledTrustStore {
    /// File name of the packaged store.
    pub const FILE_NAME: &'static str = "rds-ca-2019-root.pem.jks";

    /// Password of the packaged store.
    pub const PASSWORD: &'static str = "changeme";

    /// Search the default candidate locations.
    pub fn from_env(env: &Env) -> Self {
        let mut candidates = Vec::new();
        if let Some(path) = env.get(TRUST_STORE_ENV) {
            candidates.push(PathBuf::from(path));
        }
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(dir.join(Self::FILE_NAME));
            candidates.push(dir.join("resources").join(Self::FILE_NAME));
        }
        Self { candidates }
    }

    /// Look only at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }
}

impl LocateTrustStore for BundledTrustStore {
    fn locate(&self) -> Option<TrustStore> {
        let path = self.candidates.iter().find(|path| path.is_file())?;
        let url = path
            .canonicalize()
            .ok()
            .and_then(|path| Url::from_file_path(path).ok());

        match url {
            Some(url) => Some(TrustStore::new(url, Some(Self::PASSWORD.to_string()))),
            None => {
                debug!(path = %path.display(), "Trust store path cannot be expressed as a URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_locates_a_store_on_disk() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(BundledTrustStore::FILE_NAME);
        std::fs::write(&path, b"store")?;

        let store = BundledTrustStore::at(&path).locate().ok_or("not located")?;

        assert!(store.url.starts_with("file:///"));
        assert!(store.url.ends_with(BundledTrustStore::FILE_NAME));
        assert_eq!(store.password.as_deref(), Some("changeme"));
        Ok(())
    }

    #[test]
    fn it_prefers_the_environment_override() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("custom.jks");
        std::fs::write(&path, b"store")?;
        let env = Env::from_slice(&[(TRUST_STORE_ENV, path.to_str().ok_or("path")?)]);

        let store = BundledTrustStore::from_env(&env)
            .locate()
            .ok_or("not located")?;

        assert!(store.url.ends_with("custom.jks"));
        Ok(())
    }

    #[test]
    fn it_reports_a_missing_store() -> TestResult {
        let dir = tempfile::tempdir()?;

        assert_eq!(BundledTrustStore::at(dir.path().join("absent.jks")).locate(), None);
        // A directory is not a store.
        assert_eq!(BundledTrustStore::at(dir.path()).locate(), None);
        Ok(())
    }

    #[test]
    fn it_serves_a_fixed_store() {
        let store = TrustStore::new("file:///etc/rds.jks", None);

        assert_eq!(store.locate(), Some(store.clone()));
    }
}
