#![warn(missing_docs)]

//! AWS credentials and presigned RDS IAM authentication tokens.
//!
//! This crate turns a named AWS profile into a short-lived authentication
//! token that a MySQL or MariaDB server running on Amazon RDS accepts in
//! place of a password. Credentials and regions are resolved with the AWS
//! SDK's profile providers, so static keys, assumed roles, SSO sessions and
//! credential processes all work. The token itself is a SigV4
//! [query string authentication] signature computed locally.
//!
//! # Example
//!
//! ```no_run
//! use rds_iam_credentials::{AuthTokenGenerator, Env, ProfileCredentialsProvider, SigningContext};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProfileCredentialsProvider::from_env(&Env::real());
//! let generator = AuthTokenGenerator::new(Arc::new(provider));
//!
//! let context = SigningContext::new(
//!     "db.abc123.eu-west-1.rds.amazonaws.com",
//!     3306,
//!     "iam_user",
//!     "eu-west-1",
//!     "production",
//!     chrono::Utc::now(),
//! );
//! let token = generator.generate(&context)?;
//! println!("password: {}", token.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! [query string authentication]: https://docs.aws.amazon.com/AmazonRDS/latest/UserGuide/UsingWithRDS.IAMDBAuth.Connecting.html

mod credentials;
mod env;
mod files;
mod region;
mod runtime;
pub mod sigv4;
mod time;
mod token;

pub use credentials::{
    Credentials, CredentialsError, ProfileCredentialsProvider, ProvideCredentials,
    StaticCredentialsProvider,
};
pub use env::Env;
pub use files::ProfileFiles;
pub use region::{DefaultRegionProviderChain, ProvideRegion, RegionError, StaticRegionProvider};
pub use sigv4::SigningError;
pub use time::{Clock, FixedClock, SystemClock};
pub use token::{
    AuthToken, AuthTokenGenerator, DB_ACTION, SERVICE_NAME, SigningContext, TOKEN_EXPIRES,
    TokenError,
};
