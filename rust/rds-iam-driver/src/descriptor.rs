//! Connection URL parsing.
//!
//! The adapter handles URLs of the form
//!
//! ```text
//! rdbc:iam:<scheme>://[<user>:<profile>@]<host>[:<port>]/<path>[?<query>]
//! ```
//!
//! Parsing strips the `iam:` marker and the user-info, leaving a URL the
//! delegate driver consumes unchanged, alongside a structured view used to
//! sign the token.

use url::Url;

use crate::DriverError;
use crate::properties::{self, Properties};

/// Prefix shared by every connection URL.
pub const URL_PREFIX: &str = "rdbc:";

/// Marker that selects this adapter.
pub const IAM_MARKER: &str = "iam:";

/// Whether `url` carries the adapter's marker.
pub fn accepts(url: &str) -> bool {
    url.strip_prefix(URL_PREFIX)
        .is_some_and(|rest| rest.starts_with(IAM_MARKER))
}

/// Database families with built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// MySQL
    Mysql,
    /// MariaDB
    Mariadb,
}

impl Family {
    /// Identify the family named by a URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "mysql" => Some(Self::Mysql),
            "mariadb" => Some(Self::Mariadb),
            _ => None,
        }
    }

    /// Port used when the URL names none.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Mysql | Self::Mariadb => 3306,
        }
    }

    /// Registry name of the driver used when none is configured.
    pub fn default_driver(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Mariadb => "mariadb",
        }
    }
}

/// Structured view of a connection URL, without marker or user-info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl Descriptor {
    /// URL scheme, e.g. `mysql`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The family of the scheme, when it has built-in defaults.
    pub fn family(&self) -> Option<Family> {
        Family::from_scheme(&self.scheme)
    }

    /// Host name, when the URL names one.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Port, when the URL names one explicitly.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Explicit port, else the family default.
    pub fn port_or_default(&self) -> Option<u16> {
        self.port
            .or_else(|| self.family().map(Family::default_port))
    }

    /// URL path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Query-string parameters as properties.
    pub fn query_properties(&self) -> Properties {
        properties::parse_query(self.query())
    }
}

/// A parsed connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    delegate_url: String,
    descriptor: Descriptor,
    user_info: Option<String>,
}

impl ParsedUrl {
    /// Parse a URL carrying the adapter's marker.
    pub fn parse(url: &str) -> Result<Self, DriverError> {
        let body = url
            .strip_prefix(URL_PREFIX)
            .and_then(|rest| rest.strip_prefix(IAM_MARKER))
            .ok_or_else(|| {
                DriverError::MalformedDescriptor(format!(
                    "`{url}` does not start with `{URL_PREFIX}{IAM_MARKER}`"
                ))
            })?;

        let (body, user_info) = split_user_info(body);
        let parsed = Url::parse(&body)
            .map_err(|error| DriverError::MalformedDescriptor(format!("{error}")))?;

        let descriptor = Descriptor {
            scheme: parsed.scheme().to_string(),
            host: parsed
                .host_str()
                .filter(|host| !host.is_empty())
                .map(str::to_string),
            port: parsed.port(),
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
        };

        Ok(Self {
            delegate_url: format!("{URL_PREFIX}{body}"),
            descriptor,
            user_info,
        })
    }

    /// URL handed to the delegate driver: marker and user-info removed.
    pub fn delegate_url(&self) -> &str {
        &self.delegate_url
    }

    /// Structured view of the URL.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Raw user-info that preceded the host, if any.
    pub fn user_info(&self) -> Option<&str> {
        self.user_info.as_deref()
    }

    /// Merge `base` with the query string and user-info of this URL.
    pub fn merge_properties(&self, base: &Properties) -> Properties {
        properties::merge(
            base,
            self.descriptor.query_properties(),
            properties::parse_user_info(self.user_info()),
        )
    }
}

/// Remove the user-info from the authority of `body`, returning both.
///
/// Only the authority (after `//`, up to the first `/`, `?` or `#`) is
/// searched, and the first `@` ends the user-info.
fn split_user_info(body: &str) -> (String, Option<String>) {
    let Some(start) = body.find("://").map(|index| index + 3) else {
        return (body.to_string(), None);
    };
    let end = body[start..]
        .find(['/', '?', '#'])
        .map_or(body.len(), |index| start + index);

    match body[start..end].find('@') {
        Some(at) => {
            let user_info = body[start..start + at].to_string();
            let stripped = format!("{}{}", &body[..start], &body[start + at + 1..]);
            (stripped, Some(user_info))
        }
        None => (body.to_string(), None),
    }
}
