//! Connection properties and the rules for merging their sources.
//!
//! Three sources contribute to the properties of a connection attempt, in
//! increasing precedence:
//!
//! 1. the property set the caller passes to `connect`
//! 2. the query-string parameters of the connection URL
//! 3. the `user:password` pair embedded in the URL
//!
//! Later sources overwrite earlier ones key-by-key.

use indexmap::IndexMap;

/// Ordered map of property names to values. Keys are case-sensitive.
pub type Properties = IndexMap<String, String>;

/// Database user.
pub const USER: &str = "user";
/// AWS profile on input, authentication token on output.
pub const PASSWORD: &str = "password";
/// Explicit signing region.
pub const AWS_REGION: &str = "awsRegion";
/// Registry name of the delegate driver to load.
pub const DELEGATE_DRIVER: &str = "delegateDriver";
/// Enables TLS on the delegate connection.
pub const USE_SSL: &str = "useSSL";
/// Refuses to fall back to plaintext.
pub const REQUIRE_SSL: &str = "requireSSL";
/// TLS protocol versions the delegate may negotiate.
pub const ENABLED_TLS_PROTOCOLS: &str = "enabledTLSProtocols";
/// Whether the delegate verifies the server certificate.
pub const VERIFY_SERVER_CERTIFICATE: &str = "verifyServerCertificate";
/// Location of the trust store used to verify the server.
pub const TRUST_STORE_URL: &str = "trustCertificateKeyStoreUrl";
/// Password of the trust store.
pub const TRUST_STORE_PASSWORD: &str = "trustCertificateKeyStorePassword";

/// Protocols allowed unless the caller chooses otherwise.
pub const DEFAULT_TLS_PROTOCOLS: &str = "TLSv1.2,TLSv1.3";

/// Placeholder logged in place of secret values.
pub const HIDDEN: &str = "hidden-from-log";

/// Percent-decode a URL component.
///
/// Unlike form decoding, `+` stays a literal `+`: AWS secret access keys and
/// profile names may contain it.
pub fn url_decode(value: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}

/// Parse a raw query string into properties, preserving order.
///
/// Pairs without `=` are skipped. Keys and values are decoded with
/// [`url_decode`]; a repeated key keeps its last value.
pub fn parse_query(query: Option<&str>) -> Properties {
    let Some(query) = query else {
        return Properties::new();
    };

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (url_decode(key), url_decode(value)))
        .collect()
}

/// Map a raw `user:password` pair to the `user` and `password` properties.
///
/// Anything other than exactly two parts with a non-empty password yields no
/// properties, leaving the identity to the other sources.
pub fn parse_user_info(user_info: Option<&str>) -> Properties {
    let Some(user_info) = user_info.filter(|info| !info.is_empty()) else {
        return Properties::new();
    };

    let parts: Vec<&str> = user_info.split(':').collect();
    match parts.as_slice() {
        [user, password] if !password.is_empty() => Properties::from([
            (USER.to_string(), url_decode(user)),
            (PASSWORD.to_string(), url_decode(password)),
        ]),
        _ => Properties::new(),
    }
}

/// Merge the three property sources, later ones taking precedence.
pub fn merge(base: &Properties, query: Properties, user_info: Properties) -> Properties {
    let mut merged = base.clone();
    merged.extend(query);
    merged.extend(user_info);
    merged
}

/// Copy of `properties` with secret values replaced by [`HIDDEN`].
pub fn redacted(properties: &Properties) -> Properties {
    properties
        .iter()
        .map(|(key, value)| {
            let value = match key.as_str() {
                PASSWORD | TRUST_STORE_PASSWORD => HIDDEN.to_string(),
                _ => value.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}
