//! Environment variable access that tests can replace.

use std::collections::HashMap;
use std::sync::Arc;

/// Source of environment variables.
///
/// [`Env::real`] reads the process environment. [`Env::from_slice`] serves a
/// fixed set of variables so providers can be exercised without touching
/// process-wide state.
#[derive(Debug, Clone, Default)]
pub struct Env(Option<Arc<HashMap<String, String>>>);

impl Env {
    /// Read variables from the process environment.
    pub fn real() -> Self {
        Self(None)
    }

    /// Serve exactly the given variables.
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self(Some(Arc::new(vars)))
    }

    /// Look up a variable. Empty values are treated as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match &self.0 {
            None => std::env::var(key).ok(),
            Some(vars) => vars.get(key).cloned(),
        };
        value.filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_serves_fixed_variables() {
        let env = Env::from_slice(&[("AWS_REGION", "eu-west-1"), ("EMPTY", "")]);

        assert_eq!(env.get("AWS_REGION").as_deref(), Some("eu-west-1"));
        assert_eq!(env.get("EMPTY"), None);
        assert_eq!(env.get("MISSING"), None);
    }
}
