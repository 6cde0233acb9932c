//! Backend connection settings.

use std::env;

use crate::error::ConfigError;

pub const BACKEND_URL_VAR: &str = "WORKDESK_BACKEND_URL";
pub const PROJECT_ID_VAR: &str = "WORKDESK_PROJECT_ID";
pub const PUBLIC_KEY_VAR: &str = "WORKDESK_PUBLIC_KEY";

/// Where the record backend lives and which project to address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub project_id: String,
    pub public_key: String,
}

impl BackendConfig {
    pub fn new(base_url: &str, project_id: &str, public_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            public_key: public_key.to_string(),
        }
    }

    /// Read the configuration from `WORKDESK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let base_url = require(BACKEND_URL_VAR)?;
        let project_id = require(PROJECT_ID_VAR)?;
        let public_key = require(PUBLIC_KEY_VAR)?;
        Ok(Self::new(&base_url, &project_id, &public_key))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn new_strips_trailing_slash() {
        let config = BackendConfig::new("http://localhost:3000/", "p", "k");
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = BackendConfig::from_lookup(lookup_from(&[
            (BACKEND_URL_VAR, "http://backend/"),
            (PROJECT_ID_VAR, "proj-1"),
            (PUBLIC_KEY_VAR, "key-1"),
        ]))
        .unwrap();
        assert_eq!(config, BackendConfig::new("http://backend", "proj-1", "key-1"));
    }

    #[test]
    fn from_lookup_reports_first_missing_variable() {
        let err = BackendConfig::from_lookup(lookup_from(&[(BACKEND_URL_VAR, "http://backend")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(PROJECT_ID_VAR)));
    }
}
