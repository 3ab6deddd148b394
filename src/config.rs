//! Connection configuration
//!
//! Explicitly provided values win; anything left unset falls back to the
//! environment (`RAGIC_URL`, `RAGIC_NAMESPACE`, `RAGIC_API_KEY`). The three
//! connection parameters are mandatory, there are no hardcoded fallbacks for
//! them.

use crate::ragic::{RagicError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_URL: &str = "RAGIC_URL";
pub const ENV_NAMESPACE: &str = "RAGIC_NAMESPACE";
pub const ENV_API_KEY: &str = "RAGIC_API_KEY";

/// API version sent as `v=` on every request
pub const DEFAULT_VERSION: u32 = 3;

/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_STRUCTURE_PATH: &str = "structure.yaml";

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server root, e.g. `https://www.ragic.com`
    pub base_url: String,

    /// Account name, first path segment of every resource
    pub namespace: String,

    /// API key sent as `Authorization: Basic <key>`
    pub api_key: String,

    pub version: u32,

    /// YAML structure file describing tabs, tables and columns
    pub structure_path: PathBuf,

    pub timeout: Duration,
}

/// Partially specified configuration, completed from the environment
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub base_url: Option<String>,
    pub namespace: Option<String>,
    pub api_key: Option<String>,
    pub version: Option<u32>,
    pub structure_path: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Build from the environment only
    pub fn from_env() -> Result<Self> {
        Self::resolve(ConnectionOverrides::default())
    }

    /// Build from explicit values, falling back to the environment
    pub fn resolve(overrides: ConnectionOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Same as `resolve` with a custom variable lookup
    pub fn resolve_with<F>(overrides: ConnectionOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |value: Option<String>, var: &str| {
            value
                .or_else(|| lookup(var))
                .filter(|v| !v.trim().is_empty())
        };

        let base_url = pick(overrides.base_url, ENV_URL);
        let namespace = pick(overrides.namespace, ENV_NAMESPACE);
        let api_key = pick(overrides.api_key, ENV_API_KEY);

        let (base_url, namespace, api_key) = match (base_url, namespace, api_key) {
            (Some(u), Some(n), Some(k)) => (u, n, k),
            (u, n, k) => {
                let missing: Vec<&str> = [
                    (u.is_none(), ENV_URL),
                    (n.is_none(), ENV_NAMESPACE),
                    (k.is_none(), ENV_API_KEY),
                ]
                .into_iter()
                .filter(|(absent, _)| *absent)
                .map(|(_, var)| var)
                .collect();
                return Err(RagicError::ConfigurationMissing(missing.join(", ")));
            }
        };

        Ok(ConnectionConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: namespace.trim_matches('/').to_string(),
            api_key,
            version: overrides.version.unwrap_or(DEFAULT_VERSION),
            structure_path: overrides
                .structure_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STRUCTURE_PATH)),
            timeout: overrides.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// API key with everything but the first four characters masked
    pub fn masked_api_key(&self) -> String {
        let shown: String = self.api_key.chars().take(4).collect();
        format!("{}***", shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_resolve_from_env() {
        let lookup = env(&[
            (ENV_URL, "https://www.ragic.com/"),
            (ENV_NAMESPACE, "acme"),
            (ENV_API_KEY, "secretkey"),
        ]);
        let config = ConnectionConfig::resolve_with(ConnectionOverrides::default(), lookup).unwrap();
        assert_eq!(config.base_url, "https://www.ragic.com");
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.version, DEFAULT_VERSION);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.structure_path, PathBuf::from(DEFAULT_STRUCTURE_PATH));
        assert_eq!(config.masked_api_key(), "secr***");
    }

    #[test]
    fn test_overrides_win() {
        let lookup = env(&[
            (ENV_URL, "https://env.example"),
            (ENV_NAMESPACE, "env"),
            (ENV_API_KEY, "envkey"),
        ]);
        let overrides = ConnectionOverrides {
            namespace: Some("explicit".to_string()),
            version: Some(2),
            ..Default::default()
        };
        let config = ConnectionConfig::resolve_with(overrides, lookup).unwrap();
        assert_eq!(config.base_url, "https://env.example");
        assert_eq!(config.namespace, "explicit");
        assert_eq!(config.version, 2);
    }

    #[test]
    fn test_missing_values() {
        let lookup = env(&[(ENV_URL, "https://env.example"), (ENV_API_KEY, "  ")]);
        match ConnectionConfig::resolve_with(ConnectionOverrides::default(), lookup) {
            Err(RagicError::ConfigurationMissing(vars)) => {
                assert_eq!(vars, "RAGIC_NAMESPACE, RAGIC_API_KEY");
            }
            other => panic!("expected ConfigurationMissing, got {:?}", other),
        }
    }
}
