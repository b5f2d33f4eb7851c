use crate::error::MetaError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

pub const DEFAULT_ROOT_PREFIX: &str = "metacat";

/// Runtime configuration for a metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub root_prefix: String,
    pub request_timeout_ms: u64,
    pub max_scan_entries: usize,
    /// Hex SHA-256 digest the bootstrap token must hash to. `None` accepts
    /// any non-empty token.
    pub bootstrap_token_sha256: Option<String>,
    pub seed_well_known: bool,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            root_prefix: DEFAULT_ROOT_PREFIX.to_string(),
            request_timeout_ms: 5_000,
            max_scan_entries: 100_000,
            bootstrap_token_sha256: None,
            seed_well_known: true,
        }
    }
}

impl MetaConfig {
    pub fn development() -> Self {
        Self {
            request_timeout_ms: 30_000,
            bootstrap_token_sha256: None,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, MetaError> {
        let config: Self = toml::from_str(text).map_err(|e| MetaError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_root_prefix(mut self, root_prefix: impl Into<String>) -> Self {
        self.root_prefix = root_prefix.into();
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_scan_entries(mut self, max_scan_entries: usize) -> Self {
        self.max_scan_entries = max_scan_entries;
        self
    }

    /// Stores only the digest of `token`; the plaintext never lives in config.
    pub fn with_bootstrap_token(mut self, token: &str) -> Self {
        self.bootstrap_token_sha256 = Some(token_digest(token));
        self
    }

    pub fn with_seed_well_known(mut self, seed: bool) -> Self {
        self.seed_well_known = seed;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), MetaError> {
        if self.root_prefix.is_empty() || self.root_prefix.contains('/') {
            return Err(MetaError::InvalidConfig {
                message: "root_prefix must be non-empty and must not contain '/'".into(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(MetaError::InvalidConfig {
                message: "request_timeout_ms must be > 0".into(),
            });
        }
        if self.max_scan_entries == 0 {
            return Err(MetaError::InvalidConfig {
                message: "max_scan_entries must be > 0".into(),
            });
        }
        if let Some(digest) = &self.bootstrap_token_sha256 {
            let valid = hex::decode(digest)
                .map(|bytes| bytes.len() == 32)
                .unwrap_or(false);
            if !valid {
                return Err(MetaError::InvalidConfig {
                    message: "bootstrap_token_sha256 must be a hex encoded sha-256 digest".into(),
                });
            }
        }
        Ok(())
    }
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::{MetaConfig, token_digest};
    use crate::error::MetaError;

    #[test]
    fn default_config_is_valid() {
        MetaConfig::default().validate().expect("default valid");
        MetaConfig::development().validate().expect("dev valid");
    }

    #[test]
    fn rejects_zero_timeout_and_bad_root() {
        let err = MetaConfig::default()
            .with_request_timeout_ms(0)
            .validate()
            .expect_err("zero timeout");
        assert!(matches!(err, MetaError::InvalidConfig { .. }));

        let err = MetaConfig::default()
            .with_root_prefix("a/b")
            .validate()
            .expect_err("slash in root");
        assert!(matches!(err, MetaError::InvalidConfig { .. }));
    }

    #[test]
    fn loads_from_toml_with_defaults() {
        let config = MetaConfig::from_toml_str(
            r#"
            root_prefix = "catalog"
            request_timeout_ms = 250
            "#,
        )
        .expect("parse");
        assert_eq!(config.root_prefix, "catalog");
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.max_scan_entries, 100_000);
        assert!(config.seed_well_known);
    }

    #[test]
    fn bootstrap_token_is_stored_as_digest() {
        let config = MetaConfig::default().with_bootstrap_token("tok1");
        let digest = config.bootstrap_token_sha256.clone().expect("digest");
        assert_eq!(digest, token_digest("tok1"));
        assert_ne!(digest, "tok1");
        config.validate().expect("valid digest");

        let err = MetaConfig::from_toml_str(r#"bootstrap_token_sha256 = "abc""#)
            .expect_err("short digest");
        assert!(matches!(err, MetaError::InvalidConfig { .. }));
    }
}
