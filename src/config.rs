use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Environment variable holding the secret that company ID tokens are keyed from.
pub const ENV_VAR: &str = "COMPANY_ID_ENCRYPTION_KEY";

/// Secret used when `COMPANY_ID_ENCRYPTION_KEY` is unset.
///
/// **Not for production.** This value is public, so anyone can decrypt and forge
/// tokens made with it.
pub const DEVELOPMENT_SECRET: &str = "dev-company-id-encryption-key";

/// AES-128 key length in bytes.
pub(crate) const KEY_LENGTH: usize = 16;

/// Where a configuration's secret came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Environment,
    DevelopmentDefault,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("company ID secret must not be empty")]
    EmptySecret,
    #[error("COMPANY_ID_ENCRYPTION_KEY is not set; refusing to use the development key")]
    DevelopmentKey,
}

/// Configuring the company ID codec.
#[derive(Clone)]
pub struct Config {
    secret: Vec<u8>,
    source: KeySource,
}

/// The cipher key, derived from a `Config` secret.
#[derive(Clone)]
pub(crate) struct DerivedKey(pub(crate) [u8; KEY_LENGTH]);

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

impl Config {
    /// Creates a configuration from an explicit `secret`.
    ///
    /// **Security note:** the secret should be random with sufficient entropy. It is
    /// hashed rather than stretched, so a short or guessable secret stays weak.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Config {
            secret: secret.as_ref().to_vec(),
            source: KeySource::Explicit,
        }
    }

    /// Like `new`, but rejects an empty secret.
    pub fn try_new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigError> {
        if secret.as_ref().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(Self::new(secret))
    }

    /// Reads the secret from `COMPANY_ID_ENCRYPTION_KEY`, falling back to
    /// [`DEVELOPMENT_SECRET`] when the variable is unset or empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the secret through `lookup` instead of the process environment.
    ///
    /// ```
    /// use company_id_token::{Config, KeySource};
    ///
    /// let config = Config::from_lookup(|_| Some("s3cret".to_string()));
    /// assert_eq!(config.source(), KeySource::Environment);
    ///
    /// let config = Config::from_lookup(|_| None);
    /// assert!(config.is_development_default());
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let config = match lookup(ENV_VAR).filter(|value| !value.is_empty()) {
            Some(secret) => Config {
                secret: secret.into_bytes(),
                source: KeySource::Environment,
            },
            None => {
                tracing::warn!(
                    env_var = ENV_VAR,
                    "company ID secret not configured, using the development key"
                );
                Config {
                    secret: DEVELOPMENT_SECRET.as_bytes().to_vec(),
                    source: KeySource::DevelopmentDefault,
                }
            }
        };
        tracing::debug!(source = ?config.source, "resolved company ID codec config");
        config
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_development_default(&self) -> bool {
        self.source == KeySource::DevelopmentDefault
    }

    /// Fails if the configuration fell back to the development key. Call this at
    /// startup in deployments that must not run with the public default.
    pub fn require_configured(self) -> Result<Self, ConfigError> {
        if self.is_development_default() {
            Err(ConfigError::DevelopmentKey)
        } else {
            Ok(self)
        }
    }

    /// First 16 bytes of SHA-256 over the secret.
    pub(crate) fn derive_key(&self) -> DerivedKey {
        let digest = Sha256::digest(&self.secret);
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&digest[..KEY_LENGTH]);
        DerivedKey(key)
    }
}
