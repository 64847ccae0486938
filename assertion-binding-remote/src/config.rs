//! Protocol configuration.

use std::time::Duration;

use assertion_binding::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::AssertionError;

/// Configuration shared by assertion generators and channel factories.
///
/// # Example
///
/// ```
/// use assertion_binding::HashAlgorithm;
/// use assertion_binding_remote::ProtocolConfig;
///
/// let config = ProtocolConfig::from_json(
///     r#"{"hash_algorithms": ["SHA512", "SHA256"], "assertion_ttl_secs": 60}"#,
/// ).unwrap();
///
/// assert_eq!(config.hash_algorithms, vec![HashAlgorithm::Sha512, HashAlgorithm::Sha256]);
/// assert_eq!(config.issuer, "local-assertion-generator");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Transcript hash algorithms in order of preference.
    ///
    /// A generator picks the first of these that the client also offers.
    /// Default: SHA256, SHA384, SHA512
    pub hash_algorithms: Vec<HashAlgorithm>,

    /// Lifetime of issued remote assertions, in seconds.
    ///
    /// Default: 3600
    pub assertion_ttl_secs: u64,

    /// Issuer recorded in remote assertions.
    ///
    /// Default: `local-assertion-generator`
    pub issuer: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            hash_algorithms: HashAlgorithm::ALL.to_vec(),
            assertion_ttl_secs: 3600,
            issuer: "local-assertion-generator".to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if the JSON is malformed,
    /// names an unknown hash algorithm, or fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, AssertionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AssertionError::invalid_argument("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the hash algorithm preference order.
    #[must_use]
    pub fn with_hash_algorithms(mut self, algorithms: Vec<HashAlgorithm>) -> Self {
        self.hash_algorithms = algorithms;
        self
    }

    /// Sets the assertion lifetime.
    #[must_use]
    pub const fn with_assertion_ttl(mut self, ttl: Duration) -> Self {
        self.assertion_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Returns the assertion lifetime.
    #[must_use]
    pub const fn assertion_ttl(&self) -> Duration {
        Duration::from_secs(self.assertion_ttl_secs)
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if the hash algorithm list
    /// is empty or repeats an algorithm, the TTL is zero, or the issuer is
    /// empty.
    pub fn validate(&self) -> Result<(), AssertionError> {
        check_hash_algorithms(&self.hash_algorithms)?;
        if self.assertion_ttl_secs == 0 {
            return Err(AssertionError::invalid_argument(
                "assertion_ttl_secs",
                "must be positive",
            ));
        }
        if self.issuer.is_empty() {
            return Err(AssertionError::invalid_argument(
                "issuer",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

/// Checks that an algorithm list is non-empty and free of repeats.
///
/// Distinct lists hold at most [`HashAlgorithm::ALL`] entries, so their
/// length always fits the one-byte count of a client hello.
pub(crate) fn check_hash_algorithms(algorithms: &[HashAlgorithm]) -> Result<(), AssertionError> {
    if algorithms.is_empty() {
        return Err(AssertionError::invalid_argument(
            "hash_algorithms",
            "at least one algorithm is required",
        ));
    }
    for (i, alg) in algorithms.iter().enumerate() {
        if algorithms[..i].contains(alg) {
            return Err(AssertionError::invalid_argument(
                "hash_algorithms",
                format!("{alg} is listed more than once"),
            ));
        }
    }
    Ok(())
}
