//! Remote assertion claims.

use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AssertionError;
use crate::identity::TargetInfo;

/// Claims embedded in a remote assertion.
///
/// The claims bind caller-chosen user data to the identity the generator
/// authenticated over the attested channel.
///
/// # Example
///
/// ```
/// use assertion_binding_remote::{AssertionClaims, Measurement, TargetInfo};
/// use std::time::Duration;
///
/// let identity = TargetInfo::new(Measurement::of_image(b"client"), 0);
/// let claims = AssertionClaims::builder()
///     .user_data(b"nonce-1234".to_vec())
///     .identity(identity)
///     .issuer("local-assertion-generator")
///     .ttl(Duration::from_secs(600))
///     .build()
///     .unwrap();
///
/// assert_eq!(claims.user_data, b"nonce-1234");
/// assert_eq!(claims.identity, identity);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Caller data bound by the assertion, base64 on the wire
    #[serde(with = "base64_bytes")]
    pub user_data: Vec<u8>,
    /// Identity of the enclave the assertion speaks for
    pub identity: TargetInfo,
    /// Generator that issued the assertion
    pub iss: String,
    /// When the assertion was issued
    pub iat: DateTime<Utc>,
    /// When the assertion expires
    pub exp: DateTime<Utc>,
}

impl AssertionClaims {
    /// Creates a new builder for assertion claims.
    #[must_use]
    pub fn builder() -> AssertionClaimsBuilder {
        AssertionClaimsBuilder::new()
    }

    /// Returns true if the assertion has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.exp
    }

    /// Returns true if the assertion is not yet valid (before `iat`).
    #[must_use]
    pub fn is_not_yet_valid(&self) -> bool {
        Utc::now() < self.iat
    }
}

/// Builder for constructing [`AssertionClaims`].
#[derive(Debug, Clone)]
pub struct AssertionClaimsBuilder {
    user_data: Option<Vec<u8>>,
    identity: Option<TargetInfo>,
    issuer: Option<String>,
    ttl: Duration,
}

impl AssertionClaimsBuilder {
    /// Creates a new builder with a default TTL of one hour.
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_data: None,
            identity: None,
            issuer: None,
            ttl: Duration::from_secs(3600),
        }
    }

    /// Sets the user data to bind.
    #[must_use]
    pub fn user_data(mut self, user_data: impl Into<Vec<u8>>) -> Self {
        self.user_data = Some(user_data.into());
        self
    }

    /// Sets the authenticated identity.
    #[must_use]
    pub fn identity(mut self, identity: TargetInfo) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the time-to-live duration.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builds the claims.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if a required field is not
    /// set or the TTL does not fit a timestamp.
    pub fn build(self) -> Result<AssertionClaims, AssertionError> {
        let user_data = self
            .user_data
            .ok_or_else(|| AssertionError::invalid_argument("user_data", "field is required"))?;
        let identity = self
            .identity
            .ok_or_else(|| AssertionError::invalid_argument("identity", "field is required"))?;
        let issuer = self
            .issuer
            .ok_or_else(|| AssertionError::invalid_argument("issuer", "field is required"))?;

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|_| AssertionError::invalid_argument("ttl", "duration is out of range"))?;
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AssertionError::invalid_argument("ttl", "duration is out of range"))?;

        Ok(AssertionClaims {
            user_data,
            identity,
            iss: issuer,
            iat: now,
            exp,
        })
    }
}

impl Default for AssertionClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serde adapter for byte fields carried as standard base64.
pub(crate) mod base64_bytes {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BASE64_STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Encodes user data for the `user_data` token claim.
pub(crate) fn encode_user_data(user_data: &[u8]) -> String {
    BASE64_STANDARD.encode(user_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Measurement;

    fn identity() -> TargetInfo {
        TargetInfo::new(Measurement::of_image(b"client"), 1)
    }

    #[test]
    fn builder_creates_valid_claims() {
        let claims = AssertionClaimsBuilder::new()
            .user_data(b"data".to_vec())
            .identity(identity())
            .issuer("generator")
            .build()
            .unwrap();

        assert_eq!(claims.user_data, b"data");
        assert_eq!(claims.identity, identity());
        assert_eq!(claims.iss, "generator");
    }

    #[test]
    fn builder_requires_user_data() {
        let result = AssertionClaimsBuilder::new()
            .identity(identity())
            .issuer("generator")
            .build();

        assert!(matches!(
            result,
            Err(AssertionError::InvalidArgument {
                field: "user_data",
                ..
            })
        ));
    }

    #[test]
    fn builder_requires_identity() {
        let result = AssertionClaimsBuilder::new()
            .user_data(Vec::new())
            .issuer("generator")
            .build();

        assert!(matches!(
            result,
            Err(AssertionError::InvalidArgument {
                field: "identity",
                ..
            })
        ));
    }

    #[test]
    fn builder_requires_issuer() {
        let result = AssertionClaimsBuilder::new()
            .user_data(Vec::new())
            .identity(identity())
            .build();

        assert!(matches!(
            result,
            Err(AssertionError::InvalidArgument { field: "issuer", .. })
        ));
    }

    #[test]
    fn builder_rejects_unrepresentable_ttl() {
        let result = AssertionClaimsBuilder::new()
            .user_data(Vec::new())
            .identity(identity())
            .issuer("generator")
            .ttl(Duration::MAX)
            .build();

        assert!(matches!(
            result,
            Err(AssertionError::InvalidArgument { field: "ttl", .. })
        ));
    }

    #[test]
    fn builder_with_custom_ttl() {
        let claims = AssertionClaimsBuilder::new()
            .user_data(Vec::new())
            .identity(identity())
            .issuer("generator")
            .ttl(Duration::from_secs(60))
            .build()
            .unwrap();

        let expected_exp = claims.iat + chrono::Duration::seconds(60);
        assert!((claims.exp - expected_exp).num_seconds().abs() < 2);
        assert!(!claims.is_expired());
        assert!(!claims.is_not_yet_valid());
    }

    #[test]
    fn claims_serialize_bytes_as_base64() {
        let claims = AssertionClaimsBuilder::new()
            .user_data(vec![0xff, 0x00, 0x10])
            .identity(identity())
            .issuer("generator")
            .build()
            .unwrap();

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["user_data"], "/wAQ");
        assert_eq!(json["identity"], identity().to_base64());

        let recovered: AssertionClaims = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, claims);
    }
}
