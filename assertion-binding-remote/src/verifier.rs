//! Remote assertion verifier.

use std::collections::HashMap;

use base64::prelude::*;
use chrono::Utc;
use log::warn;
use rusty_paseto::prelude::*;

use crate::claims::AssertionClaims;
use crate::error::AssertionError;
use crate::generator::RemoteAssertion;
use crate::identity::TargetInfo;
use crate::keys::VerifyingKey;
use crate::verification::{check_expiration, validate_identity, validate_issuer, validate_user_data};

/// Verifies remote assertions against a set of trusted generators.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use assertion_binding_remote::{
///     AssertionGenerator, AssertionVerifier, Measurement, ProtocolConfig,
///     SoftwareReportOracle, TargetInfo,
/// };
///
/// let oracle = SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"gen"), 0));
/// let generator = AssertionGenerator::generate(&ProtocolConfig::default(), Arc::new(oracle)).unwrap();
///
/// let peer = TargetInfo::new(Measurement::of_image(b"client"), 0);
/// let assertion = generator.generate_remote_assertion(&peer, b"challenge").unwrap();
///
/// let mut verifier = AssertionVerifier::new();
/// verifier.add_trusted_generator(generator.issuer(), generator.verifying_key());
///
/// let claims = verifier.verify_bound(&assertion, b"challenge", &peer).unwrap();
/// assert_eq!(claims.identity, peer);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssertionVerifier {
    trusted_generators: HashMap<String, VerifyingKey>,
}

impl AssertionVerifier {
    /// Creates a verifier that trusts no generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts assertions from `issuer` signed by `public_key`.
    pub fn add_trusted_generator(&mut self, issuer: impl Into<String>, public_key: VerifyingKey) {
        self.trusted_generators.insert(issuer.into(), public_key);
    }

    /// Returns true if `issuer` is trusted.
    #[must_use]
    pub fn has_trusted_generator(&self, issuer: &str) -> bool {
        self.trusted_generators.contains_key(issuer)
    }

    /// Returns the number of trusted generators.
    #[must_use]
    pub fn trusted_generator_count(&self) -> usize {
        self.trusted_generators.len()
    }

    /// Verifies an assertion and returns its claims.
    ///
    /// The signature must verify under a trusted generator key and the
    /// assertion's issuer must be the one that key was registered for. A key
    /// trusted under several issuers is tried under each of them.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::VerificationFailure` if no trusted key
    /// verifies the token, the issuer does not match, or the assertion has
    /// expired. Returns `AssertionError::DecodingError` if the claims are
    /// malformed.
    pub fn verify(&self, assertion: &RemoteAssertion) -> Result<AssertionClaims, AssertionError> {
        let mut last_error = None;

        for (issuer, verifying_key) in &self.trusted_generators {
            let claims = match try_verify_with_key(assertion.as_str(), verifying_key)
                .and_then(|claims| validate_issuer(issuer, &claims.iss).map(|()| claims))
            {
                Ok(claims) => claims,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };
            check_expiration(claims.exp, Utc::now())?;
            return Ok(claims);
        }

        let err = last_error
            .unwrap_or_else(|| AssertionError::verification("no trusted assertion generators"));
        warn!("remote assertion rejected: {err}");
        Err(err)
    }

    /// Verifies an assertion and checks that it binds `user_data` to
    /// `identity`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`verify`](Self::verify), or
    /// `AssertionError::VerificationFailure` if the user data or identity
    /// differ.
    pub fn verify_bound(
        &self,
        assertion: &RemoteAssertion,
        user_data: &[u8],
        identity: &TargetInfo,
    ) -> Result<AssertionClaims, AssertionError> {
        let claims = self.verify(assertion)?;
        validate_user_data(user_data, &claims.user_data)?;
        validate_identity(identity, &claims.identity)?;
        Ok(claims)
    }
}

fn try_verify_with_key(
    token: &str,
    verifying_key: &VerifyingKey,
) -> Result<AssertionClaims, AssertionError> {
    let key_bytes = verifying_key.to_bytes();
    let key_wrapper = Key::<32>::from(&key_bytes);
    let paseto_key = PasetoAsymmetricPublicKey::<V4, Public>::from(&key_wrapper);

    let json_value = PasetoParser::<V4, Public>::default()
        .parse(token, &paseto_key)
        .map_err(|e| AssertionError::verification(format!("token rejected: {e}")))?;

    extract_claims(&json_value)
}

fn str_claim<'a>(json: &'a serde_json::Value, name: &str) -> Result<&'a str, AssertionError> {
    json[name]
        .as_str()
        .ok_or_else(|| AssertionError::decoding(format!("missing {name} claim")))
}

fn extract_claims(json: &serde_json::Value) -> Result<AssertionClaims, AssertionError> {
    let user_data = BASE64_STANDARD
        .decode(str_claim(json, "user_data")?)
        .map_err(|e| AssertionError::decoding(format!("invalid user_data claim: {e}")))?;
    let identity = TargetInfo::from_base64(str_claim(json, "identity")?)?;
    let iss = str_claim(json, "iss")?.to_string();

    let iat = chrono::DateTime::parse_from_rfc3339(str_claim(json, "iat")?)
        .map_err(|e| AssertionError::decoding(format!("invalid iat format: {e}")))?
        .with_timezone(&Utc);
    let exp = chrono::DateTime::parse_from_rfc3339(str_claim(json, "exp")?)
        .map_err(|e| AssertionError::decoding(format!("invalid exp format: {e}")))?
        .with_timezone(&Utc);

    Ok(AssertionClaims {
        user_data,
        identity,
        iss,
        iat,
        exp,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::claims::AssertionClaimsBuilder;
    use crate::config::ProtocolConfig;
    use crate::generator::AssertionGenerator;
    use crate::identity::Measurement;
    use crate::keys::SigningKey;
    use crate::oracle::SoftwareReportOracle;

    fn generator(issuer: &str) -> AssertionGenerator {
        let oracle =
            SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"gen"), 0));
        AssertionGenerator::generate(&ProtocolConfig::new().with_issuer(issuer), Arc::new(oracle))
            .unwrap()
    }

    fn peer() -> TargetInfo {
        TargetInfo::new(Measurement::of_image(b"client"), 2)
    }

    fn verifier_for(generator: &AssertionGenerator) -> AssertionVerifier {
        let mut verifier = AssertionVerifier::new();
        verifier.add_trusted_generator(generator.issuer(), generator.verifying_key());
        verifier
    }

    #[test]
    fn verify_recovers_claims() {
        let generator = generator("gen-a");
        let assertion = generator
            .generate_remote_assertion(&peer(), b"user data")
            .unwrap();

        let claims = verifier_for(&generator).verify(&assertion).unwrap();
        assert_eq!(claims.user_data, b"user data");
        assert_eq!(claims.identity, peer());
        assert_eq!(claims.iss, "gen-a");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_without_trusted_generators_fails() {
        let generator = generator("gen-a");
        let assertion = generator.generate_remote_assertion(&peer(), b"").unwrap();

        assert!(matches!(
            AssertionVerifier::new().verify(&assertion),
            Err(AssertionError::VerificationFailure { .. })
        ));
    }

    #[test]
    fn verify_rejects_other_generator_key() {
        let trusted = generator("gen-a");
        let rogue = generator("gen-a");
        let assertion = rogue.generate_remote_assertion(&peer(), b"data").unwrap();

        assert!(verifier_for(&trusted).verify(&assertion).is_err());
    }

    #[test]
    fn verify_rejects_issuer_registered_under_other_name() {
        let generator = generator("gen-a");
        let assertion = generator.generate_remote_assertion(&peer(), b"data").unwrap();

        let mut verifier = AssertionVerifier::new();
        verifier.add_trusted_generator("gen-b", generator.verifying_key());

        assert!(verifier.verify(&assertion).is_err());
    }

    #[test]
    fn key_shared_by_two_issuers_verifies_under_matching_issuer() {
        let generator = generator("gen-a");
        let assertion = generator.generate_remote_assertion(&peer(), b"data").unwrap();

        // Fresh maps get fresh hash seeds, so both iteration orders occur
        for _ in 0..16 {
            let mut verifier = AssertionVerifier::new();
            verifier.add_trusted_generator("gen-b", generator.verifying_key());
            verifier.add_trusted_generator("gen-a", generator.verifying_key());

            let claims = verifier.verify(&assertion).unwrap();
            assert_eq!(claims.iss, "gen-a");
        }
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let generator = generator("gen-a");
        let token = generator
            .generate_remote_assertion(&peer(), b"data")
            .unwrap()
            .into_string();

        let mut tampered = token.into_bytes();
        let index = tampered.len() - 5;
        tampered[index] = if tampered[index] == b'A' { b'B' } else { b'A' };
        let tampered = RemoteAssertion::new(String::from_utf8(tampered).unwrap());

        assert!(verifier_for(&generator).verify(&tampered).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let generator = generator("gen-a");
        let garbage = RemoteAssertion::new("not a token");
        assert!(verifier_for(&generator).verify(&garbage).is_err());
    }

    #[test]
    fn verify_bound_checks_user_data_and_identity() {
        let generator = generator("gen-a");
        let verifier = verifier_for(&generator);
        let assertion = generator.generate_remote_assertion(&peer(), b"nonce").unwrap();

        assert!(verifier.verify_bound(&assertion, b"nonce", &peer()).is_ok());
        assert!(verifier.verify_bound(&assertion, b"other", &peer()).is_err());

        let stranger = TargetInfo::new(Measurement::of_image(b"stranger"), 2);
        assert!(verifier.verify_bound(&assertion, b"nonce", &stranger).is_err());
    }

    #[test]
    fn claims_signed_directly_verify() {
        let signing_key = SigningKey::generate();
        let oracle =
            SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"gen"), 0));
        let generator = AssertionGenerator::new(
            &ProtocolConfig::default(),
            signing_key.clone(),
            Arc::new(oracle),
        )
        .unwrap();

        let claims = AssertionClaimsBuilder::new()
            .user_data(vec![1, 2, 3])
            .identity(peer())
            .issuer(generator.issuer())
            .ttl(Duration::from_secs(60))
            .build()
            .unwrap();
        let assertion = generator.issue_claims(&claims).unwrap();

        let mut verifier = AssertionVerifier::new();
        verifier.add_trusted_generator(generator.issuer(), signing_key.verifying_key());
        assert_eq!(verifier.trusted_generator_count(), 1);
        assert!(verifier.has_trusted_generator("local-assertion-generator"));

        let recovered = verifier.verify(&assertion).unwrap();
        assert_eq!(recovered.user_data, vec![1, 2, 3]);
    }
}
