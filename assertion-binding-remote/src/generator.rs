//! The assertion generator service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use assertion_binding::HashAlgorithm;
use log::{debug, info};
use rusty_paseto::prelude::*;
use serde::{Deserialize, Serialize};

use crate::claims::{AssertionClaims, AssertionClaimsBuilder, encode_user_data};
use crate::config::{ProtocolConfig, check_hash_algorithms};
use crate::error::AssertionError;
use crate::handshake::{ClientHello, ServerHello, binding_aad, select_hash_algorithm};
use crate::identity::TargetInfo;
use crate::keys::{SigningKey, VerifyingKey};
use crate::oracle::ReportOracle;
use crate::report::{HardwareReport, ReportData};
use crate::verification::check_report_binding;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A signed statement binding user data to an attested enclave identity.
///
/// The token is a PASETO v4.public token. Verify it with an
/// [`AssertionVerifier`](crate::AssertionVerifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteAssertion(String);

impl RemoteAssertion {
    /// Wraps a token received from a peer.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the assertion and returns the token text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RemoteAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues remote assertions to enclaves that complete an attested handshake.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use assertion_binding_remote::{
///     AssertionGenerator, Measurement, ProtocolConfig, SoftwareReportOracle, TargetInfo,
/// };
///
/// let oracle = SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"gen"), 0));
/// let generator = AssertionGenerator::generate(&ProtocolConfig::default(), Arc::new(oracle)).unwrap();
///
/// let peer = TargetInfo::new(Measurement::of_image(b"client"), 0);
/// let assertion = generator.generate_remote_assertion(&peer, b"user data").unwrap();
/// assert!(assertion.as_str().starts_with("v4.public."));
/// ```
pub struct AssertionGenerator {
    issuer: String,
    signing_key: SigningKey,
    default_ttl: Duration,
    hash_algorithms: Vec<HashAlgorithm>,
    oracle: Arc<dyn ReportOracle>,
}

impl AssertionGenerator {
    /// Creates a generator running inside the enclave behind `oracle`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if `config` is invalid.
    pub fn new(
        config: &ProtocolConfig,
        signing_key: SigningKey,
        oracle: Arc<dyn ReportOracle>,
    ) -> Result<Self, AssertionError> {
        config.validate()?;
        Ok(Self {
            issuer: config.issuer.clone(),
            signing_key,
            default_ttl: config.assertion_ttl(),
            hash_algorithms: config.hash_algorithms.clone(),
            oracle,
        })
    }

    /// Creates a generator with a random signing key.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if `config` is invalid.
    pub fn generate(
        config: &ProtocolConfig,
        oracle: Arc<dyn ReportOracle>,
    ) -> Result<Self, AssertionError> {
        Self::new(config, SigningKey::generate(), oracle)
    }

    /// Returns the issuer recorded in assertions.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the key that verifies this generator's assertions.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Returns the lifetime of issued assertions.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the transcript hash algorithms in preference order.
    #[must_use]
    pub fn hash_algorithms(&self) -> &[HashAlgorithm] {
        &self.hash_algorithms
    }

    /// Answers a client hello and produces this side's handshake report.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if the hello's algorithm
    /// list is empty or repeats an algorithm, `AssertionError::Transport` if
    /// no hash algorithm is shared, or the oracle's error if the report
    /// cannot be produced.
    pub fn accept(self: &Arc<Self>, hello: &ClientHello) -> Result<PendingSession, AssertionError> {
        check_hash_algorithms(&hello.hash_algorithms)?;
        let algorithm = select_hash_algorithm(&self.hash_algorithms, &hello.hash_algorithms)?;
        let server_hello = ServerHello::new(self.oracle.target_info()?, algorithm);
        let expected = ReportData::from(binding_aad(hello, &server_hello)?);
        let server_report = self.oracle.produce(&hello.target_info, &expected)?;

        debug!(
            "accepted client hello from {:?} using {algorithm}",
            hello.target_info.measurement()
        );
        Ok(PendingSession {
            generator: Arc::clone(self),
            client: hello.target_info,
            server_hello,
            server_report,
            expected,
        })
    }

    /// Issues an assertion binding `user_data` to `peer`.
    ///
    /// Callers must have authenticated `peer`; sessions created by
    /// [`accept`](Self::accept) do this.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the token cannot be built.
    pub fn generate_remote_assertion(
        &self,
        peer: &TargetInfo,
        user_data: &[u8],
    ) -> Result<RemoteAssertion, AssertionError> {
        let claims = AssertionClaimsBuilder::new()
            .user_data(user_data)
            .identity(*peer)
            .issuer(&self.issuer)
            .ttl(self.default_ttl)
            .build()?;

        let assertion = self.issue_claims(&claims)?;
        info!(
            "issued remote assertion for {:?} ({} bytes of user data)",
            peer.measurement(),
            user_data.len()
        );
        Ok(assertion)
    }

    /// Signs pre-built claims.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if a claim is rejected by the
    /// token builder or signing fails.
    pub fn issue_claims(&self, claims: &AssertionClaims) -> Result<RemoteAssertion, AssertionError> {
        let dalek_key = self.signing_key.as_dalek();
        let key_bytes = dalek_key.to_keypair_bytes();
        let key_wrapper = Key::<64>::from(&key_bytes);
        let paseto_key = PasetoAsymmetricPrivateKey::<V4, Public>::from(&key_wrapper);

        let exp_str = claims.exp.format(TIMESTAMP_FORMAT).to_string();
        let iat_str = claims.iat.format(TIMESTAMP_FORMAT).to_string();

        let exp_claim = ExpirationClaim::try_from(exp_str.as_str())
            .map_err(|e| AssertionError::internal(format!("invalid expiration: {e}")))?;
        let iat_claim = IssuedAtClaim::try_from(iat_str.as_str())
            .map_err(|e| AssertionError::internal(format!("invalid issued at: {e}")))?;
        let iss_claim = IssuerClaim::from(claims.iss.as_str());

        let user_data = encode_user_data(&claims.user_data);
        let user_data_claim = CustomClaim::try_from(("user_data", user_data.as_str()))
            .map_err(|e| AssertionError::internal(format!("invalid user_data claim: {e}")))?;
        let identity = claims.identity.to_base64();
        let identity_claim = CustomClaim::try_from(("identity", identity.as_str()))
            .map_err(|e| AssertionError::internal(format!("invalid identity claim: {e}")))?;

        let mut builder = PasetoBuilder::<V4, Public>::default();
        builder
            .set_claim(exp_claim)
            .set_claim(iat_claim)
            .set_claim(iss_claim)
            .set_claim(user_data_claim)
            .set_claim(identity_claim);

        builder
            .build(&paseto_key)
            .map(RemoteAssertion)
            .map_err(|e| AssertionError::internal(format!("token signing failed: {e}")))
    }
}

impl fmt::Debug for AssertionGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionGenerator")
            .field("issuer", &self.issuer)
            .field("verifying_key", &self.verifying_key())
            .field("default_ttl", &self.default_ttl)
            .field("hash_algorithms", &self.hash_algorithms)
            .finish_non_exhaustive()
    }
}

/// A handshake the generator has answered but not yet completed.
#[derive(Debug)]
pub struct PendingSession {
    generator: Arc<AssertionGenerator>,
    client: TargetInfo,
    server_hello: ServerHello,
    server_report: HardwareReport,
    expected: ReportData,
}

impl PendingSession {
    /// Returns the hello to send to the client.
    #[must_use]
    pub const fn server_hello(&self) -> &ServerHello {
        &self.server_hello
    }

    /// Returns the generator's report, addressed at the client.
    #[must_use]
    pub const fn server_report(&self) -> &HardwareReport {
        &self.server_report
    }

    /// Completes the handshake with the client's report.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::VerificationFailure` if the report is not
    /// authentic, not addressed to the generator, not produced by the
    /// enclave named in the client hello, or not bound to this handshake.
    pub fn finish(self, client_report: &HardwareReport) -> Result<Session, AssertionError> {
        self.generator.oracle.verify(client_report)?;
        check_report_binding(client_report, &self.client, &self.expected)?;

        info!(
            "attested session established with {:?}",
            self.client.measurement()
        );
        Ok(Session {
            generator: self.generator,
            peer: self.client,
        })
    }
}

/// A mutually attested session with one client enclave.
#[derive(Debug, Clone)]
pub struct Session {
    generator: Arc<AssertionGenerator>,
    peer: TargetInfo,
}

impl Session {
    /// Returns the authenticated identity of the client.
    #[must_use]
    pub const fn peer(&self) -> &TargetInfo {
        &self.peer
    }

    /// Issues an assertion binding `user_data` to the session's client.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the token cannot be built.
    pub fn generate_remote_assertion(
        &self,
        user_data: &[u8],
    ) -> Result<RemoteAssertion, AssertionError> {
        self.generator
            .generate_remote_assertion(&self.peer, user_data)
    }
}
