//! Local report verification and remote assertions for enclaves.
//!
//! This crate builds on the transcript and AAD primitives of
//! [`assertion_binding`] to provide three operations an enclave serves:
//!
//! - **Get target info**: publish this enclave's identity so peers can
//!   address reports at it.
//! - **Verify report**: check that a report is authentic and addressed to
//!   this enclave.
//! - **Get remote assertion**: open a mutually attested channel to an
//!   assertion generator and obtain a signed statement binding caller data to
//!   this enclave's identity.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use assertion_binding_remote::prelude::*;
//!
//! // Two enclaves on one platform: a generator and a client.
//! let generator_oracle = SoftwareReportOracle::generate(
//!     TargetInfo::new(Measurement::of_image(b"generator"), 0),
//! );
//! let client_oracle = Arc::new(generator_oracle.sibling(
//!     TargetInfo::new(Measurement::of_image(b"client"), 0),
//! ));
//!
//! let config = ProtocolConfig::default();
//! let generator = Arc::new(AssertionGenerator::generate(&config, Arc::new(generator_oracle)).unwrap());
//!
//! let network = Arc::new(LocalNetwork::new());
//! let address = ServerAddress::parse("unix:/run/generator.sock").unwrap();
//! network.bind(address, generator.clone()).unwrap();
//!
//! let channels = LocalChannelFactory::new(network, client_oracle.clone(), &config);
//! let service = AssertionService::new(client_oracle.clone(), Arc::new(channels));
//!
//! let response = service.handle(&AssertionRequest::GetRemoteAssertion {
//!     server_address: Some("unix:/run/generator.sock".to_string()),
//!     user_data: b"challenge".to_vec(),
//! });
//! let AssertionResponse::RemoteAssertion { assertion } = response else {
//!     panic!("request failed");
//! };
//!
//! let mut verifier = AssertionVerifier::new();
//! verifier.add_trusted_generator(generator.issuer(), generator.verifying_key());
//! let claims = verifier
//!     .verify_bound(&assertion, b"challenge", client_oracle.identity())
//!     .unwrap();
//! assert_eq!(claims.user_data, b"challenge");
//! ```
//!
//! # Wire Formats
//!
//! | Structure | Size | Layout |
//! |-----------|------|--------|
//! | [`TargetInfo`] | 64 | measurement, attributes (LE), reserved zero |
//! | [`HardwareReport`] | 256 | reporter target info, target info, report data, tag |
//! | [`RemoteAssertion`] | variable | PASETO v4.public token |
//!
//! Binary structures travel as standard base64 inside JSON envelopes.
//!
//! # Failure Disclosure
//!
//! A malformed report and a forged one produce the same public failure,
//! `verification_failed` / `"verification failed"`. Every failed call to an
//! assertion generator produces `transport` /
//! `"assertion generator request failed"`, whether nothing listened or the
//! generator failed attestation. The detailed reason is logged through the
//! `log` facade at `warn` level.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod channel;
mod claims;
mod config;
mod envelope;
mod error;
mod generator;
mod handlers;
mod handshake;
mod identity;
mod keys;
mod oracle;
mod report;
mod verification;
mod verifier;

pub use channel::{
    AssertionGeneratorClient, ChannelFactory, LocalChannelFactory, LocalNetwork, ServerAddress,
};
pub use claims::{AssertionClaims, AssertionClaimsBuilder};
pub use config::ProtocolConfig;
pub use envelope::{AssertionRequest, AssertionResponse, AssertionService, RequestState};
pub use error::{AssertionError, ErrorCode, TRANSPORT_FAILED_MESSAGE, VERIFICATION_FAILED_MESSAGE};
pub use generator::{AssertionGenerator, PendingSession, RemoteAssertion, Session};
pub use handlers::{
    GetRemoteAssertionInput, GetRemoteAssertionOutput, GetTargetInfoOutput, VerifyReportInput,
    get_remote_assertion, get_target_info, verify_report,
};
pub use handshake::{ClientHello, NONCE_SIZE, ServerHello, binding_aad, select_hash_algorithm};
pub use identity::{MEASUREMENT_SIZE, Measurement, TARGET_INFO_SIZE, TargetInfo};
pub use keys::{SIGNATURE_SIZE, SigningKey, VerifyingKey};
pub use oracle::{ReportOracle, SoftwareReportOracle};
pub use report::{HardwareReport, REPORT_BODY_SIZE, REPORT_DATA_SIZE, REPORT_SIZE, ReportData};
pub use verification::{
    check_expiration, check_report_binding, check_report_purpose, validate_identity,
    validate_issuer, validate_user_data,
};
pub use verifier::AssertionVerifier;

/// A prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use assertion_binding_remote::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AssertionClaims, AssertionError, AssertionGenerator, AssertionRequest, AssertionResponse,
        AssertionService, AssertionVerifier, ChannelFactory, ErrorCode, HardwareReport,
        LocalChannelFactory, LocalNetwork, Measurement, ProtocolConfig, RemoteAssertion,
        ReportData, ReportOracle, ServerAddress, SoftwareReportOracle, TargetInfo,
    };
}
