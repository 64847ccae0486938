//! Stateless request handlers.
//!
//! Each handler takes its dependencies as arguments and keeps nothing
//! between calls, so one enclave can serve any number of requests.

use log::{info, warn};

use crate::channel::{ChannelFactory, ServerAddress, into_transport};
use crate::error::AssertionError;
use crate::generator::RemoteAssertion;
use crate::oracle::ReportOracle;
use crate::report::HardwareReport;

/// Result of [`get_target_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTargetInfoOutput {
    /// Base64 wire form of this enclave's target info
    pub target_info: String,
}

/// Input to [`verify_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReportInput {
    /// Base64 wire form of the report
    pub report: Option<String>,
}

/// Input to [`get_remote_assertion`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRemoteAssertionInput {
    /// Address of the assertion generator
    pub server_address: Option<String>,
    /// Data to bind into the assertion
    pub user_data: Vec<u8>,
}

/// Result of [`get_remote_assertion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRemoteAssertionOutput {
    /// The issued assertion
    pub assertion: RemoteAssertion,
}

/// Returns the identity of the enclave behind `oracle`.
///
/// # Errors
///
/// Returns `AssertionError::Internal` if the oracle cannot be queried.
pub fn get_target_info(oracle: &dyn ReportOracle) -> Result<GetTargetInfoOutput, AssertionError> {
    let target_info = oracle.target_info().map_err(|e| match e {
        AssertionError::Internal { .. } => e,
        other => AssertionError::internal(format!("target info query failed: {other}")),
    })?;

    Ok(GetTargetInfoOutput {
        target_info: target_info.to_base64(),
    })
}

/// Checks that a report is authentic and addressed to this enclave.
///
/// The purpose carried in the report data is not checked; callers that
/// need it can use [`check_report_purpose`](crate::check_report_purpose).
///
/// # Errors
///
/// Returns `AssertionError::InvalidArgument` if no report was supplied,
/// `AssertionError::DecodingError` if it is malformed, and
/// `AssertionError::VerificationFailure` if it does not verify. Send
/// failures to peers through [`AssertionError::public_code`].
pub fn verify_report(
    oracle: &dyn ReportOracle,
    input: &VerifyReportInput,
) -> Result<(), AssertionError> {
    let encoded = input
        .report
        .as_deref()
        .ok_or_else(|| AssertionError::invalid_argument("report", "field is required"))?;

    let report = HardwareReport::from_base64(encoded)
        .inspect_err(|e| warn!("rejected malformed report: {e}"))?;
    oracle.verify(&report)?;

    info!(
        "verified report from {:?}",
        report.reporter().measurement()
    );
    Ok(())
}

/// Obtains a remote assertion from the generator at the requested address.
///
/// Exactly one connection attempt and one request are made.
///
/// # Errors
///
/// Returns `AssertionError::InvalidArgument` if the address is missing or
/// malformed, and `AssertionError::Transport` if connecting, the attested
/// handshake, or the request fails. The transport reason is logged here;
/// peers only see [`TRANSPORT_FAILED_MESSAGE`](crate::TRANSPORT_FAILED_MESSAGE).
pub fn get_remote_assertion(
    channels: &dyn ChannelFactory,
    input: &GetRemoteAssertionInput,
) -> Result<GetRemoteAssertionOutput, AssertionError> {
    let address = input
        .server_address
        .as_deref()
        .ok_or_else(|| AssertionError::invalid_argument("server_address", "field is required"))?;
    let address = ServerAddress::parse(address)?;

    let assertion = channels
        .connect(&address)
        .and_then(|client| client.generate_remote_assertion(&input.user_data))
        .map_err(into_transport)
        .inspect_err(|e| warn!("remote assertion from {address} failed: {e}"))?;

    info!("obtained remote assertion from {address}");
    Ok(GetRemoteAssertionOutput { assertion })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ProtocolConfig;
    use crate::generator::AssertionGenerator;
    use crate::identity::{Measurement, TargetInfo};
    use crate::oracle::SoftwareReportOracle;
    use crate::report::ReportData;
    use crate::channel::{LocalChannelFactory, LocalNetwork};

    struct BrokenOracle;

    impl ReportOracle for BrokenOracle {
        fn target_info(&self) -> Result<TargetInfo, AssertionError> {
            Err(AssertionError::transport("platform unavailable"))
        }

        fn produce(
            &self,
            _target: &TargetInfo,
            _data: &ReportData,
        ) -> Result<HardwareReport, AssertionError> {
            Err(AssertionError::internal("platform unavailable"))
        }

        fn verify(&self, _report: &HardwareReport) -> Result<(), AssertionError> {
            Err(AssertionError::internal("platform unavailable"))
        }
    }

    fn siblings() -> (SoftwareReportOracle, SoftwareReportOracle) {
        let a = SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"a"), 0));
        let b = a.sibling(TargetInfo::new(Measurement::of_image(b"b"), 0));
        (a, b)
    }

    #[test]
    fn get_target_info_returns_base64_identity() {
        let (a, _) = siblings();
        let output = get_target_info(&a).unwrap();
        assert_eq!(
            TargetInfo::from_base64(&output.target_info).unwrap(),
            *a.identity()
        );
    }

    #[test]
    fn get_target_info_failure_is_internal() {
        assert!(matches!(
            get_target_info(&BrokenOracle),
            Err(AssertionError::Internal { .. })
        ));
    }

    #[test]
    fn verify_report_accepts_sibling_report() {
        let (a, b) = siblings();
        let data = ReportData::from_digest(b"hello").unwrap();
        let report = a.produce(b.identity(), &data).unwrap();

        let input = VerifyReportInput {
            report: Some(report.to_base64()),
        };
        assert!(verify_report(&b, &input).is_ok());
    }

    #[test]
    fn verify_report_requires_report() {
        let (a, _) = siblings();
        assert!(matches!(
            verify_report(&a, &VerifyReportInput::default()),
            Err(AssertionError::InvalidArgument { field: "report", .. })
        ));
    }

    #[test]
    fn verify_report_rejects_malformed_report() {
        let (a, _) = siblings();
        let input = VerifyReportInput {
            report: Some("AAAA".to_string()),
        };
        assert!(matches!(
            verify_report(&a, &input),
            Err(AssertionError::DecodingError { .. })
        ));
    }

    #[test]
    fn get_remote_assertion_requires_address() {
        let (a, _) = siblings();
        let factory = LocalChannelFactory::new(
            Arc::new(LocalNetwork::new()),
            Arc::new(a),
            &ProtocolConfig::default(),
        );

        for address in [None, Some(String::new()), Some("no port".to_string())] {
            let input = GetRemoteAssertionInput {
                server_address: address,
                user_data: b"data".to_vec(),
            };
            assert!(matches!(
                get_remote_assertion(&factory, &input),
                Err(AssertionError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn get_remote_assertion_through_local_network() {
        let (server, client) = siblings();
        let config = ProtocolConfig::default();
        let generator = AssertionGenerator::generate(&config, Arc::new(server)).unwrap();

        let network = Arc::new(LocalNetwork::new());
        network
            .bind(
                ServerAddress::parse("unix:/run/generator.sock").unwrap(),
                Arc::new(generator),
            )
            .unwrap();
        let factory = LocalChannelFactory::new(network, Arc::new(client), &config);

        let input = GetRemoteAssertionInput {
            server_address: Some("unix:/run/generator.sock".to_string()),
            user_data: b"data".to_vec(),
        };
        let output = get_remote_assertion(&factory, &input).unwrap();
        assert!(output.assertion.as_str().starts_with("v4.public."));
    }

    #[test]
    fn get_remote_assertion_without_listener_is_transport_error() {
        let (a, _) = siblings();
        let factory = LocalChannelFactory::new(
            Arc::new(LocalNetwork::new()),
            Arc::new(a),
            &ProtocolConfig::default(),
        );
        let input = GetRemoteAssertionInput {
            server_address: Some("localhost:1".to_string()),
            user_data: Vec::new(),
        };

        assert!(matches!(
            get_remote_assertion(&factory, &input),
            Err(AssertionError::Transport { .. })
        ));
    }

    #[test]
    fn get_remote_assertion_failures_share_public_message() {
        let (_, client) = siblings();
        let foreign =
            SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"foreign"), 0));
        let config = ProtocolConfig::default();

        let network = Arc::new(LocalNetwork::new());
        network
            .bind(
                ServerAddress::parse("h:1").unwrap(),
                Arc::new(AssertionGenerator::generate(&config, Arc::new(foreign)).unwrap()),
            )
            .unwrap();
        let factory = LocalChannelFactory::new(network, Arc::new(client), &config);

        let failure = |address: &str| {
            let input = GetRemoteAssertionInput {
                server_address: Some(address.to_string()),
                user_data: Vec::new(),
            };
            get_remote_assertion(&factory, &input).unwrap_err()
        };
        let untrusted = failure("h:1");
        let unreachable = failure("h:2");

        assert_ne!(untrusted, unreachable);
        assert_eq!(untrusted.public_code(), unreachable.public_code());
        assert_eq!(untrusted.public_message(), unreachable.public_message());
        assert!(!untrusted.public_message().contains("signature"));
    }
}
