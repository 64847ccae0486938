//! JSON request and response envelopes, and the service that answers them.
//!
//! ```text
//! {"kind": "get_target_info"}
//! {"kind": "get_remote_assertion", "server_address": "host:1234", "user_data": "<base64>"}
//! {"kind": "verify_report", "report": "<base64>"}
//! ```
//!
//! Every response carries a `status`. Failures carry a machine-readable
//! `code` and a message that never distinguishes a malformed report from a
//! forged one.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelFactory;
use crate::claims::base64_bytes;
use crate::error::{AssertionError, ErrorCode};
use crate::generator::RemoteAssertion;
use crate::handlers::{
    GetRemoteAssertionInput, VerifyReportInput, get_remote_assertion, get_target_info,
    verify_report,
};
use crate::oracle::ReportOracle;

const ENCODING_FAILURE: &[u8] =
    br#"{"status":"failure","code":"internal","message":"response encoding failed"}"#;

/// A request to the assertion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssertionRequest {
    /// Return this enclave's target info.
    GetTargetInfo,
    /// Obtain a remote assertion from a generator.
    GetRemoteAssertion {
        /// Address of the generator
        #[serde(default, skip_serializing_if = "Option::is_none")]
        server_address: Option<String>,
        /// Data to bind, base64 on the wire
        #[serde(default, with = "base64_bytes")]
        user_data: Vec<u8>,
    },
    /// Verify a report addressed to this enclave.
    VerifyReport {
        /// Base64 wire form of the report
        #[serde(default, skip_serializing_if = "Option::is_none")]
        report: Option<String>,
    },
}

impl AssertionRequest {
    /// Returns the request kind as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GetTargetInfo => "get_target_info",
            Self::GetRemoteAssertion { .. } => "get_remote_assertion",
            Self::VerifyReport { .. } => "verify_report",
        }
    }
}

/// A response from the assertion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssertionResponse {
    /// This enclave's target info.
    TargetInfo {
        /// Base64 wire form of the target info
        target_info: String,
    },
    /// An issued remote assertion.
    RemoteAssertion {
        /// The assertion token
        assertion: RemoteAssertion,
    },
    /// The report verified.
    ReportVerified,
    /// The request failed.
    Failure {
        /// Machine-readable error code
        code: ErrorCode,
        /// Message safe to show to the peer
        message: String,
    },
}

impl AssertionResponse {
    /// Builds the failure response a peer may see for `err`.
    #[must_use]
    pub fn failure(err: &AssertionError) -> Self {
        Self::Failure {
            code: err.public_code(),
            message: err.public_message(),
        }
    }

    /// Returns true unless this is a failure.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

/// Lifecycle of a single request.
///
/// ```text
/// Idle --begin--> Requesting --complete--> Succeeded | Failed
/// ```
///
/// `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Not started
    Idle,
    /// Handler running
    Requesting,
    /// Handler returned a result
    Succeeded,
    /// Handler returned an error
    Failed,
}

impl RequestState {
    /// Moves from `Idle` to `Requesting`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::AlreadyInitialized` from any other state.
    pub const fn begin(self) -> Result<Self, AssertionError> {
        match self {
            Self::Idle => Ok(Self::Requesting),
            _ => Err(AssertionError::AlreadyInitialized),
        }
    }

    /// Moves from `Requesting` to `Succeeded` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::NotInitialized` from `Idle` and
    /// `AssertionError::AlreadyInitialized` from a terminal state.
    pub const fn complete(self, succeeded: bool) -> Result<Self, AssertionError> {
        match self {
            Self::Requesting if succeeded => Ok(Self::Succeeded),
            Self::Requesting => Ok(Self::Failed),
            Self::Idle => Err(AssertionError::NotInitialized),
            Self::Succeeded | Self::Failed => Err(AssertionError::AlreadyInitialized),
        }
    }

    /// Returns true for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Dispatches requests to the handlers of one enclave.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use assertion_binding_remote::{
///     AssertionService, LocalChannelFactory, LocalNetwork, Measurement, ProtocolConfig,
///     SoftwareReportOracle, TargetInfo,
/// };
///
/// let oracle = Arc::new(SoftwareReportOracle::generate(
///     TargetInfo::new(Measurement::of_image(b"enclave"), 0),
/// ));
/// let channels = LocalChannelFactory::new(
///     Arc::new(LocalNetwork::new()),
///     oracle.clone(),
///     &ProtocolConfig::default(),
/// );
/// let service = AssertionService::new(oracle, Arc::new(channels));
///
/// let response = service.handle_json(br#"{"kind": "get_target_info"}"#);
/// let response: serde_json::Value = serde_json::from_slice(&response).unwrap();
/// assert_eq!(response["status"], "target_info");
/// ```
pub struct AssertionService {
    oracle: Arc<dyn ReportOracle>,
    channels: Arc<dyn ChannelFactory>,
}

impl AssertionService {
    /// Creates a service for the enclave behind `oracle`.
    #[must_use]
    pub fn new(oracle: Arc<dyn ReportOracle>, channels: Arc<dyn ChannelFactory>) -> Self {
        Self { oracle, channels }
    }

    /// Answers one request.
    #[must_use]
    pub fn handle(&self, request: &AssertionRequest) -> AssertionResponse {
        let kind = request.kind();
        debug!("{kind}: {}", RequestState::Requesting);

        let result = self.dispatch(request);
        let state = if result.is_ok() {
            RequestState::Succeeded
        } else {
            RequestState::Failed
        };

        match result {
            Ok(response) => {
                info!("{kind}: {state}");
                response
            }
            Err(err) => {
                if err.is_rejection() {
                    warn!("{kind}: {state}: {err}");
                } else {
                    info!("{kind}: {state}: {err}");
                }
                AssertionResponse::failure(&err)
            }
        }
    }

    /// Answers one JSON-encoded request with a JSON-encoded response.
    ///
    /// Input that is not a valid request yields an `invalid_argument`
    /// failure.
    #[must_use]
    pub fn handle_json(&self, request: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<AssertionRequest>(request) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                let err = AssertionError::invalid_argument("request", e.to_string());
                info!("rejected request: {err}");
                AssertionResponse::failure(&err)
            }
        };

        serde_json::to_vec(&response).unwrap_or_else(|e| {
            error!("response encoding failed: {e}");
            ENCODING_FAILURE.to_vec()
        })
    }

    fn dispatch(&self, request: &AssertionRequest) -> Result<AssertionResponse, AssertionError> {
        match request {
            AssertionRequest::GetTargetInfo => {
                let output = get_target_info(self.oracle.as_ref())?;
                Ok(AssertionResponse::TargetInfo {
                    target_info: output.target_info,
                })
            }
            AssertionRequest::GetRemoteAssertion {
                server_address,
                user_data,
            } => {
                let input = GetRemoteAssertionInput {
                    server_address: server_address.clone(),
                    user_data: user_data.clone(),
                };
                let output = get_remote_assertion(self.channels.as_ref(), &input)?;
                Ok(AssertionResponse::RemoteAssertion {
                    assertion: output.assertion,
                })
            }
            AssertionRequest::VerifyReport { report } => {
                let input = VerifyReportInput {
                    report: report.clone(),
                };
                verify_report(self.oracle.as_ref(), &input)?;
                Ok(AssertionResponse::ReportVerified)
            }
        }
    }
}

impl fmt::Debug for AssertionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionService").finish_non_exhaustive()
    }
}
