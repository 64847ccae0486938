//! Report production and verification.
//!
//! A [`ReportOracle`] stands in for the platform instructions that create and
//! check hardware reports. Reports are only verifiable by the enclave they are
//! addressed to.

use log::{debug, warn};

use crate::error::AssertionError;
use crate::identity::TargetInfo;
use crate::keys::SigningKey;
use crate::report::{HardwareReport, ReportData};

/// Produces and verifies hardware reports for one enclave.
pub trait ReportOracle: Send + Sync {
    /// Returns the identity of the enclave this oracle runs in.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the identity cannot be queried.
    fn target_info(&self) -> Result<TargetInfo, AssertionError>;

    /// Produces a report binding `data` to this enclave, addressed at `target`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::Internal` if the report cannot be produced.
    fn produce(
        &self,
        target: &TargetInfo,
        data: &ReportData,
    ) -> Result<HardwareReport, AssertionError>;

    /// Checks that `report` is authentic and addressed to this enclave.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::VerificationFailure` if the tag is invalid or
    /// the report targets another enclave.
    fn verify(&self, report: &HardwareReport) -> Result<(), AssertionError>;
}

/// Software report oracle backed by a shared platform key.
///
/// Enclaves on one platform are siblings: they share the platform key and
/// differ in identity. A report produced by one sibling verifies in the
/// sibling it was addressed to and nowhere else.
///
/// # Example
///
/// ```
/// use assertion_binding_remote::{Measurement, ReportData, ReportOracle, SoftwareReportOracle, TargetInfo};
///
/// let alice = SoftwareReportOracle::generate(TargetInfo::new(Measurement::of_image(b"alice"), 0));
/// let bob = alice.sibling(TargetInfo::new(Measurement::of_image(b"bob"), 0));
///
/// let data = ReportData::from_digest(b"hello").unwrap();
/// let report = alice.produce(&bob.target_info().unwrap(), &data).unwrap();
///
/// assert!(bob.verify(&report).is_ok());
/// assert!(alice.verify(&report).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SoftwareReportOracle {
    platform_key: SigningKey,
    identity: TargetInfo,
}

impl SoftwareReportOracle {
    /// Creates an oracle for `identity` on the platform owning `platform_key`.
    #[must_use]
    pub const fn new(platform_key: SigningKey, identity: TargetInfo) -> Self {
        Self {
            platform_key,
            identity,
        }
    }

    /// Creates an oracle on a fresh platform.
    #[must_use]
    pub fn generate(identity: TargetInfo) -> Self {
        Self::new(SigningKey::generate(), identity)
    }

    /// Creates an oracle for another enclave on the same platform.
    #[must_use]
    pub fn sibling(&self, identity: TargetInfo) -> Self {
        Self::new(self.platform_key.clone(), identity)
    }

    /// Returns the identity of this enclave.
    #[must_use]
    pub const fn identity(&self) -> &TargetInfo {
        &self.identity
    }
}

impl ReportOracle for SoftwareReportOracle {
    fn target_info(&self) -> Result<TargetInfo, AssertionError> {
        Ok(self.identity)
    }

    fn produce(
        &self,
        target: &TargetInfo,
        data: &ReportData,
    ) -> Result<HardwareReport, AssertionError> {
        let body = HardwareReport::body_for(&self.identity, target, data);
        let tag = self.platform_key.sign(&body);
        debug!(
            "produced report from {:?} for {:?}",
            self.identity.measurement(),
            target.measurement()
        );
        Ok(HardwareReport::from_parts(self.identity, *target, *data, tag))
    }

    fn verify(&self, report: &HardwareReport) -> Result<(), AssertionError> {
        if report.target() != &self.identity {
            warn!(
                "report from {:?} targets {:?}, not this enclave",
                report.reporter().measurement(),
                report.target()
            );
            return Err(AssertionError::verification(
                "report is addressed to another enclave",
            ));
        }

        self.platform_key
            .verifying_key()
            .verify(&report.body(), report.tag())
            .inspect_err(|e| warn!("report tag rejected: {e}"))
    }
}
