//! Pure verification functions.
//!
//! Each function checks one property and has no side effects, so the same
//! inputs always give the same answer.
//!
//! | Function | Property checked |
//! |----------|------------------|
//! | [`check_expiration`] | Current time is strictly less than expiration |
//! | [`validate_issuer`] | Assertion issuer equals the trusted generator |
//! | [`validate_user_data`] | Asserted user data equals the expected bytes |
//! | [`validate_identity`] | Asserted identity equals the expected enclave |
//! | [`check_report_binding`] | Report comes from the expected enclave and carries the expected data |
//! | [`check_report_purpose`] | Report data was generated for the expected purpose |

use assertion_binding::{AAD_DIGEST_SIZE, AadGenerator};
use chrono::{DateTime, Utc};

use crate::error::AssertionError;
use crate::identity::TargetInfo;
use crate::report::{HardwareReport, ReportData};

/// Checks that an assertion has not expired at `now`.
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` if `now >= exp`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use assertion_binding_remote::check_expiration;
///
/// let now = Utc::now();
/// assert!(check_expiration(now + Duration::hours(1), now).is_ok());
/// assert!(check_expiration(now - Duration::hours(1), now).is_err());
/// assert!(check_expiration(now, now).is_err());
/// ```
pub fn check_expiration(exp: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AssertionError> {
    if now < exp {
        Ok(())
    } else {
        Err(AssertionError::verification(format!(
            "assertion expired at {}",
            exp.to_rfc3339()
        )))
    }
}

/// Checks that an assertion was issued by the expected generator.
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` if the issuers differ.
pub fn validate_issuer(expected: &str, issuer: &str) -> Result<(), AssertionError> {
    if expected == issuer {
        Ok(())
    } else {
        Err(AssertionError::verification(format!(
            "issuer '{issuer}' does not match '{expected}'"
        )))
    }
}

/// Checks that an assertion binds exactly the expected user data.
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` if the bytes differ.
///
/// # Examples
///
/// ```
/// use assertion_binding_remote::validate_user_data;
///
/// assert!(validate_user_data(b"nonce", b"nonce").is_ok());
/// assert!(validate_user_data(b"nonce", b"nonce2").is_err());
/// ```
pub fn validate_user_data(expected: &[u8], asserted: &[u8]) -> Result<(), AssertionError> {
    if expected == asserted {
        Ok(())
    } else {
        Err(AssertionError::verification(
            "asserted user data does not match",
        ))
    }
}

/// Checks that an assertion speaks for the expected enclave.
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` if the identities differ.
pub fn validate_identity(
    expected: &TargetInfo,
    asserted: &TargetInfo,
) -> Result<(), AssertionError> {
    if expected == asserted {
        Ok(())
    } else {
        Err(AssertionError::verification(format!(
            "asserted identity {:?} does not match {:?}",
            asserted.measurement(),
            expected.measurement()
        )))
    }
}

/// Checks that an authenticated report comes from `reporter` and carries
/// `data`.
///
/// The report's tag must already have been checked by a
/// [`ReportOracle`](crate::ReportOracle).
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` on either mismatch.
pub fn check_report_binding(
    report: &HardwareReport,
    reporter: &TargetInfo,
    data: &ReportData,
) -> Result<(), AssertionError> {
    if report.reporter() != reporter {
        return Err(AssertionError::verification(format!(
            "report comes from {:?}, expected {:?}",
            report.reporter().measurement(),
            reporter.measurement()
        )));
    }
    if report.data() != data {
        return Err(AssertionError::verification(
            "report data is not bound to this exchange",
        ));
    }
    Ok(())
}

/// Checks that report data carries the purpose and UUID of `generator`.
///
/// Only the trailing purpose and UUID are compared; the digest is opaque
/// without the data it was computed over.
///
/// # Errors
///
/// Returns `AssertionError::VerificationFailure` if either field differs.
///
/// # Examples
///
/// ```
/// use assertion_binding::AadGenerator;
/// use assertion_binding_remote::{ReportData, check_report_purpose};
///
/// let ekep = AadGenerator::ekep().unwrap();
/// let data = ReportData::from(ekep.generate(b"transcript digest"));
///
/// assert!(check_report_purpose(&data, &ekep).is_ok());
/// assert!(check_report_purpose(&data, &AadGenerator::get_pce_info().unwrap()).is_err());
/// ```
pub fn check_report_purpose(
    data: &ReportData,
    generator: &AadGenerator,
) -> Result<(), AssertionError> {
    let tail = &data.as_bytes()[AAD_DIGEST_SIZE..];
    let (purpose, uuid) = tail.split_at(generator.purpose().len());
    if purpose == generator.purpose() && uuid == generator.uuid() {
        Ok(())
    } else {
        Err(AssertionError::verification(
            "report data was generated for another purpose",
        ))
    }
}
