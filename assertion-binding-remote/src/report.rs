//! Hardware reports and the caller data bound into them.

use std::fmt;

use assertion_binding::Aad;
use base64::prelude::*;

use crate::error::AssertionError;
use crate::identity::{TARGET_INFO_SIZE, TargetInfo};
use crate::keys::SIGNATURE_SIZE;

/// Size of the caller data carried by a report.
pub const REPORT_DATA_SIZE: usize = 64;

/// Size of the serialized report body covered by the authentication tag.
pub const REPORT_BODY_SIZE: usize = 2 * TARGET_INFO_SIZE + REPORT_DATA_SIZE;

/// Size of the serialized report.
pub const REPORT_SIZE: usize = REPORT_BODY_SIZE + SIGNATURE_SIZE;

const TARGET_OFFSET: usize = TARGET_INFO_SIZE;
const DATA_OFFSET: usize = TARGET_OFFSET + TARGET_INFO_SIZE;

/// Caller-supplied data bound into a report, usually an [`Aad`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportData([u8; REPORT_DATA_SIZE]);

impl ReportData {
    /// Wraps 64 raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; REPORT_DATA_SIZE]) -> Self {
        Self(bytes)
    }

    /// Places a digest of at most 64 bytes at the start of the report data,
    /// zero-padding the rest.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::InvalidArgument` if `digest` is longer than
    /// 64 bytes.
    pub fn from_digest(digest: &[u8]) -> Result<Self, AssertionError> {
        if digest.len() > REPORT_DATA_SIZE {
            return Err(AssertionError::invalid_argument(
                "report_data",
                format!(
                    "digest is {} bytes, at most {REPORT_DATA_SIZE} fit",
                    digest.len()
                ),
            ));
        }
        let mut bytes = [0u8; REPORT_DATA_SIZE];
        bytes[..digest.len()].copy_from_slice(digest);
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; REPORT_DATA_SIZE] {
        &self.0
    }
}

impl From<Aad> for ReportData {
    fn from(aad: Aad) -> Self {
        Self(*aad.as_bytes())
    }
}

impl fmt::Debug for ReportData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReportData(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...)")
    }
}

/// A report binding caller data to the enclave that produced it.
///
/// The report is addressed at one target enclave, which is the only party
/// able to verify it. The wire form is 256 bytes:
///
/// ```text
/// [0..64)    reporter target info
/// [64..128)  target info
/// [128..192) report data
/// [192..256) authentication tag over [0..192)
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct HardwareReport {
    reporter: TargetInfo,
    target: TargetInfo,
    data: ReportData,
    tag: [u8; SIGNATURE_SIZE],
}

impl HardwareReport {
    /// Assembles a report from its parts.
    ///
    /// Only report oracles should call this; the tag must cover
    /// [`body`](Self::body).
    #[must_use]
    pub const fn from_parts(
        reporter: TargetInfo,
        target: TargetInfo,
        data: ReportData,
        tag: [u8; SIGNATURE_SIZE],
    ) -> Self {
        Self {
            reporter,
            target,
            data,
            tag,
        }
    }

    /// Serializes the portion of a report covered by its tag.
    #[must_use]
    pub fn body_for(
        reporter: &TargetInfo,
        target: &TargetInfo,
        data: &ReportData,
    ) -> [u8; REPORT_BODY_SIZE] {
        let mut body = [0u8; REPORT_BODY_SIZE];
        body[..TARGET_OFFSET].copy_from_slice(&reporter.to_bytes());
        body[TARGET_OFFSET..DATA_OFFSET].copy_from_slice(&target.to_bytes());
        body[DATA_OFFSET..].copy_from_slice(data.as_bytes());
        body
    }

    /// Serializes the portion of this report covered by its tag.
    #[must_use]
    pub fn body(&self) -> [u8; REPORT_BODY_SIZE] {
        Self::body_for(&self.reporter, &self.target, &self.data)
    }

    /// Returns the identity of the enclave that produced the report.
    #[must_use]
    pub const fn reporter(&self) -> &TargetInfo {
        &self.reporter
    }

    /// Returns the identity of the enclave the report is addressed to.
    #[must_use]
    pub const fn target(&self) -> &TargetInfo {
        &self.target
    }

    /// Returns the bound caller data.
    #[must_use]
    pub const fn data(&self) -> &ReportData {
        &self.data
    }

    /// Returns the authentication tag.
    #[must_use]
    pub const fn tag(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.tag
    }

    /// Encodes the 256-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(REPORT_SIZE);
        bytes.extend_from_slice(&self.body());
        bytes.extend_from_slice(&self.tag);
        bytes
    }

    /// Decodes the 256-byte wire form.
    ///
    /// Decoding checks structure only; use a
    /// [`ReportOracle`](crate::ReportOracle) to check the tag.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::DecodingError` if `bytes` has the wrong
    /// length or embeds malformed target info.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssertionError> {
        if bytes.len() != REPORT_SIZE {
            return Err(AssertionError::decoding(format!(
                "report is {} bytes, expected {REPORT_SIZE}",
                bytes.len()
            )));
        }

        let reporter = TargetInfo::from_bytes(&bytes[..TARGET_OFFSET])?;
        let target = TargetInfo::from_bytes(&bytes[TARGET_OFFSET..DATA_OFFSET])?;
        let mut data = [0u8; REPORT_DATA_SIZE];
        data.copy_from_slice(&bytes[DATA_OFFSET..REPORT_BODY_SIZE]);
        let mut tag = [0u8; SIGNATURE_SIZE];
        tag.copy_from_slice(&bytes[REPORT_BODY_SIZE..]);

        Ok(Self {
            reporter,
            target,
            data: ReportData(data),
            tag,
        })
    }

    /// Encodes the wire form as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.to_bytes())
    }

    /// Decodes a report from standard base64.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::DecodingError` if the text is not base64 or
    /// the bytes are not a valid wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, AssertionError> {
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| AssertionError::decoding(format!("report is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for HardwareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareReport")
            .field("reporter", &self.reporter.measurement())
            .field("target", &self.target.measurement())
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
