//! Additional authenticated data (AAD) for enclave assertions.
//!
//! An AAD value is a flat 64-byte blob that scopes a digest of caller data to
//! one protocol and one role within it:
//!
//! ```text
//! [0..32)  SHA-256(data)
//! [32..48) purpose
//! [48..64) uuid
//! ```
//!
//! The layout is a wire contract shared with the peer, so every field is
//! written at a fixed offset.

use std::fmt;
use std::ops::Range;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::{
    AAD_DIGEST_SIZE, AAD_PURPOSE_SIZE, AAD_SIZE, AAD_UUID_SIZE, EKEP_AAD_PURPOSE, EKEP_AAD_UUID,
    GET_PCE_INFO_AAD_PURPOSE, GET_PCE_INFO_AAD_UUID, PCE_SIGN_REPORT_AAD_PURPOSE,
    PCE_SIGN_REPORT_AAD_UUID,
};
use crate::error::BindingError;

const DIGEST_RANGE: Range<usize> = 0..AAD_DIGEST_SIZE;
const PURPOSE_RANGE: Range<usize> = AAD_DIGEST_SIZE..AAD_DIGEST_SIZE + AAD_PURPOSE_SIZE;
const UUID_RANGE: Range<usize> = AAD_DIGEST_SIZE + AAD_PURPOSE_SIZE..AAD_SIZE;

/// A formatted 64-byte AAD value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aad([u8; AAD_SIZE]);

impl Aad {
    /// Wraps raw AAD bytes received from a peer.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; AAD_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the full 64-byte value.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; AAD_SIZE] {
        &self.0
    }

    /// Returns the digest of the bound data.
    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.0[DIGEST_RANGE]
    }

    /// Returns the purpose field.
    #[must_use]
    pub fn purpose(&self) -> &[u8] {
        &self.0[PURPOSE_RANGE]
    }

    /// Returns the UUID field.
    #[must_use]
    pub fn uuid(&self) -> &[u8] {
        &self.0[UUID_RANGE]
    }
}

impl AsRef<[u8]> for Aad {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Aad {
    type Error = BindingError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; AAD_SIZE]>::try_from(bytes).map(Self).map_err(|_| {
            BindingError::invalid_argument(
                "aad",
                format!("expected {AAD_SIZE} bytes, got {}", bytes.len()),
            )
        })
    }
}

impl fmt::Debug for Aad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aad(")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..., purpose={:?})", String::from_utf8_lossy(self.purpose()))
    }
}

/// Generates AAD values for one protocol and purpose.
///
/// Generators are immutable and `Copy`, so one instance can be shared freely
/// between threads.
///
/// # Examples
///
/// ```
/// use assertion_binding::AadGenerator;
///
/// let generator = AadGenerator::new([0u8; 16], [1u8; 16]);
/// let aad = generator.generate(b"");
///
/// assert_eq!(aad.as_bytes().len(), 64);
/// assert_eq!(aad.purpose(), &[1u8; 16]);
/// assert_eq!(aad.uuid(), &[0u8; 16]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AadGenerator {
    uuid: [u8; AAD_UUID_SIZE],
    purpose: [u8; AAD_PURPOSE_SIZE],
}

impl AadGenerator {
    /// Creates a generator from explicit UUID and purpose values.
    #[must_use]
    pub const fn new(uuid: [u8; AAD_UUID_SIZE], purpose: [u8; AAD_PURPOSE_SIZE]) -> Self {
        Self { uuid, purpose }
    }

    /// Creates a generator from byte slices of unchecked length.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::InvalidArgument` unless both slices are exactly
    /// 16 bytes.
    pub fn from_slices(uuid: &[u8], purpose: &[u8]) -> Result<Self, BindingError> {
        let uuid = <[u8; AAD_UUID_SIZE]>::try_from(uuid).map_err(|_| {
            BindingError::invalid_argument(
                "uuid",
                format!("expected {AAD_UUID_SIZE} bytes, got {}", uuid.len()),
            )
        })?;
        let purpose = <[u8; AAD_PURPOSE_SIZE]>::try_from(purpose).map_err(|_| {
            BindingError::invalid_argument(
                "purpose",
                format!("expected {AAD_PURPOSE_SIZE} bytes, got {}", purpose.len()),
            )
        })?;
        Ok(Self::new(uuid, purpose))
    }

    /// Creates a generator for assertions carried by PCE get-info requests.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::Internal` if the built-in UUID cannot be parsed.
    pub fn get_pce_info() -> Result<Self, BindingError> {
        Self::from_constants(GET_PCE_INFO_AAD_UUID, GET_PCE_INFO_AAD_PURPOSE)
    }

    /// Creates a generator for assertions carried by PCE sign-report requests.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::Internal` if the built-in UUID cannot be parsed.
    pub fn pce_sign_report() -> Result<Self, BindingError> {
        Self::from_constants(PCE_SIGN_REPORT_AAD_UUID, PCE_SIGN_REPORT_AAD_PURPOSE)
    }

    /// Creates a generator for enclave key exchange protocol handshakes.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::Internal` if the built-in UUID cannot be parsed.
    pub fn ekep() -> Result<Self, BindingError> {
        Self::from_constants(EKEP_AAD_UUID, EKEP_AAD_PURPOSE)
    }

    fn from_constants(
        uuid: &str,
        purpose: &[u8; AAD_PURPOSE_SIZE],
    ) -> Result<Self, BindingError> {
        let parsed = Uuid::parse_str(uuid).map_err(|e| {
            BindingError::internal(format!("invalid AAD UUID constant '{uuid}': {e}"))
        })?;
        Ok(Self::new(parsed.into_bytes(), *purpose))
    }

    /// Returns the UUID written into generated values.
    #[must_use]
    pub const fn uuid(&self) -> &[u8; AAD_UUID_SIZE] {
        &self.uuid
    }

    /// Returns the purpose written into generated values.
    #[must_use]
    pub const fn purpose(&self) -> &[u8; AAD_PURPOSE_SIZE] {
        &self.purpose
    }

    /// Formats `SHA-256(data) || purpose || uuid`.
    #[must_use]
    pub fn generate(&self, data: &[u8]) -> Aad {
        let mut aad = [0u8; AAD_SIZE];
        aad[DIGEST_RANGE].copy_from_slice(&Sha256::digest(data));
        aad[PURPOSE_RANGE].copy_from_slice(&self.purpose);
        aad[UUID_RANGE].copy_from_slice(&self.uuid);
        Aad(aad)
    }

    /// Returns true if `aad` is exactly what this generator produces for `data`.
    #[must_use]
    pub fn matches(&self, aad: &Aad, data: &[u8]) -> bool {
        self.generate(data) == *aad
    }
}
