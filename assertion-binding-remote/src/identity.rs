//! Enclave identities and the target info that addresses reports at them.

use std::fmt;

use base64::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::AssertionError;

/// Size of an enclave measurement.
pub const MEASUREMENT_SIZE: usize = 32;

/// Size of the wire form of a [`TargetInfo`].
pub const TARGET_INFO_SIZE: usize = 64;

const ATTRIBUTES_OFFSET: usize = MEASUREMENT_SIZE;
const RESERVED_OFFSET: usize = ATTRIBUTES_OFFSET + 8;

/// Hash of the code and initial data an enclave was loaded with.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Measurement([u8; MEASUREMENT_SIZE]);

impl Measurement {
    /// Creates a measurement from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MEASUREMENT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Measures an enclave image as `SHA256(image)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use assertion_binding_remote::Measurement;
    ///
    /// let a = Measurement::of_image(b"enclave v1");
    /// let b = Measurement::of_image(b"enclave v2");
    /// assert_ne!(a, b);
    /// ```
    #[must_use]
    pub fn of_image(image: &[u8]) -> Self {
        Self(Sha256::digest(image).into())
    }

    /// Returns the measurement bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MEASUREMENT_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Measurement(")?;
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...)")
    }
}

/// Identifies one enclave instance so that reports can be addressed at it.
///
/// The wire form is 64 bytes:
///
/// ```text
/// [0..32)  measurement
/// [32..40) attributes, little endian
/// [40..64) reserved, must be zero
/// ```
///
/// Over JSON and other text transports the wire form travels as standard
/// base64.
///
/// # Examples
///
/// ```
/// use assertion_binding_remote::{Measurement, TargetInfo};
///
/// let target = TargetInfo::new(Measurement::of_image(b"enclave"), 0x5);
/// let encoded = target.to_base64();
///
/// assert_eq!(TargetInfo::from_base64(&encoded).unwrap(), target);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetInfo {
    measurement: Measurement,
    attributes: u64,
}

impl TargetInfo {
    /// Creates target info for an enclave.
    #[must_use]
    pub const fn new(measurement: Measurement, attributes: u64) -> Self {
        Self {
            measurement,
            attributes,
        }
    }

    /// Returns the enclave measurement.
    #[must_use]
    pub const fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// Returns the enclave attribute flags.
    #[must_use]
    pub const fn attributes(&self) -> u64 {
        self.attributes
    }

    /// Encodes the 64-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; TARGET_INFO_SIZE] {
        let mut bytes = [0u8; TARGET_INFO_SIZE];
        bytes[..ATTRIBUTES_OFFSET].copy_from_slice(self.measurement.as_bytes());
        bytes[ATTRIBUTES_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.attributes.to_le_bytes());
        bytes
    }

    /// Decodes the 64-byte wire form.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::DecodingError` if `bytes` has the wrong
    /// length or the reserved bytes are not zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssertionError> {
        let bytes = <&[u8; TARGET_INFO_SIZE]>::try_from(bytes).map_err(|_| {
            AssertionError::decoding(format!(
                "target info is {} bytes, expected {TARGET_INFO_SIZE}",
                bytes.len()
            ))
        })?;

        if bytes[RESERVED_OFFSET..].iter().any(|&b| b != 0) {
            return Err(AssertionError::decoding(
                "target info reserved bytes are not zero",
            ));
        }

        let mut measurement = [0u8; MEASUREMENT_SIZE];
        measurement.copy_from_slice(&bytes[..ATTRIBUTES_OFFSET]);
        let mut attributes = [0u8; 8];
        attributes.copy_from_slice(&bytes[ATTRIBUTES_OFFSET..RESERVED_OFFSET]);

        Ok(Self {
            measurement: Measurement(measurement),
            attributes: u64::from_le_bytes(attributes),
        })
    }

    /// Encodes the wire form as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.to_bytes())
    }

    /// Decodes target info from standard base64.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::DecodingError` if the text is not base64 or
    /// the decoded bytes are not a valid wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, AssertionError> {
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| AssertionError::decoding(format!("target info is not base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for TargetInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for TargetInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
