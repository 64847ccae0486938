//! Ed25519 keys for report tags and remote assertions.

use ed25519_dalek::{
    Signature, Signer, SigningKey as DalekSigningKey, VerifyingKey as DalekVerifyingKey,
};

use crate::error::AssertionError;

/// Size of a signature produced by [`SigningKey::sign`].
pub const SIGNATURE_SIZE: usize = 64;

/// A signing key held by a platform or an assertion generator.
///
/// # Example
///
/// ```
/// use assertion_binding_remote::SigningKey;
///
/// let signing_key = SigningKey::generate();
/// let signature = signing_key.sign(b"report body");
///
/// assert!(signing_key.verifying_key().verify(b"report body", &signature).is_ok());
/// ```
#[derive(Clone)]
pub struct SigningKey {
    inner: DalekSigningKey,
}

impl SigningKey {
    /// Creates a new random signing key.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            inner: DalekSigningKey::generate(&mut rng),
        }
    }

    /// Creates a signing key from its 32-byte seed.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: DalekSigningKey::from_bytes(bytes),
        }
    }

    /// Returns the raw seed bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Returns the corresponding verifying (public) key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Signs `message`.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.inner.sign(message).to_bytes()
    }

    /// Returns a reference to the inner dalek signing key.
    pub(crate) fn as_dalek(&self) -> &DalekSigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.verifying_key())
            .finish_non_exhaustive()
    }
}

/// A verifying key for report tags and remote assertions.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: DalekVerifyingKey,
}

impl VerifyingKey {
    /// Creates a verifying key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::DecodingError` if the bytes are not a valid
    /// Ed25519 public key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, AssertionError> {
        DalekVerifyingKey::from_bytes(bytes)
            .map(|inner| Self { inner })
            .map_err(|e| AssertionError::decoding(format!("invalid verifying key: {e}")))
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Checks `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns `AssertionError::VerificationFailure` if the signature does
    /// not verify under this key.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), AssertionError> {
        let signature = Signature::from_bytes(signature);
        self.inner
            .verify_strict(message, &signature)
            .map_err(|e| AssertionError::verification(format!("invalid signature: {e}")))
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 4 bytes are enough to tell keys apart in logs
        let bytes = self.to_bytes();
        write!(
            f,
            "VerifyingKey({:02x}{:02x}{:02x}{:02x}...)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_key_generates_unique_keys() {
        let key1 = SigningKey::generate();
        let key2 = SigningKey::generate();

        assert_ne!(key1.to_bytes(), key2.to_bytes());
    }

    #[test]
    fn signing_key_roundtrip_bytes() {
        let original = SigningKey::generate();
        let recovered = SigningKey::from_bytes(&original.to_bytes());

        assert_eq!(original.verifying_key(), recovered.verifying_key());
    }

    #[test]
    fn verifying_key_roundtrip_bytes() {
        let verifying_key = SigningKey::generate().verifying_key();
        let recovered = VerifyingKey::from_bytes(&verifying_key.to_bytes()).unwrap();

        assert_eq!(verifying_key, recovered);
    }

    #[test]
    fn signature_verifies_only_for_same_message() {
        let key = SigningKey::generate();
        let signature = key.sign(b"message");

        assert!(key.verifying_key().verify(b"message", &signature).is_ok());
        assert!(matches!(
            key.verifying_key().verify(b"other", &signature),
            Err(AssertionError::VerificationFailure { .. })
        ));
    }

    #[test]
    fn signature_rejected_by_other_key() {
        let signature = SigningKey::generate().sign(b"message");
        let other = SigningKey::generate().verifying_key();

        assert!(other.verify(b"message", &signature).is_err());
    }

    #[test]
    fn flipped_signature_bit_is_rejected() {
        let key = SigningKey::generate();
        let mut signature = key.sign(b"message");
        signature[40] ^= 0x01;

        assert!(key.verifying_key().verify(b"message", &signature).is_err());
    }

    #[test]
    fn verifying_key_debug_shows_partial_bytes() {
        let verifying_key = SigningKey::generate().verifying_key();
        let debug_output = format!("{verifying_key:?}");

        assert!(debug_output.contains("VerifyingKey("));
        assert!(debug_output.contains("..."));
    }
}
