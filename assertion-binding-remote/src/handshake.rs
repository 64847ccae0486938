//! Messages and binding for the mutually attested handshake.
//!
//! Both peers hash the two hello messages into a [`Transcript`] before the
//! hash algorithm is known, then bind the negotiated digest into their
//! reports through the EKEP [`AadGenerator`]:
//!
//! ```text
//! client                                    server
//!   | ClientHello { target, nonce, algs } ---> |
//!   | <--- ServerHello { target, nonce, alg }  |
//!   | <--- server report (data = AAD)          |
//!   | client report (data = AAD) ------------> |
//! ```

use assertion_binding::{Aad, AadGenerator, HashAlgorithm, Transcript};
use log::debug;

use crate::error::AssertionError;
use crate::identity::TargetInfo;

/// Size of a handshake nonce.
pub const NONCE_SIZE: usize = 32;

const CLIENT_HELLO_TAG: u8 = 0x01;
const SERVER_HELLO_TAG: u8 = 0x02;

/// First handshake message, sent by the connecting enclave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Identity of the client enclave
    pub target_info: TargetInfo,
    /// Fresh client randomness
    pub nonce: [u8; NONCE_SIZE],
    /// Hash algorithms the client accepts, in preference order
    pub hash_algorithms: Vec<HashAlgorithm>,
}

impl ClientHello {
    /// Creates a hello with a fresh random nonce.
    #[must_use]
    pub fn new(target_info: TargetInfo, hash_algorithms: Vec<HashAlgorithm>) -> Self {
        Self {
            target_info,
            nonce: rand::random(),
            hash_algorithms,
        }
    }

    /// Encodes the message as it enters the transcript.
    ///
    /// Layout: tag, target info, nonce, algorithm count, algorithm ids.
    /// Peers reject lists that repeat an algorithm, so the count fits a byte.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 64 + NONCE_SIZE + 1 + self.hash_algorithms.len());
        bytes.push(CLIENT_HELLO_TAG);
        bytes.extend_from_slice(&self.target_info.to_bytes());
        bytes.extend_from_slice(&self.nonce);
        bytes.push(u8::try_from(self.hash_algorithms.len()).unwrap_or(u8::MAX));
        bytes.extend(self.hash_algorithms.iter().map(|alg| alg.wire_id()));
        bytes
    }
}

/// Second handshake message, sent by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// Identity of the generator enclave
    pub target_info: TargetInfo,
    /// Fresh server randomness
    pub nonce: [u8; NONCE_SIZE],
    /// Negotiated transcript hash algorithm
    pub hash_algorithm: HashAlgorithm,
}

impl ServerHello {
    /// Creates a hello with a fresh random nonce.
    #[must_use]
    pub fn new(target_info: TargetInfo, hash_algorithm: HashAlgorithm) -> Self {
        Self {
            target_info,
            nonce: rand::random(),
            hash_algorithm,
        }
    }

    /// Encodes the message as it enters the transcript.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 64 + NONCE_SIZE + 1);
        bytes.push(SERVER_HELLO_TAG);
        bytes.extend_from_slice(&self.target_info.to_bytes());
        bytes.extend_from_slice(&self.nonce);
        bytes.push(self.hash_algorithm.wire_id());
        bytes
    }
}

/// Picks the first algorithm in `preferred` that also appears in `offered`.
///
/// # Errors
///
/// Returns `AssertionError::Transport` if the lists share no algorithm.
///
/// # Examples
///
/// ```
/// use assertion_binding::HashAlgorithm;
/// use assertion_binding_remote::select_hash_algorithm;
///
/// let chosen = select_hash_algorithm(
///     &[HashAlgorithm::Sha512, HashAlgorithm::Sha256],
///     &[HashAlgorithm::Sha256, HashAlgorithm::Sha512],
/// ).unwrap();
/// assert_eq!(chosen, HashAlgorithm::Sha512);
///
/// assert!(select_hash_algorithm(&[HashAlgorithm::Sha384], &[HashAlgorithm::Sha256]).is_err());
/// ```
pub fn select_hash_algorithm(
    preferred: &[HashAlgorithm],
    offered: &[HashAlgorithm],
) -> Result<HashAlgorithm, AssertionError> {
    preferred
        .iter()
        .copied()
        .find(|alg| offered.contains(alg))
        .ok_or_else(|| AssertionError::transport("no common transcript hash algorithm"))
}

/// Computes the AAD both peers bind into their handshake reports.
///
/// The hellos are added to a transcript before the negotiated hasher is
/// assigned, exactly as a peer does when it has to read the server's choice
/// off the wire.
///
/// # Errors
///
/// Returns `AssertionError::Internal` if the EKEP constants cannot be
/// resolved.
pub fn binding_aad(client: &ClientHello, server: &ServerHello) -> Result<Aad, AssertionError> {
    let mut transcript = Transcript::new();
    transcript.add(&client.encode());
    transcript.add(&server.encode());
    transcript.set_hasher(server.hash_algorithm.hasher())?;
    let digest = transcript.hash()?;

    debug!(
        "handshake transcript bound with {} ({} bytes)",
        server.hash_algorithm,
        digest.len()
    );
    Ok(AadGenerator::ekep()?.generate(&digest))
}

#[cfg(test)]
mod tests {
    use assertion_binding::EKEP_AAD_PURPOSE;

    use super::*;
    use crate::identity::Measurement;

    fn hellos() -> (ClientHello, ServerHello) {
        let client = ClientHello::new(
            TargetInfo::new(Measurement::of_image(b"client"), 0),
            HashAlgorithm::ALL.to_vec(),
        );
        let server = ServerHello::new(
            TargetInfo::new(Measurement::of_image(b"server"), 0),
            HashAlgorithm::Sha384,
        );
        (client, server)
    }

    #[test]
    fn selection_follows_server_preference() {
        let chosen = select_hash_algorithm(
            &[HashAlgorithm::Sha384, HashAlgorithm::Sha256],
            &HashAlgorithm::ALL,
        )
        .unwrap();
        assert_eq!(chosen, HashAlgorithm::Sha384);
    }

    #[test]
    fn selection_without_overlap_is_transport_error() {
        let result = select_hash_algorithm(&[HashAlgorithm::Sha512], &[HashAlgorithm::Sha256]);
        assert!(matches!(result, Err(AssertionError::Transport { .. })));
    }

    #[test]
    fn selection_with_empty_offer_fails() {
        assert!(select_hash_algorithm(&HashAlgorithm::ALL, &[]).is_err());
    }

    #[test]
    fn hellos_encode_deterministically() {
        let (client, server) = hellos();
        assert_eq!(client.encode(), client.clone().encode());
        assert_eq!(client.encode().len(), 1 + 64 + NONCE_SIZE + 1 + 3);
        assert_eq!(server.encode().len(), 1 + 64 + NONCE_SIZE + 1);
        assert_eq!(server.encode()[0], SERVER_HELLO_TAG);
    }

    #[test]
    fn fresh_hellos_use_fresh_nonces() {
        let (a, _) = hellos();
        let (b, _) = hellos();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn binding_matches_direct_hash() {
        let (client, server) = hellos();
        let aad = binding_aad(&client, &server).unwrap();

        let mut data = client.encode();
        data.extend_from_slice(&server.encode());
        let digest = HashAlgorithm::Sha384.digest(&data);

        assert_eq!(aad, AadGenerator::ekep().unwrap().generate(&digest));
        assert_eq!(aad.purpose(), EKEP_AAD_PURPOSE);
    }

    #[test]
    fn binding_depends_on_both_nonces() {
        let (client, server) = hellos();
        let original = binding_aad(&client, &server).unwrap();

        let mut other_client = client.clone();
        other_client.nonce[0] ^= 1;
        assert_ne!(binding_aad(&other_client, &server).unwrap(), original);

        let mut other_server = server;
        other_server.nonce[0] ^= 1;
        assert_ne!(binding_aad(&client, &other_server).unwrap(), original);
    }
}
