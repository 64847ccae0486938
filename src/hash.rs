//! Streaming hash capability consumed by [`Transcript`](crate::Transcript).

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::BindingError;

/// A streaming, resettable cryptographic hash.
///
/// A transcript depends only on this capability set, never on a concrete
/// algorithm, so the algorithm can be chosen after data starts arriving.
pub trait HashInterface: Send {
    /// Returns the algorithm this hasher implements.
    fn algorithm(&self) -> HashAlgorithm;

    /// Returns the digest size in bytes.
    fn digest_size(&self) -> usize {
        self.algorithm().digest_size()
    }

    /// Resets the hasher to its initial state.
    fn init(&mut self);

    /// Absorbs `data` into the running hash.
    fn update(&mut self, data: &[u8]);

    /// Returns the digest of everything absorbed since the last `init`.
    ///
    /// The running state is left untouched, so more data may follow.
    fn cumulative_hash(&self) -> Vec<u8>;
}

/// Hash algorithms available for transcripts.
///
/// # Examples
///
/// ```
/// use assertion_binding::HashAlgorithm;
///
/// let alg: HashAlgorithm = "SHA384".parse().unwrap();
/// assert_eq!(alg, HashAlgorithm::Sha384);
/// assert_eq!(alg.digest_size(), 48);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// All supported algorithms, strongest last.
    pub const ALL: [Self; 3] = [Self::Sha256, Self::Sha384, Self::Sha512];

    /// Returns the canonical name of the algorithm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Returns the digest size in bytes.
    #[must_use]
    pub const fn digest_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the single-byte identifier used in handshake messages.
    #[must_use]
    pub const fn wire_id(self) -> u8 {
        match self {
            Self::Sha256 => 1,
            Self::Sha384 => 2,
            Self::Sha512 => 3,
        }
    }

    /// Looks up an algorithm by its handshake identifier.
    #[must_use]
    pub const fn from_wire_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Sha256),
            2 => Some(Self::Sha384),
            3 => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Creates a fresh hasher for this algorithm.
    #[must_use]
    pub fn hasher(self) -> Box<dyn HashInterface> {
        Box::new(Sha2Hasher::new(self))
    }

    /// Hashes `data` in one shot.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                BindingError::invalid_argument("hash_algorithm", format!("unknown algorithm '{s}'"))
            })
    }
}

#[derive(Clone)]
enum Sha2Context {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Sha2Context {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Self::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }
}

/// [`HashInterface`] backed by the `sha2` crate.
///
/// # Examples
///
/// ```
/// use assertion_binding::{HashAlgorithm, HashInterface, Sha2Hasher};
///
/// let mut hasher = Sha2Hasher::new(HashAlgorithm::Sha256);
/// hasher.update(b"hello ");
/// hasher.update(b"world");
/// assert_eq!(hasher.cumulative_hash(), HashAlgorithm::Sha256.digest(b"hello world"));
/// ```
#[derive(Clone)]
pub struct Sha2Hasher {
    algorithm: HashAlgorithm,
    context: Sha2Context,
}

impl Sha2Hasher {
    /// Creates a hasher for `algorithm`.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            context: Sha2Context::new(algorithm),
        }
    }
}

impl fmt::Debug for Sha2Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sha2Hasher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl HashInterface for Sha2Hasher {
    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn init(&mut self) {
        self.context = Sha2Context::new(self.algorithm);
    }

    fn update(&mut self, data: &[u8]) {
        match &mut self.context {
            Sha2Context::Sha256(ctx) => ctx.update(data),
            Sha2Context::Sha384(ctx) => ctx.update(data),
            Sha2Context::Sha512(ctx) => ctx.update(data),
        }
    }

    fn cumulative_hash(&self) -> Vec<u8> {
        match &self.context {
            Sha2Context::Sha256(ctx) => ctx.clone().finalize().to_vec(),
            Sha2Context::Sha384(ctx) => ctx.clone().finalize().to_vec(),
            Sha2Context::Sha512(ctx) => ctx.clone().finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sizes_match_output() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(alg.digest(b"abc").len(), alg.digest_size());
        }
    }

    #[test]
    fn sha256_known_vector() {
        let digest = HashAlgorithm::Sha256.digest(b"abc");
        assert_eq!(
            digest[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "SHA-256(\"abc\") starts with ba7816bf"
        );
    }

    #[test]
    fn cumulative_hash_does_not_consume_state() {
        let mut hasher = Sha2Hasher::new(HashAlgorithm::Sha384);
        hasher.update(b"part one");
        let first = hasher.cumulative_hash();
        assert_eq!(first, hasher.cumulative_hash());

        hasher.update(b" and two");
        assert_eq!(
            hasher.cumulative_hash(),
            HashAlgorithm::Sha384.digest(b"part one and two")
        );
    }

    #[test]
    fn init_resets_state() {
        let mut hasher = Sha2Hasher::new(HashAlgorithm::Sha512);
        hasher.update(b"discarded");
        hasher.init();
        assert_eq!(hasher.cumulative_hash(), HashAlgorithm::Sha512.digest(b""));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
    }

    #[test]
    fn parse_rejects_unknown() {
        let result = "md5".parse::<HashAlgorithm>();
        assert!(matches!(
            result,
            Err(BindingError::InvalidArgument {
                field: "hash_algorithm",
                ..
            })
        ));
    }

    #[test]
    fn wire_ids_roundtrip() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_wire_id(alg.wire_id()), Some(alg));
        }
        assert_eq!(HashAlgorithm::from_wire_id(0), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&HashAlgorithm::ALL).unwrap();
        assert_eq!(json, r#"["SHA256","SHA384","SHA512"]"#);

        let parsed: Vec<HashAlgorithm> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, HashAlgorithm::ALL.to_vec());
        assert!(serde_json::from_str::<HashAlgorithm>(r#""MD5""#).is_err());
    }

    #[test]
    fn boxed_hasher_reports_algorithm() {
        let hasher = HashAlgorithm::Sha384.hasher();
        assert_eq!(hasher.algorithm(), HashAlgorithm::Sha384);
        assert_eq!(hasher.digest_size(), 48);
    }
}
