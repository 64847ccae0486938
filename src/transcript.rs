//! Handshake transcript with a late-bound hash algorithm.

use std::fmt;
use std::io::{self, BufRead};

use log::debug;

use crate::error::BindingError;
use crate::hash::{HashAlgorithm, HashInterface};

/// Accumulates handshake bytes and reduces them to a single digest.
///
/// Bytes may be added before the hash algorithm is known. They are buffered
/// until [`set_hasher`](Self::set_hasher) is called, at which point the
/// buffer is replayed into the hasher and all later bytes are hashed
/// directly. The resulting digest is the same as if the algorithm had been
/// known from the start.
///
/// A transcript belongs to a single handshake; concurrent sessions each own
/// their own instance.
///
/// # Examples
///
/// ```
/// use assertion_binding::{HashAlgorithm, Transcript};
///
/// let mut transcript = Transcript::new();
/// transcript.add(b"client hello");
///
/// // The peer's reply selects the algorithm.
/// transcript.set_hasher(HashAlgorithm::Sha256.hasher()).unwrap();
/// transcript.add(b"server hello");
///
/// let digest = transcript.hash().unwrap();
/// assert_eq!(digest, HashAlgorithm::Sha256.digest(b"client helloserver hello"));
/// ```
#[derive(Default)]
pub struct Transcript {
    hasher: Option<Box<dyn HashInterface>>,
    buffer: Vec<u8>,
}

impl Transcript {
    /// Creates an empty transcript with no hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `data` to the transcript.
    pub fn add(&mut self, data: &[u8]) {
        match &mut self.hasher {
            Some(hasher) => hasher.update(data),
            None => self.buffer.extend_from_slice(data),
        }
    }

    /// Drains `reader` chunk by chunk into the transcript.
    ///
    /// Each chunk returned by `fill_buf` is added as if by [`add`](Self::add).
    /// Returns the total number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the reader. Chunks read before the
    /// error remain in the transcript.
    pub fn add_reader<R: BufRead>(&mut self, mut reader: R) -> io::Result<u64> {
        let mut total = 0u64;
        loop {
            let chunk = match reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if chunk.is_empty() {
                return Ok(total);
            }
            let len = chunk.len();
            self.add(chunk);
            reader.consume(len);
            total += len as u64;
        }
    }

    /// Assigns the hash algorithm.
    ///
    /// The hasher is initialized, fed every buffered byte in the order it was
    /// added, and owned by the transcript from then on.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::AlreadyInitialized` if a hasher was already
    /// assigned. The transcript is left unchanged.
    pub fn set_hasher(&mut self, mut hasher: Box<dyn HashInterface>) -> Result<(), BindingError> {
        if self.hasher.is_some() {
            return Err(BindingError::AlreadyInitialized);
        }

        hasher.init();
        hasher.update(&self.buffer);
        debug!(
            "transcript switched to {} after buffering {} bytes",
            hasher.algorithm(),
            self.buffer.len()
        );
        self.buffer = Vec::new();
        self.hasher = Some(hasher);
        Ok(())
    }

    /// Returns the digest of every byte added so far.
    ///
    /// # Errors
    ///
    /// Returns `BindingError::NotInitialized` if no hasher has been assigned.
    pub fn hash(&self) -> Result<Vec<u8>, BindingError> {
        self.hasher
            .as_ref()
            .map(|hasher| hasher.cumulative_hash())
            .ok_or(BindingError::NotInitialized)
    }

    /// Returns true once a hasher has been assigned.
    #[must_use]
    pub fn has_hasher(&self) -> bool {
        self.hasher.is_some()
    }

    /// Returns the assigned algorithm, if any.
    #[must_use]
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        self.hasher.as_ref().map(|hasher| hasher.algorithm())
    }

    /// Returns the number of bytes waiting for a hasher.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl<T: AsRef<[u8]>> Extend<T> for Transcript {
    fn extend<I: IntoIterator<Item = T>>(&mut self, chunks: I) {
        for chunk in chunks {
            self.add(chunk.as_ref());
        }
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("algorithm", &self.algorithm())
            .field("buffered_len", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor, Read};

    use super::*;

    #[test]
    fn hash_before_hasher_fails() {
        let mut transcript = Transcript::new();
        transcript.add(b"data");

        assert_eq!(transcript.hash(), Err(BindingError::NotInitialized));
    }

    #[test]
    fn buffered_bytes_are_replayed() {
        let mut transcript = Transcript::new();
        transcript.add(b"abc");
        transcript.add(b"def");
        assert_eq!(transcript.buffered_len(), 6);

        transcript
            .set_hasher(HashAlgorithm::Sha256.hasher())
            .unwrap();

        assert_eq!(transcript.buffered_len(), 0);
        assert_eq!(
            transcript.hash().unwrap(),
            HashAlgorithm::Sha256.digest(b"abcdef")
        );
    }

    #[test]
    fn bytes_after_hasher_are_hashed_directly() {
        let mut transcript = Transcript::new();
        transcript
            .set_hasher(HashAlgorithm::Sha512.hasher())
            .unwrap();
        transcript.add(b"late");

        assert_eq!(transcript.buffered_len(), 0);
        assert_eq!(
            transcript.hash().unwrap(),
            HashAlgorithm::Sha512.digest(b"late")
        );
    }

    #[test]
    fn empty_transcript_hashes_empty_input() {
        let mut transcript = Transcript::new();
        transcript
            .set_hasher(HashAlgorithm::Sha256.hasher())
            .unwrap();

        assert_eq!(transcript.hash().unwrap(), HashAlgorithm::Sha256.digest(b""));
    }

    #[test]
    fn second_hasher_is_rejected_and_digest_unchanged() {
        let mut transcript = Transcript::new();
        transcript.add(b"payload");
        transcript
            .set_hasher(HashAlgorithm::Sha256.hasher())
            .unwrap();
        let before = transcript.hash().unwrap();

        let result = transcript.set_hasher(HashAlgorithm::Sha384.hasher());

        assert_eq!(result, Err(BindingError::AlreadyInitialized));
        assert_eq!(transcript.algorithm(), Some(HashAlgorithm::Sha256));
        assert_eq!(transcript.hash().unwrap(), before);
    }

    #[test]
    fn repeated_hash_is_stable_until_more_data() {
        let mut transcript = Transcript::new();
        transcript
            .set_hasher(HashAlgorithm::Sha256.hasher())
            .unwrap();
        transcript.add(b"one");
        let first = transcript.hash().unwrap();
        assert_eq!(first, transcript.hash().unwrap());

        transcript.add(b"two");
        let second = transcript.hash().unwrap();
        assert_ne!(first, second);
        assert_eq!(second, HashAlgorithm::Sha256.digest(b"onetwo"));
    }

    #[test]
    fn add_reader_drains_every_chunk() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        // A tiny buffer forces many fill_buf chunks.
        let reader = BufReader::with_capacity(7, Cursor::new(data.clone()));

        let mut transcript = Transcript::new();
        let consumed = transcript.add_reader(reader).unwrap();
        transcript
            .set_hasher(HashAlgorithm::Sha256.hasher())
            .unwrap();

        assert_eq!(consumed, 10_000);
        assert_eq!(transcript.hash().unwrap(), HashAlgorithm::Sha256.digest(&data));
    }

    #[test]
    fn add_reader_exhausts_the_source() {
        let mut reader = Cursor::new(b"streamed".to_vec());
        let mut transcript = Transcript::new();
        transcript.add_reader(&mut reader).unwrap();

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn extend_matches_individual_adds() {
        let chunks: [&[u8]; 4] = [b"al", b"pha", b"", b"bet"];

        let mut extended = Transcript::new();
        extended.extend(chunks);
        extended
            .set_hasher(HashAlgorithm::Sha384.hasher())
            .unwrap();

        let mut added = Transcript::new();
        added
            .set_hasher(HashAlgorithm::Sha384.hasher())
            .unwrap();
        for chunk in chunks {
            added.add(chunk);
        }

        assert_eq!(extended.hash().unwrap(), added.hash().unwrap());
    }

    #[test]
    fn debug_shows_state() {
        let mut transcript = Transcript::new();
        transcript.add(b"12345");
        let output = format!("{transcript:?}");
        assert!(output.contains("buffered_len: 5"));
        assert!(output.contains("algorithm: None"));
    }
}
