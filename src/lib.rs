//! Handshake transcripts and additional authenticated data for enclave
//! assertions.
//!
//! This crate provides the two primitives that bind a handshake to a
//! hardware-rooted assertion:
//!
//! - [`Transcript`] reduces handshake bytes to a single digest, even when the
//!   hash algorithm is only negotiated after the first bytes were seen.
//! - [`AadGenerator`] packs a digest of caller data together with a purpose
//!   and a protocol UUID into a fixed 64-byte [`Aad`] value that hardware
//!   reports and assertion requests accept as opaque user data.
//!
//! # Quick Start
//!
//! ```rust
//! use assertion_binding::{AadGenerator, HashAlgorithm, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.add(b"client hello");
//! transcript.add(b"server hello");
//!
//! // Hash negotiation finished: pick the algorithm now.
//! transcript.set_hasher(HashAlgorithm::Sha256.hasher()).unwrap();
//! let digest = transcript.hash().unwrap();
//!
//! let aad = AadGenerator::ekep().unwrap().generate(&digest);
//! assert_eq!(aad.as_bytes().len(), 64);
//! ```
//!
//! # AAD Layout
//!
//! | Bytes | Content |
//! |-------|---------|
//! | `[0, 32)` | SHA-256 of the bound data |
//! | `[32, 48)` | purpose |
//! | `[48, 64)` | protocol UUID |

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod aad;
mod constants;
mod error;
mod hash;
pub mod prelude;
mod transcript;

pub use aad::{Aad, AadGenerator};
pub use constants::{
    AAD_DIGEST_SIZE, AAD_PURPOSE_SIZE, AAD_SIZE, AAD_UUID_SIZE, EKEP_AAD_PURPOSE, EKEP_AAD_UUID,
    GET_PCE_INFO_AAD_PURPOSE, GET_PCE_INFO_AAD_UUID, PCE_SIGN_REPORT_AAD_PURPOSE,
    PCE_SIGN_REPORT_AAD_UUID,
};
pub use error::BindingError;
pub use hash::{HashAlgorithm, HashInterface, Sha2Hasher};
pub use transcript::Transcript;
