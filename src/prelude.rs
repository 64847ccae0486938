//! Convenient re-exports for glob imports.
//!
//! ```rust
//! use assertion_binding::prelude::*;
//!
//! let mut transcript = Transcript::new();
//! transcript.add(b"hello");
//! ```

pub use crate::{
    // Core types
    Aad, AadGenerator, HashAlgorithm, HashInterface, Sha2Hasher, Transcript,
    // Errors
    BindingError,
    // Constants
    AAD_DIGEST_SIZE, AAD_PURPOSE_SIZE, AAD_SIZE, AAD_UUID_SIZE,
};
