//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed algorithm descriptions:
//! - Hash algorithms with OIDs, sizes and OpenSSL digests
//! - AES-CBC content ciphers and AES key wrap algorithms
//! - An explicit name/alias registry for digest resolution

mod cipher;
mod hash;
mod registry;

use der::asn1::ObjectIdentifier;

pub use cipher::{ContentCipher, KeyWrapAlgorithm};
pub use hash::HashAlgorithm;
pub use registry::AlgorithmRegistry;

/// An algorithm name or OID that no known mapping covers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported algorithm: {name}")]
pub struct UnsupportedAlgorithm {
    name: String,
}

impl UnsupportedAlgorithm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Algorithm identifier parameters that could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum AlgorithmParameterError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedAlgorithm),

    #[error("missing algorithm parameters for {0}")]
    Missing(ObjectIdentifier),

    #[error("IV length mismatch (expected {expected}, actual {actual})")]
    IvLength { expected: usize, actual: usize },

    #[error("malformed algorithm parameters: {0}")]
    Asn1(#[from] der::Error),
}
