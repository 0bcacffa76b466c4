//! Digest calculators.
//!
//! [`PrecomputedDigest`] hands back a digest computed earlier.
//! [`BufferDigestCalculator`] resolves its algorithm on every call and
//! recomputes over the held buffer; nothing derived is cached.

use std::fmt;

use crate::adapters::primitives::Provider;
use crate::domain::crypto::{AlgorithmRegistry, HashAlgorithm};
use crate::infra::error::{CmsResult, ProtocolError};

pub trait DigestCalculator {
    /// A fresh copy of the digest value.
    fn digest(&self) -> CmsResult<Vec<u8>>;
}

/// A digest computed elsewhere, e.g. over an inner signature value.
#[derive(Clone, PartialEq, Eq)]
pub struct PrecomputedDigest {
    digest: Vec<u8>,
}

impl PrecomputedDigest {
    pub fn new(digest: impl Into<Vec<u8>>) -> Self {
        Self {
            digest: digest.into(),
        }
    }
}

impl fmt::Debug for PrecomputedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrecomputedDigest({})", hex::encode(&self.digest))
    }
}

impl DigestCalculator for PrecomputedDigest {
    fn digest(&self) -> CmsResult<Vec<u8>> {
        Ok(self.digest.clone())
    }
}

/// Digest over an owned buffer with a named algorithm and provider.
#[derive(Debug, Clone)]
pub struct BufferDigestCalculator {
    algorithm: String,
    registry: AlgorithmRegistry,
    provider: Provider,
    data: Vec<u8>,
}

impl BufferDigestCalculator {
    pub fn new(algorithm: impl Into<String>, provider: Provider, data: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            registry: AlgorithmRegistry::new(),
            provider,
            data: data.into(),
        }
    }

    /// Resolve names through `registry` instead of the built-in spellings
    /// only.
    #[must_use]
    pub fn with_registry(mut self, registry: AlgorithmRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn algorithm_name(&self) -> &str {
        &self.algorithm
    }

    fn resolve(&self) -> Result<HashAlgorithm, ProtocolError> {
        self.registry.resolve_digest(&self.algorithm).map_err(|e| {
            ProtocolError::with_cause(
                format!("cannot resolve digest algorithm {}", self.algorithm),
                e,
            )
        })
    }
}

impl DigestCalculator for BufferDigestCalculator {
    fn digest(&self) -> CmsResult<Vec<u8>> {
        let algorithm = self.resolve()?;
        let digest = self
            .provider
            .primitives()
            .hash(algorithm, &self.data)
            .map_err(|e| {
                ProtocolError::with_cause(
                    format!(
                        "{algorithm} digest unavailable from the {} provider",
                        self.provider
                    ),
                    e,
                )
            })?;
        log::debug!(
            "Computed {algorithm} digest over {} bytes with {}",
            self.data.len(),
            self.provider
        );
        Ok(digest)
    }
}
