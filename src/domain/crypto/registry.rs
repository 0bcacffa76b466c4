//! Explicit algorithm-name registry.
//!
//! Maps digest names, caller-defined aliases and dotted OIDs to a
//! [`HashAlgorithm`]. A registry value is threaded into every resolution
//! call; there is no process-wide mapping table.

use std::collections::BTreeMap;
use std::str::FromStr;

use der::asn1::ObjectIdentifier;

use super::{HashAlgorithm, UnsupportedAlgorithm};

#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    aliases: BTreeMap<String, HashAlgorithm>,
}

impl AlgorithmRegistry {
    /// Registry that knows only the built-in spellings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` (case-insensitive) for `algorithm`.
    #[must_use]
    pub fn with_alias(mut self, alias: impl AsRef<str>, algorithm: HashAlgorithm) -> Self {
        self.insert_alias(alias, algorithm);
        self
    }

    pub fn insert_alias(&mut self, alias: impl AsRef<str>, algorithm: HashAlgorithm) {
        self.aliases
            .insert(alias.as_ref().trim().to_ascii_lowercase(), algorithm);
    }

    #[must_use]
    pub fn aliases(&self) -> &BTreeMap<String, HashAlgorithm> {
        &self.aliases
    }

    /// Resolve a digest name, alias or dotted OID.
    pub fn resolve_digest(&self, name: &str) -> Result<HashAlgorithm, UnsupportedAlgorithm> {
        let trimmed = name.trim();
        if let Some(alg) = self.aliases.get(&trimmed.to_ascii_lowercase()) {
            return Ok(*alg);
        }
        if let Ok(alg) = HashAlgorithm::from_str(trimmed) {
            return Ok(alg);
        }
        match ObjectIdentifier::new(trimmed) {
            Ok(oid) => HashAlgorithm::from_oid(&oid),
            Err(_) => Err(UnsupportedAlgorithm::new(name)),
        }
    }
}
