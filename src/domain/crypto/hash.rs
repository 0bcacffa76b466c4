//! Hash algorithm domain type.
//!
//! Provides the `HashAlgorithm` enumeration used for content digests,
//! PBKDF2 pseudo random functions and signature digests. Each variant maps
//! to its object identifier, its canonical CMS name and the OpenSSL digest.

use std::fmt;
use std::str::FromStr;

use der::asn1::ObjectIdentifier;
use openssl::hash::MessageDigest;
use spki::AlgorithmIdentifierOwned;

use super::UnsupportedAlgorithm;
use crate::domain::constants;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
    ];

    /// Canonical name, e.g. `SHA-256`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => constants::ID_SHA1,
            HashAlgorithm::Sha256 => constants::ID_SHA256,
            HashAlgorithm::Sha384 => constants::ID_SHA384,
            HashAlgorithm::Sha512 => constants::ID_SHA512,
        }
    }

    /// HMAC pseudo random function OID for PBKDF2.
    #[must_use]
    pub fn hmac_oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => constants::ID_HMAC_WITH_SHA1,
            HashAlgorithm::Sha256 => constants::ID_HMAC_WITH_SHA256,
            HashAlgorithm::Sha384 => constants::ID_HMAC_WITH_SHA384,
            HashAlgorithm::Sha512 => constants::ID_HMAC_WITH_SHA512,
        }
    }

    #[must_use]
    pub fn message_digest(&self) -> MessageDigest {
        match self {
            HashAlgorithm::Sha1 => MessageDigest::sha1(),
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha384 => MessageDigest::sha384(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    /// Digest algorithm identifier with absent parameters (RFC 5754).
    #[must_use]
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.oid() == *oid)
            .ok_or_else(|| UnsupportedAlgorithm::new(oid.to_string()))
    }

    pub fn from_hmac_oid(oid: &ObjectIdentifier) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.hmac_oid() == *oid)
            .ok_or_else(|| UnsupportedAlgorithm::new(oid.to_string()))
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnsupportedAlgorithm;

    /// Accepts `SHA-256`, `SHA256` and `sha256` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(UnsupportedAlgorithm::new(s)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_properties() {
        assert_eq!(HashAlgorithm::Sha256.as_str(), "SHA-256");
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest_size(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
        assert_eq!(HashAlgorithm::Sha1.digest_size(), 20);
    }

    #[test]
    fn test_parse_spellings() {
        for name in ["SHA-256", "sha256", "SHA256", "sha_256"] {
            assert_eq!(name.parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        }
        assert!("MD5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_oid_round_trip() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_oid(&alg.oid()).unwrap(), alg);
            assert_eq!(HashAlgorithm::from_hmac_oid(&alg.hmac_oid()).unwrap(), alg);
        }
        assert!(HashAlgorithm::from_oid(&constants::ID_DATA).is_err());
    }
}
