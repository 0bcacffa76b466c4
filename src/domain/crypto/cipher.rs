//! Content encryption and key wrap algorithm types.

use std::fmt;
use std::str::FromStr;

use der::asn1::{ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode};
use openssl::symm::Cipher;
use spki::AlgorithmIdentifierOwned;

use super::{AlgorithmParameterError, UnsupportedAlgorithm};
use crate::domain::constants;

/// AES-CBC content encryption algorithms.
///
/// The algorithm identifier carries the IV as an OCTET STRING parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl ContentCipher {
    pub const ALL: [ContentCipher; 3] = [
        ContentCipher::Aes128Cbc,
        ContentCipher::Aes192Cbc,
        ContentCipher::Aes256Cbc,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCipher::Aes128Cbc => "AES-128-CBC",
            ContentCipher::Aes192Cbc => "AES-192-CBC",
            ContentCipher::Aes256Cbc => "AES-256-CBC",
        }
    }

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            ContentCipher::Aes128Cbc => constants::ID_AES128_CBC,
            ContentCipher::Aes192Cbc => constants::ID_AES192_CBC,
            ContentCipher::Aes256Cbc => constants::ID_AES256_CBC,
        }
    }

    #[must_use]
    pub fn key_size(&self) -> usize {
        match self {
            ContentCipher::Aes128Cbc => 16,
            ContentCipher::Aes192Cbc => 24,
            ContentCipher::Aes256Cbc => 32,
        }
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        constants::AES_BLOCK_SIZE
    }

    #[must_use]
    pub fn openssl_cipher(&self) -> Cipher {
        match self {
            ContentCipher::Aes128Cbc => Cipher::aes_128_cbc(),
            ContentCipher::Aes192Cbc => Cipher::aes_192_cbc(),
            ContentCipher::Aes256Cbc => Cipher::aes_256_cbc(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|c| c.oid() == *oid)
            .ok_or_else(|| UnsupportedAlgorithm::new(oid.to_string()))
    }

    /// Resolve the cipher and IV carried by an algorithm identifier.
    pub fn from_algorithm_identifier(
        alg: &AlgorithmIdentifierOwned,
    ) -> Result<(Self, Vec<u8>), AlgorithmParameterError> {
        let cipher = Self::from_oid(&alg.oid)?;
        let params = alg
            .parameters
            .as_ref()
            .ok_or(AlgorithmParameterError::Missing(alg.oid))?;
        let iv = OctetString::from_der(&params.to_der()?)?;
        let iv = iv.as_bytes().to_vec();
        if iv.len() != cipher.block_size() {
            return Err(AlgorithmParameterError::IvLength {
                expected: cipher.block_size(),
                actual: iv.len(),
            });
        }
        Ok((cipher, iv))
    }

    /// Algorithm identifier carrying `iv` as parameter.
    pub fn algorithm_identifier(
        &self,
        iv: &[u8],
    ) -> Result<AlgorithmIdentifierOwned, AlgorithmParameterError> {
        if iv.len() != self.block_size() {
            return Err(AlgorithmParameterError::IvLength {
                expected: self.block_size(),
                actual: iv.len(),
            });
        }
        let octets = OctetString::new(iv.to_vec())?;
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(Any::from_der(&octets.to_der()?)?),
        })
    }

    /// Key-size matched cipher, used by RFC 3211 key encryption.
    pub fn for_key_size(key_size: usize) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|c| c.key_size() == key_size)
            .ok_or_else(|| UnsupportedAlgorithm::new(format!("AES-CBC with {key_size}-byte key")))
    }
}

impl FromStr for ContentCipher {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnsupportedAlgorithm::new(s))
    }
}

impl fmt::Display for ContentCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AES key wrap algorithms (RFC 3394), parameters absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyWrapAlgorithm {
    Aes128,
    Aes192,
    Aes256,
}

impl KeyWrapAlgorithm {
    pub const ALL: [KeyWrapAlgorithm; 3] = [
        KeyWrapAlgorithm::Aes128,
        KeyWrapAlgorithm::Aes192,
        KeyWrapAlgorithm::Aes256,
    ];

    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            KeyWrapAlgorithm::Aes128 => constants::ID_AES128_WRAP,
            KeyWrapAlgorithm::Aes192 => constants::ID_AES192_WRAP,
            KeyWrapAlgorithm::Aes256 => constants::ID_AES256_WRAP,
        }
    }

    #[must_use]
    pub fn key_size(&self) -> usize {
        match self {
            KeyWrapAlgorithm::Aes128 => 16,
            KeyWrapAlgorithm::Aes192 => 24,
            KeyWrapAlgorithm::Aes256 => 32,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|w| w.oid() == *oid)
            .ok_or_else(|| UnsupportedAlgorithm::new(oid.to_string()))
    }

    /// Wrap algorithm matching a key-encryption key length.
    pub fn for_key_size(key_size: usize) -> Result<Self, UnsupportedAlgorithm> {
        Self::ALL
            .into_iter()
            .find(|w| w.key_size() == key_size)
            .ok_or_else(|| UnsupportedAlgorithm::new(format!("AES key wrap with {key_size}-byte key")))
    }

    #[must_use]
    pub fn algorithm_identifier(&self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iv_parameter_round_trip() {
        let iv = [0x42u8; 16];
        let alg = ContentCipher::Aes256Cbc.algorithm_identifier(&iv).unwrap();
        let (cipher, decoded) = ContentCipher::from_algorithm_identifier(&alg).unwrap();
        assert_eq!(cipher, ContentCipher::Aes256Cbc);
        assert_eq!(decoded, iv);
    }

    #[test]
    fn test_missing_iv_is_rejected() {
        let alg = AlgorithmIdentifierOwned {
            oid: constants::ID_AES128_CBC,
            parameters: None,
        };
        assert!(matches!(
            ContentCipher::from_algorithm_identifier(&alg),
            Err(AlgorithmParameterError::Missing(_))
        ));
    }

    #[test]
    fn test_wrong_iv_length_is_rejected() {
        assert!(ContentCipher::Aes128Cbc.algorithm_identifier(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_names_and_sizes() {
        assert_eq!("aes-192-cbc".parse::<ContentCipher>().unwrap(), ContentCipher::Aes192Cbc);
        assert_eq!(KeyWrapAlgorithm::for_key_size(32).unwrap(), KeyWrapAlgorithm::Aes256);
        assert!(KeyWrapAlgorithm::for_key_size(20).is_err());
        assert_eq!(ContentCipher::for_key_size(16).unwrap(), ContentCipher::Aes128Cbc);
    }
}
