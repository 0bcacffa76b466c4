//! Type-safe wrappers using the new-type pattern.
//!
//! Secret-bearing values (passwords, content-encryption keys) are zeroized
//! on drop and never printed by `Debug`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use spki::AlgorithmIdentifierOwned;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::infra::error::ProtocolError;

/// Type-safe wrapper for recipient passwords
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    /// Create a new Password after validation
    pub fn new(password: impl AsRef<str>) -> Result<Self, ProtocolError> {
        let password = password.as_ref();
        if password.is_empty() {
            return Err(ProtocolError::new("password must not be empty"));
        }
        Ok(Password(password.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Password bytes under the given conversion scheme.
    #[must_use]
    pub fn to_bytes(&self, scheme: PasswordConversion) -> Zeroizing<Vec<u8>> {
        match scheme {
            // PKCS#5 legacy convention: low byte of each UTF-16 code unit.
            PasswordConversion::Pkcs5Scheme2 => {
                Zeroizing::new(self.0.encode_utf16().map(|unit| unit as u8).collect())
            }
            PasswordConversion::Pkcs5Scheme2Utf8 => Zeroizing::new(self.0.as_bytes().to_vec()),
        }
    }
}

impl FromStr for Password {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(len={})", self.0.chars().count())
    }
}

/// Password-to-key conversion scheme for PBKDF2 derivation.
///
/// Both schemes derive with PBKDF2; they differ in how the password's
/// characters become bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PasswordConversion {
    /// PKCS#5 scheme 2, legacy 8-bit character conversion.
    Pkcs5Scheme2,
    /// PKCS#5 scheme 2 with UTF-8 password encoding.
    Pkcs5Scheme2Utf8,
}

impl PasswordConversion {
    #[must_use]
    pub fn scheme_id(&self) -> u8 {
        match self {
            PasswordConversion::Pkcs5Scheme2 => 0,
            PasswordConversion::Pkcs5Scheme2Utf8 => 1,
        }
    }
}

impl TryFrom<u8> for PasswordConversion {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PasswordConversion::Pkcs5Scheme2),
            1 => Ok(PasswordConversion::Pkcs5Scheme2Utf8),
            other => Err(ProtocolError::new(format!(
                "unknown password conversion scheme: {other}"
            ))),
        }
    }
}

impl From<PasswordConversion> for u8 {
    fn from(value: PasswordConversion) -> Self {
        value.scheme_id()
    }
}

/// How a content-encryption key is held.
#[derive(Clone)]
pub enum KeyRepresentation {
    /// Exportable key bytes.
    Raw(Zeroizing<Vec<u8>>),
    /// Key resident in an external token; bytes are not available.
    External { label: String },
}

/// Generic content-encryption key handed to recipient-info generators.
#[derive(Clone)]
pub struct GenericKey {
    algorithm: AlgorithmIdentifierOwned,
    representation: KeyRepresentation,
}

impl GenericKey {
    #[must_use]
    pub fn raw(algorithm: AlgorithmIdentifierOwned, bytes: Vec<u8>) -> Self {
        Self {
            algorithm,
            representation: KeyRepresentation::Raw(Zeroizing::new(bytes)),
        }
    }

    #[must_use]
    pub fn external(algorithm: AlgorithmIdentifierOwned, label: impl Into<String>) -> Self {
        Self {
            algorithm,
            representation: KeyRepresentation::External {
                label: label.into(),
            },
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.algorithm
    }

    #[must_use]
    pub fn representation(&self) -> &KeyRepresentation {
        &self.representation
    }

    /// Key bytes, if the representation is exportable.
    #[must_use]
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match &self.representation {
            KeyRepresentation::Raw(bytes) => Some(bytes.as_slice()),
            KeyRepresentation::External { .. } => None,
        }
    }
}

impl fmt::Debug for GenericKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.representation {
            KeyRepresentation::Raw(bytes) => write!(
                f,
                "GenericKey(alg={}, raw len={})",
                self.algorithm.oid,
                bytes.len()
            ),
            KeyRepresentation::External { label } => {
                write!(f, "GenericKey(alg={}, external={label})", self.algorithm.oid)
            }
        }
    }
}
