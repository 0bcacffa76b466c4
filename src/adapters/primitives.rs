//! Cryptographic primitive collaborator.
//!
//! The CMS layer never implements a primitive itself; it drives engines
//! obtained here:
//! - [`DigestEngine`] from a [`PrimitiveProvider`] (OpenSSL or RustCrypto)
//! - [`MacEngine`] backed by the `hmac` crate
//! - [`SignatureEngine`] backed by OpenSSL `Signer` / `Verifier`

use std::fmt;
use std::str::FromStr;

use der::{Any, Decode};
use hmac::{Hmac, Mac};
use openssl::hash::Hasher;
use openssl::pkey::{HasPublic, Id, PKeyRef, Private};
use openssl::sign::{Signer, Verifier};
use sha2::digest::DynDigest;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::domain::constants;
use crate::domain::crypto::{AlgorithmParameterError, HashAlgorithm, UnsupportedAlgorithm};

/// Failure raised by a primitive or by primitive resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedAlgorithm),

    #[error("{algorithm} is not available from the {provider} provider")]
    NotProvided {
        algorithm: String,
        provider: &'static str,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    #[error("key wrap operation failed")]
    KeyWrap,

    #[error(transparent)]
    Parameters(#[from] AlgorithmParameterError),

    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),
}

/// Incremental digest computation.
pub trait DigestEngine {
    fn algorithm(&self) -> HashAlgorithm;

    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError>;

    /// Finish the digest and reset the engine for reuse.
    fn finish(&mut self) -> Result<Vec<u8>, PrimitiveError>;
}

/// Incremental MAC computation.
pub trait MacEngine {
    fn algorithm(&self) -> HashAlgorithm;

    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError>;

    fn finish(&mut self) -> Result<Vec<u8>, PrimitiveError>;
}

/// Incremental signature creation or verification.
pub trait SignatureEngine {
    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError>;
}

/// Resolves digest engines for one cryptographic backend.
pub trait PrimitiveProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn digest(&self, algorithm: HashAlgorithm) -> Result<Box<dyn DigestEngine>, PrimitiveError>;

    /// One-shot digest over `data`.
    fn hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
        let mut engine = self.digest(algorithm)?;
        engine.update(data)?;
        engine.finish()
    }
}

/// Selectable backend, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    #[default]
    OpenSsl,
    RustCrypto,
}

static OPENSSL_PROVIDER: OpenSslProvider = OpenSslProvider;
static RUSTCRYPTO_PROVIDER: RustCryptoProvider = RustCryptoProvider;

impl Provider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenSsl => "openssl",
            Provider::RustCrypto => "rustcrypto",
        }
    }

    #[must_use]
    pub fn primitives(&self) -> &'static dyn PrimitiveProvider {
        match self {
            Provider::OpenSsl => &OPENSSL_PROVIDER,
            Provider::RustCrypto => &RUSTCRYPTO_PROVIDER,
        }
    }
}

impl FromStr for Provider {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openssl" => Ok(Provider::OpenSsl),
            "rustcrypto" | "rust" => Ok(Provider::RustCrypto),
            _ => Err(UnsupportedAlgorithm::new(format!("provider {s}"))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenSSL-backed digests (SHA-1 and SHA-2).
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslProvider;

struct OpenSslDigest {
    algorithm: HashAlgorithm,
    hasher: Hasher,
}

impl DigestEngine for OpenSslDigest {
    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError> {
        Ok(self.hasher.update(data)?)
    }

    fn finish(&mut self) -> Result<Vec<u8>, PrimitiveError> {
        Ok(self.hasher.finish()?.to_vec())
    }
}

impl PrimitiveProvider for OpenSslProvider {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn digest(&self, algorithm: HashAlgorithm) -> Result<Box<dyn DigestEngine>, PrimitiveError> {
        let hasher = Hasher::new(algorithm.message_digest())?;
        Ok(Box::new(OpenSslDigest { algorithm, hasher }))
    }
}

/// Pure-Rust digests from the `sha2` crate. SHA-1 is not provided.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

struct RustCryptoDigest {
    algorithm: HashAlgorithm,
    hasher: Box<dyn DynDigest>,
}

impl DigestEngine for RustCryptoDigest {
    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError> {
        self.hasher.update(data);
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, PrimitiveError> {
        Ok(self.hasher.finalize_reset().into_vec())
    }
}

impl PrimitiveProvider for RustCryptoProvider {
    fn name(&self) -> &'static str {
        "rustcrypto"
    }

    fn digest(&self, algorithm: HashAlgorithm) -> Result<Box<dyn DigestEngine>, PrimitiveError> {
        let hasher: Box<dyn DynDigest> = match algorithm {
            HashAlgorithm::Sha256 => Box::new(Sha256::new()),
            HashAlgorithm::Sha384 => Box::new(Sha384::new()),
            HashAlgorithm::Sha512 => Box::new(Sha512::new()),
            HashAlgorithm::Sha1 => {
                return Err(PrimitiveError::NotProvided {
                    algorithm: algorithm.as_str().to_string(),
                    provider: self.name(),
                })
            }
        };
        Ok(Box::new(RustCryptoDigest { algorithm, hasher }))
    }
}

enum HmacState {
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

/// HMAC over SHA-2. The engine is spent once [`MacEngine::finish`] runs.
pub struct HmacEngine {
    algorithm: HashAlgorithm,
    state: Option<HmacState>,
}

impl HmacEngine {
    pub fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self, PrimitiveError> {
        let invalid = |_: hmac::digest::InvalidLength| PrimitiveError::InvalidKey("HMAC key rejected".into());
        let state = match algorithm {
            HashAlgorithm::Sha256 => HmacState::Sha256(
                Hmac::<Sha256>::new_from_slice(key).map_err(invalid)?,
            ),
            HashAlgorithm::Sha384 => HmacState::Sha384(
                Hmac::<Sha384>::new_from_slice(key).map_err(invalid)?,
            ),
            HashAlgorithm::Sha512 => HmacState::Sha512(
                Hmac::<Sha512>::new_from_slice(key).map_err(invalid)?,
            ),
            HashAlgorithm::Sha1 => {
                return Err(PrimitiveError::NotProvided {
                    algorithm: "HMAC-SHA-1".into(),
                    provider: "hmac",
                })
            }
        };
        Ok(Self {
            algorithm,
            state: Some(state),
        })
    }
}

impl MacEngine for HmacEngine {
    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError> {
        match self.state.as_mut() {
            Some(HmacState::Sha256(mac)) => mac.update(data),
            Some(HmacState::Sha384(mac)) => mac.update(data),
            Some(HmacState::Sha512(mac)) => mac.update(data),
            None => return Err(PrimitiveError::NotInitialized("MAC engine")),
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, PrimitiveError> {
        match self.state.take() {
            Some(HmacState::Sha256(mac)) => Ok(mac.finalize().into_bytes().to_vec()),
            Some(HmacState::Sha384(mac)) => Ok(mac.finalize().into_bytes().to_vec()),
            Some(HmacState::Sha512(mac)) => Ok(mac.finalize().into_bytes().to_vec()),
            None => Err(PrimitiveError::NotInitialized("MAC engine")),
        }
    }
}

/// Signature creation over an OpenSSL private key.
///
/// After [`OpenSslSignatureEngine::sign`] the engine is spent and further
/// updates fail with [`PrimitiveError::NotInitialized`].
pub struct OpenSslSignatureEngine<'k> {
    digest: HashAlgorithm,
    signer: Option<Signer<'k>>,
}

impl<'k> OpenSslSignatureEngine<'k> {
    pub fn new(digest: HashAlgorithm, key: &'k PKeyRef<Private>) -> Result<Self, PrimitiveError> {
        let signer = Signer::new(digest.message_digest(), key)?;
        Ok(Self {
            digest,
            signer: Some(signer),
        })
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> HashAlgorithm {
        self.digest
    }

    pub fn sign(&mut self) -> Result<Vec<u8>, PrimitiveError> {
        let signer = self
            .signer
            .take()
            .ok_or(PrimitiveError::NotInitialized("signature engine"))?;
        Ok(signer.sign_to_vec()?)
    }
}

impl SignatureEngine for OpenSslSignatureEngine<'_> {
    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError> {
        let signer = self
            .signer
            .as_mut()
            .ok_or(PrimitiveError::NotInitialized("signature engine"))?;
        Ok(signer.update(data)?)
    }
}

/// Signature verification over an OpenSSL public key.
pub struct OpenSslVerificationEngine<'k> {
    verifier: Option<Verifier<'k>>,
}

impl<'k> OpenSslVerificationEngine<'k> {
    pub fn new<T: HasPublic>(
        digest: HashAlgorithm,
        key: &'k PKeyRef<T>,
    ) -> Result<Self, PrimitiveError> {
        let verifier = Verifier::new(digest.message_digest(), key)?;
        Ok(Self {
            verifier: Some(verifier),
        })
    }

    pub fn verify(&mut self, signature: &[u8]) -> Result<bool, PrimitiveError> {
        let verifier = self
            .verifier
            .take()
            .ok_or(PrimitiveError::NotInitialized("verification engine"))?;
        Ok(verifier.verify(signature)?)
    }
}

impl SignatureEngine for OpenSslVerificationEngine<'_> {
    fn update(&mut self, data: &[u8]) -> Result<(), PrimitiveError> {
        let verifier = self
            .verifier
            .as_mut()
            .ok_or(PrimitiveError::NotInitialized("verification engine"))?;
        Ok(verifier.update(data)?)
    }
}

/// Signature algorithm identifier for a key type and digest.
pub fn signature_algorithm<T>(
    key: &PKeyRef<T>,
    digest: HashAlgorithm,
) -> Result<AlgorithmIdentifierOwned, PrimitiveError> {
    let id = key.id();
    let (oid, null_params) = if id == Id::RSA {
        let oid = match digest {
            HashAlgorithm::Sha256 => Some(constants::ID_SHA256_WITH_RSA),
            HashAlgorithm::Sha384 => Some(constants::ID_SHA384_WITH_RSA),
            HashAlgorithm::Sha512 => Some(constants::ID_SHA512_WITH_RSA),
            HashAlgorithm::Sha1 => None,
        };
        (oid, true)
    } else if id == Id::EC {
        let oid = match digest {
            HashAlgorithm::Sha256 => Some(constants::ID_ECDSA_WITH_SHA256),
            HashAlgorithm::Sha384 => Some(constants::ID_ECDSA_WITH_SHA384),
            HashAlgorithm::Sha512 => Some(constants::ID_ECDSA_WITH_SHA512),
            HashAlgorithm::Sha1 => None,
        };
        (oid, false)
    } else {
        (None, false)
    };
    let oid = oid.ok_or_else(|| {
        UnsupportedAlgorithm::new(format!("{digest} signature with key type {}", id.as_raw()))
    })?;
    let parameters = if null_params {
        Some(Any::from_der(constants::ASN1_NULL)?)
    } else {
        None
    };
    Ok(AlgorithmIdentifierOwned { oid, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn providers_agree_on_sha256() {
        for provider in [Provider::OpenSsl, Provider::RustCrypto] {
            let digest = provider
                .primitives()
                .hash(HashAlgorithm::Sha256, b"abc")
                .unwrap();
            assert_eq!(hex::encode(digest), ABC_SHA256, "provider {provider}");
        }
    }

    #[test]
    fn rustcrypto_does_not_provide_sha1() {
        let err = Provider::RustCrypto
            .primitives()
            .digest(HashAlgorithm::Sha1)
            .err()
            .expect("SHA-1 must not resolve");
        assert!(matches!(err, PrimitiveError::NotProvided { .. }));
        assert!(Provider::OpenSsl.primitives().digest(HashAlgorithm::Sha1).is_ok());
    }

    #[test]
    fn digest_engine_resets_after_finish() {
        let mut engine = OpenSslProvider.digest(HashAlgorithm::Sha256).unwrap();
        engine.update(b"abc").unwrap();
        let first = engine.finish().unwrap();
        engine.update(b"abc").unwrap();
        assert_eq!(engine.finish().unwrap(), first);
    }

    #[test]
    fn hmac_known_answer() {
        // RFC 4231 test case 2
        let mut mac = HmacEngine::new(HashAlgorithm::Sha256, b"Jefe").unwrap();
        mac.update(b"what do ya want ").unwrap();
        mac.update(b"for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac.finish().unwrap()),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        assert!(matches!(
            mac.update(b"more"),
            Err(PrimitiveError::NotInitialized(_))
        ));
    }

    #[test]
    fn provider_names_parse() {
        assert_eq!("OpenSSL".parse::<Provider>().unwrap(), Provider::OpenSsl);
        assert_eq!("rustcrypto".parse::<Provider>().unwrap(), Provider::RustCrypto);
        assert!("bouncy".parse::<Provider>().is_err());
    }
}
