//! OpenSSL-backed recipients for the four key-recovery mechanisms.

use std::fmt;

use openssl::pkey::{PKey, Private};
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::recipient::{
    KekRecipient, KeyAgreeRecipient, KeyTransRecipient, PasswordRecipient, RecipientOperator,
};
use crate::adapters::key_management::{self, KeyTransportPadding};
use crate::adapters::primitives::Provider;
use crate::domain::cms::recipient_info::{parse_key_agreement_algorithm, parse_pwri_kek_algorithm};
use crate::domain::cms::{OriginatorPublicKey, Pbkdf2Params};
use crate::domain::constants;
use crate::domain::crypto::{HashAlgorithm, KeyWrapAlgorithm};
use crate::domain::types::{Password, PasswordConversion};
use crate::infra::error::ProtocolError;

const KEY_RECOVERY_FAILED: &str = "content-encryption key recovery failed";

/// RSA key transport recipient.
#[derive(Clone)]
pub struct OpenSslKeyTransRecipient {
    key: PKey<Private>,
}

impl OpenSslKeyTransRecipient {
    #[must_use]
    pub fn new(key: PKey<Private>) -> Self {
        Self { key }
    }
}

impl fmt::Debug for OpenSslKeyTransRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenSslKeyTransRecipient(bits={})", self.key.bits())
    }
}

impl KeyTransRecipient for OpenSslKeyTransRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError> {
        let padding = KeyTransportPadding::from_algorithm_identifier(key_encryption_algorithm)
            .map_err(|e| ProtocolError::with_cause("unsupported key encryption algorithm", e))?;
        let key = key_management::rsa_decrypt_key(&self.key, padding, encrypted_key)
            .map_err(|_| ProtocolError::new(KEY_RECOVERY_FAILED))?;
        RecipientOperator::new(content_encryption_algorithm, key)
            .map_err(|_| ProtocolError::new(KEY_RECOVERY_FAILED))
    }
}

/// Pre-shared key-encryption key recipient (RFC 3394 AES key wrap).
#[derive(Clone)]
pub struct OpenSslKekRecipient {
    kek: Zeroizing<Vec<u8>>,
}

impl OpenSslKekRecipient {
    pub fn new(kek: impl Into<Vec<u8>>) -> Self {
        Self {
            kek: Zeroizing::new(kek.into()),
        }
    }
}

impl fmt::Debug for OpenSslKekRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenSslKekRecipient(len={})", self.kek.len())
    }
}

impl KekRecipient for OpenSslKekRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError> {
        let wrap = KeyWrapAlgorithm::from_oid(&key_encryption_algorithm.oid)
            .map_err(|e| ProtocolError::with_cause("unsupported key encryption algorithm", e))?;
        if wrap.key_size() != self.kek.len() {
            return Err(ProtocolError::new(format!(
                "{}-byte KEK cannot unwrap with {}",
                self.kek.len(),
                key_encryption_algorithm.oid
            )));
        }
        let key = key_management::aes_unwrap(&self.kek, encrypted_key)
            .map_err(|e| ProtocolError::with_cause("key unwrap failed", e))?;
        RecipientOperator::new(content_encryption_algorithm, key)
    }
}

/// EC key agreement recipient (stdDH single pass, X9.63 KDF with SHA-256).
#[derive(Clone)]
pub struct OpenSslKeyAgreeRecipient {
    key: PKey<Private>,
    provider: Provider,
}

impl OpenSslKeyAgreeRecipient {
    #[must_use]
    pub fn new(key: PKey<Private>) -> Self {
        Self {
            key,
            provider: Provider::default(),
        }
    }

    /// Provider for the KDF digest.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }
}

impl fmt::Debug for OpenSslKeyAgreeRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpenSslKeyAgreeRecipient(bits={}, provider={})",
            self.key.bits(),
            self.provider
        )
    }
}

impl KeyAgreeRecipient for OpenSslKeyAgreeRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        originator: &OriginatorPublicKey,
        ukm: Option<&[u8]>,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError> {
        let (wrap, wrap_alg) = parse_key_agreement_algorithm(key_encryption_algorithm)
            .map_err(|e| ProtocolError::with_cause("unsupported key agreement algorithm", e))?;
        if originator.algorithm.oid != constants::ID_EC_PUBLIC_KEY {
            return Err(ProtocolError::new(format!(
                "unsupported originator key algorithm {}",
                originator.algorithm.oid
            )));
        }

        let shared = key_management::ecdh_shared_secret(&self.key, &originator.public_key)
            .map_err(|e| ProtocolError::with_cause("key agreement failed", e))?;
        let shared_info = key_management::ecc_cms_shared_info(&wrap_alg, ukm, wrap.key_size())
            .map_err(|e| ProtocolError::with_cause("cannot encode KDF shared info", e))?;
        let kek = key_management::x963_kdf(
            self.provider.primitives(),
            HashAlgorithm::Sha256,
            &shared,
            &shared_info,
            wrap.key_size(),
        )
        .map_err(|e| ProtocolError::with_cause("key derivation failed", e))?;
        let key = key_management::aes_unwrap(&kek, encrypted_key)
            .map_err(|e| ProtocolError::with_cause("key unwrap failed", e))?;
        RecipientOperator::new(content_encryption_algorithm, key)
    }
}

/// Password recipient: PBKDF2 then RFC 3211 PWRI-KEK unwrap.
#[derive(Clone)]
pub struct OpenSslPasswordRecipient {
    password: Password,
    scheme: PasswordConversion,
}

impl OpenSslPasswordRecipient {
    #[must_use]
    pub fn new(password: Password, scheme: PasswordConversion) -> Self {
        Self { password, scheme }
    }
}

impl fmt::Debug for OpenSslPasswordRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpenSslPasswordRecipient({:?}, scheme={})",
            self.password,
            self.scheme.scheme_id()
        )
    }
}

impl PasswordRecipient for OpenSslPasswordRecipient {
    fn conversion_scheme(&self) -> PasswordConversion {
        self.scheme
    }

    fn password(&self) -> &Password {
        &self.password
    }

    fn derive_key(
        &self,
        key_derivation_algorithm: &AlgorithmIdentifierOwned,
        key_size: usize,
    ) -> Result<Zeroizing<Vec<u8>>, ProtocolError> {
        let params = Pbkdf2Params::from_algorithm_identifier(key_derivation_algorithm)
            .map_err(|e| ProtocolError::with_cause("unsupported key derivation algorithm", e))?;
        if let Some(length) = params.key_length() {
            if usize::from(length) != key_size {
                return Err(ProtocolError::new(format!(
                    "PBKDF2 key length {length} does not match the {key_size}-byte KEK"
                )));
            }
        }
        let password = self.password.to_bytes(self.scheme);
        key_management::pbkdf2(
            &password,
            params.salt(),
            params.iterations(),
            params.prf(),
            key_size,
        )
        .map_err(|e| ProtocolError::with_cause("key derivation failed", e))
    }

    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        derived_key: &[u8],
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError> {
        let (cipher, iv) = parse_pwri_kek_algorithm(key_encryption_algorithm)
            .map_err(|e| ProtocolError::with_cause("unsupported key encryption algorithm", e))?;
        let key = key_management::pwri_unwrap(cipher, derived_key, &iv, encrypted_key)
            .map_err(|_| ProtocolError::new(KEY_RECOVERY_FAILED))?;
        RecipientOperator::new(content_encryption_algorithm, key)
            .map_err(|_| ProtocolError::new(KEY_RECOVERY_FAILED))
    }
}
