//! Recipient-info generation, the encryption-side mirror of recipients.
//!
//! Every generator implements [`RecipientInfoGenerator::generate_with`],
//! which takes an explicit randomness source and primitive provider and
//! surfaces [`PrimitiveError`] untranslated. The provided
//! [`RecipientInfoGenerator::generate`] wraps every failure into a
//! [`ProtocolError`].

use std::fmt;

use openssl::pkey::{Id, PKey, Public};
use openssl::x509::X509Ref;
use rand::RngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::adapters::key_management::{self, KeyTransportPadding};
use crate::adapters::primitives::{PrimitiveError, PrimitiveProvider, Provider};
use crate::adapters::symmetric;
use crate::domain::cms::recipient_info::{key_agreement_algorithm, pwri_kek_algorithm};
use crate::domain::cms::{
    KekRecipientInfo, KeyAgreeRecipientInfo, KeyIdentifier, KeyTransRecipientInfo,
    OriginatorPublicKey, PasswordRecipientInfo, Pbkdf2Params, RecipientEncryptedKey,
    RecipientInfo, RecipientKind,
};
use crate::domain::constants;
use crate::domain::crypto::{ContentCipher, HashAlgorithm, KeyWrapAlgorithm};
use crate::domain::types::{GenericKey, Password, PasswordConversion};
use crate::infra::config::CmsConfiguration;
use crate::infra::error::{CmsResult, ProtocolError};

pub trait RecipientInfoGenerator {
    fn kind(&self) -> RecipientKind;

    /// Provider used by [`RecipientInfoGenerator::generate`].
    fn provider(&self) -> Provider {
        Provider::default()
    }

    /// Build the record for `key`, surfacing primitive failures as is.
    fn generate_with(
        &self,
        key: &GenericKey,
        rng: &mut dyn RngCore,
        provider: &dyn PrimitiveProvider,
    ) -> Result<RecipientInfo, PrimitiveError>;

    /// Build the record for `key` with the thread RNG.
    fn generate(&self, key: &GenericKey) -> Result<RecipientInfo, ProtocolError> {
        let info = self
            .generate_with(key, &mut rand::thread_rng(), self.provider().primitives())
            .map_err(|e| {
                ProtocolError::with_cause(
                    format!("cannot generate {} recipient info", self.kind().as_str()),
                    e,
                )
            })?;
        log::debug!("Generated {} recipient info", self.kind().as_str());
        Ok(info)
    }
}

fn exportable(key: &GenericKey) -> Result<&[u8], PrimitiveError> {
    key.raw_bytes().ok_or_else(|| {
        PrimitiveError::InvalidKey(format!(
            "content key for {} is not exportable",
            key.algorithm().oid
        ))
    })
}

/// Key transport to an RSA public key.
#[derive(Clone)]
pub struct KeyTransRecipientInfoGenerator {
    rid: KeyIdentifier,
    public_key: PKey<Public>,
    padding: KeyTransportPadding,
}

impl KeyTransRecipientInfoGenerator {
    pub fn new(
        rid: KeyIdentifier,
        public_key: PKey<Public>,
        padding: KeyTransportPadding,
    ) -> Result<Self, ProtocolError> {
        if public_key.id() != Id::RSA {
            return Err(ProtocolError::new(
                "key transport requires an RSA public key",
            ));
        }
        Ok(Self {
            rid,
            public_key,
            padding,
        })
    }

    /// Identify the recipient by issuer and serial number of `cert`.
    pub fn from_certificate(
        cert: &X509Ref,
        padding: KeyTransportPadding,
    ) -> Result<Self, ProtocolError> {
        let public_key = cert
            .public_key()
            .map_err(|e| ProtocolError::with_cause("cannot read certificate public key", e))?;
        Self::new(KeyIdentifier::issuer_serial(cert)?, public_key, padding)
    }

    /// Identify the recipient by subject key identifier of `cert`.
    pub fn from_certificate_ski(
        cert: &X509Ref,
        padding: KeyTransportPadding,
    ) -> Result<Self, ProtocolError> {
        let public_key = cert
            .public_key()
            .map_err(|e| ProtocolError::with_cause("cannot read certificate public key", e))?;
        Self::new(KeyIdentifier::subject_key_id(cert)?, public_key, padding)
    }
}

impl fmt::Debug for KeyTransRecipientInfoGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyTransRecipientInfoGenerator({:?}, {:?})",
            self.rid, self.padding
        )
    }
}

impl RecipientInfoGenerator for KeyTransRecipientInfoGenerator {
    fn kind(&self) -> RecipientKind {
        RecipientKind::KeyTrans
    }

    fn generate_with(
        &self,
        key: &GenericKey,
        _rng: &mut dyn RngCore,
        _provider: &dyn PrimitiveProvider,
    ) -> Result<RecipientInfo, PrimitiveError> {
        let encrypted_key =
            key_management::rsa_encrypt_key(&self.public_key, self.padding, exportable(key)?)?;
        Ok(RecipientInfo::KeyTrans(KeyTransRecipientInfo {
            rid: self.rid.clone(),
            key_encryption_algorithm: self.padding.algorithm_identifier()?,
            encrypted_key,
        }))
    }
}

/// AES key wrap under a pre-shared key-encryption key.
#[derive(Clone)]
pub struct KekRecipientInfoGenerator {
    key_identifier: Vec<u8>,
    kek: Zeroizing<Vec<u8>>,
    wrap: KeyWrapAlgorithm,
}

impl KekRecipientInfoGenerator {
    /// The wrap algorithm follows the KEK length (16, 24 or 32 bytes).
    pub fn new(key_identifier: impl Into<Vec<u8>>, kek: impl Into<Vec<u8>>) -> Result<Self, ProtocolError> {
        let kek = Zeroizing::new(kek.into());
        let wrap = KeyWrapAlgorithm::for_key_size(kek.len())
            .map_err(|e| ProtocolError::with_cause("unusable key-encryption key", e))?;
        Ok(Self {
            key_identifier: key_identifier.into(),
            kek,
            wrap,
        })
    }
}

impl fmt::Debug for KekRecipientInfoGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KekRecipientInfoGenerator(id={}, wrap={:?})",
            hex::encode(&self.key_identifier),
            self.wrap
        )
    }
}

impl RecipientInfoGenerator for KekRecipientInfoGenerator {
    fn kind(&self) -> RecipientKind {
        RecipientKind::Kek
    }

    fn generate_with(
        &self,
        key: &GenericKey,
        _rng: &mut dyn RngCore,
        _provider: &dyn PrimitiveProvider,
    ) -> Result<RecipientInfo, PrimitiveError> {
        let encrypted_key = key_management::aes_wrap(&self.kek, exportable(key)?)?;
        Ok(RecipientInfo::Kek(KekRecipientInfo {
            key_identifier: self.key_identifier.clone(),
            key_encryption_algorithm: self.wrap.algorithm_identifier(),
            encrypted_key,
        }))
    }
}

/// Ephemeral-static ECDH to one or more EC public keys on the same curve.
#[derive(Clone)]
pub struct KeyAgreeRecipientInfoGenerator {
    wrap: KeyWrapAlgorithm,
    ukm: Option<Vec<u8>>,
    provider: Provider,
    recipients: Vec<(KeyIdentifier, PKey<Public>)>,
}

impl KeyAgreeRecipientInfoGenerator {
    #[must_use]
    pub fn new(wrap: KeyWrapAlgorithm) -> Self {
        Self {
            wrap,
            ukm: None,
            provider: Provider::default(),
            recipients: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_ukm(mut self, ukm: impl Into<Vec<u8>>) -> Self {
        self.ukm = Some(ukm.into());
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn add_recipient(
        &mut self,
        rid: KeyIdentifier,
        public_key: PKey<Public>,
    ) -> Result<(), ProtocolError> {
        if public_key.id() != Id::EC {
            return Err(ProtocolError::new("key agreement requires an EC public key"));
        }
        self.recipients.push((rid, public_key));
        Ok(())
    }

    pub fn add_recipient_certificate(&mut self, cert: &X509Ref) -> Result<(), ProtocolError> {
        let public_key = cert
            .public_key()
            .map_err(|e| ProtocolError::with_cause("cannot read certificate public key", e))?;
        self.add_recipient(KeyIdentifier::issuer_serial(cert)?, public_key)
    }
}

impl fmt::Debug for KeyAgreeRecipientInfoGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyAgreeRecipientInfoGenerator(wrap={:?}, recipients={})",
            self.wrap,
            self.recipients.len()
        )
    }
}

impl RecipientInfoGenerator for KeyAgreeRecipientInfoGenerator {
    fn kind(&self) -> RecipientKind {
        RecipientKind::KeyAgree
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn generate_with(
        &self,
        key: &GenericKey,
        _rng: &mut dyn RngCore,
        provider: &dyn PrimitiveProvider,
    ) -> Result<RecipientInfo, PrimitiveError> {
        let cek = exportable(key)?;
        let (_, first_key) = self
            .recipients
            .first()
            .ok_or_else(|| PrimitiveError::InvalidKey("no key agreement recipients".into()))?;

        let ephemeral = key_management::ephemeral_key_for(first_key)?;
        let originator = OriginatorPublicKey {
            algorithm: AlgorithmIdentifierOwned {
                oid: constants::ID_EC_PUBLIC_KEY,
                parameters: None,
            },
            public_key: key_management::ec_public_point(&ephemeral)?,
        };
        let wrap_alg = self.wrap.algorithm_identifier();
        let shared_info =
            key_management::ecc_cms_shared_info(&wrap_alg, self.ukm.as_deref(), self.wrap.key_size())?;

        let mut recipient_encrypted_keys = Vec::with_capacity(self.recipients.len());
        for (rid, public_key) in &self.recipients {
            let point = key_management::ec_public_point(public_key)?;
            let shared = key_management::ecdh_shared_secret(&ephemeral, &point)?;
            let kek = key_management::x963_kdf(
                provider,
                HashAlgorithm::Sha256,
                &shared,
                &shared_info,
                self.wrap.key_size(),
            )?;
            recipient_encrypted_keys.push(RecipientEncryptedKey {
                rid: rid.clone(),
                encrypted_key: key_management::aes_wrap(&kek, cek)?,
            });
        }

        Ok(RecipientInfo::KeyAgree(KeyAgreeRecipientInfo {
            originator,
            ukm: self.ukm.clone(),
            key_encryption_algorithm: key_agreement_algorithm(self.wrap)?,
            recipient_encrypted_keys,
        }))
    }
}

/// PBKDF2-derived key-encryption key with RFC 3211 wrapping.
#[derive(Clone)]
pub struct PasswordRecipientInfoGenerator {
    password: Password,
    scheme: PasswordConversion,
    kek_cipher: ContentCipher,
    iterations: u32,
    salt_length: usize,
    prf: HashAlgorithm,
}

impl PasswordRecipientInfoGenerator {
    #[must_use]
    pub fn new(password: Password, kek_cipher: ContentCipher) -> Self {
        Self {
            password,
            scheme: PasswordConversion::Pkcs5Scheme2Utf8,
            kek_cipher,
            iterations: constants::DEFAULT_PBKDF2_ITERATIONS,
            salt_length: constants::DEFAULT_PBKDF2_SALT_LENGTH,
            prf: HashAlgorithm::Sha256,
        }
    }

    /// Generator using the configured PBKDF2 settings and cipher.
    pub fn from_config(password: Password, config: &CmsConfiguration) -> CmsResult<Self> {
        Ok(Self::new(password, config.cipher()?)
            .with_conversion_scheme(config.password.conversion_scheme)
            .with_iterations(config.password.iterations)
            .with_salt_length(config.password.salt_length)
            .with_prf(config.password_prf()?))
    }

    #[must_use]
    pub fn with_conversion_scheme(mut self, scheme: PasswordConversion) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_salt_length(mut self, salt_length: usize) -> Self {
        self.salt_length = salt_length;
        self
    }

    #[must_use]
    pub fn with_prf(mut self, prf: HashAlgorithm) -> Self {
        self.prf = prf;
        self
    }
}

impl fmt::Debug for PasswordRecipientInfoGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PasswordRecipientInfoGenerator(kek={}, iterations={}, prf={}, scheme={})",
            self.kek_cipher,
            self.iterations,
            self.prf,
            self.scheme.scheme_id()
        )
    }
}

impl RecipientInfoGenerator for PasswordRecipientInfoGenerator {
    fn kind(&self) -> RecipientKind {
        RecipientKind::Password
    }

    fn generate_with(
        &self,
        key: &GenericKey,
        rng: &mut dyn RngCore,
        _provider: &dyn PrimitiveProvider,
    ) -> Result<RecipientInfo, PrimitiveError> {
        let cek = exportable(key)?;

        let mut salt = vec![0u8; self.salt_length];
        rng.fill_bytes(&mut salt);
        let iv = symmetric::generate_iv(self.kek_cipher, rng);

        let password = self.password.to_bytes(self.scheme);
        let kek = key_management::pbkdf2(
            &password,
            &salt,
            self.iterations,
            self.prf,
            self.kek_cipher.key_size(),
        )?;
        let encrypted_key = key_management::pwri_wrap(self.kek_cipher, &kek, &iv, cek, rng)?;

        Ok(RecipientInfo::Password(PasswordRecipientInfo {
            key_derivation_algorithm: Some(
                Pbkdf2Params::new(salt, self.iterations, self.prf).algorithm_identifier()?,
            ),
            key_encryption_algorithm: pwri_kek_algorithm(self.kek_cipher, &iv)?,
            encrypted_key,
        }))
    }
}
