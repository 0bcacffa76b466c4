//! Per-recipient records (RFC 5652 §6.2).
//!
//! These are the structured values exchanged with the ASN.1 layer. Algorithm
//! parameters that this crate interprets itself (PBKDF2, PWRI-KEK, key
//! agreement wrap) have typed helpers here.

use der::asn1::OctetString;
use der::{Any, Decode, Encode, Sequence};
use spki::AlgorithmIdentifierOwned;

use super::recipient_id::{KeyIdentifier, RecipientKind};
use crate::domain::constants;
use crate::domain::crypto::{
    AlgorithmParameterError, ContentCipher, HashAlgorithm, KeyWrapAlgorithm, UnsupportedAlgorithm,
};

/// KeyTransRecipientInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTransRecipientInfo {
    pub rid: KeyIdentifier,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: Vec<u8>,
}

/// KEKRecipientInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KekRecipientInfo {
    pub key_identifier: Vec<u8>,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: Vec<u8>,
}

/// Originator public key of a key agreement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginatorPublicKey {
    pub algorithm: AlgorithmIdentifierOwned,
    /// Encoded EC point.
    pub public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientEncryptedKey {
    pub rid: KeyIdentifier,
    pub encrypted_key: Vec<u8>,
}

/// KeyAgreeRecipientInfo. One record may serve several recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgreeRecipientInfo {
    pub originator: OriginatorPublicKey,
    pub ukm: Option<Vec<u8>>,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub recipient_encrypted_keys: Vec<RecipientEncryptedKey>,
}

/// PasswordRecipientInfo. Carries nothing that identifies the recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecipientInfo {
    pub key_derivation_algorithm: Option<AlgorithmIdentifierOwned>,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientInfo {
    KeyTrans(KeyTransRecipientInfo),
    Kek(KekRecipientInfo),
    KeyAgree(KeyAgreeRecipientInfo),
    Password(PasswordRecipientInfo),
}

impl RecipientInfo {
    #[must_use]
    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientInfo::KeyTrans(_) => RecipientKind::KeyTrans,
            RecipientInfo::Kek(_) => RecipientKind::Kek,
            RecipientInfo::KeyAgree(_) => RecipientKind::KeyAgree,
            RecipientInfo::Password(_) => RecipientKind::Password,
        }
    }

    /// CMSVersion of the record.
    #[must_use]
    pub fn version(&self) -> u8 {
        match self {
            RecipientInfo::KeyTrans(info) => match info.rid {
                KeyIdentifier::IssuerSerial { .. } => 0,
                KeyIdentifier::SubjectKeyId(_) => 2,
            },
            RecipientInfo::Kek(_) => 4,
            RecipientInfo::KeyAgree(_) => 3,
            RecipientInfo::Password(_) => 0,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct Pbkdf2ParamsDer {
    salt: OctetString,
    iteration_count: u32,
    #[asn1(optional = "true")]
    key_length: Option<u16>,
    #[asn1(optional = "true")]
    prf: Option<AlgorithmIdentifierOwned>,
}

/// PBKDF2-params (RFC 8018 §A.2), specified-salt form only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Params {
    salt: Vec<u8>,
    iterations: u32,
    key_length: Option<u16>,
    prf: HashAlgorithm,
}

impl Pbkdf2Params {
    #[must_use]
    pub fn new(salt: Vec<u8>, iterations: u32, prf: HashAlgorithm) -> Self {
        Self {
            salt,
            iterations,
            key_length: None,
            prf,
        }
    }

    #[must_use]
    pub fn with_key_length(mut self, key_length: u16) -> Self {
        self.key_length = Some(key_length);
        self
    }

    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[must_use]
    pub fn key_length(&self) -> Option<u16> {
        self.key_length
    }

    #[must_use]
    pub fn prf(&self) -> HashAlgorithm {
        self.prf
    }

    /// `id-PBKDF2` identifier carrying these parameters. A SHA-1 PRF is the
    /// DEFAULT and is omitted.
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned, der::Error> {
        let prf = match self.prf {
            HashAlgorithm::Sha1 => None,
            other => Some(AlgorithmIdentifierOwned {
                oid: other.hmac_oid(),
                parameters: Some(Any::from_der(constants::ASN1_NULL)?),
            }),
        };
        let params = Pbkdf2ParamsDer {
            salt: OctetString::new(self.salt.clone())?,
            iteration_count: self.iterations,
            key_length: self.key_length,
            prf,
        };
        Ok(AlgorithmIdentifierOwned {
            oid: constants::ID_PBKDF2,
            parameters: Some(Any::from_der(&params.to_der()?)?),
        })
    }

    pub fn from_algorithm_identifier(
        alg: &AlgorithmIdentifierOwned,
    ) -> Result<Self, AlgorithmParameterError> {
        if alg.oid != constants::ID_PBKDF2 {
            return Err(UnsupportedAlgorithm::new(alg.oid.to_string()).into());
        }
        let params = alg
            .parameters
            .as_ref()
            .ok_or(AlgorithmParameterError::Missing(alg.oid))?;
        let params = Pbkdf2ParamsDer::from_der(&params.to_der()?)?;
        let prf = match &params.prf {
            None => HashAlgorithm::Sha1,
            Some(prf) => HashAlgorithm::from_hmac_oid(&prf.oid)?,
        };
        Ok(Self {
            salt: params.salt.as_bytes().to_vec(),
            iterations: params.iteration_count,
            key_length: params.key_length,
            prf,
        })
    }
}

/// `id-alg-PWRI-KEK` identifier wrapping the AES-CBC cipher used for the
/// RFC 3211 double encryption.
pub fn pwri_kek_algorithm(
    cipher: ContentCipher,
    iv: &[u8],
) -> Result<AlgorithmIdentifierOwned, AlgorithmParameterError> {
    let inner = cipher.algorithm_identifier(iv)?;
    Ok(AlgorithmIdentifierOwned {
        oid: constants::ID_ALG_PWRI_KEK,
        parameters: Some(Any::from_der(&inner.to_der()?)?),
    })
}

/// Cipher and IV from an `id-alg-PWRI-KEK` identifier.
pub fn parse_pwri_kek_algorithm(
    alg: &AlgorithmIdentifierOwned,
) -> Result<(ContentCipher, Vec<u8>), AlgorithmParameterError> {
    if alg.oid != constants::ID_ALG_PWRI_KEK {
        return Err(UnsupportedAlgorithm::new(alg.oid.to_string()).into());
    }
    let params = alg
        .parameters
        .as_ref()
        .ok_or(AlgorithmParameterError::Missing(alg.oid))?;
    let inner = AlgorithmIdentifierOwned::from_der(&params.to_der()?)?;
    ContentCipher::from_algorithm_identifier(&inner)
}

/// `dhSinglePass-stdDH-sha256kdf-scheme` identifier naming the key wrap
/// algorithm as parameter.
pub fn key_agreement_algorithm(
    wrap: KeyWrapAlgorithm,
) -> Result<AlgorithmIdentifierOwned, der::Error> {
    Ok(AlgorithmIdentifierOwned {
        oid: constants::ID_DH_SINGLE_PASS_STD_DH_SHA256_KDF,
        parameters: Some(Any::from_der(&wrap.algorithm_identifier().to_der()?)?),
    })
}

/// Key wrap algorithm (and its full identifier) from a key agreement
/// identifier.
pub fn parse_key_agreement_algorithm(
    alg: &AlgorithmIdentifierOwned,
) -> Result<(KeyWrapAlgorithm, AlgorithmIdentifierOwned), AlgorithmParameterError> {
    if alg.oid != constants::ID_DH_SINGLE_PASS_STD_DH_SHA256_KDF {
        return Err(UnsupportedAlgorithm::new(alg.oid.to_string()).into());
    }
    let params = alg
        .parameters
        .as_ref()
        .ok_or(AlgorithmParameterError::Missing(alg.oid))?;
    let wrap_alg = AlgorithmIdentifierOwned::from_der(&params.to_der()?)?;
    let wrap = KeyWrapAlgorithm::from_oid(&wrap_alg.oid)?;
    Ok((wrap, wrap_alg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pbkdf2_params_survive_encoding() {
        let params = Pbkdf2Params::new(vec![7u8; 20], 10_000, HashAlgorithm::Sha256).with_key_length(32);
        let alg = params.algorithm_identifier().unwrap();
        assert_eq!(alg.oid, constants::ID_PBKDF2);
        assert_eq!(Pbkdf2Params::from_algorithm_identifier(&alg).unwrap(), params);
    }

    #[test]
    fn pbkdf2_sha1_prf_is_defaulted() {
        let params = Pbkdf2Params::new(vec![1u8; 8], 2048, HashAlgorithm::Sha1);
        let alg = params.algorithm_identifier().unwrap();
        let shorter = Pbkdf2Params::new(vec![1u8; 8], 2048, HashAlgorithm::Sha256)
            .algorithm_identifier()
            .unwrap();
        assert!(alg.to_der().unwrap().len() < shorter.to_der().unwrap().len());
        assert_eq!(
            Pbkdf2Params::from_algorithm_identifier(&alg).unwrap().prf(),
            HashAlgorithm::Sha1
        );
    }

    #[test]
    fn pwri_kek_identifier_carries_cipher_and_iv() {
        let iv = [3u8; 16];
        let alg = pwri_kek_algorithm(ContentCipher::Aes192Cbc, &iv).unwrap();
        let (cipher, parsed_iv) = parse_pwri_kek_algorithm(&alg).unwrap();
        assert_eq!(cipher, ContentCipher::Aes192Cbc);
        assert_eq!(parsed_iv, iv);
    }

    #[test]
    fn key_agreement_identifier_names_wrap() {
        let alg = key_agreement_algorithm(KeyWrapAlgorithm::Aes256).unwrap();
        let (wrap, wrap_alg) = parse_key_agreement_algorithm(&alg).unwrap();
        assert_eq!(wrap, KeyWrapAlgorithm::Aes256);
        assert_eq!(wrap_alg, KeyWrapAlgorithm::Aes256.algorithm_identifier());
    }

    #[test]
    fn versions_follow_identifier_choice() {
        let record = |rid| {
            RecipientInfo::KeyTrans(KeyTransRecipientInfo {
                rid,
                key_encryption_algorithm: AlgorithmIdentifierOwned {
                    oid: constants::ID_RSA_ENCRYPTION,
                    parameters: None,
                },
                encrypted_key: vec![],
            })
        };
        assert_eq!(
            record(KeyIdentifier::IssuerSerial {
                issuer: vec![],
                serial: vec![1]
            })
            .version(),
            0
        );
        assert_eq!(record(KeyIdentifier::SubjectKeyId(vec![1])).version(), 2);
    }
}
