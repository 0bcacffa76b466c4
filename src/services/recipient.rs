//! Recipient key recovery.
//!
//! One trait per key-recovery mechanism, dispatched through the closed
//! [`Recipient`] enum. A recipient turns encrypted key material into a
//! [`RecipientOperator`] that decrypts the content. Decoded records are
//! held as [`RecipientInformation`] in a [`RecipientInformationStore`] and
//! selected with a [`RecipientId`] before anything is decrypted.

use std::fmt;
use std::io::{Read, Write};

use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::adapters::symmetric::{self, CipherSink};
use crate::domain::cms::recipient_info::parse_pwri_kek_algorithm;
use crate::domain::cms::{
    KekRecipientInfo, KeyAgreeRecipientInfo, KeyTransRecipientInfo, OriginatorPublicKey,
    PasswordRecipientInfo, RecipientCandidate, RecipientId, RecipientInfo, RecipientKind, Selector,
};
use crate::domain::crypto::ContentCipher;
use crate::domain::types::{Password, PasswordConversion};
use crate::infra::error::{CmsResult, ProtocolError};

/// Content decryption bound to a recovered content-encryption key.
pub struct RecipientOperator {
    cipher: ContentCipher,
    iv: Vec<u8>,
    key: Zeroizing<Vec<u8>>,
}

impl RecipientOperator {
    pub fn new(
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        key: Zeroizing<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let (cipher, iv) = ContentCipher::from_algorithm_identifier(content_encryption_algorithm)
            .map_err(|e| {
                ProtocolError::with_cause("unsupported content encryption algorithm", e)
            })?;
        if key.len() != cipher.key_size() {
            return Err(ProtocolError::new(format!(
                "recovered key does not fit {cipher}"
            )));
        }
        Ok(Self { cipher, iv, key })
    }

    #[must_use]
    pub fn cipher(&self) -> ContentCipher {
        self.cipher
    }

    /// The recovered content-encryption key.
    #[must_use]
    pub fn content_key(&self) -> &[u8] {
        &self.key
    }

    pub fn decrypt(&self, encrypted_content: &[u8]) -> CmsResult<Vec<u8>> {
        symmetric::decrypt_content(self.cipher, &self.key, &self.iv, encrypted_content)
            .map_err(|e| ProtocolError::with_cause("content decryption failed", e).into())
    }

    /// Sink that decrypts whatever is written to it into `inner`.
    pub fn decrypting_sink<W: Write>(&self, inner: W) -> CmsResult<CipherSink<W>> {
        CipherSink::decrypting(self.cipher, &self.key, &self.iv, inner)
            .map_err(|e| ProtocolError::with_cause("cannot initialise content decryption", e).into())
    }

    /// Stream ciphertext from `source` into `sink` and return the sink.
    pub fn decrypt_stream<W: Write>(&self, source: &mut dyn Read, sink: W) -> CmsResult<W> {
        let mut decrypting = self.decrypting_sink(sink)?;
        std::io::copy(source, &mut decrypting)?;
        Ok(decrypting.finish()?)
    }
}

impl fmt::Debug for RecipientOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientOperator(cipher={})", self.cipher)
    }
}

/// Recovers the content key from a key transport record.
pub trait KeyTransRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError>;
}

/// Recovers the content key with a pre-shared key-encryption key.
pub trait KekRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError>;
}

/// Recovers the content key through key agreement with the originator.
pub trait KeyAgreeRecipient {
    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        originator: &OriginatorPublicKey,
        ukm: Option<&[u8]>,
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError>;
}

/// Recovers the content key from a password-derived key-encryption key.
///
/// Any failure after derivation must be reported without a distinguishing
/// reason: a wrong password and a wrong conversion scheme look the same.
pub trait PasswordRecipient {
    fn conversion_scheme(&self) -> PasswordConversion;

    fn password(&self) -> &Password;

    /// Derive a `key_size`-byte key-encryption key.
    fn derive_key(
        &self,
        key_derivation_algorithm: &AlgorithmIdentifierOwned,
        key_size: usize,
    ) -> Result<Zeroizing<Vec<u8>>, ProtocolError>;

    fn recipient_operator(
        &self,
        key_encryption_algorithm: &AlgorithmIdentifierOwned,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
        derived_key: &[u8],
        encrypted_key: &[u8],
    ) -> Result<RecipientOperator, ProtocolError>;
}

/// Caller key material, tagged by mechanism.
#[derive(Clone, Copy)]
pub enum Recipient<'a> {
    KeyTrans(&'a dyn KeyTransRecipient),
    Kek(&'a dyn KekRecipient),
    KeyAgree(&'a dyn KeyAgreeRecipient),
    Password(&'a dyn PasswordRecipient),
}

impl Recipient<'_> {
    #[must_use]
    pub fn kind(&self) -> RecipientKind {
        match self {
            Recipient::KeyTrans(_) => RecipientKind::KeyTrans,
            Recipient::Kek(_) => RecipientKind::Kek,
            Recipient::KeyAgree(_) => RecipientKind::KeyAgree,
            Recipient::Password(_) => RecipientKind::Password,
        }
    }
}

impl fmt::Debug for Recipient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipient({})", self.kind().as_str())
    }
}

#[derive(Debug, Clone)]
enum Record {
    KeyTrans(KeyTransRecipientInfo),
    Kek(KekRecipientInfo),
    /// One recipient encrypted key of a key agreement record.
    KeyAgree {
        info: KeyAgreeRecipientInfo,
        index: usize,
    },
    Password(PasswordRecipientInfo),
}

/// A decoded recipient record paired with the content-encryption algorithm
/// of its message.
#[derive(Debug, Clone)]
pub struct RecipientInformation {
    rid: RecipientId,
    record: Record,
    content_encryption_algorithm: AlgorithmIdentifierOwned,
}

impl RecipientInformation {
    /// Expand one record; a key agreement record yields one entry per
    /// recipient encrypted key.
    #[must_use]
    pub fn from_recipient_info(
        info: &RecipientInfo,
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
    ) -> Vec<Self> {
        let entry = |rid, record| Self {
            rid,
            record,
            content_encryption_algorithm: content_encryption_algorithm.clone(),
        };
        match info {
            RecipientInfo::KeyTrans(ktri) => vec![entry(
                RecipientId::KeyTrans(ktri.rid.clone()),
                Record::KeyTrans(ktri.clone()),
            )],
            RecipientInfo::Kek(kekri) => vec![entry(
                RecipientId::kek(kekri.key_identifier.clone()),
                Record::Kek(kekri.clone()),
            )],
            RecipientInfo::KeyAgree(kari) => kari
                .recipient_encrypted_keys
                .iter()
                .enumerate()
                .map(|(index, rek)| {
                    entry(
                        RecipientId::KeyAgree(rek.rid.clone()),
                        Record::KeyAgree {
                            info: kari.clone(),
                            index,
                        },
                    )
                })
                .collect(),
            RecipientInfo::Password(pwri) => {
                vec![entry(RecipientId::Password, Record::Password(pwri.clone()))]
            }
        }
    }

    #[must_use]
    pub fn rid(&self) -> &RecipientId {
        &self.rid
    }

    #[must_use]
    pub fn kind(&self) -> RecipientKind {
        self.rid.kind()
    }

    #[must_use]
    pub fn key_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        match &self.record {
            Record::KeyTrans(info) => &info.key_encryption_algorithm,
            Record::Kek(info) => &info.key_encryption_algorithm,
            Record::KeyAgree { info, .. } => &info.key_encryption_algorithm,
            Record::Password(info) => &info.key_encryption_algorithm,
        }
    }

    #[must_use]
    pub fn content_encryption_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.content_encryption_algorithm
    }

    /// Recover the content-encryption key with `recipient`.
    pub fn recipient_operator(&self, recipient: Recipient<'_>) -> CmsResult<RecipientOperator> {
        let cea = &self.content_encryption_algorithm;
        let operator = match (&self.record, recipient) {
            (Record::KeyTrans(info), Recipient::KeyTrans(r)) => {
                r.recipient_operator(&info.key_encryption_algorithm, cea, &info.encrypted_key)?
            }
            (Record::Kek(info), Recipient::Kek(r)) => {
                r.recipient_operator(&info.key_encryption_algorithm, cea, &info.encrypted_key)?
            }
            (Record::KeyAgree { info, index }, Recipient::KeyAgree(r)) => {
                let rek = info.recipient_encrypted_keys.get(*index).ok_or_else(|| {
                    ProtocolError::new("recipient encrypted key index out of range")
                })?;
                r.recipient_operator(
                    &info.key_encryption_algorithm,
                    cea,
                    &info.originator,
                    info.ukm.as_deref(),
                    &rek.encrypted_key,
                )?
            }
            (Record::Password(info), Recipient::Password(r)) => {
                Self::password_operator(info, cea, r)?
            }
            (_, other) => {
                return Err(ProtocolError::new(format!(
                    "{} recipient cannot open a {} record",
                    other.kind().as_str(),
                    self.kind().as_str()
                ))
                .into())
            }
        };
        log::debug!("Recovered content key for {} recipient", self.kind().as_str());
        Ok(operator)
    }

    fn password_operator(
        info: &PasswordRecipientInfo,
        cea: &AlgorithmIdentifierOwned,
        recipient: &dyn PasswordRecipient,
    ) -> Result<RecipientOperator, ProtocolError> {
        // The scheme decides the password bytes, so it is fixed before any
        // derivation happens.
        let scheme = recipient.conversion_scheme();
        log::debug!("Password recipient uses conversion scheme {}", scheme.scheme_id());

        let kda = info
            .key_derivation_algorithm
            .as_ref()
            .ok_or_else(|| ProtocolError::new("password recipient info lacks a key derivation algorithm"))?;
        let (kek_cipher, _) = parse_pwri_kek_algorithm(&info.key_encryption_algorithm)
            .map_err(|e| ProtocolError::with_cause("unsupported key encryption algorithm", e))?;
        let derived = recipient.derive_key(kda, kek_cipher.key_size())?;
        recipient.recipient_operator(&info.key_encryption_algorithm, cea, &derived, &info.encrypted_key)
    }

    /// Recover the key and decrypt `encrypted_content` in one step.
    pub fn content(&self, recipient: Recipient<'_>, encrypted_content: &[u8]) -> CmsResult<Vec<u8>> {
        self.recipient_operator(recipient)?.decrypt(encrypted_content)
    }
}

impl RecipientCandidate for RecipientInformation {
    fn recipient_id(&self) -> &RecipientId {
        &self.rid
    }
}

/// Recipient records of one message.
#[derive(Debug, Clone, Default)]
pub struct RecipientInformationStore {
    recipients: Vec<RecipientInformation>,
}

impl RecipientInformationStore {
    #[must_use]
    pub fn new(recipients: Vec<RecipientInformation>) -> Self {
        Self { recipients }
    }

    #[must_use]
    pub fn from_recipient_infos(
        infos: &[RecipientInfo],
        content_encryption_algorithm: &AlgorithmIdentifierOwned,
    ) -> Self {
        Self::new(
            infos
                .iter()
                .flat_map(|info| {
                    RecipientInformation::from_recipient_info(info, content_encryption_algorithm)
                })
                .collect(),
        )
    }

    /// First record `selector` matches.
    #[must_use]
    pub fn get<S: Selector<RecipientInformation> + ?Sized>(
        &self,
        selector: &S,
    ) -> Option<&RecipientInformation> {
        self.recipients.iter().find(|r| selector.matches(r))
    }

    /// Every record `selector` matches.
    #[must_use]
    pub fn matching<S: Selector<RecipientInformation> + ?Sized>(
        &self,
        selector: &S,
    ) -> Vec<&RecipientInformation> {
        self.recipients.iter().filter(|r| selector.matches(r)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipientInformation> {
        self.recipients.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}
