//! Enveloped data generation and opening.

use std::fmt;
use std::io::Write;

use der::asn1::ObjectIdentifier;
use spki::AlgorithmIdentifierOwned;

use super::recipient::{Recipient, RecipientInformationStore};
use super::recipient_generators::RecipientInfoGenerator;
use crate::adapters::symmetric::{self, CipherSink};
use crate::domain::cms::{CmsTypedData, RecipientId, RecipientInfo, RecipientKind};
use crate::domain::crypto::ContentCipher;
use crate::domain::types::GenericKey;
use crate::infra::config::CmsConfiguration;
use crate::infra::error::{CmsResult, ProtocolError};

/// Encrypts content once under a fresh key and wraps that key for every
/// registered recipient.
pub struct EnvelopedDataGenerator {
    cipher: ContentCipher,
    generators: Vec<Box<dyn RecipientInfoGenerator>>,
}

impl EnvelopedDataGenerator {
    #[must_use]
    pub fn new(cipher: ContentCipher) -> Self {
        Self {
            cipher,
            generators: Vec::new(),
        }
    }

    /// Generator using the configured content cipher.
    pub fn from_config(config: &CmsConfiguration) -> CmsResult<Self> {
        Ok(Self::new(config.cipher()?))
    }

    pub fn add_recipient(&mut self, generator: impl RecipientInfoGenerator + 'static) {
        self.generators.push(Box::new(generator));
    }

    #[must_use]
    pub fn with_recipient(mut self, generator: impl RecipientInfoGenerator + 'static) -> Self {
        self.add_recipient(generator);
        self
    }

    #[must_use]
    pub fn cipher(&self) -> ContentCipher {
        self.cipher
    }

    pub fn generate(&self, content: &dyn CmsTypedData) -> CmsResult<EnvelopedData> {
        if self.generators.is_empty() {
            return Err(ProtocolError::new("enveloped data needs at least one recipient").into());
        }

        let mut rng = rand::thread_rng();
        let cek = symmetric::generate_content_key(self.cipher, &mut rng);
        let iv = symmetric::generate_iv(self.cipher, &mut rng);
        let content_encryption_algorithm = self
            .cipher
            .algorithm_identifier(&iv)
            .map_err(|e| ProtocolError::with_cause("cannot encode content encryption algorithm", e))?;

        let mut sink = CipherSink::encrypting(self.cipher, &cek, &iv, Vec::new())
            .map_err(|e| ProtocolError::with_cause("cannot initialise content encryption", e))?;
        content.write_to(&mut sink)?;
        let encrypted_content = sink.finish()?;

        let key = GenericKey::raw(content_encryption_algorithm.clone(), cek.to_vec());
        let recipient_infos = self
            .generators
            .iter()
            .map(|generator| generator.generate(&key))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Generated enveloped data: {} recipient(s), {}, {} encrypted bytes",
            recipient_infos.len(),
            self.cipher,
            encrypted_content.len()
        );

        Ok(EnvelopedData {
            content_type: content.content_type(),
            recipient_infos,
            content_encryption_algorithm,
            encrypted_content,
        })
    }
}

impl fmt::Debug for EnvelopedDataGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self.generators.iter().map(|g| g.kind().as_str()).collect();
        write!(f, "EnvelopedDataGenerator({}, [{}])", self.cipher, kinds.join(", "))
    }
}

/// EnvelopedData content (RFC 5652 §6.1) without originator info or
/// unprotected attributes.
#[derive(Debug, Clone)]
pub struct EnvelopedData {
    pub content_type: ObjectIdentifier,
    pub recipient_infos: Vec<RecipientInfo>,
    pub content_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_content: Vec<u8>,
}

impl EnvelopedData {
    /// CMSVersion: 3 with a password recipient, 0 when every record is
    /// version 0, otherwise 2.
    #[must_use]
    pub fn version(&self) -> u8 {
        if self
            .recipient_infos
            .iter()
            .any(|info| info.kind() == RecipientKind::Password)
        {
            3
        } else if self.recipient_infos.iter().all(|info| info.version() == 0) {
            0
        } else {
            2
        }
    }

    #[must_use]
    pub fn recipient_infos(&self) -> RecipientInformationStore {
        RecipientInformationStore::from_recipient_infos(
            &self.recipient_infos,
            &self.content_encryption_algorithm,
        )
    }

    /// Decrypt the content with the record `rid` selects.
    pub fn decrypt(&self, rid: &RecipientId, recipient: Recipient<'_>) -> CmsResult<Vec<u8>> {
        self.decrypt_to(rid, recipient, Vec::new())
    }

    /// Stream the decrypted content into `sink`.
    pub fn decrypt_to<W: Write>(
        &self,
        rid: &RecipientId,
        recipient: Recipient<'_>,
        sink: W,
    ) -> CmsResult<W> {
        let store = self.recipient_infos();
        let information = store
            .get(rid)
            .ok_or_else(|| ProtocolError::new(format!("no {} recipient matches", rid.kind().as_str())))?;
        log::debug!("Matched {} recipient", information.kind().as_str());
        let operator = information.recipient_operator(recipient)?;
        operator.decrypt_stream(&mut self.encrypted_content.as_slice(), sink)
    }
}
