//! SignerInfo generation and verification.
//!
//! Content is streamed exactly once. With signed attributes the content
//! goes through a [`DigestSink`] and the signature covers the DER SET of
//! attributes; without them a [`TeeSink`] feeds digest and signature
//! engines in the same pass.

use std::fmt;

use der::asn1::ObjectIdentifier;
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private};
use openssl::x509::X509Ref;

use super::attribute_generators::{CmsAttributeTableGenerator, DefaultSignedAttributeTableGenerator};
use super::digest_calculator::DigestCalculator;
use super::sinks::{DigestSink, SignatureSink, TeeSink};
use crate::adapters::primitives::{
    self, OpenSslSignatureEngine, OpenSslVerificationEngine, PrimitiveError, Provider,
    SignatureEngine,
};
use crate::domain::cms::{
    AttributeParameters, AttributeTable, CmsProcessable, CmsTypedData, KeyIdentifier, SignerInfo,
};
use crate::domain::crypto::HashAlgorithm;
use crate::infra::config::CmsConfiguration;
use crate::infra::error::{CmsResult, ProtocolError};

fn primitive_failure(message: &'static str) -> impl FnOnce(PrimitiveError) -> ProtocolError {
    move |e| ProtocolError::with_cause(message, e)
}

/// Produces [`SignerInfo`] records for one signing key.
pub struct SignerInfoGenerator {
    sid: KeyIdentifier,
    key: PKey<Private>,
    digest: HashAlgorithm,
    provider: Provider,
    signed: Option<Box<dyn CmsAttributeTableGenerator>>,
    unsigned: Option<Box<dyn CmsAttributeTableGenerator>>,
}

impl SignerInfoGenerator {
    #[must_use]
    pub fn new(sid: KeyIdentifier, key: PKey<Private>, digest: HashAlgorithm) -> Self {
        Self {
            sid,
            key,
            digest,
            provider: Provider::default(),
            signed: Some(Box::new(DefaultSignedAttributeTableGenerator::new())),
            unsigned: None,
        }
    }

    /// Signer identified by issuer and serial number of `cert`.
    pub fn from_certificate(
        cert: &X509Ref,
        key: PKey<Private>,
        digest: HashAlgorithm,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(KeyIdentifier::issuer_serial(cert)?, key, digest))
    }

    /// Signer with the configured digest and provider.
    pub fn from_config(
        sid: KeyIdentifier,
        key: PKey<Private>,
        config: &CmsConfiguration,
    ) -> CmsResult<Self> {
        Ok(Self::new(sid, key, config.digest_algorithm()?).with_provider(config.provider()?))
    }

    /// Provider for the content digest.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_signed_attribute_generator(
        mut self,
        generator: impl CmsAttributeTableGenerator + 'static,
    ) -> Self {
        self.signed = Some(Box::new(generator));
        self
    }

    /// Sign the content directly instead of a signed attribute set.
    #[must_use]
    pub fn without_signed_attributes(mut self) -> Self {
        self.signed = None;
        self
    }

    #[must_use]
    pub fn with_unsigned_attribute_generator(
        mut self,
        generator: impl CmsAttributeTableGenerator + 'static,
    ) -> Self {
        self.unsigned = Some(Box::new(generator));
        self
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> HashAlgorithm {
        self.digest
    }

    pub fn generate(&self, content: &dyn CmsTypedData) -> CmsResult<SignerInfo> {
        let mut digest_engine = self
            .provider
            .primitives()
            .digest(self.digest)
            .map_err(primitive_failure("content digest unavailable"))?;

        let (digest, signed_attributes, signature) = match &self.signed {
            Some(generator) => {
                content.write_to(&mut DigestSink::new(digest_engine.as_mut()))?;
                let digest = digest_engine
                    .finish()
                    .map_err(primitive_failure("content digest failed"))?;
                let table = generator.attributes(&self.signed_parameters(content, &digest))?;
                let signature = self.sign_attributes(&table)?;
                (digest, Some(table), signature)
            }
            None => {
                let mut signer = OpenSslSignatureEngine::new(self.digest, &self.key)
                    .map_err(primitive_failure("cannot initialise signature"))?;
                content.write_to(&mut TeeSink::new(
                    DigestSink::new(digest_engine.as_mut()),
                    SignatureSink::new(&mut signer),
                ))?;
                let digest = digest_engine
                    .finish()
                    .map_err(primitive_failure("content digest failed"))?;
                let signature = signer.sign().map_err(primitive_failure("signing failed"))?;
                (digest, None, signature)
            }
        };

        let signer_info = self.assemble(content.content_type(), &digest, signed_attributes, signature)?;
        log::info!(
            "Generated signer info: {} digest, {} signed attribute(s)",
            self.digest,
            signer_info.signed_attributes.as_ref().map_or(0, AttributeTable::len)
        );
        Ok(signer_info)
    }

    /// Sign over a digest computed elsewhere; requires signed attributes.
    pub fn generate_from_digest(
        &self,
        content_type: ObjectIdentifier,
        calculator: &dyn DigestCalculator,
    ) -> CmsResult<SignerInfo> {
        let generator = self.signed.as_ref().ok_or_else(|| {
            ProtocolError::new("a precomputed digest can only be signed through signed attributes")
        })?;
        let digest = calculator.digest()?;
        if digest.len() != self.digest.digest_size() {
            return Err(ProtocolError::new(format!(
                "{}-byte digest does not fit {}",
                digest.len(),
                self.digest
            ))
            .into());
        }

        let parameters = AttributeParameters::new()
            .with_content_type(content_type)
            .with_digest(digest.clone())
            .with_digest_algorithm(self.digest.algorithm_identifier());
        let table = generator.attributes(&parameters)?;
        let signature = self.sign_attributes(&table)?;
        log::info!("Generated signer info over precomputed {} digest", self.digest);
        self.assemble(content_type, &digest, Some(table), signature)
    }

    fn signed_parameters(&self, content: &dyn CmsTypedData, digest: &[u8]) -> AttributeParameters {
        AttributeParameters::new()
            .with_content_type(content.content_type())
            .with_digest(digest.to_vec())
            .with_digest_algorithm(self.digest.algorithm_identifier())
    }

    fn sign_attributes(&self, table: &AttributeTable) -> Result<Vec<u8>, ProtocolError> {
        let to_be_signed = table
            .to_der_set()
            .map_err(|e| ProtocolError::with_cause("cannot encode signed attributes", e))?;
        let mut signer = OpenSslSignatureEngine::new(self.digest, &self.key)
            .map_err(primitive_failure("cannot initialise signature"))?;
        signer
            .update(&to_be_signed)
            .map_err(primitive_failure("signing failed"))?;
        signer.sign().map_err(primitive_failure("signing failed"))
    }

    fn assemble(
        &self,
        content_type: ObjectIdentifier,
        digest: &[u8],
        signed_attributes: Option<AttributeTable>,
        signature: Vec<u8>,
    ) -> CmsResult<SignerInfo> {
        let unsigned_attributes = match &self.unsigned {
            Some(generator) => {
                let parameters = AttributeParameters::new()
                    .with_content_type(content_type)
                    .with_digest(digest.to_vec())
                    .with_digest_algorithm(self.digest.algorithm_identifier())
                    .with_encrypted_digest(signature.clone());
                Some(generator.attributes(&parameters)?).filter(|table| !table.is_empty())
            }
            None => None,
        };

        Ok(SignerInfo {
            sid: self.sid.clone(),
            digest_algorithm: self.digest.algorithm_identifier(),
            signed_attributes,
            signature_algorithm: primitives::signature_algorithm(&self.key, self.digest)
                .map_err(primitive_failure("unsupported signature algorithm"))?,
            signature,
            unsigned_attributes,
        })
    }
}

impl fmt::Debug for SignerInfoGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerInfoGenerator")
            .field("sid", &self.sid)
            .field("digest", &self.digest)
            .field("provider", &self.provider)
            .field("signed_attributes", &self.signed.is_some())
            .field("unsigned_attributes", &self.unsigned.is_some())
            .finish()
    }
}

impl SignerInfo {
    /// Check the signature (and messageDigest attribute, when signed
    /// attributes are present) against `content`.
    ///
    /// A mismatch is `Ok(false)`; errors mean the record could not be
    /// processed at all.
    pub fn verify<T: HasPublic>(
        &self,
        content: &dyn CmsProcessable,
        key: &PKeyRef<T>,
        provider: Provider,
    ) -> CmsResult<bool> {
        let digest = HashAlgorithm::from_oid(&self.digest_algorithm.oid)
            .map_err(|e| ProtocolError::with_cause("unsupported digest algorithm", e))?;
        let mut verifier = OpenSslVerificationEngine::new(digest, key)
            .map_err(primitive_failure("cannot initialise verification"))?;

        let valid = match &self.signed_attributes {
            Some(table) => {
                let expected = table
                    .message_digest()
                    .ok_or_else(|| ProtocolError::new("signed attributes lack messageDigest"))?;
                let mut engine = provider
                    .primitives()
                    .digest(digest)
                    .map_err(primitive_failure("content digest unavailable"))?;
                content.write_to(&mut DigestSink::new(engine.as_mut()))?;
                let actual = engine
                    .finish()
                    .map_err(primitive_failure("content digest failed"))?;
                if actual != expected {
                    log::warn!("messageDigest attribute does not match the content");
                    return Ok(false);
                }
                let signed = table.to_der_set()?;
                verifier
                    .update(&signed)
                    .map_err(primitive_failure("verification failed"))?;
                verifier
                    .verify(&self.signature)
                    .map_err(primitive_failure("verification failed"))?
            }
            None => {
                content.write_to(&mut SignatureSink::new(&mut verifier))?;
                verifier
                    .verify(&self.signature)
                    .map_err(primitive_failure("verification failed"))?
            }
        };

        log::info!("Signer info verification with {digest}: {valid}");
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cms::ProcessableBytes;
    use crate::domain::constants;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::nid::Nid;

    fn ec_key() -> PKey<Private> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
    }

    fn sid() -> KeyIdentifier {
        KeyIdentifier::SubjectKeyId(vec![1, 2, 3, 4])
    }

    #[test]
    fn signed_attributes_round_trip() {
        let key = ec_key();
        let generator = SignerInfoGenerator::new(sid(), key.clone(), HashAlgorithm::Sha256);
        let content = ProcessableBytes::new(b"hello".to_vec());
        let info = generator.generate(&content).unwrap();

        let table = info.signed_attributes.as_ref().unwrap();
        assert_eq!(table.content_type(), Some(constants::ID_DATA));
        assert_eq!(info.version(), 3);
        assert!(info.verify(&content, &key, Provider::OpenSsl).unwrap());
        assert!(!info
            .verify(&ProcessableBytes::new(b"hellO".to_vec()), &key, Provider::OpenSsl)
            .unwrap());
    }

    #[test]
    fn direct_signature_round_trip() {
        let key = ec_key();
        let generator =
            SignerInfoGenerator::new(sid(), key.clone(), HashAlgorithm::Sha384).without_signed_attributes();
        let content = ProcessableBytes::new(vec![9u8; 5000]);
        let info = generator.generate(&content).unwrap();
        assert!(info.signed_attributes.is_none());
        assert!(info.verify(&content, &key, Provider::RustCrypto).unwrap());
    }

    #[test]
    fn precomputed_digest_length_is_checked() {
        use crate::services::digest_calculator::PrecomputedDigest;
        let generator = SignerInfoGenerator::new(sid(), ec_key(), HashAlgorithm::Sha256);
        assert!(generator
            .generate_from_digest(constants::ID_DATA, &PrecomputedDigest::new(vec![0u8; 20]))
            .is_err());
    }
}
