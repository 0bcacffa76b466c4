//! SignerInfo generation and verification over streamed content.

mod common;

use std::time::{Duration, UNIX_EPOCH};

use cms_recipients::domain::cms::attributes::content_type_attribute;
use cms_recipients::domain::constants;
use cms_recipients::services::{
    BufferDigestCalculator, CmsAttributeTableGenerator, DefaultSignedAttributeTableGenerator,
    SimpleAttributeTableGenerator,
};
use cms_recipients::{
    AttributeGenerationError, AttributeParameters, AttributeTable, CmsConfiguration, CmsError,
    HashAlgorithm, KeyIdentifier, ProcessableBytes, Provider, SignerInfoGenerator,
    SingleUseContent,
};

/// Records the parameters it was called with as a one-attribute table.
struct EncryptedDigestEcho;

impl CmsAttributeTableGenerator for EncryptedDigestEcho {
    fn attributes(
        &self,
        parameters: &AttributeParameters,
    ) -> Result<AttributeTable, AttributeGenerationError> {
        let signature = parameters
            .encrypted_digest()
            .ok_or_else(|| AttributeGenerationError::new("encryptedDigest missing"))?;
        let attribute = cms_recipients::domain::cms::attributes::message_digest_attribute(signature)
            .map_err(|e| AttributeGenerationError::with_cause("encoding", e))?;
        Ok(AttributeTable::from_attributes([attribute]))
    }
}

struct Failing;

impl CmsAttributeTableGenerator for Failing {
    fn attributes(
        &self,
        _parameters: &AttributeParameters,
    ) -> Result<AttributeTable, AttributeGenerationError> {
        Err(AttributeGenerationError::new("timestamp authority unreachable"))
    }
}

#[test]
fn certificate_signer_round_trip() {
    common::init_logging();
    let key = common::rsa_key();
    let cert = common::self_signed_cert(&key, "signer", 42);
    let generator = SignerInfoGenerator::from_certificate(&cert, key.clone(), HashAlgorithm::Sha256)
        .unwrap()
        .with_signed_attribute_generator(
            DefaultSignedAttributeTableGenerator::new()
                .with_signing_time(UNIX_EPOCH + Duration::from_secs(1_600_000_000)),
        );

    let content = ProcessableBytes::new(b"document body".to_vec());
    let info = generator.generate(&content).unwrap();
    assert_eq!(info.version(), 1);
    assert_eq!(info.signature.len(), 256);
    assert_eq!(info.digest_algorithm.oid, constants::ID_SHA256);
    assert_eq!(info.signature_algorithm.oid, constants::ID_SHA256_WITH_RSA);

    let public = cert.public_key().unwrap();
    assert!(info.verify(&content, &public, Provider::OpenSsl).unwrap());
    assert!(info.verify(&content, &public, Provider::RustCrypto).unwrap());
    assert!(!info
        .verify(&ProcessableBytes::new(b"tampered".to_vec()), &public, Provider::OpenSsl)
        .unwrap());
}

#[test]
fn unsigned_attributes_see_the_signature() {
    let key = common::ec_key();
    let generator = SignerInfoGenerator::new(
        KeyIdentifier::SubjectKeyId(vec![0xAB; 20]),
        key,
        HashAlgorithm::Sha256,
    )
    .with_unsigned_attribute_generator(EncryptedDigestEcho);

    let info = generator.generate(&ProcessableBytes::new(b"x".to_vec())).unwrap();
    let unsigned = info.unsigned_attributes.expect("unsigned attributes");
    assert_eq!(unsigned.message_digest(), Some(info.signature.clone()));
}

#[test]
fn attribute_generation_failure_is_reported() {
    let generator = SignerInfoGenerator::new(
        KeyIdentifier::SubjectKeyId(vec![1]),
        common::ec_key(),
        HashAlgorithm::Sha256,
    )
    .with_signed_attribute_generator(Failing);
    match generator.generate(&ProcessableBytes::new(b"x".to_vec())).unwrap_err() {
        CmsError::AttributeGeneration(e) => assert_eq!(e.message(), "timestamp authority unreachable"),
        other => panic!("expected attribute generation error, got {other:?}"),
    }
}

#[test]
fn static_signed_attributes_without_digest_do_not_verify() {
    let key = common::ec_key();
    let table = AttributeTable::from_attributes([content_type_attribute(constants::ID_DATA).unwrap()]);
    let generator = SignerInfoGenerator::new(KeyIdentifier::SubjectKeyId(vec![2]), key.clone(), HashAlgorithm::Sha256)
        .with_signed_attribute_generator(SimpleAttributeTableGenerator::new(table));
    let content = ProcessableBytes::new(b"x".to_vec());
    let info = generator.generate(&content).unwrap();
    assert!(matches!(
        info.verify(&content, &key, Provider::OpenSsl),
        Err(CmsError::Protocol(_))
    ));
}

#[test]
fn precomputed_digest_matches_streamed_signing() {
    let key = common::ec_key();
    let data = vec![0x5Au8; 10_000];
    let generator = SignerInfoGenerator::new(KeyIdentifier::SubjectKeyId(vec![3]), key.clone(), HashAlgorithm::Sha512);

    let calculator = BufferDigestCalculator::new("SHA-512", Provider::RustCrypto, data.clone());
    let info = generator
        .generate_from_digest(constants::ID_DATA, &calculator)
        .unwrap();
    assert!(info
        .verify(&ProcessableBytes::new(data), &key, Provider::OpenSsl)
        .unwrap());

    let direct = SignerInfoGenerator::new(KeyIdentifier::SubjectKeyId(vec![3]), key, HashAlgorithm::Sha512)
        .without_signed_attributes();
    assert!(direct
        .generate_from_digest(constants::ID_DATA, &calculator)
        .is_err());
}

#[test]
fn single_use_content_signs_once() {
    let generator = SignerInfoGenerator::new(
        KeyIdentifier::SubjectKeyId(vec![4]),
        common::ec_key(),
        HashAlgorithm::Sha256,
    )
    .without_signed_attributes();
    let content = SingleUseContent::new(std::io::Cursor::new(vec![1u8, 2, 3, 4, 5]));
    assert!(generator.generate(&content).is_ok());
    assert!(generator.generate(&content).unwrap_err().is_misuse());
}

#[test]
fn configured_signer_uses_configured_digest() {
    let mut config = CmsConfiguration::default();
    config.default_digest_algorithm = "house".to_string();
    config
        .algorithm_aliases
        .insert("house".to_string(), "SHA-384".to_string());
    config.default_provider = "rustcrypto".to_string();

    let generator =
        SignerInfoGenerator::from_config(KeyIdentifier::SubjectKeyId(vec![5]), common::ec_key(), &config)
            .unwrap();
    assert_eq!(generator.digest_algorithm(), HashAlgorithm::Sha384);
    let info = generator.generate(&ProcessableBytes::new(b"cfg".to_vec())).unwrap();
    assert_eq!(info.digest_algorithm.oid, constants::ID_SHA384);
}
