//! Enveloped data: one encryption pass, many recipients.

mod common;

use std::io::Write;

use cms_recipients::adapters::key_management::KeyTransportPadding;
use cms_recipients::services::{
    KeyAgreeRecipientInfoGenerator, KeyTransRecipientInfoGenerator, PasswordRecipientInfoGenerator,
};
use cms_recipients::{
    CmsConfiguration, ContentCipher, EnvelopedDataGenerator, KekRecipientInfoGenerator,
    KeyIdentifier, KeyWrapAlgorithm, OpenSslKekRecipient, OpenSslKeyAgreeRecipient,
    OpenSslKeyTransRecipient, OpenSslPasswordRecipient, Password, PasswordConversion,
    ProcessableBytes, ProcessableFile, Recipient, RecipientId, RecipientKind, SingleUseContent,
};
use tempfile::NamedTempFile;

fn message() -> Vec<u8> {
    b"The quick brown fox jumps over the lazy dog. ".repeat(100)
}

#[test]
fn all_recipient_kinds_open_the_same_message() {
    common::init_logging();
    let rsa = common::rsa_key();
    let rsa_cert = common::self_signed_cert(&rsa, "rsa", 1);
    let ec = common::ec_key();
    let ec_cert = common::self_signed_cert(&ec, "ec", 2);
    let kek = vec![0x77u8; 24];

    let mut agree = KeyAgreeRecipientInfoGenerator::new(KeyWrapAlgorithm::Aes256);
    agree.add_recipient_certificate(&ec_cert).unwrap();

    let enveloped = EnvelopedDataGenerator::new(ContentCipher::Aes256Cbc)
        .with_recipient(
            KeyTransRecipientInfoGenerator::from_certificate(&rsa_cert, KeyTransportPadding::Oaep)
                .unwrap(),
        )
        .with_recipient(KekRecipientInfoGenerator::new(b"vault".to_vec(), kek.clone()).unwrap())
        .with_recipient(agree)
        .with_recipient(
            PasswordRecipientInfoGenerator::new(Password::new("s3cret").unwrap(), ContentCipher::Aes128Cbc)
                .with_iterations(2000),
        )
        .generate(&ProcessableBytes::new(message()))
        .unwrap();

    assert_eq!(enveloped.version(), 3);
    assert_eq!(enveloped.recipient_infos().len(), 4);
    let kinds: Vec<_> = enveloped.recipient_infos().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            RecipientKind::KeyTrans,
            RecipientKind::Kek,
            RecipientKind::KeyAgree,
            RecipientKind::Password
        ]
    );

    let ktri = OpenSslKeyTransRecipient::new(rsa);
    let kekri = OpenSslKekRecipient::new(kek);
    let kari = OpenSslKeyAgreeRecipient::new(ec);
    let pwri = OpenSslPasswordRecipient::new(
        Password::new("s3cret").unwrap(),
        PasswordConversion::Pkcs5Scheme2Utf8,
    );

    let openings = [
        (
            RecipientId::KeyTrans(KeyIdentifier::issuer_serial(&rsa_cert).unwrap()),
            Recipient::KeyTrans(&ktri),
        ),
        (RecipientId::kek(b"vault".to_vec()), Recipient::Kek(&kekri)),
        (
            RecipientId::KeyAgree(KeyIdentifier::issuer_serial(&ec_cert).unwrap()),
            Recipient::KeyAgree(&kari),
        ),
        (RecipientId::Password, Recipient::Password(&pwri)),
    ];
    for (rid, recipient) in openings {
        assert_eq!(enveloped.decrypt(&rid, recipient).unwrap(), message(), "{rid:?}");
    }
}

#[test]
fn key_transport_only_messages_are_version_zero() {
    let rsa = common::rsa_key();
    let cert = common::self_signed_cert(&rsa, "solo", 5);
    let enveloped = EnvelopedDataGenerator::new(ContentCipher::Aes128Cbc)
        .with_recipient(
            KeyTransRecipientInfoGenerator::from_certificate(&cert, KeyTransportPadding::Pkcs1v15)
                .unwrap(),
        )
        .generate(&ProcessableBytes::new(vec![1, 2, 3]))
        .unwrap();
    assert_eq!(enveloped.version(), 0);
}

#[test]
fn file_content_streams_into_a_sink() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&message()).unwrap();
    file.flush().unwrap();

    let config = CmsConfiguration::default();
    let kek = vec![0x10u8; 16];
    let mut generator = EnvelopedDataGenerator::from_config(&config).unwrap();
    generator.add_recipient(KekRecipientInfoGenerator::new(b"f".to_vec(), kek.clone()).unwrap());
    assert_eq!(generator.cipher(), ContentCipher::Aes256Cbc);

    let enveloped = generator
        .generate(&ProcessableFile::new(file.path()).with_buffer_size(13))
        .unwrap();
    let recipient = OpenSslKekRecipient::new(kek);
    let out = enveloped
        .decrypt_to(&RecipientId::kek(b"f".to_vec()), Recipient::Kek(&recipient), Vec::new())
        .unwrap();
    assert_eq!(out, message());
}

#[test]
fn single_use_content_can_be_enveloped_once() {
    let kek = vec![0x01u8; 32];
    let generator = EnvelopedDataGenerator::new(ContentCipher::Aes192Cbc)
        .with_recipient(KekRecipientInfoGenerator::new(b"once".to_vec(), kek).unwrap());
    let content = SingleUseContent::new(std::io::Cursor::new(message()));

    assert!(generator.generate(&content).is_ok());
    assert!(generator.generate(&content).unwrap_err().is_misuse());
}

#[test]
fn configured_password_settings_are_applied() {
    let mut config = CmsConfiguration::default();
    config.password.iterations = 1500;
    config.password.conversion_scheme = PasswordConversion::Pkcs5Scheme2;

    let generator = PasswordRecipientInfoGenerator::from_config(Password::new("pw").unwrap(), &config)
        .unwrap();
    let enveloped = EnvelopedDataGenerator::new(ContentCipher::Aes128Cbc)
        .with_recipient(generator)
        .generate(&ProcessableBytes::new(b"cfg".to_vec()))
        .unwrap();

    let matching = OpenSslPasswordRecipient::new(Password::new("pw").unwrap(), PasswordConversion::Pkcs5Scheme2);
    assert_eq!(
        enveloped
            .decrypt(&RecipientId::Password, Recipient::Password(&matching))
            .unwrap(),
        b"cfg"
    );
}
