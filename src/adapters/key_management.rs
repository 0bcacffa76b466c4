//! Key management primitives used by recipients and their generators.
//!
//! Provides:
//! - RSA key transport (PKCS#1 v1.5 and RSAES-OAEP with default parameters)
//! - AES key wrap (RFC 3394) and the PWRI-KEK double CBC wrap (RFC 3211)
//! - PBKDF2 password derivation
//! - ECDH shared secrets and the ANSI X9.63 KDF with ECC-CMS-SharedInfo
//!
//! Unwrap failures are reported as [`PrimitiveError::KeyWrap`] without
//! detail.

use der::{Any, Decode, Encode};
use openssl::aes::{self, AesKey};
use openssl::bn::BigNumContext;
use openssl::derive::Deriver;
use openssl::ec::{EcKey, EcPoint, PointConversionForm};
use openssl::encrypt::{Decrypter, Encrypter};
use openssl::pkey::{HasPublic, Id, PKey, PKeyRef, Private};
use openssl::rsa::Padding;
use openssl::symm::{Crypter, Mode};
use rand::RngCore;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::primitives::{PrimitiveError, PrimitiveProvider};
use crate::domain::constants;
use crate::domain::der_util::encode_tlv;
use crate::domain::crypto::{ContentCipher, HashAlgorithm, UnsupportedAlgorithm};

/// RSA key transport padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransportPadding {
    Pkcs1v15,
    /// RSAES-OAEP with default (SHA-1 / MGF1-SHA-1) parameters.
    Oaep,
}

/// DER of an RSAES-OAEP-params SEQUENCE with every field defaulted.
const OAEP_DEFAULT_PARAMS: &[u8] = &[constants::ASN1_SEQUENCE_TAG, 0x00];

impl KeyTransportPadding {
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned, PrimitiveError> {
        Ok(match self {
            KeyTransportPadding::Pkcs1v15 => AlgorithmIdentifierOwned {
                oid: constants::ID_RSA_ENCRYPTION,
                parameters: Some(Any::from_der(constants::ASN1_NULL)?),
            },
            KeyTransportPadding::Oaep => AlgorithmIdentifierOwned {
                oid: constants::ID_RSAES_OAEP,
                parameters: Some(Any::from_der(OAEP_DEFAULT_PARAMS)?),
            },
        })
    }

    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifierOwned) -> Result<Self, PrimitiveError> {
        if alg.oid == constants::ID_RSA_ENCRYPTION {
            return Ok(KeyTransportPadding::Pkcs1v15);
        }
        if alg.oid == constants::ID_RSAES_OAEP {
            let defaulted = match &alg.parameters {
                None => true,
                Some(params) => params.to_der()? == OAEP_DEFAULT_PARAMS,
            };
            if defaulted {
                return Ok(KeyTransportPadding::Oaep);
            }
            return Err(UnsupportedAlgorithm::new("RSAES-OAEP with non-default parameters").into());
        }
        Err(UnsupportedAlgorithm::new(alg.oid.to_string()).into())
    }

    fn openssl_padding(&self) -> Padding {
        match self {
            KeyTransportPadding::Pkcs1v15 => Padding::PKCS1,
            KeyTransportPadding::Oaep => Padding::PKCS1_OAEP,
        }
    }
}

/// Encrypt a content-encryption key to an RSA public key.
pub fn rsa_encrypt_key<T: HasPublic>(
    key: &PKeyRef<T>,
    padding: KeyTransportPadding,
    cek: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    if key.id() != Id::RSA {
        return Err(PrimitiveError::InvalidKey(
            "key transport requires an RSA public key".into(),
        ));
    }
    let mut encrypter = Encrypter::new(key)?;
    encrypter.set_rsa_padding(padding.openssl_padding())?;
    let mut out = vec![0u8; encrypter.encrypt_len(cek)?];
    let written = encrypter.encrypt(cek, &mut out)?;
    out.truncate(written);
    Ok(out)
}

/// Decrypt a transported content-encryption key.
pub fn rsa_decrypt_key(
    key: &PKeyRef<Private>,
    padding: KeyTransportPadding,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    if key.id() != Id::RSA {
        return Err(PrimitiveError::InvalidKey(
            "key transport requires an RSA private key".into(),
        ));
    }
    let mut decrypter = Decrypter::new(key)?;
    decrypter.set_rsa_padding(padding.openssl_padding())?;
    let mut out = Zeroizing::new(vec![0u8; decrypter.decrypt_len(encrypted_key)?]);
    let written = decrypter
        .decrypt(encrypted_key, &mut out)
        .map_err(|_| PrimitiveError::KeyWrap)?;
    out.truncate(written);
    Ok(out)
}

/// RFC 3394 AES key wrap.
pub fn aes_wrap(kek: &[u8], key: &[u8]) -> Result<Vec<u8>, PrimitiveError> {
    if key.len() < 16 || key.len() % 8 != 0 {
        return Err(PrimitiveError::InvalidKey(format!(
            "cannot AES-wrap a {}-byte key",
            key.len()
        )));
    }
    let aes_key = AesKey::new_encrypt(kek)
        .map_err(|_| PrimitiveError::InvalidKey("unusable key-encryption key".into()))?;
    let mut out = vec![0u8; key.len() + 8];
    let written = aes::wrap_key(&aes_key, None, &mut out, key).map_err(|_| PrimitiveError::KeyWrap)?;
    out.truncate(written);
    Ok(out)
}

/// RFC 3394 AES key unwrap; integrity failures are opaque.
pub fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
        return Err(PrimitiveError::KeyWrap);
    }
    let aes_key = AesKey::new_decrypt(kek)
        .map_err(|_| PrimitiveError::InvalidKey("unusable key-encryption key".into()))?;
    let mut out = Zeroizing::new(vec![0u8; wrapped.len() - 8]);
    let written =
        aes::unwrap_key(&aes_key, None, &mut out, wrapped).map_err(|_| PrimitiveError::KeyWrap)?;
    out.truncate(written);
    Ok(out)
}

fn cbc_no_padding(
    cipher: ContentCipher,
    mode: Mode,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    let mut crypter = Crypter::new(cipher.openssl_cipher(), mode, key, Some(iv))?;
    crypter.pad(false);
    let mut out = vec![0u8; data.len() + cipher.block_size()];
    let mut written = crypter.update(data, &mut out)?;
    written += crypter.finalize(&mut out[written..])?;
    out.truncate(written);
    Ok(out)
}

/// RFC 3211 PWRI-KEK wrap: format the key block, then CBC-encrypt twice.
pub fn pwri_wrap(
    cipher: ContentCipher,
    kek: &[u8],
    iv: &[u8],
    cek: &[u8],
    rng: &mut dyn RngCore,
) -> Result<Vec<u8>, PrimitiveError> {
    let block = cipher.block_size();
    if cek.len() < 3 || cek.len() > 255 {
        return Err(PrimitiveError::InvalidKey(format!(
            "cannot PWRI-wrap a {}-byte key",
            cek.len()
        )));
    }
    let formatted_len = (cek.len() + 4).div_ceil(block).max(2) * block;
    let mut formatted = Zeroizing::new(vec![0u8; formatted_len]);
    formatted[0] = cek.len() as u8;
    formatted[1] = !cek[0];
    formatted[2] = !cek[1];
    formatted[3] = !cek[2];
    formatted[4..4 + cek.len()].copy_from_slice(cek);
    rng.fill_bytes(&mut formatted[4 + cek.len()..]);

    let first = cbc_no_padding(cipher, Mode::Encrypt, kek, iv, &formatted)?;
    let chained_iv = &first[first.len() - block..];
    cbc_no_padding(cipher, Mode::Encrypt, kek, chained_iv, &first)
}

/// RFC 3211 PWRI-KEK unwrap. Every failure is reported as
/// [`PrimitiveError::KeyWrap`].
pub fn pwri_unwrap(
    cipher: ContentCipher,
    kek: &[u8],
    iv: &[u8],
    wrapped: &[u8],
) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    let block = cipher.block_size();
    if wrapped.len() < 2 * block || wrapped.len() % block != 0 {
        return Err(PrimitiveError::KeyWrap);
    }
    let opaque = |_| PrimitiveError::KeyWrap;

    // Undo the outer pass: blocks 1.. chain off ciphertext block 0, block 0
    // chains off the recovered last block.
    let mut inner = Zeroizing::new(vec![0u8; wrapped.len()]);
    let tail = cbc_no_padding(cipher, Mode::Decrypt, kek, &wrapped[..block], &wrapped[block..])
        .map_err(opaque)?;
    inner[block..].copy_from_slice(&tail);
    let last = inner[inner.len() - block..].to_vec();
    let head = cbc_no_padding(cipher, Mode::Decrypt, kek, &last, &wrapped[..block]).map_err(opaque)?;
    inner[..block].copy_from_slice(&head);

    let formatted = Zeroizing::new(
        cbc_no_padding(cipher, Mode::Decrypt, kek, iv, &inner).map_err(opaque)?,
    );

    let key_len = usize::from(formatted[0]);
    if key_len < 3 || 4 + key_len > formatted.len() {
        return Err(PrimitiveError::KeyWrap);
    }
    let check = (formatted[1] ^ formatted[4] ^ 0xff)
        | (formatted[2] ^ formatted[5] ^ 0xff)
        | (formatted[3] ^ formatted[6] ^ 0xff);
    if check != 0 {
        return Err(PrimitiveError::KeyWrap);
    }
    Ok(Zeroizing::new(formatted[4..4 + key_len].to_vec()))
}

/// PBKDF2 with an HMAC pseudo random function.
pub fn pbkdf2(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    prf: HashAlgorithm,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    let mut key = Zeroizing::new(vec![0u8; key_len]);
    openssl::pkcs5::pbkdf2_hmac(
        password,
        salt,
        iterations as usize,
        prf.message_digest(),
        &mut key,
    )?;
    Ok(key)
}

/// DER of ECC-CMS-SharedInfo (RFC 5753 §7.2).
pub fn ecc_cms_shared_info(
    key_wrap: &AlgorithmIdentifierOwned,
    ukm: Option<&[u8]>,
    key_len: usize,
) -> Result<Vec<u8>, PrimitiveError> {
    let mut body = key_wrap.to_der()?;
    if let Some(ukm) = ukm {
        body.extend_from_slice(&encode_tlv(
            0xA0,
            &encode_tlv(constants::ASN1_OCTET_STRING_TAG, ukm),
        ));
    }
    let key_bits = u32::try_from(key_len * 8)
        .map_err(|_| PrimitiveError::InvalidKey("key length out of range".into()))?;
    body.extend_from_slice(&encode_tlv(
        0xA2,
        &encode_tlv(constants::ASN1_OCTET_STRING_TAG, &key_bits.to_be_bytes()),
    ));
    Ok(encode_tlv(constants::ASN1_SEQUENCE_TAG, &body))
}

/// ANSI X9.63 key derivation over a shared secret.
pub fn x963_kdf(
    provider: &dyn PrimitiveProvider,
    digest: HashAlgorithm,
    shared_secret: &[u8],
    shared_info: &[u8],
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    let mut engine = provider.digest(digest)?;
    let mut out = Zeroizing::new(Vec::with_capacity(key_len + digest.digest_size()));
    let mut counter: u32 = 1;
    while out.len() < key_len {
        engine.update(shared_secret)?;
        engine.update(&counter.to_be_bytes())?;
        engine.update(shared_info)?;
        out.extend_from_slice(&engine.finish()?);
        counter += 1;
    }
    out.truncate(key_len);
    Ok(out)
}

/// Uncompressed public point of an EC key.
pub fn ec_public_point<T: HasPublic>(key: &PKeyRef<T>) -> Result<Vec<u8>, PrimitiveError> {
    let ec = key
        .ec_key()
        .map_err(|_| PrimitiveError::InvalidKey("key agreement requires an EC key".into()))?;
    let mut ctx = BigNumContext::new()?;
    Ok(ec
        .public_key()
        .to_bytes(ec.group(), PointConversionForm::UNCOMPRESSED, &mut ctx)?)
}

/// Fresh key pair on the same curve as `peer`.
pub fn ephemeral_key_for<T: HasPublic>(peer: &PKeyRef<T>) -> Result<PKey<Private>, PrimitiveError> {
    let ec = peer
        .ec_key()
        .map_err(|_| PrimitiveError::InvalidKey("key agreement requires an EC key".into()))?;
    let ephemeral = EcKey::generate(ec.group())?;
    Ok(PKey::from_ec_key(ephemeral)?)
}

/// ECDH shared secret between `own` and the peer's encoded public point.
pub fn ecdh_shared_secret(
    own: &PKeyRef<Private>,
    peer_point: &[u8],
) -> Result<Zeroizing<Vec<u8>>, PrimitiveError> {
    let ec = own
        .ec_key()
        .map_err(|_| PrimitiveError::InvalidKey("key agreement requires an EC key".into()))?;
    let mut ctx = BigNumContext::new()?;
    let point = EcPoint::from_bytes(ec.group(), peer_point, &mut ctx)
        .map_err(|_| PrimitiveError::InvalidKey("malformed originator public key".into()))?;
    let peer = PKey::from_ec_key(EcKey::from_public_key(ec.group(), &point)?)?;
    let mut deriver = Deriver::new(own)?;
    deriver.set_peer(&peer)?;
    Ok(Zeroizing::new(deriver.derive_to_vec()?))
}
