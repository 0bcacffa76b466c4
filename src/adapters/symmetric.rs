//! AES-CBC content encryption over OpenSSL `Crypter`.
//!
//! [`CipherSink`] transforms bytes as they are written and forwards the
//! result to an inner writer, so content is encrypted or decrypted in one
//! streaming pass.

use std::io::{self, Write};

use openssl::symm::{self, Crypter, Mode};
use rand::RngCore;
use zeroize::Zeroizing;

use super::primitives::PrimitiveError;
use crate::domain::crypto::ContentCipher;
use crate::infra::error::StreamError;

/// Fresh random content-encryption key sized for `cipher`.
pub fn generate_content_key(cipher: ContentCipher, rng: &mut dyn RngCore) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; cipher.key_size()]);
    rng.fill_bytes(&mut key);
    key
}

/// Fresh random IV for `cipher`.
pub fn generate_iv(cipher: ContentCipher, rng: &mut dyn RngCore) -> Vec<u8> {
    let mut iv = vec![0u8; cipher.block_size()];
    rng.fill_bytes(&mut iv);
    iv
}

/// One-shot PKCS#7-padded encryption.
pub fn encrypt_content(
    cipher: ContentCipher,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    Ok(symm::encrypt(cipher.openssl_cipher(), key, Some(iv), data)?)
}

/// One-shot PKCS#7-padded decryption.
pub fn decrypt_content(
    cipher: ContentCipher,
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, PrimitiveError> {
    Ok(symm::decrypt(cipher.openssl_cipher(), key, Some(iv), data)?)
}

/// Writer adapter that encrypts or decrypts everything written to it.
///
/// Call [`CipherSink::finish`] once the content is exhausted; dropping the
/// sink without finishing loses the final block.
pub struct CipherSink<W: Write> {
    crypter: Crypter,
    inner: W,
    block_size: usize,
    scratch: Vec<u8>,
}

impl<W: Write> CipherSink<W> {
    pub fn encrypting(
        cipher: ContentCipher,
        key: &[u8],
        iv: &[u8],
        inner: W,
    ) -> Result<Self, PrimitiveError> {
        Self::new(cipher, Mode::Encrypt, key, iv, inner)
    }

    pub fn decrypting(
        cipher: ContentCipher,
        key: &[u8],
        iv: &[u8],
        inner: W,
    ) -> Result<Self, PrimitiveError> {
        Self::new(cipher, Mode::Decrypt, key, iv, inner)
    }

    fn new(
        cipher: ContentCipher,
        mode: Mode,
        key: &[u8],
        iv: &[u8],
        inner: W,
    ) -> Result<Self, PrimitiveError> {
        if key.len() != cipher.key_size() {
            return Err(PrimitiveError::InvalidKey(format!(
                "{cipher} needs a {}-byte key, got {}",
                cipher.key_size(),
                key.len()
            )));
        }
        let crypter = Crypter::new(cipher.openssl_cipher(), mode, key, Some(iv))?;
        Ok(Self {
            crypter,
            inner,
            block_size: cipher.block_size(),
            scratch: Vec::new(),
        })
    }

    /// Flush the final padded block and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.scratch.resize(2 * self.block_size, 0);
        let written = self
            .crypter
            .finalize(&mut self.scratch)
            .map_err(|e| StreamError::with_cause("content cipher finalisation failed", e))?;
        self.inner.write_all(&self.scratch[..written])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CipherSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.resize(buf.len() + self.block_size, 0);
        let written = self
            .crypter
            .update(buf, &mut self.scratch)
            .map_err(|e| StreamError::with_cause("content cipher update failed", e))?;
        self.inner.write_all(&self.scratch[..written])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
