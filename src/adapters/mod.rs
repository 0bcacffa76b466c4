//! Adapter layer over the cryptographic backends.
//!
//! Provides adapters for:
//! - Digest, MAC and signature engines (OpenSSL, RustCrypto, `hmac`)
//! - Key transport, key wrap, password derivation and key agreement
//! - Streaming AES-CBC content encryption

pub mod key_management;
pub mod primitives;
pub mod symmetric;
