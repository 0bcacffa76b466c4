//! CMS Recipients Library
//!
//! Recipient key recovery and recipient-info generation for CMS enveloped
//! data, plus single-pass digest, MAC and signature accumulation for
//! signer info records.
//!
//! ## Architecture
//!
//! - **Infrastructure** (`infra`): error taxonomy and configuration
//! - **Domain** (`domain`): algorithms, secrets and CMS value types
//! - **Adapters** (`adapters`): OpenSSL and RustCrypto primitives
//! - **Services** (`services`): sinks, recipients, generators and the
//!   enveloped and signed data pipelines
//!
//! ```no_run
//! use cms_recipients::{
//!     ContentCipher, EnvelopedDataGenerator, KekRecipientInfoGenerator, OpenSslKekRecipient,
//!     ProcessableBytes, Recipient, RecipientId,
//! };
//!
//! # fn main() -> cms_recipients::CmsResult<()> {
//! let kek = vec![0x11u8; 32];
//! let enveloped = EnvelopedDataGenerator::new(ContentCipher::Aes256Cbc)
//!     .with_recipient(KekRecipientInfoGenerator::new(b"backup".to_vec(), kek.clone())?)
//!     .generate(&ProcessableBytes::new(b"payload".to_vec()))?;
//!
//! let recipient = OpenSslKekRecipient::new(kek);
//! let plain = enveloped.decrypt(&RecipientId::kek(b"backup".to_vec()), Recipient::Kek(&recipient))?;
//! assert_eq!(plain, b"payload");
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::primitives::{PrimitiveError, PrimitiveProvider, Provider};
pub use domain::cms::{
    AbsentContent, AttributeParameters, AttributeTable, CmsProcessable, CmsReadable,
    CmsTypedData, KeyIdentifier, ProcessableBytes, ProcessableFile, RecipientId, RecipientInfo,
    RecipientKind, Selector, SignerInfo, SingleUseContent,
};
pub use domain::crypto::{AlgorithmRegistry, ContentCipher, HashAlgorithm, KeyWrapAlgorithm};
pub use domain::types::{GenericKey, Password, PasswordConversion};
pub use infra::config::{CmsConfiguration, ConfigManager};
pub use infra::error::{
    AttributeGenerationError, CmsError, CmsResult, ProtocolError, RuntimeProtocolError,
    StreamError,
};
pub use services::{
    DigestCalculator, EnvelopedData, EnvelopedDataGenerator, KekRecipientInfoGenerator,
    OpenSslKekRecipient, OpenSslKeyAgreeRecipient, OpenSslKeyTransRecipient,
    OpenSslPasswordRecipient, Recipient, RecipientInfoGenerator, SignerInfoGenerator,
};
