//! Service layer: accumulation sinks, digest calculators, recipients and
//! the enveloped and signed data pipelines built on them.

pub mod attribute_generators;
pub mod digest_calculator;
pub mod enveloped;
pub mod openssl_recipients;
pub mod recipient;
pub mod recipient_generators;
pub mod signer_info;
pub mod sinks;

pub use attribute_generators::{
    CmsAttributeTableGenerator, DefaultSignedAttributeTableGenerator, SimpleAttributeTableGenerator,
};
pub use digest_calculator::{BufferDigestCalculator, DigestCalculator, PrecomputedDigest};
pub use enveloped::{EnvelopedData, EnvelopedDataGenerator};
pub use openssl_recipients::{
    OpenSslKekRecipient, OpenSslKeyAgreeRecipient, OpenSslKeyTransRecipient,
    OpenSslPasswordRecipient,
};
pub use recipient::{
    KekRecipient, KeyAgreeRecipient, KeyTransRecipient, PasswordRecipient, Recipient,
    RecipientInformation, RecipientInformationStore, RecipientOperator,
};
pub use recipient_generators::{
    KekRecipientInfoGenerator, KeyAgreeRecipientInfoGenerator, KeyTransRecipientInfoGenerator,
    PasswordRecipientInfoGenerator, RecipientInfoGenerator,
};
pub use signer_info::SignerInfoGenerator;
pub use sinks::{DigestSink, MacSink, NullSink, SignatureSink, TeeSink};
