//! CMS value types: content, recipient identity and records, attribute
//! tables and signer records.

pub mod attributes;
pub mod content;
pub mod recipient_id;
pub mod recipient_info;
pub mod signer_info;

pub use attributes::{AttributeParameter, AttributeParameters, AttributeTable};
pub use content::{
    AbsentContent, CmsProcessable, CmsReadable, CmsTypedData, ContentRef, ProcessableBytes,
    ProcessableFile, SingleUseContent,
};
pub use recipient_id::{KeyIdentifier, RecipientCandidate, RecipientId, RecipientKind, Selector};
pub use recipient_info::{
    KekRecipientInfo, KeyAgreeRecipientInfo, KeyTransRecipientInfo, OriginatorPublicKey,
    PasswordRecipientInfo, Pbkdf2Params, RecipientEncryptedKey, RecipientInfo,
};
pub use signer_info::SignerInfo;
