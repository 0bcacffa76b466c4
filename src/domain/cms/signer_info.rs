//! SignerInfo record (RFC 5652 §5.3).

use spki::AlgorithmIdentifierOwned;

use super::attributes::AttributeTable;
use super::recipient_id::KeyIdentifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub sid: KeyIdentifier,
    pub digest_algorithm: AlgorithmIdentifierOwned,
    pub signed_attributes: Option<AttributeTable>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: Vec<u8>,
    pub unsigned_attributes: Option<AttributeTable>,
}

impl SignerInfo {
    /// CMSVersion: 1 for issuer and serial, 3 for subject key identifier.
    #[must_use]
    pub fn version(&self) -> u8 {
        match self.sid {
            KeyIdentifier::IssuerSerial { .. } => 1,
            KeyIdentifier::SubjectKeyId(_) => 3,
        }
    }
}
