//! Recipient identifiers and the selector contract.
//!
//! A [`RecipientId`] names one recipient record. Matching never decrypts and
//! never fails: a non-match is `false`.

use openssl::x509::X509Ref;

use crate::infra::error::ProtocolError;

/// The closed set of key-recovery mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecipientKind {
    KeyTrans,
    Kek,
    KeyAgree,
    Password,
}

impl RecipientKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::KeyTrans => "keyTrans",
            RecipientKind::Kek => "kek",
            RecipientKind::KeyAgree => "keyAgree",
            RecipientKind::Password => "password",
        }
    }
}

/// Certificate-based identification used by key transport and key
/// agreement recipients (and by signers).
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum KeyIdentifier {
    /// DER-encoded issuer name plus big-endian serial number bytes.
    IssuerSerial { issuer: Vec<u8>, serial: Vec<u8> },
    SubjectKeyId(Vec<u8>),
}

impl KeyIdentifier {
    /// Issuer and serial number of `cert`.
    pub fn issuer_serial(cert: &X509Ref) -> Result<Self, ProtocolError> {
        let issuer = cert
            .issuer_name()
            .to_der()
            .map_err(|e| ProtocolError::with_cause("cannot encode certificate issuer", e))?;
        let serial = cert
            .serial_number()
            .to_bn()
            .map_err(|e| ProtocolError::with_cause("cannot read certificate serial", e))?
            .to_vec();
        Ok(KeyIdentifier::IssuerSerial { issuer, serial })
    }

    /// Subject key identifier extension of `cert`.
    pub fn subject_key_id(cert: &X509Ref) -> Result<Self, ProtocolError> {
        cert.subject_key_id()
            .map(|ski| KeyIdentifier::SubjectKeyId(ski.as_slice().to_vec()))
            .ok_or_else(|| ProtocolError::new("certificate has no subject key identifier"))
    }
}

impl std::fmt::Debug for KeyIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyIdentifier::IssuerSerial { issuer, serial } => write!(
                f,
                "IssuerSerial(issuer_len={}, serial={})",
                issuer.len(),
                hex::encode(serial)
            ),
            KeyIdentifier::SubjectKeyId(ski) => write!(f, "SubjectKeyId({})", hex::encode(ski)),
        }
    }
}

/// Identifier of one recipient record.
///
/// Password recipients carry no distinguishing fields, so every
/// `RecipientId::Password` is equal to (and hashes like) every other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecipientId {
    KeyTrans(KeyIdentifier),
    Kek { key_identifier: Vec<u8> },
    KeyAgree(KeyIdentifier),
    Password,
}

impl RecipientId {
    #[must_use]
    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientId::KeyTrans(_) => RecipientKind::KeyTrans,
            RecipientId::Kek { .. } => RecipientKind::Kek,
            RecipientId::KeyAgree(_) => RecipientKind::KeyAgree,
            RecipientId::Password => RecipientKind::Password,
        }
    }

    #[must_use]
    pub fn kek(key_identifier: impl Into<Vec<u8>>) -> Self {
        RecipientId::Kek {
            key_identifier: key_identifier.into(),
        }
    }
}

/// Something a [`RecipientId`] can be matched against.
pub trait RecipientCandidate {
    fn recipient_id(&self) -> &RecipientId;

    fn recipient_kind(&self) -> RecipientKind {
        self.recipient_id().kind()
    }
}

/// Side-effect free predicate over candidates.
pub trait Selector<T: ?Sized> {
    fn matches(&self, candidate: &T) -> bool;
}

impl<T: RecipientCandidate + ?Sized> Selector<T> for RecipientId {
    fn matches(&self, candidate: &T) -> bool {
        match self {
            RecipientId::Password => candidate.recipient_kind() == RecipientKind::Password,
            other => candidate.recipient_id() == other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    struct Candidate(RecipientId);

    impl RecipientCandidate for Candidate {
        fn recipient_id(&self) -> &RecipientId {
            &self.0
        }
    }

    fn hash_of(id: &RecipientId) -> u64 {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn password_ids_are_interchangeable() {
        let a = RecipientId::Password;
        let b = RecipientId::Password;
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn kek_ids_compare_by_identifier() {
        let id = RecipientId::kek(b"kek-1".to_vec());
        assert!(id.matches(&Candidate(RecipientId::kek(b"kek-1".to_vec()))));
        assert!(!id.matches(&Candidate(RecipientId::kek(b"kek-2".to_vec()))));
        assert!(!id.matches(&Candidate(RecipientId::Password)));
    }

    #[test]
    fn password_id_matches_only_password_candidates() {
        let id = RecipientId::Password;
        assert!(id.matches(&Candidate(RecipientId::Password)));
        assert!(!id.matches(&Candidate(RecipientId::KeyTrans(KeyIdentifier::SubjectKeyId(
            vec![1, 2, 3]
        )))));
    }
}
