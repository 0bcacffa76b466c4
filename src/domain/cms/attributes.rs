//! Signed and unsigned attribute tables, and the parameter mapping their
//! generators are driven by.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use der::asn1::{ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Any, Decode, Encode};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;

use crate::domain::constants;
use crate::domain::der_util::encode_tlv;

const SET_TAG: u8 = 0x31;
const IMPLICIT_ZERO_TAG: u8 = 0xA0;

fn single_valued(oid: ObjectIdentifier, value: &impl Encode) -> Result<Attribute, der::Error> {
    let value = Any::from_der(&value.to_der()?)?;
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// PKCS#9 contentType attribute.
pub fn content_type_attribute(content_type: ObjectIdentifier) -> Result<Attribute, der::Error> {
    single_valued(constants::PKCS9_CONTENT_TYPE, &content_type)
}

/// PKCS#9 messageDigest attribute.
pub fn message_digest_attribute(digest: &[u8]) -> Result<Attribute, der::Error> {
    single_valued(
        constants::PKCS9_MESSAGE_DIGEST,
        &OctetString::new(digest.to_vec())?,
    )
}

/// PKCS#9 signingTime attribute as UTCTime.
pub fn signing_time_attribute(time: SystemTime) -> Result<Attribute, der::Error> {
    single_valued(constants::PKCS9_SIGNING_TIME, &UtcTime::from_system_time(time)?)
}

/// Ordered collection of attributes, at most one per type.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
}

impl AttributeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from attributes; a later attribute replaces an earlier one of
    /// the same type.
    #[must_use]
    pub fn from_attributes(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        let mut table = Self::new();
        for attribute in attributes {
            table.insert(attribute);
        }
        table
    }

    /// Insert, replacing any attribute of the same type.
    pub fn insert(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.oid == attribute.oid) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    #[must_use]
    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.oid == *oid)
    }

    #[must_use]
    pub fn contains(&self, oid: &ObjectIdentifier) -> bool {
        self.get(oid).is_some()
    }

    pub fn remove(&mut self, oid: &ObjectIdentifier) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.oid == *oid)?;
        Some(self.attributes.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn first_value(&self, oid: &ObjectIdentifier) -> Option<&Any> {
        self.get(oid).and_then(|a| a.values.iter().next())
    }

    /// Value of the messageDigest attribute, if present and well formed.
    #[must_use]
    pub fn message_digest(&self) -> Option<Vec<u8>> {
        let value = self.first_value(&constants::PKCS9_MESSAGE_DIGEST)?;
        let octets = OctetString::from_der(&value.to_der().ok()?).ok()?;
        Some(octets.as_bytes().to_vec())
    }

    /// Value of the contentType attribute, if present and well formed.
    #[must_use]
    pub fn content_type(&self) -> Option<ObjectIdentifier> {
        let value = self.first_value(&constants::PKCS9_CONTENT_TYPE)?;
        ObjectIdentifier::from_der(&value.to_der().ok()?).ok()
    }

    /// Attribute DER encodings in canonical DER SET order.
    fn canonical_encodings(&self) -> Result<Vec<Vec<u8>>, der::Error> {
        let mut encoded = self
            .attributes
            .iter()
            .map(|attribute| attribute.to_der())
            .collect::<Result<Vec<_>, _>>()?;
        encoded.sort();
        Ok(encoded)
    }

    /// `SET OF Attribute` DER; the bytes a signature over signed
    /// attributes covers.
    pub fn to_der_set(&self) -> Result<Vec<u8>, der::Error> {
        Ok(encode_tlv(SET_TAG, &self.canonical_encodings()?.concat()))
    }

    /// `[0] IMPLICIT` form embedded in a SignerInfo.
    pub fn to_der_implicit(&self) -> Result<Vec<u8>, der::Error> {
        Ok(encode_tlv(
            IMPLICIT_ZERO_TAG,
            &self.canonical_encodings()?.concat(),
        ))
    }
}

impl fmt::Debug for AttributeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let oids: Vec<String> = self.attributes.iter().map(|a| a.oid.to_string()).collect();
        write!(f, "AttributeTable({})", oids.join(", "))
    }
}

/// A value in an [`AttributeParameters`] mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeParameter {
    ContentType(ObjectIdentifier),
    Digest(Vec<u8>),
    DigestAlgorithm(AlgorithmIdentifierOwned),
    EncryptedDigest(Vec<u8>),
    Bytes(Vec<u8>),
}

/// String-keyed inputs to attribute table generation.
///
/// Well-known keys are `contentType`, `digest`, `digestAlgID` and, for
/// unsigned attributes only, `encryptedDigest`. Other keys are carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeParameters {
    entries: BTreeMap<String, AttributeParameter>,
}

impl AttributeParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ObjectIdentifier) -> Self {
        self.insert(
            constants::PARAM_CONTENT_TYPE,
            AttributeParameter::ContentType(content_type),
        );
        self
    }

    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<Vec<u8>>) -> Self {
        self.insert(constants::PARAM_DIGEST, AttributeParameter::Digest(digest.into()));
        self
    }

    #[must_use]
    pub fn with_digest_algorithm(mut self, algorithm: AlgorithmIdentifierOwned) -> Self {
        self.insert(
            constants::PARAM_DIGEST_ALGORITHM_ID,
            AttributeParameter::DigestAlgorithm(algorithm),
        );
        self
    }

    #[must_use]
    pub fn with_encrypted_digest(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.insert(
            constants::PARAM_ENCRYPTED_DIGEST,
            AttributeParameter::EncryptedDigest(signature.into()),
        );
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AttributeParameter) {
        self.entries.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeParameter> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<ObjectIdentifier> {
        match self.get(constants::PARAM_CONTENT_TYPE)? {
            AttributeParameter::ContentType(oid) => Some(*oid),
            _ => None,
        }
    }

    #[must_use]
    pub fn digest(&self) -> Option<&[u8]> {
        match self.get(constants::PARAM_DIGEST)? {
            AttributeParameter::Digest(digest) => Some(digest),
            _ => None,
        }
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> Option<&AlgorithmIdentifierOwned> {
        match self.get(constants::PARAM_DIGEST_ALGORITHM_ID)? {
            AttributeParameter::DigestAlgorithm(alg) => Some(alg),
            _ => None,
        }
    }

    #[must_use]
    pub fn encrypted_digest(&self) -> Option<&[u8]> {
        match self.get(constants::PARAM_ENCRYPTED_DIGEST)? {
            AttributeParameter::EncryptedDigest(signature) => Some(signature),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_decode_well_known_attributes() {
        let table = AttributeTable::from_attributes([
            content_type_attribute(constants::ID_DATA).unwrap(),
            message_digest_attribute(&[0xAA; 32]).unwrap(),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.content_type(), Some(constants::ID_DATA));
        assert_eq!(table.message_digest(), Some(vec![0xAA; 32]));
    }

    #[test]
    fn insert_replaces_same_type() {
        let mut table = AttributeTable::new();
        table.insert(message_digest_attribute(&[1]).unwrap());
        table.insert(message_digest_attribute(&[2]).unwrap());
        assert_eq!(table.len(), 1);
        assert_eq!(table.message_digest(), Some(vec![2]));
    }

    #[test]
    fn der_set_is_canonical_regardless_of_insertion_order() {
        let a = content_type_attribute(constants::ID_DATA).unwrap();
        let b = message_digest_attribute(&[0x11; 32]).unwrap();
        let c = signing_time_attribute(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000)).unwrap();
        let forward = AttributeTable::from_attributes([a.clone(), b.clone(), c.clone()]);
        let backward = AttributeTable::from_attributes([c, b, a]);
        let set = forward.to_der_set().unwrap();
        assert_eq!(set, backward.to_der_set().unwrap());
        assert_eq!(set[0], 0x31);

        let implicit = forward.to_der_implicit().unwrap();
        assert_eq!(implicit[0], 0xA0);
        assert_eq!(&implicit[1..], &set[1..]);
    }

    #[test]
    fn parameters_ignore_mismatched_kinds() {
        let mut params = AttributeParameters::new().with_digest(vec![1, 2, 3]);
        params.insert(constants::PARAM_CONTENT_TYPE, AttributeParameter::Bytes(vec![0]));
        params.insert("vendorExtension", AttributeParameter::Bytes(vec![9]));
        assert_eq!(params.digest(), Some(&[1u8, 2, 3][..]));
        assert_eq!(params.content_type(), None);
        assert_eq!(params.keys().count(), 3);
    }
}
