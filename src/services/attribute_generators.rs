//! Signed and unsigned attribute table generators.
//!
//! Generators read only the parameter keys they need. Extra keys are
//! ignored, and `encryptedDigest` is only ever meaningful when unsigned
//! attributes are generated.

use std::fmt;
use std::time::SystemTime;

use crate::domain::cms::attributes::{
    content_type_attribute, message_digest_attribute, signing_time_attribute,
};
use crate::domain::cms::{AttributeParameters, AttributeTable};
use crate::domain::constants;
use crate::infra::error::AttributeGenerationError;

pub trait CmsAttributeTableGenerator {
    fn attributes(
        &self,
        parameters: &AttributeParameters,
    ) -> Result<AttributeTable, AttributeGenerationError>;
}

/// Returns the table it was built with, whatever the parameters.
#[derive(Debug, Clone, Default)]
pub struct SimpleAttributeTableGenerator {
    table: AttributeTable,
}

impl SimpleAttributeTableGenerator {
    #[must_use]
    pub fn new(table: AttributeTable) -> Self {
        Self { table }
    }
}

impl CmsAttributeTableGenerator for SimpleAttributeTableGenerator {
    fn attributes(
        &self,
        _parameters: &AttributeParameters,
    ) -> Result<AttributeTable, AttributeGenerationError> {
        Ok(self.table.clone())
    }
}

/// Standard signed attributes: contentType, signingTime and messageDigest.
///
/// Attributes in the base table are kept as given and take precedence over
/// the derived ones of the same type.
#[derive(Clone, Default)]
pub struct DefaultSignedAttributeTableGenerator {
    base: AttributeTable,
    signing_time: Option<SystemTime>,
}

impl DefaultSignedAttributeTableGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base(base: AttributeTable) -> Self {
        Self {
            base,
            signing_time: None,
        }
    }

    /// Fixed signing time instead of the clock at generation time.
    #[must_use]
    pub fn with_signing_time(mut self, time: SystemTime) -> Self {
        self.signing_time = Some(time);
        self
    }
}

impl fmt::Debug for DefaultSignedAttributeTableGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSignedAttributeTableGenerator")
            .field("base", &self.base)
            .field("fixed_signing_time", &self.signing_time.is_some())
            .finish()
    }
}

fn encoding_failed(name: &str) -> impl FnOnce(der::Error) -> AttributeGenerationError + '_ {
    move |e| AttributeGenerationError::with_cause(format!("cannot encode {name} attribute"), e)
}

impl CmsAttributeTableGenerator for DefaultSignedAttributeTableGenerator {
    fn attributes(
        &self,
        parameters: &AttributeParameters,
    ) -> Result<AttributeTable, AttributeGenerationError> {
        let mut table = self.base.clone();

        if !table.contains(&constants::PKCS9_CONTENT_TYPE) {
            if let Some(content_type) = parameters.content_type() {
                table.insert(
                    content_type_attribute(content_type).map_err(encoding_failed("contentType"))?,
                );
            }
        }

        if !table.contains(&constants::PKCS9_SIGNING_TIME) {
            let time = self.signing_time.unwrap_or_else(SystemTime::now);
            table.insert(signing_time_attribute(time).map_err(encoding_failed("signingTime"))?);
        }

        if !table.contains(&constants::PKCS9_MESSAGE_DIGEST) {
            let digest = parameters.digest().ok_or_else(|| {
                AttributeGenerationError::new("messageDigest requires the content digest")
            })?;
            table.insert(
                message_digest_attribute(digest).map_err(encoding_failed("messageDigest"))?,
            );
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn simple_generator_ignores_parameters() {
        let table =
            AttributeTable::from_attributes([content_type_attribute(constants::ID_DATA).unwrap()]);
        let generator = SimpleAttributeTableGenerator::new(table.clone());
        assert_eq!(
            generator.attributes(&AttributeParameters::new()).unwrap(),
            table
        );
        let noisy = AttributeParameters::new()
            .with_digest(vec![1, 2, 3])
            .with_encrypted_digest(vec![4]);
        assert_eq!(generator.attributes(&noisy).unwrap(), table);
    }

    #[test]
    fn default_generator_derives_standard_attributes() {
        let generator = DefaultSignedAttributeTableGenerator::new()
            .with_signing_time(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        let params = AttributeParameters::new()
            .with_content_type(constants::ID_DATA)
            .with_digest(vec![0xAB; 32]);
        let table = generator.attributes(&params).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.content_type(), Some(constants::ID_DATA));
        assert_eq!(table.message_digest(), Some(vec![0xAB; 32]));
        assert!(table.contains(&constants::PKCS9_SIGNING_TIME));
    }

    #[test]
    fn default_generator_requires_digest() {
        let err = DefaultSignedAttributeTableGenerator::new()
            .attributes(&AttributeParameters::new().with_content_type(constants::ID_DATA))
            .unwrap_err();
        assert!(err.message().contains("messageDigest"));
    }

    #[test]
    fn base_attributes_take_precedence() {
        let base = AttributeTable::from_attributes([
            content_type_attribute(constants::ID_SIGNED_DATA).unwrap(),
        ]);
        let table = DefaultSignedAttributeTableGenerator::with_base(base)
            .attributes(
                &AttributeParameters::new()
                    .with_content_type(constants::ID_DATA)
                    .with_digest(vec![1; 32]),
            )
            .unwrap();
        assert_eq!(table.content_type(), Some(constants::ID_SIGNED_DATA));
    }

    #[test]
    fn content_type_is_optional() {
        let table = DefaultSignedAttributeTableGenerator::new()
            .attributes(&AttributeParameters::new().with_digest(vec![7; 20]))
            .unwrap();
        assert!(table.content_type().is_none());
        assert_eq!(table.len(), 2);
    }
}
