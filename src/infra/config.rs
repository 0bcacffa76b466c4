//! Configuration management infrastructure.
//!
//! Algorithm defaults, PBKDF2 settings for password recipients and digest
//! name aliases live in a TOML file. The loaded configuration builds the
//! explicit [`AlgorithmRegistry`] that resolution calls are given.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::primitives::Provider;
use crate::domain::constants;
use crate::domain::crypto::{AlgorithmRegistry, ContentCipher, HashAlgorithm};
use crate::domain::types::PasswordConversion;
use crate::infra::error::{CmsError, CmsResult, ProtocolError};

/// Crate configuration with algorithm and password recipient defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfiguration {
    /// Digest used by signer info generation when none is given
    pub default_digest_algorithm: String,

    /// Primitive provider: "openssl" or "rustcrypto"
    pub default_provider: String,

    /// Content-encryption cipher for enveloped data
    pub content_cipher: String,

    /// Password recipient settings
    pub password: PasswordConfig,

    /// Extra digest names, mapped to canonical names
    pub algorithm_aliases: BTreeMap<String, String>,
}

/// PBKDF2 settings for password recipients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub iterations: u32,

    pub salt_length: usize,

    /// HMAC pseudo random function digest
    pub prf: String,

    /// 0 = PKCS#5 scheme 2 (8-bit), 1 = PKCS#5 scheme 2 with UTF-8
    pub conversion_scheme: PasswordConversion,
}

impl Default for CmsConfiguration {
    fn default() -> Self {
        Self {
            default_digest_algorithm: "SHA-256".to_string(),
            default_provider: "openssl".to_string(),
            content_cipher: "AES-256-CBC".to_string(),
            password: PasswordConfig::default(),
            algorithm_aliases: BTreeMap::new(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            iterations: constants::DEFAULT_PBKDF2_ITERATIONS,
            salt_length: constants::DEFAULT_PBKDF2_SALT_LENGTH,
            prf: "SHA-256".to_string(),
            conversion_scheme: PasswordConversion::Pkcs5Scheme2Utf8,
        }
    }
}

fn config_error(message: impl Into<String>) -> CmsError {
    CmsError::Protocol(ProtocolError::new(message))
}

impl CmsConfiguration {
    /// Registry holding the configured aliases.
    pub fn algorithm_registry(&self) -> CmsResult<AlgorithmRegistry> {
        let mut registry = AlgorithmRegistry::new();
        for (alias, target) in &self.algorithm_aliases {
            let algorithm = target.parse::<HashAlgorithm>().map_err(|_| {
                config_error(format!("Alias {alias} names unknown digest {target}"))
            })?;
            registry.insert_alias(alias, algorithm);
        }
        Ok(registry)
    }

    pub fn provider(&self) -> CmsResult<Provider> {
        self.default_provider
            .parse()
            .map_err(|_| config_error(format!("Invalid provider: {}", self.default_provider)))
    }

    pub fn digest_algorithm(&self) -> CmsResult<HashAlgorithm> {
        self.algorithm_registry()?
            .resolve_digest(&self.default_digest_algorithm)
            .map_err(|_| {
                config_error(format!(
                    "Invalid digest algorithm: {}",
                    self.default_digest_algorithm
                ))
            })
    }

    pub fn cipher(&self) -> CmsResult<ContentCipher> {
        self.content_cipher
            .parse()
            .map_err(|_| config_error(format!("Invalid content cipher: {}", self.content_cipher)))
    }

    pub fn password_prf(&self) -> CmsResult<HashAlgorithm> {
        self.password
            .prf
            .parse()
            .map_err(|_| config_error(format!("Invalid PBKDF2 PRF: {}", self.password.prf)))
    }

    /// Check every field.
    pub fn validate(&self) -> CmsResult<()> {
        self.algorithm_registry()?;
        self.provider()?;
        self.digest_algorithm()?;
        self.cipher()?;
        self.password_prf()?;

        if self.password.iterations == 0 {
            return Err(config_error("PBKDF2 iterations must be greater than 0"));
        }
        if self.password.salt_length < 8 {
            return Err(config_error("PBKDF2 salt length must be at least 8 bytes"));
        }
        Ok(())
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> CmsResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CmsResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("cms-recipients").join("config.toml"))
        } else {
            Ok(PathBuf::from("cms-recipients-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> CmsResult<CmsConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = CmsConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> CmsResult<CmsConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            config_error(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: CmsConfiguration = toml::from_str(&content)
            .map_err(|e| config_error(format!("Failed to parse config file: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &CmsConfiguration) -> CmsResult<()> {
        config.validate()?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                config_error(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| config_error(format!("Failed to serialize config: {e}")))?;

        fs::write(&self.config_path, content).map_err(|e| {
            config_error(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> CmsResult<()> {
        let mut config = self.load()?;

        match key {
            "default_digest_algorithm" => config.default_digest_algorithm = value.to_string(),
            "default_provider" => config.default_provider = value.to_string(),
            "content_cipher" => config.content_cipher = value.to_string(),
            "password.prf" => config.password.prf = value.to_string(),
            "password.iterations" => {
                config.password.iterations = value
                    .parse()
                    .map_err(|_| config_error(format!("Invalid iteration count: {value}")))?;
            }
            "password.salt_length" => {
                config.password.salt_length = value
                    .parse()
                    .map_err(|_| config_error(format!("Invalid salt length: {value}")))?;
            }
            "password.conversion_scheme" => {
                let scheme: u8 = value
                    .parse()
                    .map_err(|_| config_error(format!("Invalid conversion scheme: {value}")))?;
                config.password.conversion_scheme = PasswordConversion::try_from(scheme)?;
            }
            _ => {
                return Err(config_error(format!("Unknown configuration key: {key}")));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = CmsConfiguration::default();
        assert_eq!(config.default_digest_algorithm, "SHA-256");
        assert_eq!(config.password.iterations, 10_000);
        assert_eq!(config.password.salt_length, 20);
        config.validate().unwrap();
        assert_eq!(config.provider().unwrap(), Provider::OpenSsl);
        assert_eq!(config.cipher().unwrap(), ContentCipher::Aes256Cbc);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = CmsConfiguration::default();
        config
            .algorithm_aliases
            .insert("corp".to_string(), "SHA-512".to_string());
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: CmsConfiguration = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
        assert_eq!(
            deserialized
                .algorithm_registry()
                .unwrap()
                .resolve_digest("corp")
                .unwrap(),
            HashAlgorithm::Sha512
        );
    }

    #[test]
    fn test_out_of_range_conversion_scheme_is_rejected() {
        let toml_str = "[password]\nconversion_scheme = 7\n";
        assert!(toml::from_str::<CmsConfiguration>(toml_str).is_err());
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        manager.update_value("password.iterations", "2048").unwrap();
        let loaded_config = manager.load().unwrap();
        assert_eq!(loaded_config.password.iterations, 2048);
        assert_eq!(config.content_cipher, loaded_config.content_cipher);
        assert!(manager.update_value("bogus", "1").is_err());
    }
}
