//! Configuration file handling.

use cms_recipients::{
    CmsConfiguration, ConfigManager, ContentCipher, HashAlgorithm, PasswordConversion, Provider,
};
use tempfile::TempDir;

#[test]
fn default_file_is_created_and_reloaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let manager = ConfigManager::with_path(&path);

    let created = manager.load_or_create_default().unwrap();
    assert!(path.exists());
    assert_eq!(created, CmsConfiguration::default());
    assert_eq!(manager.load().unwrap(), created);
    assert_eq!(manager.config_path(), path.as_path());
}

#[test]
fn values_can_be_updated() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("config.toml"));
    manager.load_or_create_default().unwrap();

    manager.update_value("content_cipher", "AES-128-CBC").unwrap();
    manager.update_value("default_provider", "rustcrypto").unwrap();
    manager.update_value("password.conversion_scheme", "0").unwrap();
    manager.update_value("password.prf", "SHA-512").unwrap();

    let config = manager.load().unwrap();
    assert_eq!(config.cipher().unwrap(), ContentCipher::Aes128Cbc);
    assert_eq!(config.provider().unwrap(), Provider::RustCrypto);
    assert_eq!(config.password.conversion_scheme, PasswordConversion::Pkcs5Scheme2);
    assert_eq!(config.password_prf().unwrap(), HashAlgorithm::Sha512);
}

#[test]
fn invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_path(dir.path().join("config.toml"));
    manager.load_or_create_default().unwrap();

    assert!(manager.update_value("password.conversion_scheme", "2").is_err());
    assert!(manager.update_value("password.iterations", "0").is_err());
    assert!(manager.update_value("content_cipher", "DES").is_err());
    assert!(manager.update_value("default_provider", "hsm").is_err());
    assert_eq!(manager.load().unwrap(), CmsConfiguration::default());
}

#[test]
fn hand_written_file_with_aliases() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_digest_algorithm = "corp"

[password]
iterations = 4096
salt_length = 16

[algorithm_aliases]
corp = "SHA-512"
"#,
    )
    .unwrap();

    let config = ConfigManager::with_path(&path).load().unwrap();
    assert_eq!(config.digest_algorithm().unwrap(), HashAlgorithm::Sha512);
    assert_eq!(config.password.iterations, 4096);
    assert_eq!(config.password.prf, "SHA-256");
    assert_eq!(config.content_cipher, "AES-256-CBC");
}

#[test]
fn malformed_file_is_a_protocol_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "default_provider = [").unwrap();
    let err = ConfigManager::with_path(&path).load().unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
