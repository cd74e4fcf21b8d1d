use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use maildupe::actions::DeleteMode;
use maildupe::config::{Config, ConfigOverrides, ENV_PREFIX};
use maildupe::scanner::{HashAlgorithm, KeyPolicy};
use maildupe::store::maildir::FolderLayout;
use maildupe::store::FieldId;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.key_policy().unwrap(), KeyPolicy::default());
    assert_eq!(config.hash_algorithm, HashAlgorithm::Blake3);
    assert_eq!(config.delete_mode, DeleteMode::Flag);
    assert!(config.message_classes.is_empty());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
key_fields = ["message_class", "normalized_subject", "sender_email"]
hash_algorithm = "sha256"
message_classes = ["IPM.Note"]
delete_mode = "trash"
layout = "maildirpp"
dry_run = true
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(
        config.key_fields,
        vec![
            FieldId::MessageClass,
            FieldId::NormalizedSubject,
            FieldId::SenderEmail
        ]
    );
    assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
    assert_eq!(config.delete_mode, DeleteMode::Trash);
    assert_eq!(config.layout, FolderLayout::Maildirpp);
    assert!(config.dry_run);
    assert!(config.dedup_options().accepts_class("ipm.note.smime"));
    assert_eq!(config.maildir_options().layout, FolderLayout::Maildirpp);
}

#[test]
fn test_config_partial_toml_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "dry_run = true\n").unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert!(config.dry_run);
    assert_eq!(config.key_fields, Config::default().key_fields);
    assert!(config.skip_folders.iter().any(|name| name == "Trash"));
}

#[test]
fn test_config_skip_folders_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "skip_folders = [\"Archive\"]\n").unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config.skip_folders, vec!["Archive".to_string()]);
    let options = config.dedup_options();
    assert!(options.skips_folder("archive"));
    assert!(!options.skips_folder("Trash"));
}

#[test]
fn test_config_load_from_env() {
    // A private prefix keeps this test from leaking into Config::load elsewhere.
    let prefix = format!("{ENV_PREFIX}ENVTEST_");
    std::env::set_var(format!("{prefix}DELETE_MODE"), "permanent");
    std::env::set_var(format!("{prefix}DRY_RUN"), "true");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(&prefix).split("__"))
        .extract()
        .unwrap();

    assert_eq!(config.delete_mode, DeleteMode::Permanent);
    assert!(config.dry_run);

    // Clean up
    std::env::remove_var(format!("{prefix}DELETE_MODE"));
    std::env::remove_var(format!("{prefix}DRY_RUN"));
}

#[test]
fn test_cli_overrides_beat_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("explicit.toml");
    fs::write(&config_path, "delete_mode = \"trash\"\nkey_fields = [\"body\"]\n").unwrap();

    let overrides = ConfigOverrides {
        key_fields: Some(vec![FieldId::Subject]),
        ..ConfigOverrides::default()
    };
    let config = Config::load(Some(&config_path), &overrides).unwrap();

    assert_eq!(config.key_fields, vec![FieldId::Subject]);
    assert_eq!(config.delete_mode, DeleteMode::Trash);
}

#[test]
fn test_config_invalid_value() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "delete_mode = \"shred\"\n").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());
}

#[test]
fn test_config_save_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let config = Config {
        hash_algorithm: HashAlgorithm::Sha256,
        message_classes: vec!["IPM.Note".to_string()],
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let saved = fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("hash_algorithm = \"sha256\""));
    assert!(saved.contains("\"IPM.Note\""));
    assert!(saved.contains("\"message_class\""));
}
