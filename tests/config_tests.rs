// Integration tests for configuration loading and validation

use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_validation_missing_password_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    // Create a config with a non-existent password file
    let config_content = format!(
        r#"
[postgres]
host = "localhost"
password_file = "{}/nonexistent.txt"
"#,
        temp_dir.path().display()
    );

    fs::write(&config_path, config_content).unwrap();

    // This should fail because the password file doesn't exist
    let result = pgbackup_manager::config::load_config(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_config_validation_empty_host() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let password_file = temp_dir.path().join("password.txt");

    fs::write(&password_file, "test-password").unwrap();

    let config_content = format!(
        r#"
[postgres]
host = ""
password_file = "{}"
"#,
        password_file.display()
    );

    fs::write(&config_path, config_content).unwrap();

    let result = pgbackup_manager::config::load_config(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_config_validation_bad_date_format() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let password_file = temp_dir.path().join("password.txt");

    fs::write(&password_file, "test-password").unwrap();

    // %H is time-of-day; a date-only backup filename can't render it
    let config_content = format!(
        r#"
[global]
date_format = "%Y-%m-%d %H:%M"

[postgres]
host = "localhost"
password_file = "{}"
"#,
        password_file.display()
    );

    fs::write(&config_path, config_content).unwrap();

    let result = pgbackup_manager::config::load_config(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_config_validation_extension_without_dot() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let password_file = temp_dir.path().join("password.txt");

    fs::write(&password_file, "test-password").unwrap();

    let config_content = format!(
        r#"
[global]
backup_extension = "dump"

[postgres]
host = "localhost"
password_file = "{}"
"#,
        password_file.display()
    );

    fs::write(&config_path, config_content).unwrap();

    let result = pgbackup_manager::config::load_config(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_valid_config_loads() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let password_file = temp_dir.path().join("password.txt");

    fs::write(&password_file, "test-password").unwrap();

    let config_content = format!(
        r#"
[global]
backup_directory = "{}"
retention_daily = 7
retention_weekly = 4
retention_monthly = 6

[postgres]
host = "db.internal"
port = 5433
user = "backup"
password_file = "{}"
exclude_databases = ["postgres", "scratch"]
"#,
        temp_dir.path().display(),
        password_file.display()
    );

    fs::write(&config_path, config_content).unwrap();

    let config = pgbackup_manager::config::load_config(&config_path).unwrap();

    assert_eq!(config.global.retention_daily, 7);
    assert_eq!(config.global.retention_weekly, 4);
    assert_eq!(config.global.retention_monthly, 6);
    assert_eq!(config.postgres.host, "db.internal");
    assert_eq!(config.postgres.port, 5433);
    assert!(config.postgres.is_excluded("scratch"));
    assert!(!config.postgres.is_excluded("app"));

    // Unspecified values keep their defaults
    assert_eq!(config.global.date_format, "%Y-%m-%d");
    assert_eq!(config.global.backup_extension, ".dump");
}

#[test]
fn test_config_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    fs::write(&config_path, "this is not toml [[[").unwrap();

    let result = pgbackup_manager::config::load_config(&config_path);
    assert!(result.is_err());
}
