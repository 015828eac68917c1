use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.postgres.host.is_empty() {
        return Err(ConfigError::ValidationError(
            "postgres.host must not be empty".to_string(),
        ));
    }

    if !config.postgres.password_file.exists() {
        return Err(ConfigError::ValidationError(format!(
            "Postgres password file does not exist: {:?}",
            config.postgres.password_file
        )));
    }

    if !config.global.backup_extension.starts_with('.') {
        return Err(ConfigError::ValidationError(format!(
            "backup_extension must start with a dot: {:?}",
            config.global.backup_extension
        )));
    }

    if !date_format_is_usable(&config.global.date_format) {
        return Err(ConfigError::ValidationError(format!(
            "date_format is not a valid date pattern: {:?}",
            config.global.date_format
        )));
    }

    Ok(())
}

/// Check that a strftime pattern renders a plain calendar date.
///
/// Rejects both malformed patterns and patterns with time-of-day specifiers,
/// which a `NaiveDate` cannot render. Probing with a real date keeps the
/// codec's `encode` total for any configuration that passed validation.
fn date_format_is_usable(format: &str) -> bool {
    use std::fmt::Write;

    let probe = chrono::NaiveDate::from_ymd_opt(2001, 7, 8).unwrap_or(chrono::NaiveDate::MIN);
    let mut rendered = String::new();
    write!(rendered, "{}", probe.format(format)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_format_default_is_usable() {
        assert!(date_format_is_usable("%Y-%m-%d"));
    }

    #[test]
    fn test_date_format_variable_width_is_usable() {
        assert!(date_format_is_usable("%Y-%m-%-d"));
    }

    #[test]
    fn test_date_format_rejects_time_specifiers() {
        assert!(!date_format_is_usable("%Y-%m-%d_%H%M"));
    }

    #[test]
    fn test_date_format_rejects_garbage() {
        assert!(!date_format_is_usable("%Q"));
    }
}
