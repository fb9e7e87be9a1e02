//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a file extension list entry (no leading dot, no path separators)
pub fn validate_extension(ext: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(ext, "extension", domain)?;
    if ext.starts_with('.') || ext.contains('/') || ext.contains('\\') {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("extension '{}' must be a bare suffix such as 'so'", ext),
        });
    }
    if ext != ext.to_lowercase() {
        log::warn!("{} extension '{}' is not lowercase; matching is case-insensitive", domain, ext);
    }
    Ok(())
}
