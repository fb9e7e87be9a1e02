//! Plugin type definitions and utilities

use serde::{Deserialize, Serialize};
use std::fmt;

pub use semver::Version;

use crate::error::{PluginError, PluginResult};

/// Lifecycle state of a plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    /// Constructed and bound, not yet activated
    Instantiated,
    /// `on_loaded` has fired
    Loaded,
    /// Enabled
    Enabled,
    /// Disabled
    Disabled,
    /// Removed from the registry; terminal
    Unloaded,
}

impl PluginState {
    /// Whether the instance has completed its `loaded` transition and is still a member
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loaded | Self::Enabled | Self::Disabled)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instantiated => write!(f, "instantiated"),
            Self::Loaded => write!(f, "loaded"),
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
            Self::Unloaded => write!(f, "unloaded"),
        }
    }
}

/// Version bound to plugins that do not declare one
pub fn default_version() -> semver::Version {
    semver::Version::new(0, 1, 0)
}

/// Parse a plugin version, accepting the short `major` and `major.minor` forms
pub fn parse_version(s: &str) -> PluginResult<semver::Version> {
    let trimmed = s.trim();
    let invalid = |reason: String| PluginError::InvalidVersion {
        version: s.to_string(),
        reason,
    };

    if let Ok(version) = semver::Version::parse(trimmed) {
        return Ok(version);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid("expected up to three numeric components".to_string()));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|e| invalid(format!("'{}': {}", part, e)))?;
    }

    Ok(semver::Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Case-insensitive plugin name comparison used by every name lookup
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Check that a plugin name can serve as its data directory name
///
/// The name must be a single path component: not blank, not `.` or `..`,
/// and free of path separators and control characters.
pub fn validate_plugin_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name is empty".to_string());
    }
    if name == "." || name == ".." {
        return Err("name refers to a parent or current directory".to_string());
    }
    if name.contains(['/', '\\']) {
        return Err("name contains a path separator".to_string());
    }
    if name.chars().any(char::is_control) {
        return Err("name contains a control character".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_state_display() {
        assert_eq!(PluginState::Enabled.to_string(), "enabled");
        assert_eq!(PluginState::Instantiated.to_string(), "instantiated");
        assert_eq!(PluginState::Unloaded.to_string(), "unloaded");
    }

    #[test]
    fn test_plugin_state_is_active() {
        assert!(!PluginState::Instantiated.is_active());
        assert!(PluginState::Loaded.is_active());
        assert!(PluginState::Disabled.is_active());
        assert!(!PluginState::Unloaded.is_active());
    }

    #[test]
    fn test_default_version() {
        assert_eq!(default_version().to_string(), "0.1.0");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.2.3").unwrap(), semver::Version::new(1, 2, 3));
        assert_eq!(parse_version("0.1").unwrap(), semver::Version::new(0, 1, 0));
        assert_eq!(parse_version("2").unwrap(), semver::Version::new(2, 0, 0));

        let pre = parse_version("2.0.0-beta.1").unwrap();
        assert_eq!(pre.major, 2);
        assert!(!pre.pre.is_empty());

        assert!(parse_version("one.two").is_err());
        assert!(parse_version("1.2.3.4").is_err());
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Greeter", "greeter"));
        assert!(names_match("ÄRGER", "ärger"));
        assert!(!names_match("greeter", "greeter2"));
    }

    #[test]
    fn test_validate_plugin_name() {
        assert!(validate_plugin_name("Event Log").is_ok());
        assert!(validate_plugin_name("greeter.v2").is_ok());

        assert!(validate_plugin_name("").is_err());
        assert!(validate_plugin_name("   ").is_err());
        assert!(validate_plugin_name("..").is_err());
        assert!(validate_plugin_name("../escape").is_err());
        assert!(validate_plugin_name("a/b").is_err());
        assert!(validate_plugin_name("a\\b").is_err());
        assert!(validate_plugin_name("tab\there").is_err());
    }
}
