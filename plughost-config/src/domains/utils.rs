//! Default value helpers shared by the configuration domains

use std::path::PathBuf;

/// Default functions for serde
pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

/// Plugin root relative to the working directory
pub fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

pub fn default_extensions() -> Vec<String> {
    vec!["so".to_string(), "dll".to_string(), "dylib".to_string()]
}

pub fn default_capacity() -> usize {
    5000
}

/// Split a comma separated list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
