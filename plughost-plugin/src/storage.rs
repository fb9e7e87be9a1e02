//! Per-plugin configuration files in JSON, YAML or XML

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PluginError, PluginResult};

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Json,
    Yaml,
    Xml,
}

impl ConfigFormat {
    /// File extension, without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
        }
    }

    /// Format matching a file extension, ignoring case
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ConfigFormat {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim())
            .ok_or_else(|| PluginError::generic(format!("Unknown config format: {}", s)))
    }
}

/// Serialize a value in the given format
pub fn to_string<T>(value: &T, format: ConfigFormat) -> PluginResult<String>
where
    T: Serialize + ?Sized,
{
    match format {
        ConfigFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        ConfigFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        ConfigFormat::Xml => {
            quick_xml::se::to_string(value).map_err(|e| PluginError::XmlSerialize(e.to_string()))
        }
    }
}

/// Deserialize a value from text in the given format
pub fn from_str<T>(text: &str, format: ConfigFormat) -> PluginResult<T>
where
    T: DeserializeOwned,
{
    match format {
        ConfigFormat::Json => Ok(serde_json::from_str(text)?),
        ConfigFormat::Yaml => Ok(serde_yaml::from_str(text)?),
        ConfigFormat::Xml => {
            quick_xml::de::from_str(text).map_err(|e| PluginError::XmlDeserialize(e.to_string()))
        }
    }
}

/// Configuration files of one plugin, rooted at its data directory
///
/// Files are named after the plugin: `<data dir>[/<subfolder>]/<name>.<ext>`.
/// Writes append and reads parse the whole file, so a file written more than
/// once no longer reads back as a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfigStore {
    data_dir: PathBuf,
    plugin_name: String,
}

impl PluginConfigStore {
    pub fn new(data_dir: impl Into<PathBuf>, plugin_name: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            plugin_name: plugin_name.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the configuration file for `format`
    pub fn path(&self, format: ConfigFormat, subfolder: Option<&str>) -> PathBuf {
        let mut path = self.data_dir.clone();
        if let Some(subfolder) = subfolder {
            path.push(subfolder);
        }
        path.push(format!("{}.{}", self.plugin_name, format.extension()));
        path
    }

    pub fn exists(&self, format: ConfigFormat, subfolder: Option<&str>) -> bool {
        self.path(format, subfolder).is_file()
    }

    /// Serialize `value` and append it to the configuration file
    ///
    /// Missing directories are created. Returns the file path.
    pub fn write<T>(
        &self,
        value: &T,
        format: ConfigFormat,
        subfolder: Option<&str>,
    ) -> PluginResult<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let path = self.path(format, subfolder);
        let text = to_string(value, format)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() > 0 {
            file.write_all(b"\n")?;
        }
        file.write_all(text.as_bytes())?;
        file.flush()?;

        tracing::debug!(
            target: "plugin_storage",
            plugin = %self.plugin_name,
            path = ?path,
            format = %format,
            "Configuration written"
        );
        Ok(path)
    }

    /// Deserialize the whole configuration file as one value
    pub fn read<T>(&self, format: ConfigFormat, subfolder: Option<&str>) -> PluginResult<T>
    where
        T: DeserializeOwned,
    {
        let path = self.path(format, subfolder);
        if !path.is_file() {
            return Err(PluginError::PluginFileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let text = std::fs::read_to_string(&path)?;
        from_str(&text, format)
    }
}
