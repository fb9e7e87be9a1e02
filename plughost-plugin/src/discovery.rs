//! Plugin discovery: scanning the plugin directory and constructing plugin types

use serde::{Deserialize, Serialize};
use std::panic;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::Plugin;
use crate::error::{PluginError, PluginResult};
use crate::loader::LoadedModule;

/// A module artifact found in the plugin directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredArtifact {
    /// Artifact path
    pub path: PathBuf,
    /// Artifact size in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the artifact, when checksums are enabled
    pub checksum: Option<String>,
    /// Discovery timestamp
    pub discovered_at: chrono::DateTime<chrono::Utc>,
}

/// An artifact the scan found but could not inspect
#[derive(Debug)]
pub struct RejectedArtifact {
    pub path: PathBuf,
    pub error: PluginError,
}

/// Result of scanning the plugin directory
#[derive(Debug, Default)]
pub struct DiscoveryScan {
    /// Usable artifacts, sorted by file name
    pub artifacts: Vec<DiscoveredArtifact>,
    /// Artifacts rejected during the scan
    pub rejected: Vec<RejectedArtifact>,
}

impl DiscoveryScan {
    fn reject(&mut self, path: PathBuf, error: PluginError) {
        tracing::warn!(
            target: "plugin_discovery",
            path = ?path,
            error = %error,
            "Skipping artifact that could not be inspected"
        );
        self.rejected.push(RejectedArtifact { path, error });
    }
}

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Extensions to accept, compared case-insensitively
    pub extensions: Vec<String>,
    /// Hash every artifact found
    pub calculate_checksums: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["so".to_string(), "dll".to_string(), "dylib".to_string()],
            calculate_checksums: false,
        }
    }
}

/// Finds module artifacts and turns module factories into plugin objects
#[derive(Debug, Clone, Default)]
pub struct PluginDiscovery {
    config: DiscoveryConfig,
}

impl PluginDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// List artifacts directly inside `dir`, sorted by file name
    ///
    /// Subdirectories are not descended into; a missing directory yields
    /// nothing. Artifacts that cannot be inspected are logged and left out;
    /// use [`scan_all`](Self::scan_all) to get them back.
    pub fn scan(&self, dir: &Path) -> PluginResult<Vec<DiscoveredArtifact>> {
        self.scan_all(dir).map(|scan| scan.artifacts)
    }

    /// Scan `dir`, keeping artifacts that could not be inspected apart
    ///
    /// Only a failure to read `dir` itself is an error. A dangling symlink,
    /// an unreadable entry or a failed checksum rejects that artifact alone.
    pub fn scan_all(&self, dir: &Path) -> PluginResult<DiscoveryScan> {
        let mut scan = DiscoveryScan::default();
        if !dir.exists() {
            tracing::debug!(target: "plugin_discovery", directory = ?dir, "Plugin directory does not exist");
            return Ok(scan);
        }

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) if error.depth() == 0 => {
                    return Err(PluginError::generic(format!(
                        "Failed to read plugin directory: {}",
                        error
                    )));
                }
                Err(error) => {
                    let path = error
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| dir.to_path_buf());
                    let error = PluginError::generic(format!("Failed to read directory entry: {}", error));
                    scan.reject(path, error);
                    continue;
                }
            };

            let path = entry.path().to_path_buf();
            if !self.matches_extension(&path) {
                continue;
            }

            // Follows symlinks, so versioned library links are picked up
            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(error) => {
                    scan.reject(path, error.into());
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let checksum = if self.config.calculate_checksums {
                match Self::checksum(&path) {
                    Ok(checksum) => Some(checksum),
                    Err(error) => {
                        scan.reject(path, error);
                        continue;
                    }
                }
            } else {
                None
            };

            tracing::debug!(
                target: "plugin_discovery",
                path = ?path,
                size_bytes = metadata.len(),
                "Discovered module artifact"
            );

            scan.artifacts.push(DiscoveredArtifact {
                path,
                size_bytes: metadata.len(),
                checksum,
                discovered_at: chrono::Utc::now(),
            });
        }

        tracing::info!(
            target: "plugin_discovery",
            directory = ?dir,
            count = scan.artifacts.len(),
            rejected = scan.rejected.len(),
            "Plugin discovery completed"
        );

        Ok(scan)
    }

    /// Run every factory of `module`, in order
    ///
    /// A factory that fails or panics yields an `InstantiationFailed` entry
    /// and does not affect the others.
    pub fn instantiate(&self, module: &LoadedModule) -> Vec<PluginResult<Box<dyn Plugin>>> {
        module
            .factories
            .iter()
            .map(|factory| {
                match panic::catch_unwind(*factory) {
                    Ok(Ok(plugin)) => Ok(plugin),
                    Ok(Err(error)) => Err(PluginError::InstantiationFailed {
                        source_path: module.path.clone(),
                        reason: error.to_string(),
                    }),
                    Err(payload) => Err(PluginError::InstantiationFailed {
                        source_path: module.path.clone(),
                        reason: format!("constructor panicked: {}", panic_message(payload.as_ref())),
                    }),
                }
            })
            .collect()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    fn checksum(path: &Path) -> PluginResult<String> {
        use sha2::{Digest, Sha256};

        let bytes = std::fs::read(path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{factory_for, PluginContext, PluginMetadata};
    use std::any::Any;
    use tempfile::TempDir;

    struct Ok1 {
        metadata: PluginMetadata,
    }

    impl Default for Ok1 {
        fn default() -> Self {
            Self {
                metadata: PluginMetadata::new("ok"),
            }
        }
    }

    impl Plugin for Ok1 {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn on_loaded(&mut self, _context: &PluginContext) -> PluginResult<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn failing() -> PluginResult<Box<dyn Plugin>> {
        Err(PluginError::generic("no resources"))
    }

    fn panicking() -> PluginResult<Box<dyn Plugin>> {
        panic!("constructor exploded")
    }

    fn touch(dir: &TempDir, name: &str, contents: &[u8]) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(&temp_dir, "b.so", b"b");
        touch(&temp_dir, "a.SO", b"a");
        touch(&temp_dir, "notes.txt", b"ignored");
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested").join("c.so"), b"c").unwrap();

        let discovery = PluginDiscovery::default();
        let artifacts = discovery.scan(temp_dir.path()).unwrap();

        let names: Vec<_> = artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.SO", "b.so"]);
        assert_eq!(artifacts[0].size_bytes, 1);
        assert!(artifacts[0].checksum.is_none());
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let discovery = PluginDiscovery::default();
        assert!(discovery.scan(&temp_dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_scan_with_checksums() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(&temp_dir, "empty.so", b"");

        let discovery = PluginDiscovery::new(DiscoveryConfig {
            calculate_checksums: true,
            ..Default::default()
        });
        let artifacts = discovery.scan(temp_dir.path()).unwrap();

        assert_eq!(
            artifacts[0].checksum.as_deref(),
            Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    #[test]
    fn test_instantiate_isolates_failures() {
        let module = LoadedModule::new(
            "module.so",
            vec![failing, factory_for::<Ok1>, panicking, factory_for::<Ok1>],
        );

        let results = PluginDiscovery::default().instantiate(&module);
        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], Err(PluginError::InstantiationFailed { .. })));
        assert!(results[1].is_ok());
        match &results[2] {
            Err(PluginError::InstantiationFailed { reason, .. }) => {
                assert!(reason.contains("constructor exploded"))
            }
            other => panic!("unexpected result: {:?}", other.as_ref().map(|p| p.name().to_string())),
        }
        assert!(results[3].is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinks_and_rejects_dangling_ones() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let real = target_dir.path().join("libreal.so.1");
        std::fs::write(&real, b"lib").unwrap();
        std::os::unix::fs::symlink(&real, temp_dir.path().join("a.so")).unwrap();
        std::os::unix::fs::symlink(target_dir.path().join("gone.so"), temp_dir.path().join("b.so")).unwrap();

        let scan = PluginDiscovery::default().scan_all(temp_dir.path()).unwrap();

        assert_eq!(scan.artifacts.len(), 1);
        assert_eq!(scan.artifacts[0].path, temp_dir.path().join("a.so"));
        assert_eq!(scan.artifacts[0].size_bytes, 3);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].path, temp_dir.path().join("b.so"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_artifact_does_not_abort_checksum_scan() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        touch(&temp_dir, "a.so", b"");
        touch(&temp_dir, "z.so", b"secret");
        let locked = temp_dir.path().join("z.so");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the file anyway
        if std::fs::read(&locked).is_ok() {
            return;
        }

        let discovery = PluginDiscovery::new(DiscoveryConfig {
            calculate_checksums: true,
            ..Default::default()
        });
        let scan = discovery.scan_all(temp_dir.path()).unwrap();

        assert_eq!(scan.artifacts.len(), 1);
        assert_eq!(scan.artifacts[0].path, temp_dir.path().join("a.so"));
        assert!(scan.artifacts[0].checksum.is_some());
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].path, locked);
        assert!(matches!(scan.rejected[0].error, PluginError::IoError(_)));
        assert_eq!(discovery.scan(temp_dir.path()).unwrap().len(), 1);
    }
}
