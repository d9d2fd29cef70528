//! Framework version gate used for version-dependent defaults.
//!
//! The gate only ever yields a signal or no signal. A missing package, an
//! unreadable manifest or an unparseable version all mean "no signal".

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Package whose installed version drives version-dependent defaults.
pub const FRAMEWORK_PACKAGE: &str = "expo";

/// Versions below this threshold still need the React imports patcher.
pub const REACT_IMPORTS_PATCHER_RANGE: &str = "<52.0.0";

pub trait VersionGate: Send + Sync {
    /// Whether the project's framework version satisfies `range`, or `None` without a signal.
    fn satisfies(&self, project_root: &Path, range: &str) -> Option<bool>;
}

/// Reads the framework version from the nearest `node_modules/<pkg>/package.json`.
#[derive(Debug, Clone)]
pub struct PackageJsonVersionGate {
    package: String,
}

#[derive(Deserialize)]
struct PackageManifest {
    version: String,
}

impl Default for PackageJsonVersionGate {
    fn default() -> Self {
        Self::new(FRAMEWORK_PACKAGE)
    }
}

impl PackageJsonVersionGate {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
        }
    }

    /// Walks up from `project_root` like node module resolution does.
    fn find_manifest(&self, project_root: &Path) -> Option<PathBuf> {
        project_root
            .ancestors()
            .map(|dir| {
                dir.join("node_modules")
                    .join(&self.package)
                    .join("package.json")
            })
            .find(|candidate| candidate.is_file())
    }

    fn installed_version(&self, project_root: &Path) -> Option<Version> {
        let manifest_path = self.find_manifest(project_root)?;
        let content = fs::read_to_string(&manifest_path).ok()?;
        let manifest: PackageManifest = serde_json::from_str(&content).ok()?;
        match Version::parse(manifest.version.trim()) {
            Ok(version) => Some(version),
            Err(e) => {
                log::debug!(
                    "Ignoring unparseable version in {}: {}",
                    manifest_path.display(),
                    e
                );
                None
            }
        }
    }
}

impl VersionGate for PackageJsonVersionGate {
    fn satisfies(&self, project_root: &Path, range: &str) -> Option<bool> {
        let req = VersionReq::parse(range).ok()?;
        let version = self.installed_version(project_root)?;
        Some(req.matches(&version))
    }
}
