use crate::app::ignore::IgnorePaths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

/// A platform whose native project may contribute to the fingerprint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    /// Name of the native project directory at the project root.
    pub fn native_dir(self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_dir())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Md5,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
        })
    }
}

/// Bit-flag set of fingerprint sources the hashing engine should skip.
///
/// Deserializes from either the raw integer or a list of flag names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SourceSkipsRepr", into = "u32")]
pub struct SourceSkips(u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceSkipsRepr {
    Bits(u32),
    Names(Vec<String>),
}

impl SourceSkips {
    pub const NONE: SourceSkips = SourceSkips(0);
    pub const EXPO_CONFIG_VERSIONS: SourceSkips = SourceSkips(1 << 0);
    pub const EXPO_CONFIG_RUNTIME_VERSION_IF_STRING: SourceSkips = SourceSkips(1 << 1);
    pub const EXPO_CONFIG_NAMES: SourceSkips = SourceSkips(1 << 2);
    pub const EXPO_CONFIG_ANDROID_PACKAGE: SourceSkips = SourceSkips(1 << 3);
    pub const EXPO_CONFIG_IOS_BUNDLE_IDENTIFIER: SourceSkips = SourceSkips(1 << 4);
    pub const EXPO_CONFIG_SCHEMES: SourceSkips = SourceSkips(1 << 5);
    pub const EXPO_CONFIG_EAS_PROJECT: SourceSkips = SourceSkips(1 << 6);
    pub const EXPO_CONFIG_ASSETS: SourceSkips = SourceSkips(1 << 7);
    pub const EXPO_CONFIG_ALL: SourceSkips = SourceSkips(1 << 8);
    pub const PACKAGE_JSON_ANDROID_AND_IOS_SCRIPTS_IF_NOT_CONTAIN_RUN: SourceSkips =
        SourceSkips(1 << 9);
    pub const PACKAGE_JSON_SCRIPTS_ALL: SourceSkips = SourceSkips(1 << 10);
    pub const GIT_IGNORE: SourceSkips = SourceSkips(1 << 11);
    pub const EXPO_CONFIG_EXTRA_SECTION: SourceSkips = SourceSkips(1 << 12);

    const NAMED: [(&'static str, SourceSkips); 14] = [
        ("None", Self::NONE),
        ("ExpoConfigVersions", Self::EXPO_CONFIG_VERSIONS),
        (
            "ExpoConfigRuntimeVersionIfString",
            Self::EXPO_CONFIG_RUNTIME_VERSION_IF_STRING,
        ),
        ("ExpoConfigNames", Self::EXPO_CONFIG_NAMES),
        ("ExpoConfigAndroidPackage", Self::EXPO_CONFIG_ANDROID_PACKAGE),
        (
            "ExpoConfigIosBundleIdentifier",
            Self::EXPO_CONFIG_IOS_BUNDLE_IDENTIFIER,
        ),
        ("ExpoConfigSchemes", Self::EXPO_CONFIG_SCHEMES),
        ("ExpoConfigEASProject", Self::EXPO_CONFIG_EAS_PROJECT),
        ("ExpoConfigAssets", Self::EXPO_CONFIG_ASSETS),
        ("ExpoConfigAll", Self::EXPO_CONFIG_ALL),
        (
            "PackageJsonAndroidAndIosScriptsIfNotContainRun",
            Self::PACKAGE_JSON_ANDROID_AND_IOS_SCRIPTS_IF_NOT_CONTAIN_RUN,
        ),
        ("PackageJsonScriptsAll", Self::PACKAGE_JSON_SCRIPTS_ALL),
        ("GitIgnore", Self::GIT_IGNORE),
        ("ExpoConfigExtraSection", Self::EXPO_CONFIG_EXTRA_SECTION),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        SourceSkips(bits)
    }

    pub fn contains(self, other: SourceSkips) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }

    /// Names of the individual flags that are set, lowest bit first.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, flag)| flag.0 != 0 && self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for SourceSkips {
    type Output = SourceSkips;

    fn bitor(self, rhs: SourceSkips) -> SourceSkips {
        SourceSkips(self.0 | rhs.0)
    }
}

impl BitOrAssign for SourceSkips {
    fn bitor_assign(&mut self, rhs: SourceSkips) {
        self.0 |= rhs.0;
    }
}

impl From<SourceSkips> for u32 {
    fn from(skips: SourceSkips) -> u32 {
        skips.0
    }
}

impl TryFrom<SourceSkipsRepr> for SourceSkips {
    type Error = String;

    fn try_from(repr: SourceSkipsRepr) -> Result<Self, Self::Error> {
        match repr {
            SourceSkipsRepr::Bits(bits) => Ok(SourceSkips(bits)),
            SourceSkipsRepr::Names(names) => names.iter().try_fold(SourceSkips::NONE, |acc, n| {
                SourceSkips::from_name(n)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| format!("unknown source skip: {}", n))
            }),
        }
    }
}

/// Accepts a raw integer or a comma-separated list of flag names.
impl FromStr for SourceSkips {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(bits) = s.trim().parse::<u32>() {
            return Ok(SourceSkips(bits));
        }
        let names = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        SourceSkips::try_from(SourceSkipsRepr::Names(names))
    }
}

pub const DEFAULT_SOURCE_SKIPS: SourceSkips =
    SourceSkips::PACKAGE_JSON_ANDROID_AND_IOS_SCRIPTS_IF_NOT_CONTAIN_RUN;

/// How a platform's native project directory came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// Produced by generator tooling; excluded from the fingerprint.
    Managed,
    /// Checked into source control; part of the fingerprint.
    Bare,
}

impl Workflow {
    pub fn uses_generated_project(self) -> bool {
        matches!(self, Workflow::Managed)
    }
}

/// Options supplied by the caller. Unset fields never override lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions {
    pub platforms: Option<Vec<Platform>>,
    pub ignore_paths: Option<Vec<String>>,
    pub dir_excludes: Option<Vec<String>>,
    pub concurrent_io_limit: Option<NonZeroUsize>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub source_skips: Option<SourceSkips>,
    pub enable_react_imports_patcher: Option<bool>,
    pub debug: Option<bool>,
    pub silent: bool,
}

/// Settings persisted in the project's `fingerprint.config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersistedConfig {
    pub platforms: Option<Vec<Platform>>,
    pub ignore_paths: Option<Vec<String>>,
    pub concurrent_io_limit: Option<NonZeroUsize>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub source_skips: Option<SourceSkips>,
    pub enable_react_imports_patcher: Option<bool>,
    pub debug: Option<bool>,
}

/// One precedence layer of the mergeable scalar options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLayer {
    pub platforms: Option<BTreeSet<Platform>>,
    pub concurrent_io_limit: Option<NonZeroUsize>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub source_skips: Option<SourceSkips>,
    pub debug: Option<bool>,
}

/// Fully resolved options handed to the hashing engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOptions {
    pub platforms: BTreeSet<Platform>,
    pub concurrent_io_limit: NonZeroUsize,
    pub hash_algorithm: HashAlgorithm,
    pub source_skips: SourceSkips,
    pub debug: bool,
    pub enable_react_imports_patcher: bool,
    pub ignore_paths: IgnorePaths,
    #[serde(rename = "useCNGForPlatforms")]
    pub use_cng_for_platforms: BTreeMap<Platform, bool>,
}

impl NormalizedOptions {
    /// Platforms that were not requested are never managed.
    pub fn uses_generated_project(&self, platform: Platform) -> bool {
        self.use_cng_for_platforms
            .get(&platform)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_skips_parse_from_names_and_bits() {
        let skips: SourceSkips = "GitIgnore, ExpoConfigAssets".parse().unwrap();
        assert_eq!(
            skips,
            SourceSkips::GIT_IGNORE | SourceSkips::EXPO_CONFIG_ASSETS
        );
        assert_eq!(skips.names(), vec!["ExpoConfigAssets", "GitIgnore"]);

        let bits: SourceSkips = "512".parse().unwrap();
        assert_eq!(bits, DEFAULT_SOURCE_SKIPS);

        assert!("NotAFlag".parse::<SourceSkips>().is_err());
    }

    #[test]
    fn source_skips_deserialize_either_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            skips: SourceSkips,
        }

        let from_int: Wrapper = toml::from_str("skips = 2048").unwrap();
        assert_eq!(from_int.skips, SourceSkips::GIT_IGNORE);

        let from_names: Wrapper =
            toml::from_str(r#"skips = ["GitIgnore", "ExpoConfigVersions"]"#).unwrap();
        assert_eq!(
            from_names.skips,
            SourceSkips::GIT_IGNORE | SourceSkips::EXPO_CONFIG_VERSIONS
        );
    }

    #[test]
    fn unrequested_platform_is_not_managed() {
        let options = NormalizedOptions {
            platforms: BTreeSet::from([Platform::Ios]),
            concurrent_io_limit: NonZeroUsize::new(1).unwrap(),
            hash_algorithm: HashAlgorithm::Sha1,
            source_skips: DEFAULT_SOURCE_SKIPS,
            debug: false,
            enable_react_imports_patcher: false,
            ignore_paths: IgnorePaths::default(),
            use_cng_for_platforms: BTreeMap::from([(Platform::Ios, true)]),
        };
        assert!(options.uses_generated_project(Platform::Ios));
        assert!(!options.uses_generated_project(Platform::Android));
    }
}
