use crate::app::models::{HashAlgorithm, Platform, RawOptions, SourceSkips};
use clap::{ArgAction, Parser};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Resolve which project files make up the native build fingerprint"
)]
pub struct Cli {
    /// Project root (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Platforms to fingerprint
    #[arg(long = "platform", value_enum, num_args = 1..)]
    pub platforms: Option<Vec<Platform>>,

    /// Extra glob patterns to exclude (e.g., 'dist/**')
    #[arg(long = "ignore-path", num_args = 1..)]
    pub ignore_paths: Option<Vec<String>>,

    /// Directories to exclude entirely
    #[arg(long = "dir-exclude", num_args = 1..)]
    pub dir_excludes: Option<Vec<String>>,

    /// Maximum number of concurrent filesystem probes
    #[arg(long)]
    pub concurrent_io_limit: Option<NonZeroUsize>,

    #[arg(long, value_enum)]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Sources to skip, as a bitmask or comma-separated flag names
    #[arg(long)]
    pub source_skips: Option<SourceSkips>,

    /// Force the React imports patcher on or off
    #[arg(long, action = ArgAction::Set)]
    pub enable_react_imports_patcher: Option<bool>,

    #[arg(long)]
    pub debug: bool,

    /// Suppress informational config messages
    #[arg(long)]
    pub silent: bool,

    /// Print the resolved options as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the files inside the fingerprint scope instead of the options
    #[arg(long, conflicts_with = "json")]
    pub list_files: bool,
}

impl Cli {
    /// Unset flags stay `None` so persisted settings still apply.
    pub fn to_options(&self) -> RawOptions {
        RawOptions {
            platforms: self.platforms.clone(),
            ignore_paths: self.ignore_paths.clone(),
            dir_excludes: self.dir_excludes.clone(),
            concurrent_io_limit: self.concurrent_io_limit,
            hash_algorithm: self.hash_algorithm,
            source_skips: self.source_skips,
            enable_react_imports_patcher: self.enable_react_imports_patcher,
            debug: self.debug.then_some(true),
            silent: self.silent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_map_to_none() {
        let cli = Cli::parse_from(["native-fingerprint"]);
        let options = cli.to_options();
        assert_eq!(options, RawOptions::default());
    }

    #[test]
    fn explicit_flags_map_to_options() {
        let cli = Cli::parse_from([
            "native-fingerprint",
            "app",
            "--platform",
            "ios",
            "--ignore-path",
            "tmp/**",
            "--dir-exclude",
            "vendor",
            "--concurrent-io-limit",
            "2",
            "--hash-algorithm",
            "md5",
            "--source-skips",
            "GitIgnore,ExpoConfigNames",
            "--enable-react-imports-patcher",
            "false",
            "--silent",
        ]);
        assert_eq!(cli.root, Some(PathBuf::from("app")));

        let options = cli.to_options();
        assert_eq!(options.platforms, Some(vec![Platform::Ios]));
        assert_eq!(options.ignore_paths, Some(vec!["tmp/**".to_string()]));
        assert_eq!(options.dir_excludes, Some(vec!["vendor".to_string()]));
        assert_eq!(options.concurrent_io_limit, NonZeroUsize::new(2));
        assert_eq!(options.hash_algorithm, Some(HashAlgorithm::Md5));
        assert_eq!(
            options.source_skips,
            Some(SourceSkips::GIT_IGNORE | SourceSkips::EXPO_CONFIG_NAMES)
        );
        assert_eq!(options.enable_react_imports_patcher, Some(false));
        assert_eq!(options.debug, None);
        assert!(options.silent);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["native-fingerprint", "--concurrent-io-limit", "0"]).is_err());
    }
}
