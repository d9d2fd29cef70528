//! Collection and compilation of the fingerprint ignore policy.
//!
//! Globs come from the built-in defaults, the persisted config, explicit
//! options, explicit directory excludes and the project's `.fingerprintignore`.
//! Every source is additive. A later `!pattern` re-includes a path that an
//! earlier pattern excluded.

use crate::app::error::{Error, Result};
use crate::app::models::RawOptions;
use globset::{GlobBuilder, GlobMatcher};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fs;
use std::io;
use std::path::Path;

pub const FINGERPRINT_IGNORE_FILENAME: &str = ".fingerprintignore";

pub const DEFAULT_IGNORE_PATHS: &[&str] = &[
    FINGERPRINT_IGNORE_FILENAME,
    // Android
    "**/android/build/**/*",
    "**/android/.cxx/**/*",
    "**/android/.gradle/**/*",
    "**/android/app/build/**/*",
    "**/android/app/.cxx/**/*",
    "**/android/app/.gradle/**/*",
    "**/android-annotation/build/**/*",
    "**/android-annotation/.cxx/**/*",
    "**/android-annotation/.gradle/**/*",
    "**/android-annotation-processor/build/**/*",
    "**/android-annotation-processor/.cxx/**/*",
    "**/android-annotation-processor/.gradle/**/*",
    // Line endings differ between checkouts
    "**/android/gradlew.bat",
    // Android gradle plugins
    "**/*-gradle-plugin/build/**/*",
    "**/*-gradle-plugin/.cxx/**/*",
    "**/*-gradle-plugin/.gradle/**/*",
    // iOS
    "**/ios/Pods/**/*",
    "**/ios/build/**/*",
    "**/ios/.xcode.env.local",
    "**/ios/**/project.xcworkspace",
    "**/ios/*.xcworkspace/xcuserdata/**/*",
    // Machine-specific system files
    "**/.DS_Store",
    // App configs are hashed structurally elsewhere
    "app.config.ts",
    "app.config.js",
    "app.config.json",
    "app.json",
    // Nested dependency trees
    "**/node_modules/**/node_modules/**",
    // Platform-dependent native binaries
    "**/node_modules/**/*.node",
    "**/node_modules/@img/sharp-*/**/*",
    "**/node_modules/sharp/{build,vendor}/**/*",
];

const DIR_SUFFIXES: [&str; 2] = ["/**/*", "/**"];

const GLOB_META: [char; 5] = ['*', '?', '[', '{', '\\'];

/// One compiled ignore glob. A pattern starting with `#` is a comment and
/// matches nothing.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    pattern: String,
    negate: bool,
    strip_parent_prefix: bool,
    glob: Option<GlobMatcher>,
}

impl IgnoreMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.starts_with('#') {
            return Ok(Self {
                pattern: pattern.to_string(),
                negate: false,
                strip_parent_prefix: false,
                glob: None,
            });
        }
        let (negate, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let glob = compile_glob(body).map_err(|source| Error::IgnorePattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            negate,
            strip_parent_prefix: body.starts_with("**/"),
            glob: Some(glob),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn is_comment(&self) -> bool {
        self.glob.is_none()
    }

    /// Tests the glob body, ignoring negation. `relative_path` uses `/` separators.
    pub fn is_match(&self, relative_path: &str) -> bool {
        let Some(glob) = &self.glob else {
            return false;
        };
        if self.strip_parent_prefix {
            glob.is_match(strip_parent_prefixes(relative_path))
        } else {
            glob.is_match(relative_path)
        }
    }

    fn body(&self) -> &str {
        self.pattern.strip_prefix('!').unwrap_or(&self.pattern)
    }

    /// The directory whose whole subtree this pattern excludes, if any.
    fn dir_prefix(&self) -> Option<&str> {
        if self.negate || self.is_comment() {
            return None;
        }
        DIR_SUFFIXES
            .iter()
            .find_map(|suffix| self.pattern.strip_suffix(suffix))
            .filter(|prefix| !prefix.is_empty())
    }
}

impl PartialEq for IgnoreMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for IgnoreMatcher {}

fn compile_glob(pattern: &str) -> std::result::Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()?
        .compile_matcher())
}

/// `**/` patterns also cover hoisted paths outside the root, like `../../node_modules/x`.
fn strip_parent_prefixes(mut path: &str) -> &str {
    while let Some(rest) = path.strip_prefix("../") {
        path = rest;
    }
    path
}

/// The ordered matcher list plus the subset usable for subtree pruning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnorePaths {
    matchers: Vec<IgnoreMatcher>,
    dir_matchers: Vec<IgnoreMatcher>,
}

impl IgnorePaths {
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| IgnoreMatcher::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let dir_matchers = build_dir_matchers(&matchers)?;
        Ok(Self {
            matchers,
            dir_matchers,
        })
    }

    pub fn matchers(&self) -> &[IgnoreMatcher] {
        &self.matchers
    }

    pub fn dir_matchers(&self) -> &[IgnoreMatcher] {
        &self.dir_matchers
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(IgnoreMatcher::pattern)
    }

    /// Compiles and appends `pattern`, then re-derives the directory matchers.
    pub fn append(&mut self, pattern: &str) -> Result<()> {
        self.matchers.push(IgnoreMatcher::new(pattern)?);
        self.dir_matchers = build_dir_matchers(&self.matchers)?;
        Ok(())
    }

    /// Evaluates the full ordered list against a project-relative path.
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        let mut ignored = false;
        for matcher in &self.matchers {
            if matcher.is_negated() {
                if ignored && matcher.is_match(relative_path) {
                    ignored = false;
                }
            } else if !ignored {
                ignored = matcher.is_match(relative_path);
            }
        }
        ignored
    }

    /// True when every path below `relative_dir` is ignored.
    pub fn is_dir_ignored(&self, relative_dir: &str) -> bool {
        self.dir_matchers.iter().any(|m| m.is_match(relative_dir))
    }
}

impl Serialize for IgnorePaths {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("IgnorePaths", 2)?;
        state.serialize_field(
            "matchers",
            &self.matchers.iter().map(|m| &m.pattern).collect::<Vec<_>>(),
        )?;
        state.serialize_field(
            "dirMatchers",
            &self.dir_matchers.iter().map(|m| &m.pattern).collect::<Vec<_>>(),
        )?;
        state.end()
    }
}

// A subtree pattern may prune only if no later negation can re-include a
// path below one of the directories it matches.
fn build_dir_matchers(matchers: &[IgnoreMatcher]) -> Result<Vec<IgnoreMatcher>> {
    let mut dir_matchers = Vec::new();
    for (i, matcher) in matchers.iter().enumerate() {
        let Some(prefix) = matcher.dir_prefix() else {
            continue;
        };
        let dir = IgnoreMatcher::new(prefix)?;
        let blocked = matchers[i + 1..]
            .iter()
            .filter(|m| m.is_negated())
            .any(|negation| may_reinclude_below(&dir, negation));
        if blocked {
            log::debug!("Not pruning {}: a later negation may re-include", prefix);
        } else {
            dir_matchers.push(dir);
        }
    }
    Ok(dir_matchers)
}

/// Leading `/`-separated components without glob syntax, and whether that
/// covered the whole path.
fn literal_components(path: &str) -> (Vec<&str>, bool) {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    match components.iter().position(|c| c.contains(GLOB_META)) {
        Some(i) => (components[..i].to_vec(), false),
        None => (components, true),
    }
}

fn may_reinclude_below(dir: &IgnoreMatcher, negation: &IgnoreMatcher) -> bool {
    let body = negation.body();
    let (parent, name) = body.rsplit_once('/').unwrap_or(("", body));
    let (literal, exact) = literal_components(parent);

    let mut ancestor = String::new();
    for component in &literal {
        if !ancestor.is_empty() {
            ancestor.push('/');
        }
        ancestor.push_str(component);
        if dir.is_match(&ancestor) {
            return true;
        }
    }
    if exact && !name.contains("**") {
        // Every re-included path sits directly inside `literal`.
        return false;
    }

    let (dir_literal, _) = literal_components(dir.pattern());
    dir_literal.iter().zip(&literal).all(|(a, b)| a == b)
}

/// Outcome of reading the project-local ignore file.
#[derive(Debug)]
pub enum IgnoreFile {
    Loaded(Vec<String>),
    Missing,
    Unreadable(io::Error),
}

pub fn read_ignore_file(path: &Path) -> IgnoreFile {
    match fs::read_to_string(path) {
        Ok(content) => IgnoreFile::Loaded(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        ),
        Err(e) if e.kind() == io::ErrorKind::NotFound => IgnoreFile::Missing,
        Err(e) => IgnoreFile::Unreadable(e),
    }
}

/// Gathers every ignore source for `project_root` and compiles the result.
pub fn collect_ignore_paths(
    project_root: &Path,
    config_globs: Option<&[String]>,
    options: Option<&RawOptions>,
) -> Result<IgnorePaths> {
    let mut patterns: Vec<String> = DEFAULT_IGNORE_PATHS.iter().map(|p| p.to_string()).collect();

    if let Some(globs) = config_globs {
        patterns.extend(globs.iter().cloned());
    }
    if let Some(globs) = options.and_then(|o| o.ignore_paths.as_ref()) {
        patterns.extend(globs.iter().cloned());
    }
    if let Some(dirs) = options.and_then(|o| o.dir_excludes.as_ref()) {
        patterns.extend(dirs.iter().map(|dir| format!("{}/**/*", dir)));
    }

    let ignore_file = project_root.join(FINGERPRINT_IGNORE_FILENAME);
    match read_ignore_file(&ignore_file) {
        IgnoreFile::Loaded(lines) => {
            log::debug!(
                "Loaded {} patterns from {}",
                lines.len(),
                ignore_file.display()
            );
            patterns.extend(lines);
        }
        IgnoreFile::Missing => {}
        IgnoreFile::Unreadable(e) => {
            log::warn!("Skipping unreadable {}: {}", ignore_file.display(), e);
        }
    }

    IgnorePaths::from_patterns(&patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn defaults() -> IgnorePaths {
        IgnorePaths::from_patterns(DEFAULT_IGNORE_PATHS).unwrap()
    }

    #[rstest]
    #[case("android/build/outputs/app.apk")]
    #[case("android/app/build/intermediates/x.dex")]
    #[case("android/gradlew.bat")]
    #[case("node_modules/foo/android/.gradle/cache.bin")]
    #[case("ios/Pods/Manifest.lock")]
    #[case("ios/App.xcworkspace/xcuserdata/me.xcuserdatad/state.plist")]
    #[case("ios/App.xcodeproj/project.xcworkspace")]
    #[case("src/.DS_Store")]
    #[case("app.json")]
    #[case("node_modules/a/node_modules/b/index.js")]
    #[case("node_modules/fsevents/fsevents.node")]
    #[case("node_modules/sharp/vendor/lib/libvips.so")]
    #[case("node_modules/@img/sharp-darwin-arm64/lib/sharp.node")]
    #[case(".fingerprintignore")]
    #[case("../../node_modules/a/node_modules/b/index.js")]
    fn defaults_exclude_nondeterministic_paths(#[case] path: &str) {
        assert!(defaults().is_ignored(path), "{} should be ignored", path);
    }

    #[rstest]
    #[case("android/app/build.gradle")]
    #[case("ios/App.xcodeproj/project.pbxproj")]
    #[case("package.json")]
    #[case("src/app.json")]
    #[case("node_modules/react-native/package.json")]
    fn defaults_keep_source_paths(#[case] path: &str) {
        assert!(!defaults().is_ignored(path), "{} should be kept", path);
    }

    #[test]
    fn invalid_pattern_names_the_pattern() {
        let err = IgnorePaths::from_patterns(["ok/**", "broken/[a"]).unwrap_err();
        match err {
            Error::IgnorePattern { pattern, .. } => assert_eq!(pattern, "broken/[a"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn negation_reincludes_later() {
        let paths = IgnorePaths::from_patterns(["assets/**/*", "!assets/icon.png"]).unwrap();
        assert!(paths.is_ignored("assets/splash.png"));
        assert!(!paths.is_ignored("assets/icon.png"));
        // The subtree may not be pruned while a negation follows it.
        assert!(paths.dir_matchers().is_empty());
    }

    #[rstest]
    #[case("!generated/keep.ts", &["vendor", "**/out"])]
    #[case("!vendor/keep.c", &["generated", "**/out"])]
    #[case("!pkg/out/keep.ts", &["generated", "vendor"])]
    #[case("!keep.ts", &["generated", "vendor", "**/out"])]
    #[case("!generated/**/keep.ts", &["vendor"])]
    #[case("!**/keep.ts", &[])]
    fn negation_blocks_only_enclosing_dirs(#[case] negation: &str, #[case] expected: &[&str]) {
        let paths = IgnorePaths::from_patterns([
            "generated/**/*",
            "vendor/**",
            "**/out/**/*",
            negation,
        ])
        .unwrap();
        let dirs: Vec<&str> = paths.dir_matchers().iter().map(|m| m.pattern()).collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn defaults_still_prune_before_unrelated_negation() {
        let patterns = DEFAULT_IGNORE_PATHS
            .iter()
            .copied()
            .chain(["assets/**/*", "!assets/icon.png"]);
        let paths = IgnorePaths::from_patterns(patterns).unwrap();
        assert!(paths.is_dir_ignored("ios/Pods"));
        assert!(paths.is_dir_ignored("node_modules/sharp/vendor"));
        assert!(!paths.is_dir_ignored("assets"));
        assert!(!paths.is_ignored("assets/icon.png"));
    }

    #[test]
    fn dir_matchers_follow_last_negation() {
        let paths =
            IgnorePaths::from_patterns(["a/**/*", "!a/keep", "b/**", "c/*.txt", "**/out/**/*"])
                .unwrap();
        let dirs: Vec<&str> = paths.dir_matchers().iter().map(|m| m.pattern()).collect();
        assert_eq!(dirs, vec!["b", "**/out"]);
        assert!(paths.is_dir_ignored("b"));
        assert!(paths.is_dir_ignored("pkg/out"));
        assert!(!paths.is_dir_ignored("a"));
        assert!(!paths.is_dir_ignored("c"));
    }

    #[rstest]
    #[case("pkg/out")]
    #[case("android/build")]
    #[case("ios/Pods")]
    #[case("node_modules/sharp/build")]
    fn dir_matchers_imply_full_match(#[case] dir: &str) {
        let paths = defaults();
        let mut with_out = paths.clone();
        with_out.append("**/out/**/*").unwrap();
        assert!(with_out.is_dir_ignored(dir));
        for child in ["x", "x/y.z", ".hidden/file"] {
            let path = format!("{}/{}", dir, child);
            assert!(with_out.is_ignored(&path), "{} should be ignored", path);
        }
    }

    #[test]
    fn append_rederives_dir_matchers() {
        let mut paths = IgnorePaths::from_patterns(["src/*.tmp"]).unwrap();
        assert!(!paths.is_dir_ignored("android"));
        paths.append("android/**/*").unwrap();
        assert!(paths.is_dir_ignored("android"));
        assert!(paths.is_ignored("android/app/build.gradle"));
        assert_eq!(paths.patterns().last(), Some("android/**/*"));
    }

    #[test]
    fn collects_every_source() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(FINGERPRINT_IGNORE_FILENAME),
            "\n  scripts/**/*  \n\n*.log\n",
        )
        .unwrap();
        let config_globs = vec!["dist/**".to_string()];
        let options = RawOptions {
            ignore_paths: Some(vec!["tmp/**".to_string()]),
            dir_excludes: Some(vec!["vendor".to_string()]),
            ..Default::default()
        };

        let paths =
            collect_ignore_paths(temp_dir.path(), Some(&config_globs), Some(&options)).unwrap();

        let extra: Vec<&str> = paths.patterns().skip(DEFAULT_IGNORE_PATHS.len()).collect();
        assert_eq!(
            extra,
            vec!["dist/**", "tmp/**", "vendor/**/*", "scripts/**/*", "*.log"]
        );
        assert!(paths.is_ignored("vendor/lib/a.c"));
        assert!(paths.is_ignored("build.log"));
        assert!(!paths.is_ignored("src/index.ts"));
    }

    #[test]
    fn comment_lines_match_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(FINGERPRINT_IGNORE_FILENAME),
            "# generated files {see docs\n# [legacy\nbuild/**/*\n",
        )
        .unwrap();

        let paths = collect_ignore_paths(temp_dir.path(), None, None).unwrap();

        assert!(paths.is_ignored("build/out.js"));
        assert!(!paths.is_ignored("# generated files {see docs"));
        assert_eq!(paths.matchers().iter().filter(|m| m.is_comment()).count(), 2);
        assert!(paths.is_dir_ignored("build"));
    }

    #[test]
    fn escaped_hash_is_a_literal_pattern() {
        let paths = IgnorePaths::from_patterns(["\\#notes.md"]).unwrap();
        assert!(paths.is_ignored("#notes.md"));
    }

    #[test]
    fn missing_ignore_file_equals_empty_one() {
        let missing = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fs::write(empty.path().join(FINGERPRINT_IGNORE_FILENAME), "\n   \n").unwrap();

        assert!(matches!(
            read_ignore_file(&missing.path().join(FINGERPRINT_IGNORE_FILENAME)),
            IgnoreFile::Missing
        ));
        assert_eq!(
            collect_ignore_paths(missing.path(), None, None).unwrap(),
            collect_ignore_paths(empty.path(), None, None).unwrap()
        );
    }

    #[test]
    fn unreadable_ignore_file_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        // A directory in place of the file fails with something other than NotFound.
        fs::create_dir(temp_dir.path().join(FINGERPRINT_IGNORE_FILENAME)).unwrap();

        assert!(matches!(
            read_ignore_file(&temp_dir.path().join(FINGERPRINT_IGNORE_FILENAME)),
            IgnoreFile::Unreadable(_)
        ));
        assert_eq!(
            collect_ignore_paths(temp_dir.path(), None, None).unwrap(),
            defaults()
        );
    }
}
