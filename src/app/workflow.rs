//! Per-platform classification of native project directories.
//!
//! A platform is `Bare` when its native project is checked in, and `Managed`
//! when generator tooling produces it. Only requested platforms are probed.

use crate::app::error::{Error, Result};
use crate::app::ignore::IgnorePaths;
use crate::app::models::{Platform, Workflow};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Inspects one platform's native project. Called concurrently for different platforms.
pub trait WorkflowProbe: Send + Sync {
    fn probe(
        &self,
        project_root: &Path,
        platform: Platform,
        ignore_paths: &IgnorePaths,
    ) -> Result<Workflow>;
}

/// Cooperative cancellation shared by everything in one fingerprint run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Probes every requested platform on a pool of at most `concurrency` threads.
pub fn resolve_workflows(
    project_root: &Path,
    platforms: &BTreeSet<Platform>,
    ignore_paths: &IgnorePaths,
    probe: &dyn WorkflowProbe,
    concurrency: NonZeroUsize,
    cancel: &CancelToken,
) -> Result<BTreeMap<Platform, Workflow>> {
    if platforms.is_empty() {
        return Ok(BTreeMap::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.get().min(platforms.len()))
        .build()?;

    pool.install(|| {
        platforms
            .par_iter()
            .map(|&platform| -> Result<(Platform, Workflow)> {
                cancel.check()?;
                let workflow = probe.probe(project_root, platform, ignore_paths)?;
                cancel.check()?;
                log::debug!("Resolved {} workflow as {:?}", platform, workflow);
                Ok((platform, workflow))
            })
            .collect()
    })
}

pub fn workflows_to_flags(workflows: &BTreeMap<Platform, Workflow>) -> BTreeMap<Platform, bool> {
    workflows
        .iter()
        .map(|(platform, workflow)| (*platform, workflow.uses_generated_project()))
        .collect()
}

/// Treats a platform as bare when a checked-in project marker exists.
///
/// A marker only counts when it is present on disk, not excluded by the
/// fingerprint ignore paths and not ignored by git. Any I/O failure other
/// than a missing path is a probe error, since the scope is then unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWorkflowProbe;

impl FsWorkflowProbe {
    fn markers(project_root: &Path, platform: Platform) -> Result<Vec<String>> {
        let native_dir = project_root.join(platform.native_dir());
        let probe_error = |source| Error::WorkflowProbe {
            platform,
            path: native_dir.clone(),
            source,
        };
        let entries = match fs::read_dir(&native_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(probe_error(source)),
        };

        match platform {
            Platform::Android => Ok(vec![
                "android/app/build.gradle".to_string(),
                "android/app/build.gradle.kts".to_string(),
                "android/app/src/main/AndroidManifest.xml".to_string(),
            ]),
            Platform::Ios => {
                let mut markers = Vec::new();
                for entry in entries {
                    let name = entry.map_err(probe_error)?.file_name();
                    let name = name.to_string_lossy();
                    if name.ends_with(".xcodeproj") {
                        markers.push(format!("ios/{}/project.pbxproj", name));
                    }
                }
                markers.sort();
                Ok(markers)
            }
        }
    }

    fn marker_exists(project_root: &Path, platform: Platform, marker: &str) -> Result<bool> {
        let path = project_root.join(marker);
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(Error::WorkflowProbe {
                platform,
                path,
                source,
            }),
        }
    }
}

impl WorkflowProbe for FsWorkflowProbe {
    fn probe(
        &self,
        project_root: &Path,
        platform: Platform,
        ignore_paths: &IgnorePaths,
    ) -> Result<Workflow> {
        let markers = Self::markers(project_root, platform)?;
        if markers.is_empty() {
            return Ok(Workflow::Managed);
        }

        let vcs_ignore = VcsIgnore::discover(project_root);
        for marker in &markers {
            if ignore_paths.is_ignored(marker) {
                log::debug!("Marker {} is excluded from the fingerprint", marker);
                continue;
            }
            if !Self::marker_exists(project_root, platform, marker)? {
                continue;
            }
            if vcs_ignore.as_ref().is_some_and(|vcs| vcs.is_ignored(marker)) {
                log::debug!("Marker {} is git-ignored", marker);
                continue;
            }
            return Ok(Workflow::Bare);
        }

        Ok(Workflow::Managed)
    }
}

/// Git ignore rules for the checkout that contains a project.
///
/// Consults `.git/info/exclude` plus every `.gitignore` from the repository
/// root down to a path's directory. Deeper files take precedence.
struct VcsIgnore {
    repo_root: PathBuf,
    project_root: PathBuf,
}

impl VcsIgnore {
    /// Returns `None` when the project is not inside a git checkout.
    fn discover(project_root: &Path) -> Option<Self> {
        let project_root = fs::canonicalize(project_root).ok()?;
        let repo_root = project_root
            .ancestors()
            .find(|dir| dir.join(".git").exists())?
            .to_path_buf();
        Some(Self {
            repo_root,
            project_root,
        })
    }

    fn is_ignored(&self, marker: &str) -> bool {
        let path = self.project_root.join(marker);
        let Ok(relative) = path.strip_prefix(&self.repo_root) else {
            return false;
        };

        let mut sources = vec![(
            self.repo_root.clone(),
            self.repo_root.join(".git").join("info").join("exclude"),
        )];
        let mut dir = self.repo_root.clone();
        sources.push((dir.clone(), dir.join(".gitignore")));
        for component in relative.parent().into_iter().flat_map(Path::components) {
            dir.push(component);
            sources.push((dir.clone(), dir.join(".gitignore")));
        }

        for (dir, file) in sources.iter().rev() {
            let Some(gitignore) = load_gitignore(dir, file) else {
                continue;
            };
            match gitignore.matched_path_or_any_parents(&path, false) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }
}

fn load_gitignore(dir: &Path, file: &Path) -> Option<Gitignore> {
    if !file.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(dir);
    if let Some(e) = builder.add(file) {
        log::debug!("Partial ignore file at {}: {}", file.display(), e);
    }
    match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(e) => {
            log::debug!("Ignoring unusable {}: {}", file.display(), e);
            None
        }
    }
}
