//! Resolution of caller, persisted and default options into `NormalizedOptions`.
//!
//! Ordering matters here. The ignore paths are collected first so the
//! workflow probes can discount excluded markers. Managed platforms are
//! appended to the ignore paths only once every probe has finished.

use crate::app::config::{default_concurrent_io_limit, fold_layers, load_persisted_config};
use crate::app::error::Result;
use crate::app::ignore::collect_ignore_paths;
use crate::app::models::{NormalizedOptions, OptionLayer, RawOptions, DEFAULT_SOURCE_SKIPS};
use crate::app::version::{PackageJsonVersionGate, VersionGate, REACT_IMPORTS_PATCHER_RANGE};
use crate::app::workflow::{
    resolve_workflows, workflows_to_flags, CancelToken, FsWorkflowProbe, WorkflowProbe,
};
use std::path::Path;

pub struct OptionsNormalizer {
    probe: Box<dyn WorkflowProbe>,
    version_gate: Box<dyn VersionGate>,
    cancel: CancelToken,
}

impl Default for OptionsNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsNormalizer {
    pub fn new() -> Self {
        Self {
            probe: Box::new(FsWorkflowProbe),
            version_gate: Box::new(PackageJsonVersionGate::default()),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: impl WorkflowProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_version_gate(mut self, version_gate: impl VersionGate + 'static) -> Self {
        self.version_gate = Box::new(version_gate);
        self
    }

    /// Shares cancellation with the surrounding fingerprint run.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn normalize(
        &self,
        project_root: &Path,
        options: Option<&RawOptions>,
    ) -> Result<NormalizedOptions> {
        let silent = options.is_some_and(|o| o.silent);
        let config = load_persisted_config(project_root, silent)?;

        let mut ignore_paths = collect_ignore_paths(
            project_root,
            config.as_ref().and_then(|c| c.ignore_paths.as_deref()),
            options,
        )?;

        let mut layers = vec![OptionLayer::defaults()];
        layers.extend(config.as_ref().map(OptionLayer::from));
        layers.extend(options.map(OptionLayer::from));
        let merged = fold_layers(&layers);

        let platforms = merged.platforms.unwrap_or_default();
        let concurrent_io_limit = merged
            .concurrent_io_limit
            .unwrap_or_else(default_concurrent_io_limit);

        let workflows = resolve_workflows(
            project_root,
            &platforms,
            &ignore_paths,
            self.probe.as_ref(),
            concurrent_io_limit,
            &self.cancel,
        )?;

        let enable_react_imports_patcher = options
            .and_then(|o| o.enable_react_imports_patcher)
            .or_else(|| config.as_ref().and_then(|c| c.enable_react_imports_patcher))
            .or_else(|| {
                self.version_gate
                    .satisfies(project_root, REACT_IMPORTS_PATCHER_RANGE)
            })
            .unwrap_or(false);

        for (platform, workflow) in &workflows {
            if workflow.uses_generated_project() {
                log::debug!("Excluding generated {} project", platform);
                ignore_paths.append(&format!("{}/**/*", platform.native_dir()))?;
            }
        }

        Ok(NormalizedOptions {
            platforms,
            concurrent_io_limit,
            hash_algorithm: merged.hash_algorithm.unwrap_or_default(),
            source_skips: merged.source_skips.unwrap_or(DEFAULT_SOURCE_SKIPS),
            debug: merged.debug.unwrap_or(false),
            enable_react_imports_patcher,
            ignore_paths,
            use_cng_for_platforms: workflows_to_flags(&workflows),
        })
    }
}

/// Normalizes with the filesystem probe and the package.json version gate.
pub fn normalize_options(
    project_root: &Path,
    options: Option<&RawOptions>,
) -> Result<NormalizedOptions> {
    OptionsNormalizer::new().normalize(project_root, options)
}
