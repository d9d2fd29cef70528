//! Resolves the effective options for fingerprinting a project's native build surface.
//!
//! [`normalize_options`] folds defaults, the persisted `fingerprint.config.toml`
//! and caller options into one immutable [`NormalizedOptions`], including the
//! compiled ignore policy and per-platform workflow flags.

pub mod app;

pub use app::error::{Error, Result};
pub use app::ignore::{IgnoreMatcher, IgnorePaths};
pub use app::models::{
    HashAlgorithm, NormalizedOptions, PersistedConfig, Platform, RawOptions, SourceSkips,
    Workflow,
};
pub use app::normalize::{normalize_options, OptionsNormalizer};
pub use app::version::VersionGate;
pub use app::workflow::{CancelToken, WorkflowProbe};
