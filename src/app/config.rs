use crate::app::error::{Error, Result};
use crate::app::models::{
    OptionLayer, PersistedConfig, Platform, RawOptions, DEFAULT_SOURCE_SKIPS,
};
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "fingerprint.config.toml";

/// Loads `fingerprint.config.toml` from the project root, if there is one.
pub fn load_persisted_config(project_root: &Path, silent: bool) -> Result<Option<PersistedConfig>> {
    let config_path = project_root.join(CONFIG_FILENAME);

    let content = match fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No persisted config at {}", config_path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(Error::ConfigRead {
                path: config_path,
                source,
            })
        }
    };

    let parsed: PersistedConfig = toml::from_str(&content).map_err(|source| Error::ConfigParse {
        path: config_path.clone(),
        source,
    })?;

    if !silent {
        log::info!("Using custom fingerprint config from {}", config_path.display());
    }

    Ok(Some(parsed))
}

impl OptionLayer {
    /// The hardcoded bottom layer. Every field is set.
    pub fn defaults() -> Self {
        Self {
            platforms: Some(Platform::ALL.into_iter().collect()),
            concurrent_io_limit: Some(default_concurrent_io_limit()),
            hash_algorithm: Some(Default::default()),
            source_skips: Some(DEFAULT_SOURCE_SKIPS),
            debug: Some(false),
        }
    }

    /// Fields set in `upper` win. Unset fields in `upper` keep `self`'s value.
    pub fn overlay(self, upper: &OptionLayer) -> Self {
        Self {
            platforms: upper.platforms.clone().or(self.platforms),
            concurrent_io_limit: upper.concurrent_io_limit.or(self.concurrent_io_limit),
            hash_algorithm: upper.hash_algorithm.or(self.hash_algorithm),
            source_skips: upper.source_skips.or(self.source_skips),
            debug: upper.debug.or(self.debug),
        }
    }
}

impl From<&PersistedConfig> for OptionLayer {
    fn from(config: &PersistedConfig) -> Self {
        Self {
            platforms: config.platforms.as_ref().map(|p| p.iter().copied().collect()),
            concurrent_io_limit: config.concurrent_io_limit,
            hash_algorithm: config.hash_algorithm,
            source_skips: config.source_skips,
            debug: config.debug,
        }
    }
}

impl From<&RawOptions> for OptionLayer {
    fn from(options: &RawOptions) -> Self {
        Self {
            platforms: options.platforms.as_ref().map(|p| p.iter().copied().collect()),
            concurrent_io_limit: options.concurrent_io_limit,
            hash_algorithm: options.hash_algorithm,
            source_skips: options.source_skips,
            debug: options.debug,
        }
    }
}

/// Folds layers left to right; later layers take precedence field by field.
pub fn fold_layers(layers: &[OptionLayer]) -> OptionLayer {
    layers
        .iter()
        .fold(OptionLayer::default(), |merged, layer| merged.overlay(layer))
}

pub fn default_concurrent_io_limit() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}
