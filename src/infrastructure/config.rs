/// Configuration for Ripplemap.
///
/// Settings come from `ripplemap.toml` (or an explicit `--config` path),
/// with every field defaulting so an empty or missing file is valid.
use crate::domain::linker::AmbiguityPolicy;
use crate::domain::stitcher::{
    AnnotationMatcher, DisabledMatcher, EndpointMatcher, NamingConventionMatcher,
};
use crate::domain::traversal::TraversalLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "ripplemap.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub traversal: TraversalLimits,
    pub ambiguity: AmbiguityPolicy,
    pub stitching: StitchStrategy,
    pub store: StoreConfig,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            traversal: TraversalLimits::default(),
            ambiguity: AmbiguityPolicy::default(),
            stitching: StitchStrategy::default(),
            store: StoreConfig::default(),
            server_port: 7878,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StitchStrategy {
    #[default]
    NamingConvention,
    Annotation,
    Disabled,
}

impl StitchStrategy {
    pub fn matcher(&self) -> Box<dyn EndpointMatcher> {
        match self {
            StitchStrategy::NamingConvention => Box::new(NamingConventionMatcher),
            StitchStrategy::Annotation => Box::new(AnnotationMatcher),
            StitchStrategy::Disabled => Box::new(DisabledMatcher),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Disk,
            path: PathBuf::from("ripplemap.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    Disk,
}

impl Config {
    /// Load configuration. An explicit path must exist; the default file is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.traversal.max_depth, 1);
        assert_eq!(config.traversal.max_results, 100);
        assert_eq!(config.ambiguity, AmbiguityPolicy::FanOut);
        assert_eq!(config.stitching, StitchStrategy::NamingConvention);
        assert_eq!(config.store.backend, StoreBackend::Disk);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let raw = r#"
            ambiguity = "first_only"
            stitching = "disabled"

            [traversal]
            max_depth = 4
            max_results = 250

            [store]
            backend = "memory"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.ambiguity, AmbiguityPolicy::FirstOnly);
        assert_eq!(config.stitching, StitchStrategy::Disabled);
        assert_eq!(config.traversal.max_depth, 4);
        assert_eq!(config.traversal.max_results, 250);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        // Untouched fields keep defaults
        assert_eq!(config.server_port, 7878);
    }

    #[test]
    fn test_missing_default_file_is_fine() {
        let cwd_config = Config::load(None);
        assert!(cwd_config.is_ok());
    }
}
