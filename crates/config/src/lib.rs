//! Layered configuration for the prism index.
//!
//! Sources are merged in increasing order of precedence:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. An optional TOML file. A missing file is not an error.
//! 3. Environment variables prefixed with `PRISM_`, with nested keys
//!    separated by a double underscore (e.g. `PRISM_INDEX__MAX_SIZE`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size budget: 100 MB.
pub const DEFAULT_MAX_SIZE: u64 = 100_000_000;
const ENV_PREFIX: &str = "PRISM_";
const DATABASE_FILE: &str = "prism.db";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
}

/// Settings for opening a priority index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Location of the SQLite file backing the index.
    pub path: PathBuf,
    /// Ceiling on the total size of retained entries, in bytes.
    pub max_size: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// `<user cache dir>/prism/prism.db`, or `prism.db` in the working directory
/// when no home directory can be determined.
fn default_path() -> PathBuf {
    ProjectDirs::from("", "", "prism")
        .map(|dirs| dirs.cache_dir().join(DATABASE_FILE))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}

impl Config {
    /// The merged figment, before extraction. Exposed so that embedding
    /// applications can merge in their own providers.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the configuration from defaults, `file` and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file).extract().or_raise(|| ErrorKind::Invalid)?;
        tracing::debug!(
            path = %config.index.path.display(),
            max_size = config.index.max_size,
            "Loaded configuration"
        );
        Ok(config)
    }
}
