use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

mod error;
mod icon;

pub use error::*;
pub use icon::*;

/// Name of the config file, looked up in the current working directory.
pub const CONFIG_FILE_NAME: &str = "icons.toml";

/// Written when no config file exists yet.
pub const DEFAULT_CONFIG: &str = r#"[[icons]]
src = "demo.kra"
dst = "./demo.ico"
"#;

/// Trayicons configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Icons to generate, in document order.
    #[serde(default)]
    pub icons: Vec<IconEntry>,
}

impl Config {
    /// Default config path: `$CWD/icons.toml`
    pub fn path() -> Result<PathBuf> {
        std::env::current_dir()
            .map(|p| p.join(CONFIG_FILE_NAME))
            .map_err(Into::into)
    }

    /// Loads config from a toml string
    pub fn from_toml(toml: &str) -> Result<Self> {
        let span = tracing::debug_span!("config::from_toml");
        let _enter = span.enter();

        toml::from_str(toml).map_err(Into::into)
    }

    /// Loads config from path, writing [`DEFAULT_CONFIG`] there first if it doesn't exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml = load_or_bootstrap(path)?;
        Self::from_toml(&toml)
    }

    /// Loads config from a canonical path, see [`Self::path`]
    pub fn load() -> Result<Self> {
        let span = tracing::debug_span!("config::load");
        let _enter = span.enter();

        let toml = locate_or_bootstrap()?;
        let config = Self::from_toml(&toml)?;
        tracing::info!("Config loaded: {config:?}");
        Ok(config)
    }
}

/// Parses the raw config text.
#[inline]
pub fn parse(text: &str) -> Result<Config> {
    Config::from_toml(text)
}

/// Reads the config file at [`Config::path`], see [`load_or_bootstrap`].
pub fn locate_or_bootstrap() -> Result<String> {
    let path = Config::path()?;
    load_or_bootstrap(path)
}

/// Reads the config file at `path`.
///
/// When the file doesn't exist, it is created with [`DEFAULT_CONFIG`] and
/// [`Error::Bootstrapped`] is returned so the caller can stop and let the
/// user edit it.
pub fn load_or_bootstrap<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    let span = tracing::debug_span!("config::load_or_bootstrap", ?path);
    let _enter = span.enter();

    if path.try_exists()? {
        return std::fs::read_to_string(path).map_err(Into::into);
    }

    tracing::warn!("Config file '{}' does not exist", path.display());

    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;

    Err(Error::Bootstrapped {
        path: path.to_path_buf(),
    })
}
