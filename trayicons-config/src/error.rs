use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    /// The config file didn't exist and a default one was written in its place.
    #[error("default config created at '{}'. please correct the config and re-run this tool.", .path.display())]
    Bootstrapped { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
