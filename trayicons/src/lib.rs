use std::path::Path;

use trayicons_config::Config;

mod app;
pub mod convert;
mod event_loop;
pub mod tray;
pub mod watcher;

pub use app::{App, AppEvent, EventSender};

/// Loads `icons.toml` from the current directory and runs the tray until "Quit" is clicked.
#[tracing::instrument(level = "trace")]
pub fn run() -> anyhow::Result<()> {
    let config_file = Config::path()?;
    let config = Config::load()?;

    let base = config_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    event_loop::run(config, &base)
}
