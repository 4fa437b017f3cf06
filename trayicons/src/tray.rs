use std::path::Path;

use anyhow::Context;
use tray_icon::menu::{Menu, MenuId, MenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

pub const TITLE: &str = "Tray Icons";
pub const TOOLTIP: &str = "Tray Icons: watching your Krita icons";

/// Something that can display the tray title, tooltip and icon.
pub trait Presenter {
    fn set_title(&mut self, title: &str);

    fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()>;

    /// Replaces the displayed icon with the image at `path`.
    fn set_icon_from_path(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Id of the menu item that quits the app, if there is a menu.
    fn quit_id(&self) -> Option<&MenuId> {
        None
    }
}

/// Applies the fixed title and tooltip, then `icon` if it exists on disk.
///
/// A missing or undecodable icon is logged and leaves the tray without a bitmap.
pub fn present<P: Presenter>(presenter: &mut P, icon: Option<&Path>) -> anyhow::Result<()> {
    presenter.set_title(TITLE);
    presenter.set_tooltip(TOOLTIP)?;

    match icon {
        Some(path) if path.is_file() => {
            if let Err(e) = presenter.set_icon_from_path(path) {
                tracing::error!("{e:#}");
            }
        }
        Some(path) => tracing::warn!("Can't find icon file '{}'", path.display()),
        None => {}
    }

    Ok(())
}

pub struct Tray {
    icon: TrayIcon,
    quit: MenuItem,
}

impl Tray {
    pub fn new() -> anyhow::Result<Self> {
        let quit = MenuItem::new("Quit", true, None);
        let menu = Menu::new();
        menu.append(&quit)?;

        let icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .build()
            .context("Failed to create tray icon")?;

        Ok(Self { icon, quit })
    }
}

impl Presenter for Tray {
    fn set_title(&mut self, title: &str) {
        self.icon.set_title(Some(title));
    }

    fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()> {
        self.icon.set_tooltip(Some(tooltip)).map_err(Into::into)
    }

    fn set_icon_from_path(&mut self, path: &Path) -> anyhow::Result<()> {
        let icon = load_icon(path)?;
        self.icon.set_icon(Some(icon)).map_err(Into::into)
    }

    fn quit_id(&self) -> Option<&MenuId> {
        Some(self.quit.id())
    }
}

fn load_icon(path: &Path) -> anyhow::Result<Icon> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load icon '{}'", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Icon::from_rgba(image.into_raw(), width, height).map_err(Into::into)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;

    /// Records what was presented. Icons whose file is empty fail to load, like a truncated `.ico`.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub title: Option<String>,
        pub tooltip: Option<String>,
        pub icons: Vec<PathBuf>,
        pub fail_tooltip: bool,
    }

    impl Presenter for Recorder {
        fn set_title(&mut self, title: &str) {
            self.title = Some(title.to_string());
        }

        fn set_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()> {
            if self.fail_tooltip {
                anyhow::bail!("tooltip rejected");
            }
            self.tooltip = Some(tooltip.to_string());
            Ok(())
        }

        fn set_icon_from_path(&mut self, path: &Path) -> anyhow::Result<()> {
            if std::fs::metadata(path)?.len() == 0 {
                anyhow::bail!("Failed to load icon '{}'", path.display());
            }
            self.icons.push(path.to_path_buf());
            Ok(())
        }
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("trayicons-tray-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn presents_title_and_tooltip() {
        let mut recorder = Recorder::default();
        present(&mut recorder, None).unwrap();

        assert_eq!(recorder.title.as_deref(), Some(TITLE));
        assert_eq!(recorder.tooltip.as_deref(), Some(TOOLTIP));
        assert!(recorder.icons.is_empty());
    }

    #[test]
    fn skips_missing_icon() {
        let mut recorder = Recorder::default();
        let missing = std::env::temp_dir().join("trayicons-tray-missing.ico");
        present(&mut recorder, Some(&missing)).unwrap();

        assert_eq!(recorder.title.as_deref(), Some(TITLE));
        assert!(recorder.icons.is_empty());
    }

    #[test]
    fn presents_existing_icon() {
        let path = temp_file("existing.ico", b"icon");

        let mut recorder = Recorder::default();
        present(&mut recorder, Some(&path)).unwrap();
        assert_eq!(recorder.icons, vec![path.clone()]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn keeps_title_and_tooltip_when_icon_fails_to_load() {
        let path = temp_file("corrupt.ico", b"");

        let mut recorder = Recorder::default();
        present(&mut recorder, Some(&path)).unwrap();

        assert_eq!(recorder.title.as_deref(), Some(TITLE));
        assert_eq!(recorder.tooltip.as_deref(), Some(TOOLTIP));
        assert!(recorder.icons.is_empty());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn real_icon_loader_rejects_undecodable_file() {
        let path = temp_file("garbage.ico", b"not an icon");
        assert!(load_icon(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
