use std::path::Path;
use std::sync::Arc;

use trayicons_config::{Config, IconEntry, CONFIG_FILE_NAME};
use tray_icon::menu::MenuEvent;

use crate::convert;
use crate::tray::{self, Presenter, Tray};
use crate::watcher::{Change, SourceWatcher};

#[derive(Debug)]
pub enum AppEvent {
    /// A tray menu item was clicked.
    Menu(MenuEvent),
    /// A watched source or the tray icon file was modified.
    Changed(Change),
}

/// Delivers [`AppEvent`]s to the loop that owns the [`App`], from any thread.
pub type EventSender = Arc<dyn Fn(AppEvent) + Send + Sync>;

pub struct App<P = Tray> {
    pub icons: Vec<IconEntry>,
    pub tray: Option<P>,
    #[allow(unused)]
    pub watcher: Option<SourceWatcher>,
}

impl<P: Presenter> App<P> {
    /// Generates missing icons, starts watching their sources
    /// and routes tray menu events through `sender`.
    ///
    /// Relative icon paths are resolved against `base`.
    pub fn new(config: Config, base: &Path, sender: EventSender) -> Self {
        let icons = config
            .icons
            .iter()
            .map(|icon| icon.resolve(base))
            .collect::<Vec<_>>();

        if icons.is_empty() {
            tracing::warn!("No icons configured in '{CONFIG_FILE_NAME}'");
        }

        for icon in &icons {
            if !icon.dst.exists() {
                if let Err(e) = convert::convert_to_ico(&icon.src, &icon.dst) {
                    tracing::error!("{e:#}");
                }
            }
        }

        let tray_icon = icons.first().map(|icon| icon.dst.as_path());
        let watcher = {
            let sender = sender.clone();
            SourceWatcher::new(&icons, tray_icon, move |change| {
                sender(AppEvent::Changed(change))
            })
        };
        let watcher = watcher
            .inspect_err(|e| tracing::error!("Failed to watch icon sources: {e:#}"))
            .ok();

        MenuEvent::set_event_handler(Some(move |e| sender(AppEvent::Menu(e))));

        Self {
            icons,
            tray: None,
            watcher,
        }
    }

    /// The first configured icon is the one shown in the tray.
    fn tray_icon_path(&self) -> Option<&Path> {
        self.icons.first().map(|icon| icon.dst.as_path())
    }

    /// Presents the title, tooltip and first icon on `tray` and keeps it.
    ///
    /// On error the tray is dropped and the caller is expected to shut down.
    pub fn start(&mut self, mut tray: P) -> anyhow::Result<()> {
        tray::present(&mut tray, self.tray_icon_path())?;
        if let Some(path) = self.tray_icon_path() {
            tracing::info!("Showing icon '{}' in the tray", path.display());
        }
        self.tray = Some(tray);
        Ok(())
    }

    /// Handles one event, returning `true` when the app should exit.
    pub fn handle(&mut self, event: AppEvent) -> anyhow::Result<bool> {
        match event {
            AppEvent::Menu(e) => {
                let quit = self
                    .tray
                    .as_ref()
                    .and_then(|tray| tray.quit_id())
                    .is_some_and(|id| e.id == *id);
                if quit {
                    tracing::info!("Quit requested from the tray menu");
                }
                Ok(quit)
            }

            AppEvent::Changed(Change::Source { src, dst }) => {
                on_source_changed(&self.icons, self.tray.as_mut(), &src, &dst)?;
                Ok(false)
            }

            AppEvent::Changed(Change::TrayIcon(_)) => {
                let path = self.tray_icon_path().map(Path::to_path_buf);
                if let (Some(tray), Some(path)) = (self.tray.as_mut(), path) {
                    tray.set_icon_from_path(&path)?;
                }
                Ok(false)
            }
        }
    }
}

/// Regenerates `dst` from `src` and, when `dst` is the first configured icon,
/// shows the new bitmap on `presenter`. Returns whether the tray was refreshed.
pub fn on_source_changed<P: Presenter>(
    icons: &[IconEntry],
    presenter: Option<&mut P>,
    src: &Path,
    dst: &Path,
) -> anyhow::Result<bool> {
    convert::convert_to_ico(src, dst)?;

    let is_tray_icon = icons.first().is_some_and(|icon| icon.dst == dst);
    match presenter {
        Some(presenter) if is_tray_icon => {
            presenter.set_icon_from_path(dst)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::tray::tests::Recorder;
    use crate::tray::{TITLE, TOOLTIP};

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("trayicons-app-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path) {
        RgbaImage::from_pixel(32, 32, Rgba([20, 120, 220, 255]))
            .save(path)
            .unwrap();
    }

    fn two_icons(dir: &Path) -> Vec<IconEntry> {
        write_png(&dir.join("first.png"));
        write_png(&dir.join("second.png"));
        vec![
            IconEntry::new(dir.join("first.png"), dir.join("out/first.ico")),
            IconEntry::new(dir.join("second.png"), dir.join("out/second.ico")),
        ]
    }

    fn app_with(icons: Vec<IconEntry>) -> App<Recorder> {
        App {
            icons,
            tray: None,
            watcher: None,
        }
    }

    #[test]
    fn refreshes_tray_for_first_icon() {
        let dir = temp_dir("first");
        let icons = two_icons(&dir);

        let mut recorder = Recorder::default();
        let refreshed =
            on_source_changed(&icons, Some(&mut recorder), &icons[0].src, &icons[0].dst).unwrap();

        assert!(refreshed);
        assert!(icons[0].dst.is_file());
        assert_eq!(recorder.icons, vec![icons[0].dst.clone()]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn converts_other_icons_without_touching_tray() {
        let dir = temp_dir("second");
        let icons = two_icons(&dir);

        let mut recorder = Recorder::default();
        let refreshed =
            on_source_changed(&icons, Some(&mut recorder), &icons[1].src, &icons[1].dst).unwrap();

        assert!(!refreshed);
        assert!(icons[1].dst.is_file());
        assert!(recorder.icons.is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn source_change_before_tray_exists_still_converts() {
        let dir = temp_dir("no-tray");
        let icons = two_icons(&dir);

        let refreshed =
            on_source_changed::<Recorder>(&icons, None, &icons[0].src, &icons[0].dst).unwrap();

        assert!(!refreshed);
        assert!(icons[0].dst.is_file());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn handles_changes_through_app() {
        let dir = temp_dir("handle");
        let icons = two_icons(&dir);

        let mut app = app_with(icons.clone());
        app.start(Recorder::default()).unwrap();

        let change = Change::Source {
            src: icons[0].src.clone(),
            dst: icons[0].dst.clone(),
        };
        assert!(!app.handle(AppEvent::Changed(change)).unwrap());
        assert!(!app
            .handle(AppEvent::Changed(Change::TrayIcon(icons[0].dst.clone())))
            .unwrap());

        let tray = app.tray.as_ref().unwrap();
        assert_eq!(tray.title.as_deref(), Some(TITLE));
        assert_eq!(
            tray.icons,
            vec![icons[0].dst.clone(), icons[0].dst.clone()]
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn failed_start_leaves_no_tray() {
        let mut app = app_with(Vec::new());
        let recorder = Recorder {
            fail_tooltip: true,
            ..Default::default()
        };

        assert!(app.start(recorder).is_err());
        assert!(app.tray.is_none());
    }

    #[test]
    fn start_survives_corrupt_tray_icon() {
        let dir = temp_dir("corrupt");
        let dst = dir.join("first.ico");
        std::fs::write(&dst, b"").unwrap();

        let mut app = app_with(vec![IconEntry::new(dir.join("first.kra"), &dst)]);
        app.start(Recorder::default()).unwrap();

        let tray = app.tray.as_ref().unwrap();
        assert_eq!(tray.tooltip.as_deref(), Some(TOOLTIP));
        assert!(tray.icons.is_empty());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
