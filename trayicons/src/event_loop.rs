pub use imp::run;

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use anyhow::Context;
    use trayicons_config::Config;
    use winit::application::ApplicationHandler;
    use winit::event::{StartCause, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::window::WindowId;

    use crate::app::{App, AppEvent, EventSender};
    use crate::tray::Tray;

    struct Handler {
        app: App,
        startup_error: Option<anyhow::Error>,
    }

    impl ApplicationHandler<AppEvent> for Handler {
        fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
            if cause != StartCause::Init {
                return;
            }

            if let Err(e) = Tray::new().and_then(|tray| self.app.start(tray)) {
                self.startup_error = Some(e.context("Failed to show the tray icon"));
                event_loop.exit();
            }
        }

        fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
            match self.app.handle(event) {
                Ok(true) => event_loop.exit(),
                Ok(false) => {}
                Err(e) => tracing::error!("{e:#}"),
            }
        }

        fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

        fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, _: WindowEvent) {}
    }

    /// Runs the app until "Quit" is clicked, or returns the error that kept the tray from showing.
    pub fn run(config: Config, base: &Path) -> anyhow::Result<()> {
        let event_loop = EventLoop::<AppEvent>::with_user_event()
            .build()
            .context("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let proxy = Mutex::new(event_loop.create_proxy());
        let sender: EventSender = Arc::new(move |event| {
            let Ok(proxy) = proxy.lock() else {
                return;
            };
            if let Err(e) = proxy.send_event(event) {
                tracing::error!("Failed to forward event to the event loop: {e}");
            }
        });

        let mut handler = Handler {
            app: App::new(config, base, sender),
            startup_error: None,
        };

        event_loop.run_app(&mut handler)?;

        match handler.startup_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// `tray-icon` needs a running GTK loop on Linux, so the app lives on GTK's
/// main loop and other threads hand events to it through the default context.
#[cfg(target_os = "linux")]
mod imp {
    use std::cell::RefCell;
    use std::path::Path;
    use std::sync::Arc;

    use anyhow::Context;
    use gtk::glib;
    use trayicons_config::Config;

    use crate::app::{App, AppEvent, EventSender};
    use crate::tray::Tray;

    thread_local! {
        static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    }

    fn dispatch(event: AppEvent) {
        APP.with(|app| {
            let Ok(mut app) = app.try_borrow_mut() else {
                tracing::warn!("Dropping {event:?}, the app is busy");
                return;
            };
            let Some(app) = app.as_mut() else {
                tracing::debug!("Dropping {event:?}, the app is not running");
                return;
            };

            match app.handle(event) {
                Ok(true) => gtk::main_quit(),
                Ok(false) => {}
                Err(e) => tracing::error!("{e:#}"),
            }
        });
    }

    pub fn run(config: Config, base: &Path) -> anyhow::Result<()> {
        gtk::init().context("Failed to initialize gtk")?;

        let sender: EventSender = Arc::new(|event| {
            glib::MainContext::default().invoke(move || dispatch(event));
        });

        let mut app: App = App::new(config, base, sender);
        let tray = Tray::new().context("Failed to show the tray icon")?;
        app.start(tray).context("Failed to show the tray icon")?;

        APP.with(|slot| *slot.borrow_mut() = Some(app));
        gtk::main();
        APP.with(|slot| slot.borrow_mut().take());

        Ok(())
    }
}

