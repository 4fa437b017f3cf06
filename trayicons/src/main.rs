use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

fn init_logging() -> anyhow::Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .context("Failed to get $data_local_dir path")?
        .join("trayicons");

    let appender = tracing_appender::rolling::never(&log_dir, "trayicons.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false);
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trace".into()))
        .finish()
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn main() {
    let _guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = trayicons::run() {
        tracing::error!("{e:#}");
        println!("{e:#}");
        std::process::exit(1);
    }
}
