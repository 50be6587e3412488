//! Mirror-cam binary: mirrored live view of the CSI camera.

use anyhow::Context;
use mirror_cam::{viewer, ArgusSession, HighGuiWindow, StopFlag, ViewerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    if let Err(err) = run() {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    info!("mirror-cam v{}", env!("CARGO_PKG_VERSION"));

    let config = ViewerConfig::default();

    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.raise()).context("Installing Ctrl+C handler")?;

    let session = ArgusSession::new(config.descriptor());
    let window = HighGuiWindow::new(&config.window_title);

    info!(
        sensor = config.capture.sensor_id,
        width = config.capture.width,
        height = config.capture.height,
        fps = config.framerate,
        "starting camera; press '{}' to quit",
        config.quit_key
    );

    let reason = viewer::run(session, window, &config, &stop).context("Camera viewer failed")?;
    info!(?reason, "bye");
    Ok(())
}
