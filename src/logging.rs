use anyhow::Result;
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::{info, LevelFilter};
use std::io;

pub fn setup_logging(verbosity: u8, log_file: Option<&str>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut base_config = fern::Dispatch::new();

    base_config = match verbosity {
        0 => base_config.level(LevelFilter::Info),
        1 => base_config.level(LevelFilter::Debug),
        _ => base_config.level(LevelFilter::Trace),
    };

    // Separate file config so we can include year, month and day in file logs
    let file_config = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
            record.target(),
            record.level(),
            message
        ))
    });

    let stdout_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                Local::now().format("[%H:%M:%S]"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .chain(io::stdout());

    base_config = base_config.chain(stdout_config);

    if let Some(log_file) = log_file {
        base_config = base_config.chain(file_config.chain(fern::log_file(log_file)?));
    }

    base_config.apply()?;

    Ok(())
}

pub fn log_app_start(version: &str) {
    info!("Starting QR servo tracker v{}", version);
}

pub fn log_app_config(config: &crate::config::Config) {
    info!("Application configured with:");
    info!("  Camera:");
    info!("    Resolution: {}x{}", config.camera.width, config.camera.height);
    info!("  Tracking:");
    info!(
        "    FOV: {}x{} degrees",
        config.tracking.horizontal_fov, config.tracking.vertical_fov
    );
    info!("    Dead zone: {} degrees", config.tracking.dead_zone);
    info!("    Poll interval: {}s", config.tracking.poll_interval);
    info!("  Bluetooth:");
    info!("    Device name: {}", config.bluetooth.device_name);
    info!("    Characteristic UUID: {}", config.bluetooth.uuid);
}
