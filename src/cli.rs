use clap::Parser;

/// Command-line overrides for the tracker. Anything not given here falls
/// back to the TOML file (if `--config` is set) and then the built-in
/// defaults.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Camera frame width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Camera frame height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Horizontal field of view in degrees
    #[arg(long)]
    pub horizontal_fov: Option<f64>,

    /// Vertical field of view in degrees
    #[arg(long)]
    pub vertical_fov: Option<f64>,

    /// Dead zone in degrees; smaller offsets are not acted on
    #[arg(long)]
    pub dead_zone: Option<f64>,

    /// Seconds to idle between vision polls
    #[arg(long)]
    pub poll_interval: Option<f64>,

    /// Servo characteristic UUID
    #[arg(long)]
    pub uuid: Option<String>,

    /// Servo controller device name
    #[arg(long)]
    pub device_name: Option<String>,

    /// Number of simulated detection frames to play back
    #[arg(long, default_value_t = 20)]
    pub sim_frames: u32,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<String>,
}
