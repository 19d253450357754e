//! A library for tracking a QR fiducial marker and steering a pan/tilt
//! servo rig to keep it centered.
//!
//! This library provides functionality for:
//! - Converting field of view and resolution into camera intrinsics
//! - Turning a detected pixel position into dead-zone-filtered pan/tilt angles
//! - Encoding and decoding the servo wire messages
//! - Sequencing the command/ack/finish protocol, one command in flight at a time
//! - Driving the whole tracking loop over a pluggable vision source and channel

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod messages;
pub mod sequencer;
pub mod signal;
pub mod tracker;
pub mod transport;
pub mod vision;

pub use cli::CliArgs;
pub use config::Config;
pub use error::{Result, TrackerError};
pub use geometry::{compute_offset, AngularOffset, Intrinsics};
pub use messages::{AckMessage, ProgressMessage, ServoCommand, TaskFinishedMessage};
pub use sequencer::{CommandSequencer, SequencerState};
pub use tracker::{TrackingLoop, TrackingStats};
pub use transport::{channel_pair, Channel, InProcessChannel};
pub use vision::{ScriptedTargets, TargetPoint, TargetSource};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for library consumers that do not want to configure
/// fern themselves.
pub fn initialize(debug: bool, log_file: Option<&str>) -> anyhow::Result<()> {
    logging::setup_logging(debug as u8, log_file)?;
    logging::log_app_start(VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty(), "Version should not be empty");
    }
}
