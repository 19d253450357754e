use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::cli::CliArgs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub tracking: TrackingConfig,
    pub bluetooth: BluetoothConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Horizontal field of view in degrees, (0, 180) exclusive.
    pub horizontal_fov: f64,
    /// Vertical field of view in degrees, (0, 180) exclusive.
    pub vertical_fov: f64,
    /// Offsets below this many degrees are treated as already on target.
    pub dead_zone: f64,
    /// Seconds to idle between vision polls.
    pub poll_interval: f64,
}

/// Identity of the servo controller's characteristic; resolved by the
/// transport collaborator before the loop starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    pub uuid: String,
    pub device_name: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            horizontal_fov: 62.0,
            vertical_fov: 48.0,
            dead_zone: 2.0,
            poll_interval: 0.5,
        }
    }
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            uuid: "abcd1234-1234-1234-1234-1234567890ab".to_string(),
            device_name: "ArduinoBL".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            tracking: TrackingConfig::default(),
            bluetooth: BluetoothConfig::default(),
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, fov) in [
            ("horizontal_fov", self.horizontal_fov),
            ("vertical_fov", self.vertical_fov),
        ] {
            if !fov.is_finite() || fov <= 0.0 || fov >= 180.0 {
                return Err(format!("{} must be in (0, 180) degrees, got {}", name, fov));
            }
        }
        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 {
            return Err(format!("dead_zone must be non-negative, got {}", self.dead_zone));
        }
        if !self.poll_interval.is_finite() || self.poll_interval <= 0.0 {
            return Err(format!(
                "poll_interval must be positive, got {}",
                self.poll_interval
            ));
        }
        Ok(())
    }
}

impl BluetoothConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.uuid.is_empty() {
            return Err("Characteristic UUID cannot be empty".to_string());
        }
        if self.device_name.is_empty() {
            return Err("Device name cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration: TOML file if given, defaults otherwise, then
    /// CLI overrides, then a validation pass. Frozen before the loop runs.
    pub fn load(cli_args: &CliArgs) -> Result<Self> {
        let mut config = match &cli_args.config {
            Some(config_path) => {
                info!("Loading configuration from {}", config_path);
                let config_str = fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path))?;
                toml::from_str(&config_str)
                    .with_context(|| format!("Failed to parse config file: {}", config_path))?
            }
            None => Config::default(),
        };

        config.override_with_cli_args(cli_args);
        config.validate()?;

        Ok(config)
    }

    fn override_with_cli_args(&mut self, args: &CliArgs) {
        if let Some(width) = args.width {
            self.camera.width = width;
        }
        if let Some(height) = args.height {
            self.camera.height = height;
        }
        if let Some(horizontal_fov) = args.horizontal_fov {
            self.tracking.horizontal_fov = horizontal_fov;
        }
        if let Some(vertical_fov) = args.vertical_fov {
            self.tracking.vertical_fov = vertical_fov;
        }
        if let Some(dead_zone) = args.dead_zone {
            self.tracking.dead_zone = dead_zone;
        }
        if let Some(poll_interval) = args.poll_interval {
            self.tracking.poll_interval = poll_interval;
        }
        if let Some(uuid) = &args.uuid {
            self.bluetooth.uuid = uuid.clone();
        }
        if let Some(device_name) = &args.device_name {
            self.bluetooth.device_name = device_name.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        self.camera
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid camera configuration")?;
        self.tracking
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid tracking configuration")?;
        self.bluetooth
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid bluetooth configuration")?;
        Ok(())
    }
}
