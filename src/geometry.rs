//! Pinhole-camera geometry.
//!
//! Converts the configured field of view and resolution into focal
//! parameters, and a detected pixel position into pan/tilt correction
//! angles. Everything here is pure; the tracking loop owns all state.

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::vision::TargetPoint;

/// Focal parameters derived once from resolution and field of view,
/// immutable for the lifetime of a session.
#[derive(Debug, Clone, Copy)]
pub struct Intrinsics {
    pub focal_x: f64,
    pub focal_y: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Intrinsics {
    /// Derive intrinsics from frame dimensions (pixels) and field of view
    /// (degrees). Both FOV angles must lie strictly between 0 and 180 and
    /// both dimensions must be positive.
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        horizontal_fov: f64,
        vertical_fov: f64,
    ) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(TrackerError::invalid_configuration(format!(
                "frame dimensions must be positive, got {}x{}",
                frame_width, frame_height
            )));
        }
        for (name, fov) in [("horizontal", horizontal_fov), ("vertical", vertical_fov)] {
            if !fov.is_finite() || fov <= 0.0 || fov >= 180.0 {
                return Err(TrackerError::invalid_configuration(format!(
                    "{} FOV must be in (0, 180) degrees, got {}",
                    name, fov
                )));
            }
        }

        let focal_x = frame_width as f64 / (2.0 * (horizontal_fov.to_radians() / 2.0).tan());
        let focal_y = frame_height as f64 / (2.0 * (vertical_fov.to_radians() / 2.0).tan());

        Ok(Self {
            focal_x,
            focal_y,
            center_x: frame_width as f64 / 2.0,
            center_y: frame_height as f64 / 2.0,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.camera.width,
            config.camera.height,
            config.tracking.horizontal_fov,
            config.tracking.vertical_fov,
        )
    }
}

/// Signed pan/tilt correction angles in degrees, each axis already
/// snapped to exactly 0.0 if it fell inside the dead zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularOffset {
    pub horizontal: f64,
    pub vertical: f64,
}

impl AngularOffset {
    /// True when both axes were filtered out; no command is worth sending.
    pub fn is_zero(&self) -> bool {
        self.horizontal == 0.0 && self.vertical == 0.0
    }
}

/// Angular offset from the optical center to the target pixel.
///
/// Uses `atan2` against the focal length rather than a plain ratio so the
/// transform stays well-defined as `dx`/`dy` approach the focal length in
/// magnitude, matching physical lens behavior at extreme offsets.
pub fn compute_offset(
    intrinsics: &Intrinsics,
    target: TargetPoint,
    dead_zone_degrees: f64,
) -> AngularOffset {
    let dx = target.x as f64 - intrinsics.center_x;
    let dy = target.y as f64 - intrinsics.center_y;

    let mut horizontal = dx.atan2(intrinsics.focal_x).to_degrees();
    let mut vertical = dy.atan2(intrinsics.focal_y).to_degrees();

    if horizontal.abs() < dead_zone_degrees {
        horizontal = 0.0;
    }
    if vertical.abs() < dead_zone_degrees {
        vertical = 0.0;
    }

    AngularOffset {
        horizontal,
        vertical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_intrinsics() -> Intrinsics {
        Intrinsics::new(960, 720, 62.0, 48.0).unwrap()
    }

    #[test]
    fn test_intrinsics_from_960x720_62x48() {
        let i = test_intrinsics();
        let expected_fx = 960.0 / (2.0 * (31.0_f64).to_radians().tan());
        let expected_fy = 720.0 / (2.0 * (24.0_f64).to_radians().tan());
        assert!((i.focal_x - expected_fx).abs() < 1e-9);
        assert!((i.focal_y - expected_fy).abs() < 1e-9);
        assert!(i.focal_x > 790.0 && i.focal_x < 810.0);
        assert_eq!(i.center_x, 480.0);
        assert_eq!(i.center_y, 360.0);
    }

    #[test]
    fn test_intrinsics_positive_finite_over_fov_range() {
        for fov in [1.0, 30.0, 62.0, 90.0, 120.0, 179.0] {
            let i = Intrinsics::new(1280, 1024, fov, fov).unwrap();
            assert!(i.focal_x.is_finite() && i.focal_x > 0.0, "fov={}", fov);
            assert!(i.focal_y.is_finite() && i.focal_y > 0.0, "fov={}", fov);
            assert_eq!(i.center_x, 640.0);
            assert_eq!(i.center_y, 512.0);
        }
    }

    #[test]
    fn test_intrinsics_rejects_bad_fov() {
        for fov in [0.0, -10.0, 180.0, 250.0, f64::NAN] {
            assert!(Intrinsics::new(960, 720, fov, 48.0).is_err(), "fov={}", fov);
            assert!(Intrinsics::new(960, 720, 62.0, fov).is_err(), "fov={}", fov);
        }
    }

    #[test]
    fn test_intrinsics_rejects_zero_dimensions() {
        assert!(Intrinsics::new(0, 720, 62.0, 48.0).is_err());
        assert!(Intrinsics::new(960, 0, 62.0, 48.0).is_err());
    }

    #[test]
    fn test_offset_at_center_is_zero() {
        let i = test_intrinsics();
        let offset = compute_offset(&i, TargetPoint::new(480, 360), 0.0);
        assert_eq!(offset.horizontal, 0.0);
        assert_eq!(offset.vertical, 0.0);
        assert!(offset.is_zero());
    }

    #[test]
    fn test_dead_zone_snaps_to_exact_zero() {
        let i = test_intrinsics();
        // dx = 2px -> atan2(2, ~799) ~ 0.14 deg, inside the 2 deg dead zone
        let offset = compute_offset(&i, TargetPoint::new(482, 360), 2.0);
        assert_eq!(offset.horizontal, 0.0);
        assert_eq!(offset.vertical, 0.0);
    }

    #[test]
    fn test_offset_beyond_dead_zone() {
        let i = test_intrinsics();
        // dx = 120px -> ~8.5 deg, well outside the 2 deg dead zone
        let offset = compute_offset(&i, TargetPoint::new(600, 360), 2.0);
        assert!((offset.horizontal - 8.55).abs() < 0.05, "{}", offset.horizontal);
        assert_eq!(offset.vertical, 0.0);
        assert!(!offset.is_zero());
    }

    #[test]
    fn test_offset_sign_convention() {
        let i = test_intrinsics();
        let left_up = compute_offset(&i, TargetPoint::new(300, 200), 0.0);
        assert!(left_up.horizontal < 0.0);
        assert!(left_up.vertical < 0.0);
        let right_down = compute_offset(&i, TargetPoint::new(700, 500), 0.0);
        assert!(right_down.horizontal > 0.0);
        assert!(right_down.vertical > 0.0);
    }

    #[test]
    fn test_axes_filtered_independently() {
        let i = test_intrinsics();
        // Large horizontal error, tiny vertical error.
        let offset = compute_offset(&i, TargetPoint::new(600, 362), 2.0);
        assert!(offset.horizontal > 2.0);
        assert_eq!(offset.vertical, 0.0);
    }
}
