//! Vision collaborator interface.
//!
//! The core only cares about one thing from the camera pipeline: the pixel
//! centroid of a detected QR marker, or nothing for this frame. The actual
//! capture/decode stack lives behind `TargetSource`.

use std::collections::VecDeque;

/// Pixel coordinates of the marker centroid in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPoint {
    pub x: i32,
    pub y: i32,
}

impl TargetPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Produces at most one target per tracking-loop iteration.
pub trait TargetSource {
    /// Poll for a marker detection in the latest frame. `None` means no
    /// marker was seen this frame.
    fn poll_target(&mut self) -> Option<TargetPoint>;

    /// True once the source can never yield another target. A live camera
    /// never finishes; scripted playback does.
    fn finished(&self) -> bool {
        false
    }
}

/// Plays back a fixed sequence of detections, one per poll.
///
/// Used by the simulation binary and the tests in place of the real
/// camera/QR pipeline.
pub struct ScriptedTargets {
    frames: VecDeque<Option<TargetPoint>>,
}

impl ScriptedTargets {
    pub fn new(frames: Vec<Option<TargetPoint>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl TargetSource for ScriptedTargets {
    fn poll_target(&mut self) -> Option<TargetPoint> {
        self.frames.pop_front().flatten()
    }

    fn finished(&self) -> bool {
        self.frames.is_empty()
    }
}
