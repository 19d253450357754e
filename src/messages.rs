//! Wire messages exchanged with the servo controller.
//!
//! Flat JSON objects with named fields; the field names are part of the
//! wire contract. Every message carries a `msg_id` correlation identifier
//! so acks and completion signals can be matched to the command that
//! caused them. Unknown extra fields are ignored on decode for forward
//! compatibility; missing required fields fail with `MalformedMessage`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Pan/tilt correction command. Offsets are whole degrees, already negated
/// relative to the measured target angle (the rig moves opposite to the
/// apparent error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoCommand {
    pub msg_id: u16,
    pub h_offset: i32,
    pub v_offset: i32,
}

impl ServoCommand {
    /// Build a command with a fresh random correlation id. At most one
    /// command is in flight at a time, so a uniform 16-bit draw is enough.
    pub fn new(h_offset: i32, v_offset: i32) -> Self {
        Self {
            msg_id: rand::thread_rng().gen(),
            h_offset,
            v_offset,
        }
    }

    pub fn with_msg_id(msg_id: u16, h_offset: i32, v_offset: i32) -> Self {
        Self {
            msg_id,
            h_offset,
            v_offset,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| TrackerError::malformed(format!("ServoCommand: {}", e)))
    }
}

/// Controller response to a `ServoCommand`, correlated by `msg_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    pub msg_id: u16,
    pub success: bool,
    pub error_msg: String,
}

impl AckMessage {
    pub fn ok(msg_id: u16) -> Self {
        Self {
            msg_id,
            success: true,
            error_msg: String::new(),
        }
    }

    pub fn rejected(msg_id: u16, error_msg: impl Into<String>) -> Self {
        Self {
            msg_id,
            success: false,
            error_msg: error_msg.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| TrackerError::malformed(format!("AckMessage: {}", e)))
    }
}

/// Sent by the controller once the physical move for the matching command
/// has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFinishedMessage {
    pub msg_id: u16,
}

impl TaskFinishedMessage {
    pub fn new(msg_id: u16) -> Self {
        Self { msg_id }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| TrackerError::malformed(format!("TaskFinishedMessage: {}", e)))
    }
}

/// Reserved for partial-progress reporting during long moves. Not produced
/// or consumed by the sequencer yet; kept so the schema is settled before
/// controllers start emitting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub msg_id: u16,
    pub progress: f32,
}

impl ProgressMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| TrackerError::malformed(format!("ProgressMessage: {}", e)))
    }
}
