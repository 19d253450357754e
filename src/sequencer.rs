//! Command sequencer.
//!
//! Drives one servo command at a time through the command/ack/finish
//! protocol: build a command with a fresh correlation id, transmit it,
//! wait for the matching successful ack, then wait for the matching
//! task-finished signal. Responses carrying a different `msg_id` are
//! stale leftovers from an earlier exchange and are discarded without a
//! state change. The sequencer never retries; a failed cycle is reported
//! to the caller and the machine returns to `Idle` for the next target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};

use crate::error::{Result, TrackerError};
use crate::geometry::AngularOffset;
use crate::messages::{AckMessage, ServoCommand, TaskFinishedMessage};
use crate::transport::Channel;

/// How often the response wait loop wakes up to check the running flag.
const RESPONSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    /// Command transmitted, waiting for the matching ack.
    CommandSent(u16),
    /// Ack accepted, waiting for the matching task-finished signal.
    AwaitingFinish(u16),
}

/// Convert a measured offset angle into the wire correction, in whole
/// degrees. The rig moves opposite to the apparent error, so the angle is
/// negated, then rounded to the nearest degree (half away from zero).
pub fn wire_offset(degrees: f64) -> i32 {
    (-degrees).round() as i32
}

pub struct CommandSequencer<C: Channel> {
    channel: C,
    state: SequencerState,
}

impl<C: Channel> CommandSequencer<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: SequencerState::Idle,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    #[cfg(test)]
    fn force_state(&mut self, state: SequencerState) {
        self.state = state;
    }

    /// Drive one full command cycle to completion and return its `msg_id`.
    ///
    /// Refuses a new target unless the machine is `Idle`. On any error,
    /// including cancellation, the machine is reset to `Idle` before
    /// returning; a response still in flight for the abandoned command
    /// will be discarded as stale by the next cycle.
    pub fn run_cycle(&mut self, offset: &AngularOffset, running: &AtomicBool) -> Result<u16> {
        let result = self.drive_cycle(offset, running);
        if result.is_err() {
            self.state = SequencerState::Idle;
        }
        result
    }

    fn drive_cycle(&mut self, offset: &AngularOffset, running: &AtomicBool) -> Result<u16> {
        if self.state != SequencerState::Idle {
            return Err(TrackerError::protocol(format!(
                "command already in flight ({:?})",
                self.state
            )));
        }

        let command = ServoCommand::new(
            wire_offset(offset.horizontal),
            wire_offset(offset.vertical),
        );
        let msg_id = command.msg_id;
        self.channel.send(command.to_json()?.as_bytes())?;
        self.state = SequencerState::CommandSent(msg_id);
        info!(
            "Sent command {}: h_offset={} v_offset={}",
            msg_id, command.h_offset, command.v_offset
        );

        self.await_ack(msg_id, running)?;
        self.state = SequencerState::AwaitingFinish(msg_id);
        debug!("Command {} acknowledged, awaiting completion", msg_id);

        self.await_finish(msg_id, running)?;
        self.state = SequencerState::Idle;
        info!("Command {} completed", msg_id);
        Ok(msg_id)
    }

    fn await_ack(&mut self, msg_id: u16, running: &AtomicBool) -> Result<()> {
        loop {
            let text = self.next_payload(running)?;
            let ack = AckMessage::from_json(&text)?;
            if ack.msg_id != msg_id {
                debug!(
                    "Discarding stale ack for {} while waiting on {}",
                    ack.msg_id, msg_id
                );
                continue;
            }
            if !ack.success {
                return Err(TrackerError::CommandFailed {
                    msg_id,
                    error: ack.error_msg,
                });
            }
            return Ok(());
        }
    }

    fn await_finish(&mut self, msg_id: u16, running: &AtomicBool) -> Result<()> {
        loop {
            let text = self.next_payload(running)?;
            // A duplicate ack would also decode as TaskFinishedMessage
            // (extra fields are ignored), so check for the ack-only
            // `success` field before treating the payload as a finish.
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| TrackerError::malformed(format!("finish payload: {}", e)))?;
            if value.get("success").is_some() {
                debug!("Discarding out-of-phase ack while awaiting finish for {}", msg_id);
                continue;
            }
            let finished = TaskFinishedMessage::from_json(&text)?;
            if finished.msg_id != msg_id {
                debug!(
                    "Discarding stale finish for {} while waiting on {}",
                    finished.msg_id, msg_id
                );
                continue;
            }
            return Ok(());
        }
    }

    /// Block for the next inbound payload, waking periodically so a
    /// cleared running flag cancels the wait promptly.
    fn next_payload(&mut self, running: &AtomicBool) -> Result<String> {
        loop {
            if !running.load(Ordering::SeqCst) {
                return Err(TrackerError::Cancelled);
            }
            if let Some(payload) = self.channel.recv_timeout(RESPONSE_POLL)? {
                return String::from_utf8(payload)
                    .map_err(|_| TrackerError::malformed("payload is not valid UTF-8"));
            }
        }
    }
}
