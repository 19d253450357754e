//! Tracking loop driver.
//!
//! One cooperative control flow: poll the vision collaborator for a
//! marker, turn the pixel position into pan/tilt angles, and when the
//! offset survives the dead zone, drive one full command cycle before
//! looking at the next frame. Between iterations the loop idles for the
//! configured poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::config::TrackingConfig;
use crate::error::{Result, TrackerError};
use crate::geometry::{compute_offset, Intrinsics};
use crate::sequencer::CommandSequencer;
use crate::transport::Channel;
use crate::vision::TargetSource;

/// Granularity of the idle sleep, so a cleared running flag is observed
/// well within one poll interval.
const IDLE_CHUNK: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackingStats {
    pub frames_polled: u64,
    pub targets_seen: u64,
    pub commands_completed: u64,
    pub commands_failed: u64,
}

pub struct TrackingLoop<C: Channel, V: TargetSource> {
    intrinsics: Intrinsics,
    dead_zone: f64,
    poll_interval: Duration,
    sequencer: CommandSequencer<C>,
    vision: V,
    running: Arc<AtomicBool>,
}

impl<C: Channel, V: TargetSource> TrackingLoop<C, V> {
    pub fn new(
        intrinsics: Intrinsics,
        tracking: &TrackingConfig,
        sequencer: CommandSequencer<C>,
        vision: V,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            intrinsics,
            dead_zone: tracking.dead_zone,
            poll_interval: Duration::from_secs_f64(tracking.poll_interval),
            sequencer,
            vision,
            running,
        }
    }

    /// Run until cancelled, the target source is exhausted, or a fatal
    /// error occurs. A single failed command cycle is logged and the loop
    /// moves on to the next target.
    pub fn run(mut self) -> Result<TrackingStats> {
        info!("Entering tracking loop");
        let mut stats = TrackingStats::default();

        while self.running.load(Ordering::SeqCst) {
            if self.vision.finished() {
                info!("Target source exhausted, stopping");
                break;
            }

            stats.frames_polled += 1;
            match self.vision.poll_target() {
                Some(target) => {
                    stats.targets_seen += 1;
                    let offset = compute_offset(&self.intrinsics, target, self.dead_zone);
                    if offset.is_zero() {
                        debug!(
                            "Target ({}, {}) inside dead zone, holding position",
                            target.x, target.y
                        );
                    } else {
                        debug!(
                            "Target ({}, {}) -> offset h={:.2} v={:.2} degrees",
                            target.x, target.y, offset.horizontal, offset.vertical
                        );
                        match self.sequencer.run_cycle(&offset, &self.running) {
                            Ok(_) => stats.commands_completed += 1,
                            Err(TrackerError::Cancelled) => {
                                info!("Cancelled mid-exchange, stopping");
                                break;
                            }
                            Err(e) if e.is_fatal() => {
                                error!("Fatal error in command cycle: {}", e);
                                return Err(e);
                            }
                            Err(e) => {
                                stats.commands_failed += 1;
                                error!("Command cycle failed: {}", e);
                            }
                        }
                    }
                }
                None => debug!("No marker detected this frame"),
            }

            self.idle();
        }

        info!(
            "Tracking loop stopped: {} frames, {} targets, {} moves completed, {} failed",
            stats.frames_polled, stats.targets_seen, stats.commands_completed, stats.commands_failed
        );
        Ok(stats)
    }

    fn idle(&self) {
        let deadline = Instant::now() + self.poll_interval;
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(IDLE_CHUNK.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{AckMessage, ServoCommand, TaskFinishedMessage};
    use crate::transport::{channel_pair, Channel, InProcessChannel};
    use crate::vision::{ScriptedTargets, TargetPoint};
    use std::thread;

    fn test_intrinsics() -> Intrinsics {
        Intrinsics::new(960, 720, 62.0, 48.0).unwrap()
    }

    fn fast_tracking() -> TrackingConfig {
        TrackingConfig {
            poll_interval: 0.01,
            ..TrackingConfig::default()
        }
    }

    /// Servo peer that acks and finishes every command, optionally
    /// rejecting the first `reject_first` of them.
    fn spawn_servo_peer(mut remote: InProcessChannel, reject_first: usize) -> thread::JoinHandle<usize> {
        thread::spawn(move || {
            let mut handled = 0usize;
            loop {
                let payload = match remote.recv_timeout(Duration::from_secs(2)) {
                    Ok(Some(payload)) => payload,
                    Ok(None) | Err(_) => break,
                };
                let cmd =
                    ServoCommand::from_json(std::str::from_utf8(&payload).unwrap()).unwrap();
                if handled < reject_first {
                    let nack = AckMessage::rejected(cmd.msg_id, "stall").to_json().unwrap();
                    remote.send(nack.as_bytes()).unwrap();
                } else {
                    let ack = AckMessage::ok(cmd.msg_id).to_json().unwrap();
                    remote.send(ack.as_bytes()).unwrap();
                    let fin = TaskFinishedMessage::new(cmd.msg_id).to_json().unwrap();
                    remote.send(fin.as_bytes()).unwrap();
                }
                handled += 1;
            }
            handled
        })
    }

    #[test]
    fn test_loop_runs_script_to_completion() {
        let (local, remote) = channel_pair();
        let peer = spawn_servo_peer(remote, 0);

        let targets = ScriptedTargets::new(vec![
            Some(TargetPoint::new(480, 360)), // centered, dead zone
            None,                             // no detection
            Some(TargetPoint::new(600, 360)), // needs a pan move
            Some(TargetPoint::new(480, 500)), // needs a tilt move
        ]);
        let running = Arc::new(AtomicBool::new(true));
        let tracking_loop = TrackingLoop::new(
            test_intrinsics(),
            &fast_tracking(),
            CommandSequencer::new(local),
            targets,
            running,
        );

        let stats = tracking_loop.run().unwrap();
        assert_eq!(stats.frames_polled, 4);
        assert_eq!(stats.targets_seen, 3);
        assert_eq!(stats.commands_completed, 2);
        assert_eq!(stats.commands_failed, 0);
        assert_eq!(peer.join().unwrap(), 2);
    }

    #[test]
    fn test_failed_cycle_does_not_stop_loop() {
        let (local, remote) = channel_pair();
        let peer = spawn_servo_peer(remote, 1);

        let targets = ScriptedTargets::new(vec![
            Some(TargetPoint::new(600, 360)),
            Some(TargetPoint::new(600, 360)),
        ]);
        let running = Arc::new(AtomicBool::new(true));
        let tracking_loop = TrackingLoop::new(
            test_intrinsics(),
            &fast_tracking(),
            CommandSequencer::new(local),
            targets,
            running,
        );

        let stats = tracking_loop.run().unwrap();
        assert_eq!(stats.commands_failed, 1);
        assert_eq!(stats.commands_completed, 1);
        assert_eq!(peer.join().unwrap(), 2);
    }

    #[test]
    fn test_transport_failure_is_fatal() {
        let (local, remote) = channel_pair();
        drop(remote);

        let targets = ScriptedTargets::new(vec![Some(TargetPoint::new(600, 360))]);
        let running = Arc::new(AtomicBool::new(true));
        let tracking_loop = TrackingLoop::new(
            test_intrinsics(),
            &fast_tracking(),
            CommandSequencer::new(local),
            targets,
            running,
        );

        let err = tracking_loop.run().unwrap_err();
        assert!(matches!(err, TrackerError::Transport(_)));
    }

    #[test]
    fn test_cleared_flag_stops_loop() {
        let (local, _remote) = channel_pair();
        let targets = ScriptedTargets::new(vec![Some(TargetPoint::new(600, 360)); 100]);
        let running = Arc::new(AtomicBool::new(false));
        let tracking_loop = TrackingLoop::new(
            test_intrinsics(),
            &fast_tracking(),
            CommandSequencer::new(local),
            targets,
            running,
        );

        let stats = tracking_loop.run().unwrap();
        assert_eq!(stats.frames_polled, 0);
    }
}
