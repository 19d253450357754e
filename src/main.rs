use qr_servo_tracker::{
    channel_pair,
    cli::CliArgs,
    config::Config,
    geometry::Intrinsics,
    logging,
    messages::{AckMessage, ServoCommand, TaskFinishedMessage},
    sequencer::CommandSequencer,
    signal,
    tracker::TrackingLoop,
    transport::{Channel, InProcessChannel},
    vision::{ScriptedTargets, TargetPoint},
    VERSION,
};

use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn};
use rand::Rng;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli_args = CliArgs::parse();

    // Setup logging
    logging::setup_logging(cli_args.debug as u8, cli_args.log_file.as_deref())?;
    logging::log_app_start(VERSION);

    // Load configuration
    let config = Config::load(&cli_args)?;
    logging::log_app_config(&config);

    let intrinsics = Intrinsics::from_config(&config)?;
    info!(
        "Camera intrinsics: fx={:.1} fy={:.1} center=({:.0}, {:.0})",
        intrinsics.focal_x, intrinsics.focal_y, intrinsics.center_x, intrinsics.center_y
    );

    let running = signal::setup_ctrl_c_handler()?;

    // A real deployment hands the sequencer the already-connected servo
    // characteristic; here a simulated controller sits on the other end of
    // an in-process pair, and the vision source plays back a drifting
    // marker path instead of the camera/QR pipeline.
    let (local, remote) = channel_pair();
    let servo = thread::spawn(move || run_servo_peer(remote));

    let targets = ScriptedTargets::new(simulated_marker_path(&config, cli_args.sim_frames));
    let sequencer = CommandSequencer::new(local);
    let tracking_loop =
        TrackingLoop::new(intrinsics, &config.tracking, sequencer, targets, running);

    let stats = tracking_loop.run()?;
    info!(
        "Run finished: {} targets seen, {} moves completed, {} failed",
        stats.targets_seen, stats.commands_completed, stats.commands_failed
    );

    match servo.join() {
        Ok(moves) => info!("Servo simulator executed {} moves", moves),
        Err(_) => error!("Servo simulator thread panicked"),
    }

    Ok(())
}

/// Simulated servo controller: acks each command, "moves" for a time
/// proportional to the correction, then reports the task finished. Exits
/// once the tracker side of the channel goes away.
fn run_servo_peer(mut remote: InProcessChannel) -> u64 {
    let mut moves = 0u64;
    loop {
        let payload = match remote.recv_timeout(Duration::from_millis(500)) {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(_) => break,
        };

        let text = match String::from_utf8(payload) {
            Ok(text) => text,
            Err(_) => {
                warn!("Servo simulator received non-UTF-8 payload, ignoring");
                continue;
            }
        };
        let command = match ServoCommand::from_json(&text) {
            Ok(command) => command,
            Err(e) => {
                warn!("Servo simulator could not parse command: {}", e);
                continue;
            }
        };

        debug!(
            "Servo simulator moving: h={} v={} (msg {})",
            command.h_offset, command.v_offset, command.msg_id
        );
        let ack = AckMessage::ok(command.msg_id);
        if send_json(&mut remote, ack.to_json()).is_err() {
            break;
        }

        let travel = command.h_offset.unsigned_abs().max(command.v_offset.unsigned_abs());
        thread::sleep(Duration::from_millis(20 + 10 * travel as u64));

        let finished = TaskFinishedMessage::new(command.msg_id);
        if send_json(&mut remote, finished.to_json()).is_err() {
            break;
        }
        moves += 1;
    }
    moves
}

fn send_json(
    remote: &mut InProcessChannel,
    json: qr_servo_tracker::Result<String>,
) -> qr_servo_tracker::Result<()> {
    remote.send(json?.as_bytes())
}

/// A marker that starts somewhere in the frame and drifts back toward
/// center as the rig corrects, with pixel jitter and the occasional
/// missed detection.
fn simulated_marker_path(config: &Config, frames: u32) -> Vec<Option<TargetPoint>> {
    let mut rng = rand::thread_rng();
    let center_x = config.camera.width as i32 / 2;
    let center_y = config.camera.height as i32 / 2;
    let mut x = rng.gen_range(0..config.camera.width as i32);
    let mut y = rng.gen_range(0..config.camera.height as i32);

    let mut path = Vec::with_capacity(frames as usize);
    for frame in 0..frames {
        if frame % 7 == 6 {
            path.push(None);
            continue;
        }
        path.push(Some(TargetPoint::new(x, y)));
        x = center_x + (x - center_x) / 2 + rng.gen_range(-8..=8);
        y = center_y + (y - center_y) / 2 + rng.gen_range(-8..=8);
    }
    path
}
