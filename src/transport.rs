//! Channel collaborator interface.
//!
//! The sequencer sees the servo link as one ordered bidirectional byte
//! stream that is already connected; discovery, framing and reconnect
//! policy belong to whatever owns the physical transport. The in-process
//! implementation here backs the tests and the simulation binary.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::error::{Result, TrackerError};

/// An already-connected, ordered, bidirectional message channel.
pub trait Channel: Send {
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for the next inbound message. `Ok(None)` means
    /// the timeout elapsed with nothing to read; errors mean the channel
    /// is unusable. The bounded wait is what keeps the tracking loop
    /// promptly cancellable while a response is pending.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// One endpoint of an in-process channel pair.
pub struct InProcessChannel {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Create a connected pair of endpoints; messages written to one are read
/// from the other, in order.
pub fn channel_pair() -> (InProcessChannel, InProcessChannel) {
    let (a_tx, a_rx) = unbounded();
    let (b_tx, b_rx) = unbounded();
    (
        InProcessChannel { tx: a_tx, rx: b_rx },
        InProcessChannel { tx: b_tx, rx: a_rx },
    )
}

impl Channel for InProcessChannel {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.tx
            .send(payload.to_vec())
            .map_err(|_| TrackerError::transport("peer endpoint closed"))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TrackerError::transport("peer endpoint closed"))
            }
        }
    }
}
