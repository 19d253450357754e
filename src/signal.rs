//! Signal handling for graceful shutdown.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Install a Ctrl-C handler that clears the returned running flag. The
/// tracking loop checks the flag every idle chunk and at every channel
/// wait, so shutdown is prompt even mid-exchange.
pub fn setup_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Ctrl-C received, shutting down");
        r.store(false, Ordering::SeqCst);
    })?;
    Ok(running)
}
