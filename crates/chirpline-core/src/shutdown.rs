//! Graceful shutdown - signal handlers flip a global flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static FLAG: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Check if shutdown was requested
pub fn is_shutdown_requested() -> bool {
    FLAG.load(Ordering::Relaxed)
}

/// Request shutdown (signal handlers and tests)
pub fn request_shutdown() {
    FLAG.store(true, Ordering::Relaxed);
}

/// Register SIGINT/SIGTERM to flip the shutdown flag. Call once at startup
/// of long-running commands.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(sig, Arc::clone(&FLAG))?;
    }
    Ok(())
}

/// Sleep in one-second slices so a shutdown signal interrupts long waits.
///
/// Returns `false` when shutdown was requested before the full duration
/// elapsed.
pub fn sleep_interruptible(total: Duration) -> bool {
    const SLICE: Duration = Duration::from_secs(1);
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if is_shutdown_requested() {
            return false;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
    !is_shutdown_requested()
}
