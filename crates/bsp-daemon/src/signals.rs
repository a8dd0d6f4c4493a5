//! Unix signal handling for the simulated board.
//!
//! SIGTERM and SIGINT request shutdown; SIGHUP requests an immediate status
//! report. The handlers only set static atomic flags; the run loop calls
//! [`SignalHandler::poll`] between blink steps to pick them up.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static SHUTDOWN_FLAG: AtomicBool = AtomicBool::new(false);
static STATUS_FLAG: AtomicBool = AtomicBool::new(false);

/// Signals the daemon reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM or SIGINT.
    Shutdown,
    /// SIGHUP.
    Status,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Shutdown => write!(f, "shutdown"),
            SignalKind::Status => write!(f, "status"),
        }
    }
}

/// Requests collected from signals or raised by the daemon itself.
#[derive(Debug, Default)]
pub struct SignalState {
    shutdown_requested: AtomicBool,
    status_requested: AtomicBool,
    signal_count: AtomicU32,
}

impl SignalState {
    /// Whether shutdown has been requested.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Relaxed)
    }

    /// Whether a status report was requested, clearing the request.
    #[inline]
    pub fn take_status_request(&self) -> bool {
        self.status_requested.swap(false, Ordering::Relaxed)
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Relaxed);
    }

    /// Request a status report.
    pub fn request_status(&self) {
        self.status_requested.store(true, Ordering::Relaxed);
    }

    fn record_signal(&self, kind: SignalKind) {
        self.signal_count.fetch_add(1, Ordering::Relaxed);
        match kind {
            SignalKind::Shutdown => self.request_shutdown(),
            SignalKind::Status => self.request_status(),
        }
    }

    /// Number of signals received.
    pub fn signal_count(&self) -> u32 {
        self.signal_count.load(Ordering::Relaxed)
    }
}

/// Handle to the daemon's signal state.
#[derive(Debug, Clone, Default)]
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    /// Create a handler and register the Unix signal handlers.
    ///
    /// # Errors
    ///
    /// Returns the OS error if any handler cannot be installed.
    pub fn new() -> std::io::Result<Self> {
        let handler = Self::default();

        #[cfg(unix)]
        register_unix_handlers()?;

        Ok(handler)
    }

    /// Move any signals caught since the last poll into the shared state.
    pub fn poll(&self) {
        if SHUTDOWN_FLAG.swap(false, Ordering::Relaxed) {
            info!(signal = %SignalKind::Shutdown, "Signal received");
            self.state.record_signal(SignalKind::Shutdown);
        }
        if STATUS_FLAG.swap(false, Ordering::Relaxed) {
            debug!(signal = %SignalKind::Status, "Signal received");
            self.state.record_signal(SignalKind::Status);
        }
    }

    /// Whether shutdown has been requested.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.state.shutdown_requested()
    }

    /// Whether a status report was requested, clearing the request.
    #[inline]
    pub fn take_status_request(&self) -> bool {
        self.state.take_status_request()
    }

    /// Request shutdown from inside the daemon.
    pub fn request_shutdown(&self) {
        info!("Shutdown requested");
        self.state.request_shutdown();
    }

    /// Shared state for inspection.
    pub fn state(&self) -> &SignalState {
        &self.state
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn register_unix_handlers() -> std::io::Result<()> {
    use std::os::raw::c_int;

    extern "C" fn on_shutdown(_: c_int) {
        SHUTDOWN_FLAG.store(true, Ordering::Relaxed);
    }

    extern "C" fn on_status(_: c_int) {
        STATUS_FLAG.store(true, Ordering::Relaxed);
    }

    let handlers: [(c_int, extern "C" fn(c_int)); 3] = [
        (libc::SIGTERM, on_shutdown),
        (libc::SIGINT, on_shutdown),
        (libc::SIGHUP, on_status),
    ];

    for (signal, handler) in handlers {
        // SAFETY: the handlers only store to static atomics, which is
        // async-signal-safe.
        let previous = unsafe { libc::signal(signal, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }

    debug!("Unix signal handlers registered");
    Ok(())
}
