use thiserror::Error;

/// Board support error types covering time base configuration, lifecycle
/// misuse, and board collaborator failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BspError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Interrupt priority does not fit the NVIC priority field.
    #[error("invalid interrupt priority {priority} (valid range 0..{levels})")]
    InvalidPriority {
        /// Requested priority.
        priority: u8,
        /// Number of implemented priority levels.
        levels: u16,
    },

    /// The timer's kernel clock is not running or cannot be determined.
    #[error("peripheral clock unavailable: {0}")]
    ClockUnavailable(String),

    /// The timer clock cannot be divided down to the requested counter rate.
    #[error("no exact prescaler for {timer_clock_hz}Hz timer clock at {counter_hz}Hz counter rate")]
    Prescaler {
        /// Timer kernel clock.
        timer_clock_hz: u32,
        /// Requested counter rate.
        counter_hz: u32,
    },

    /// Invalid lifecycle transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Command or data phase on an external bus failed.
    #[error("bus error: {0}")]
    Bus(String),

    /// A mode register read back a different value than was written.
    #[error("register MR{register} verify failed: wrote {wrote:#04x}, read {read:#04x}")]
    RegisterVerify {
        /// Mode register index.
        register: u32,
        /// Value written.
        wrote: u8,
        /// Value read back.
        read: u8,
    },

    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Convenience type alias for board support operations.
pub type BspResult<T> = Result<T, BspError>;
