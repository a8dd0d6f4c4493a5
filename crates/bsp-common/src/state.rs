//! Time base lifecycle state machine.
//!
//! State transitions:
//! RESET → RUNNING ⇄ SUSPENDED → STOPPED
//!
//! SUSPENDED only masks the wrap interrupt; the hardware counter keeps
//! running. STOPPED is terminal for a time base instance.

use crate::error::{BspError, BspResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle states of the time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeBaseState {
    /// Peripheral not yet configured.
    #[default]
    Reset,
    /// Counter running and wrap interrupt enabled.
    Running,
    /// Counter running, wrap interrupt masked.
    Suspended,
    /// Counter stopped and interrupt disabled.
    Stopped,
}

impl fmt::Display for TimeBaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "RESET"),
            Self::Running => write!(f, "RUNNING"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

impl TimeBaseState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: TimeBaseState) -> bool {
        use TimeBaseState::{Reset, Running, Stopped, Suspended};

        matches!(
            (self, target),
            (Reset, Running)
                | (Running, Suspended)
                | (Suspended, Running)
                | (Running, Stopped)
                | (Suspended, Stopped)
        )
    }

    /// Attempt to transition to `target`, returning error if invalid.
    pub fn transition_to(&mut self, target: TimeBaseState) -> BspResult<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(BspError::InvalidStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Returns true while the hardware counter is advancing.
    #[must_use]
    pub fn is_counting(&self) -> bool {
        matches!(self, Self::Running | Self::Suspended)
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Reset => 0,
            Self::Running => 1,
            Self::Suspended => 2,
            Self::Stopped => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Suspended,
            3 => Self::Stopped,
            _ => Self::Reset,
        }
    }
}

/// Lifecycle state shared between contexts.
///
/// Transitions are compare-and-swap so that a suspend racing a resume cannot
/// land the state somewhere the transition table does not allow.
#[derive(Debug)]
pub struct AtomicTimeBaseState(AtomicU8);

impl Default for AtomicTimeBaseState {
    fn default() -> Self {
        Self::new(TimeBaseState::Reset)
    }
}

impl AtomicTimeBaseState {
    /// Create a state cell holding `state`.
    #[must_use]
    pub const fn new(state: TimeBaseState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    /// Current state.
    #[must_use]
    pub fn load(&self) -> TimeBaseState {
        TimeBaseState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Transition to `target`, returning the previous state.
    pub fn transition(&self, target: TimeBaseState) -> BspResult<TimeBaseState> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = TimeBaseState::from_u8(current);
            if !from.can_transition_to(target) {
                return Err(BspError::InvalidStateTransition {
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
            match self.0.compare_exchange_weak(
                current,
                target.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}
