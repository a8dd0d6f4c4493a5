//! Acceptance test modules.
//!
//! Deterministic tests use the stepped simulated timer; tests that compare
//! against wall-clock time use the real-time one and allow generous slack
//! for host scheduling.

mod board_test;
mod common;
mod delay_test;
mod rollover_test;
mod soak_test;
