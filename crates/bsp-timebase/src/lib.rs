//! Extended 32-bit microsecond time base for the H7RS board.
//!
//! A 16-bit hardware timer ticks at 1 MHz and interrupts on every wrap. The
//! interrupt bumps a software wrap counter; readers combine the two with a
//! lock-free "sample, read-wrap, sample" sequence that tolerates the
//! interrupt firing mid-read.

pub mod clock;
pub mod delay;
pub mod peripheral;
pub mod reader;
pub mod simulated;
pub mod timebase;
pub mod wrap;

pub use delay::TickSource;
pub use peripheral::{CounterSetup, TimerPeripheral, UpdateHandler};
pub use reader::RawSample;
pub use simulated::{SimulatedTimer, SimulationMode};
pub use timebase::TimeBase;
pub use wrap::WrapCounter;
