pub mod interrupts;
pub mod machine;
pub mod serial;
pub mod state;

pub use interrupts::{Interrupt, InterruptFlags, InterruptSink};
pub use machine::LinkMachine;
pub use serial::{ClockSource, SerialControl, SerialUnit};
pub use state::{StateError, StateReader, StateWriter};

/// DMG CPU clock rate in T-cycles per second.
pub const CPU_CLOCK_HZ: u64 = 4_194_304;
/// T-cycles per machine cycle.
pub const TCYCLES_PER_MCYCLE: u32 = 4;
