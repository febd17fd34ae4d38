use log::{info, warn};

use crate::interrupts::{Interrupt, InterruptFlags, InterruptSink};
use crate::serial::SerialUnit;
use crate::state::{StateError, StateReader, StateWriter};

/// Leading bytes of every machine snapshot.
pub const STATE_MAGIC: [u8; 4] = *b"LNKB";
/// Snapshot format version written by `save_state`.
pub const STATE_VERSION: u8 = 1;

/// Minimal host machine for the serial port.
///
/// Owns the master T-cycle counter, the IF register and the serial unit, and
/// plays the part of the CPU-side driver: every step advances the counter and
/// lets the serial unit catch up, forwarding completions to IF.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkMachine {
    pub serial: SerialUnit,
    pub if_reg: InterruptFlags,
    /// T-cycles since power-on.
    cycles: u64,
}

impl LinkMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Advance the machine by `cycles` T-cycles.
    ///
    /// Returns `true` if the serial interrupt was requested during the step.
    pub fn step(&mut self, cycles: u32) -> bool {
        self.cycles = self.cycles.wrapping_add(cycles as u64);
        let fired = self.serial.advance(self.cycles);
        if fired {
            self.if_reg.request(Interrupt::Serial);
        }
        fired
    }

    /// Step until the serial interrupt fires, giving up after `max_steps`.
    ///
    /// Returns the number of steps taken, or `None` if the budget ran out.
    pub fn run_until_serial_interrupt(&mut self, step_cycles: u32, max_steps: u64) -> Option<u64> {
        for taken in 1..=max_steps {
            if self.step(step_cycles) {
                return Some(taken);
            }
        }
        None
    }

    pub fn read8(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.serial.read_sb(),
            0xFF02 => self.serial.read_sc(),
            0xFF0F => self.if_reg.read(),
            _ => {
                warn!("read from unmapped address 0x{addr:04X}");
                0xFF
            }
        }
    }

    pub fn write8(&mut self, addr: u16, value: u8) {
        match addr {
            0xFF01 => self.serial.write_sb(value),
            0xFF02 => self.serial.write_sc(value),
            0xFF0F => self.if_reg.write(value),
            _ => warn!("write 0x{value:02X} to unmapped address 0x{addr:04X} ignored"),
        }
    }

    pub fn save_state<W: StateWriter + ?Sized>(&self, out: &mut W) -> Result<(), StateError> {
        for byte in STATE_MAGIC {
            out.write_u8(byte)?;
        }
        out.write_u8(STATE_VERSION)?;
        out.write_u64(self.cycles)?;
        out.write_u8(self.if_reg.bits())?;
        self.serial.serialize(out)?;
        Ok(())
    }

    /// Replace the machine with a snapshot written by `save_state`.
    ///
    /// The snapshot is decoded into a scratch machine first, so a failed load
    /// leaves `self` untouched.
    pub fn load_state<R: StateReader + ?Sized>(&mut self, input: &mut R) -> Result<(), StateError> {
        for expected in STATE_MAGIC {
            if input.read_u8()? != expected {
                return Err(StateError::BadMagic);
            }
        }
        let version = input.read_u8()?;
        if version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion { found: version });
        }

        let mut loaded = LinkMachine::new();
        loaded.cycles = input.read_u64()?;
        loaded.if_reg = InterruptFlags::from_bits_truncate(input.read_u8()?);
        loaded.serial.deserialize(input, version)?;

        info!("loaded state v{version} at cycle {}", loaded.cycles);
        *self = loaded;
        Ok(())
    }
}
