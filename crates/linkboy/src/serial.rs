/// Serial transfer controller (SB/SC at FF01/FF02).
///
/// No link cable is ever attached, so nothing is shifted in or out: SB
/// always reads back as 0xFF and a started transfer simply completes after
/// the time eight bits would take on the internal 8192 Hz clock, at which
/// point the serial interrupt is raised. Time advances through `advance`,
/// which is fed the absolute T-cycle count of the enclosing machine; the
/// unit keeps its own copy of the last count it saw and works on the delta.
use bitflags::bitflags;
use log::{debug, trace};

use crate::state::{StateError, StateReader, StateWriter};

/// T-cycles one internally clocked transfer takes (8 bits, 122 cycles each).
pub const SERIAL_TRANSFER_CYCLES: i64 = 8 * 122;

/// Size in bytes of the persisted serial record.
pub const SNAPSHOT_LEN: usize = 18;

/// SB value with nothing on the other end of the cable.
const DISCONNECTED_SB: u8 = 0xFF;

bitflags! {
    /// SC (FF02) bits the unit knows about. Reserved bits are kept as-is.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct SerialControl: u8 {
        const TRANSFER_START = 0x80;
        const INTERNAL_CLOCK = 0x01;
        const _ = !0;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockSource {
    External,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SerialUnit {
    /// SB (FF01).
    sb: u8,
    /// SC (FF02), stored verbatim.
    sc: SerialControl,
    /// Cycles left in the in-flight transfer. Stale while idle.
    cycles_remaining: i64,
    /// Absolute cycle count passed to the previous `advance`.
    last_cycle: u64,
}

impl Default for SerialUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialUnit {
    pub fn new() -> Self {
        Self {
            sb: DISCONNECTED_SB,
            sc: SerialControl::empty(),
            cycles_remaining: 0,
            last_cycle: 0,
        }
    }

    pub fn read_sb(&self) -> u8 {
        self.sb
    }

    /// Writes to SB are dropped: the byte "received" from an empty port is
    /// always 0xFF.
    pub fn write_sb(&mut self, value: u8) {
        trace!("SB write 0x{value:02X} ignored (no link partner)");
    }

    pub fn read_sc(&self) -> u8 {
        self.sc.bits()
    }

    /// Store SC. Setting bit 7 starts a transfer; the countdown continues
    /// from whatever the last completion reloaded it to.
    pub fn write_sc(&mut self, value: u8) {
        let was_active = self.is_transferring();
        self.sc = SerialControl::from_bits_retain(value);
        if !was_active && self.is_transferring() {
            debug!(
                "serial transfer started (SC=0x{value:02X}, {} cycles to go)",
                self.cycles_remaining
            );
        }
    }

    pub fn is_transferring(&self) -> bool {
        self.sc.contains(SerialControl::TRANSFER_START)
    }

    /// Clock selected by SC bit 0. Recorded only; timing always follows
    /// the internal clock.
    pub fn clock_source(&self) -> ClockSource {
        if self.sc.contains(SerialControl::INTERNAL_CLOCK) {
            ClockSource::Internal
        } else {
            ClockSource::External
        }
    }

    pub fn cycles_remaining(&self) -> i64 {
        self.cycles_remaining
    }

    pub fn last_observed_cycle(&self) -> u64 {
        self.last_cycle
    }

    /// Catch up to `now`, the machine's absolute T-cycle count.
    ///
    /// Returns `true` exactly when a transfer completed during this call, in
    /// which case the caller must request the serial interrupt.
    pub fn advance(&mut self, now: u64) -> bool {
        // A count at or behind the last one has no elapsed time to account for.
        let elapsed = now.saturating_sub(self.last_cycle);
        if elapsed == 0 {
            return false;
        }
        self.last_cycle = now;

        if !self.is_transferring() {
            return false;
        }

        let elapsed = i64::try_from(elapsed).unwrap_or(i64::MAX);
        self.cycles_remaining = self.cycles_remaining.saturating_sub(elapsed);
        if self.cycles_remaining > 0 {
            return false;
        }

        self.sc.remove(SerialControl::TRANSFER_START);
        self.cycles_remaining = SERIAL_TRANSFER_CYCLES;
        debug!("serial transfer complete at cycle {now}");
        true
    }

    /// Write the unit's record: SB, SC, last cycle, remaining cycles.
    pub fn serialize<W: StateWriter + ?Sized>(&self, out: &mut W) -> Result<(), StateError> {
        out.write_u8(self.sb)?;
        out.write_u8(self.sc.bits())?;
        out.write_u64(self.last_cycle)?;
        out.write_i64(self.cycles_remaining)?;
        Ok(())
    }

    /// Overwrite the unit from a record written by `serialize`.
    ///
    /// `version` is the snapshot format version of the enclosing state. On
    /// error the unit may be partially
    /// overwritten and must not be resumed.
    pub fn deserialize<R: StateReader + ?Sized>(
        &mut self,
        input: &mut R,
        version: u8,
    ) -> Result<(), StateError> {
        // Every format version so far shares this layout.
        let _ = version;
        self.sb = input.read_u8()?;
        self.sc = SerialControl::from_bits_retain(input.read_u8()?);
        self.last_cycle = input.read_u64()?;
        self.cycles_remaining = input.read_i64()?;
        Ok(())
    }
}
