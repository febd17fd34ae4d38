use bitflags::bitflags;

/// DMG interrupt sources, in priority order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// IF/IE bit for this source.
    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }
}

/// Receiver for interrupt requests raised by peripherals.
pub trait InterruptSink {
    fn request(&mut self, interrupt: Interrupt);
}

bitflags! {
    /// IF (FF0F) register contents.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct InterruptFlags: u8 {
        const VBLANK = Interrupt::VBlank.bit();
        const LCD_STAT = Interrupt::LcdStat.bit();
        const TIMER = Interrupt::Timer.bit();
        const SERIAL = Interrupt::Serial.bit();
        const JOYPAD = Interrupt::Joypad.bit();
    }
}

impl InterruptFlags {
    /// IF as the CPU reads it; bits 7-5 are unconnected and read back as 1.
    pub fn read(self) -> u8 {
        self.bits() | 0xE0
    }

    pub fn write(&mut self, value: u8) {
        *self = InterruptFlags::from_bits_truncate(value);
    }

    pub fn is_pending(self, interrupt: Interrupt) -> bool {
        self.bits() & interrupt.bit() != 0
    }

    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        *self = InterruptFlags::from_bits_truncate(self.bits() & !interrupt.bit());
    }
}

impl InterruptSink for InterruptFlags {
    fn request(&mut self, interrupt: Interrupt) {
        *self |= InterruptFlags::from_bits_truncate(interrupt.bit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_requests_bit_three() {
        let mut flags = InterruptFlags::default();
        flags.request(Interrupt::Serial);
        assert_eq!(flags, InterruptFlags::SERIAL);
        assert_eq!(flags.read(), 0xE8);
        assert!(flags.is_pending(Interrupt::Serial));
        assert!(!flags.is_pending(Interrupt::Timer));
    }

    #[test]
    fn write_drops_unconnected_bits() {
        let mut flags = InterruptFlags::default();
        flags.write(0xFF);
        assert_eq!(flags.bits(), 0x1F);
        flags.acknowledge(Interrupt::Serial);
        assert_eq!(flags.read(), 0xF7);
    }
}
