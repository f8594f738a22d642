//! The write toggle ("w") behind PPUSCROLL ($2005) and PPUADDR ($2006).
//!
//! Both registers are fed through one shared flip-flop. Every write to
//! either register flips it, and only a PPUSTATUS read puts it back to
//! `First`. A scroll write followed by an address write therefore lands in
//! the *second* half of the address, exactly like on the 2C02.

use serde::{Deserialize, Serialize};

use super::registers::Registers;

/// Which half of a two-write register the next write fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteToggle {
    /// X scroll, or the high address byte
    #[default]
    First,
    /// Y scroll, or the low address byte
    Second,
}

impl WriteToggle {
    pub fn flip(self) -> Self {
        match self {
            WriteToggle::First => WriteToggle::Second,
            WriteToggle::Second => WriteToggle::First,
        }
    }

    pub fn is_second(self) -> bool {
        self == WriteToggle::Second
    }
}

/// Mask for the 14-bit PPU address space
const ADDRESS_MASK: u16 = 0x3FFF;

impl Registers {
    /// Write to scroll register ($2005)
    pub fn write_scroll(&mut self, value: u8) {
        match self.toggle {
            // First write: X scroll
            WriteToggle::First => self.scroll_x = value,
            // Second write: Y scroll
            WriteToggle::Second => self.scroll_y = value,
        }
        log::trace!("PPUSCROLL <- {value:#04X} ({:?} write)", self.toggle);
        self.toggle = self.toggle.flip();
    }

    /// Write to address register ($2006)
    pub fn write_address(&mut self, value: u8) {
        match self.toggle {
            WriteToggle::First => {
                // High byte, only 6 bits reach the address lines
                self.pending_address =
                    (self.pending_address & 0x00FF) | (((value & 0x3F) as u16) << 8);
            }
            WriteToggle::Second => {
                // Low byte, then the whole address becomes current
                self.pending_address = (self.pending_address & 0xFF00) | value as u16;
                self.vram_address = self.pending_address & ADDRESS_MASK;
            }
        }
        log::trace!("PPUADDR <- {value:#04X} ({:?} write)", self.toggle);
        self.toggle = self.toggle.flip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AddressIncrement;

    fn registers() -> Registers {
        Registers::new(AddressIncrement::default())
    }

    #[test]
    fn test_toggle_flip() {
        assert_eq!(WriteToggle::First.flip(), WriteToggle::Second);
        assert_eq!(WriteToggle::Second.flip(), WriteToggle::First);
    }

    #[test]
    fn test_write_scroll_first() {
        let mut regs = registers();
        regs.write_scroll(0x42);
        assert_eq!(regs.scroll(), (0x42, 0));
        assert!(regs.toggle().is_second());
    }

    #[test]
    fn test_write_scroll_second() {
        let mut regs = registers();
        regs.write_scroll(0x10);
        regs.write_scroll(0x20);
        assert_eq!(regs.scroll(), (0x10, 0x20));
        assert_eq!(regs.toggle(), WriteToggle::First);
    }

    #[test]
    fn test_write_address() {
        let mut regs = registers();
        regs.write_address(0x3F);
        regs.write_address(0x00);
        assert_eq!(regs.vram_address(), 0x3F00);
    }

    #[test]
    fn test_address_high_byte_masked_to_14_bits() {
        let mut regs = registers();
        regs.write_address(0xFF);
        regs.write_address(0x12);
        assert_eq!(regs.vram_address(), 0x3F12);
    }

    #[test]
    fn test_first_address_write_does_not_move_vram_address() {
        let mut regs = registers();
        regs.write_address(0x21);
        regs.write_address(0x00);
        regs.write_address(0x23);
        // Half-written address is still pending
        assert_eq!(regs.vram_address(), 0x2100);
    }

    #[test]
    fn test_scroll_then_address_shares_toggle() {
        let mut regs = registers();
        regs.write_address(0x20);
        regs.write_address(0x00);

        // X scroll consumes the first half...
        regs.write_scroll(0x08);
        // ...so this lands as the low address byte
        regs.write_address(0x55);

        assert_eq!(regs.scroll(), (0x08, 0));
        assert_eq!(regs.vram_address(), 0x2055);
        assert_eq!(regs.toggle(), WriteToggle::First);
    }

    #[test]
    fn test_address_then_scroll_shares_toggle() {
        let mut regs = registers();
        regs.write_address(0x24);
        // Second half of the pair goes to Y scroll
        regs.write_scroll(0x30);
        assert_eq!(regs.scroll(), (0, 0x30));
        assert_eq!(regs.vram_address(), 0);
    }

    #[test]
    fn test_clear_toggle_discards_half_write() {
        let mut regs = registers();
        regs.write_scroll(5);
        regs.clear_toggle();
        regs.write_scroll(7);
        assert_eq!(regs.scroll(), (7, 0));
        assert!(regs.toggle().is_second());
    }
}
