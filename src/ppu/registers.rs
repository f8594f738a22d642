use bitflags::bitflags;

use super::latch::WriteToggle;
use crate::config::AddressIncrement;

bitflags! {
    /// PPU Control Register ($2000) bits
    /// Bit 7: Generate NMI at start of VBlank
    /// Bit 6: PPU Master/Slave
    /// Bit 5: Sprite size
    /// Bit 4: Background pattern table address
    /// Bit 3: Sprite pattern table address
    /// Bit 2: Address increment per CPU read/write of PPUDATA
    /// Bit 1-0: Base nametable address
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlFlags: u8 {
        const NAMETABLE_LO = 0b0000_0001;
        const NAMETABLE_HI = 0b0000_0010;
        const VRAM_INCREMENT_DOWN = 0b0000_0100;
        const SPRITE_PATTERN_TABLE = 0b0000_1000;
        const BG_PATTERN_TABLE = 0b0001_0000;
        const SPRITE_SIZE = 0b0010_0000;
        const MASTER_SLAVE = 0b0100_0000;
        const GENERATE_NMI = 0b1000_0000;
    }
}

bitflags! {
    /// PPU Mask Register ($2001) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaskFlags: u8 {
        const GRAYSCALE = 0b0000_0001;
        const SHOW_BACKGROUND_LEFT = 0b0000_0010;
        const SHOW_SPRITES_LEFT = 0b0000_0100;
        const SHOW_BACKGROUND = 0b0000_1000;
        const SHOW_SPRITES = 0b0001_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_BLUE = 0b1000_0000;
        /// Either layer drawing means the PPU owns VRAM
        const RENDERING = Self::SHOW_BACKGROUND.bits() | Self::SHOW_SPRITES.bits();
    }
}

/// Manages PPUCTRL, PPUMASK, OAMADDR, the scroll pair, the VRAM address
/// and the write toggle shared by $2005/$2006
pub struct Registers {
    pub(super) control: ControlFlags,
    pub(super) mask: MaskFlags,
    /// OAM address register ($2003)
    pub oam_address: u8,
    /// Current VRAM address (14 bits)
    pub(super) vram_address: u16,
    /// Address being assembled by $2006 writes
    pub(super) pending_address: u16,
    pub(super) scroll_x: u8,
    pub(super) scroll_y: u8,
    pub(super) toggle: WriteToggle,
    increment: AddressIncrement,
}

impl Registers {
    /// Create a new Registers instance
    pub fn new(increment: AddressIncrement) -> Self {
        Self {
            control: ControlFlags::empty(),
            mask: MaskFlags::empty(),
            oam_address: 0,
            vram_address: 0,
            pending_address: 0,
            scroll_x: 0,
            scroll_y: 0,
            toggle: WriteToggle::First,
            increment,
        }
    }

    /// Reset registers to initial state
    pub fn reset(&mut self) {
        *self = Self::new(self.increment);
    }

    /// Write to control register ($2000)
    pub fn write_control(&mut self, value: u8) {
        log::trace!("PPUCTRL <- {value:#04X}");
        self.control = ControlFlags::from_bits_retain(value);
    }

    /// Write to mask register ($2001)
    pub fn write_mask(&mut self, value: u8) {
        log::trace!("PPUMASK <- {value:#04X}");
        self.mask = MaskFlags::from_bits_retain(value);
    }

    /// Select the PPUDATA step without touching the other control bits
    pub fn set_increment_down(&mut self, down: bool) {
        self.control.set(ControlFlags::VRAM_INCREMENT_DOWN, down);
    }

    /// Step applied to the VRAM address after each PPUDATA access
    pub fn address_increment(&self) -> u16 {
        if self.control.contains(ControlFlags::VRAM_INCREMENT_DOWN) {
            self.increment.down
        } else {
            self.increment.across
        }
    }

    /// Increment VRAM address by the amount specified in control register
    pub fn increment_vram_address(&mut self) {
        self.vram_address = self.vram_address.wrapping_add(self.address_increment()) & 0x3FFF;
    }

    /// Load the VRAM address directly, bypassing the write toggle
    pub fn set_vram_address(&mut self, address: u16) {
        self.vram_address = address & 0x3FFF;
    }

    /// Get current VRAM address
    pub fn vram_address(&self) -> u16 {
        self.vram_address
    }

    /// Scroll pair as (X, Y)
    pub fn scroll(&self) -> (u8, u8) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn toggle(&self) -> WriteToggle {
        self.toggle
    }

    /// Clear write toggle (used when reading status)
    pub fn clear_toggle(&mut self) {
        self.toggle = WriteToggle::First;
    }

    /// Check if NMI should be generated
    pub fn should_generate_nmi(&self) -> bool {
        self.control.contains(ControlFlags::GENERATE_NMI)
    }

    /// Check if rendering is enabled (background or sprites)
    pub fn is_rendering_enabled(&self) -> bool {
        self.mask.intersects(MaskFlags::RENDERING)
    }

    pub fn control(&self) -> ControlFlags {
        self.control
    }

    pub fn mask(&self) -> MaskFlags {
        self.mask
    }
}
