use bitflags::bitflags;

bitflags! {
    /// PPU Status Register ($2002) bits
    /// Bit 7: VBlank started
    /// Bit 6: Sprite 0 hit
    /// Bit 5: Sprite overflow
    /// Bit 4-0: Unused
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_0_HIT = 0b0100_0000;
        const VBLANK = 0b1000_0000;
    }
}

/// Manages PPU status flags including VBlank, sprite 0 hit and overflow
pub struct Status {
    flags: StatusFlags,
}

impl Status {
    /// Create a new Status instance
    pub fn new() -> Self {
        Self {
            flags: StatusFlags::empty(),
        }
    }

    /// Reset status to initial state
    pub fn reset(&mut self) {
        self.flags = StatusFlags::empty();
    }

    /// Enter VBlank period
    pub fn enter_vblank(&mut self) {
        self.flags.insert(StatusFlags::VBLANK);
    }

    /// Leave VBlank at the pre-render line (clears all flags)
    pub fn end_vblank(&mut self) {
        self.flags = StatusFlags::empty();
    }

    /// Read the status register byte and clear the VBlank flag.
    /// Sprite 0 hit and overflow survive the read.
    pub fn read_status(&mut self) -> u8 {
        let status = self.flags.bits();
        self.flags.remove(StatusFlags::VBLANK);
        status
    }

    /// Current flags without the read side effect
    pub fn flags(&self) -> StatusFlags {
        self.flags
    }

    /// Overwrite all flags (save-state restore)
    pub fn set_flags(&mut self, flags: StatusFlags) {
        self.flags = flags;
    }

    /// Check if we're in VBlank period
    pub fn is_in_vblank(&self) -> bool {
        self.flags.contains(StatusFlags::VBLANK)
    }

    pub fn set_sprite_0_hit(&mut self) {
        self.flags.insert(StatusFlags::SPRITE_0_HIT);
    }

    pub fn set_sprite_overflow(&mut self) {
        self.flags.insert(StatusFlags::SPRITE_OVERFLOW);
    }

    pub fn is_sprite_0_hit(&self) -> bool {
        self.flags.contains(StatusFlags::SPRITE_0_HIT)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
