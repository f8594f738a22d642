use crate::error::{ConfigError, Result, Violation};

/// Number of hardware sprite slots
pub const SPRITE_COUNT: usize = 64;
/// OAM (Object Attribute Memory) size in bytes
pub const OAM_SIZE: usize = SPRITE_COUNT * 4;
/// First row the rasterizer never draws
const FIRST_HIDDEN_ROW: u8 = 240;

/// OAM attribute byte mask - bits 2-4 are unimplemented and always read as 0
/// Mask: 11100011 (0xE3) - preserves bits 7-5 (priority/palette) and 1-0 (flip bits)
const OAM_ATTRIBUTE_MASK: u8 = 0xE3;

/// One hardware sprite, fields in OAM byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteSlot {
    pub y: u8,
    pub tile: u8,
    pub attributes: u8,
    pub x: u8,
}

impl SpriteSlot {
    pub fn is_visible(&self) -> bool {
        self.y < FIRST_HIDDEN_ROW
    }

    fn to_bytes(self) -> [u8; 4] {
        [self.y, self.tile, self.attributes, self.x]
    }
}

/// CPU-side sprite table, copied into OAM once per frame.
///
/// Slot 0 is reserved for the sprite-0 hit used to time the status-bar
/// split, so bulk clears never move it.
pub struct SpriteTable {
    slots: [SpriteSlot; SPRITE_COUNT],
    offscreen_y: u8,
}

impl SpriteTable {
    /// Create a table with every slot except 0 hidden at `offscreen_y`.
    ///
    /// # Errors
    ///
    /// `offscreen_y` must lie below the visible rows (240 or more).
    pub fn new(offscreen_y: u8) -> std::result::Result<Self, ConfigError> {
        if offscreen_y < FIRST_HIDDEN_ROW {
            return Err(ConfigError::OnscreenSentinel(offscreen_y));
        }
        let mut table = Self {
            slots: [SpriteSlot::default(); SPRITE_COUNT],
            offscreen_y,
        };
        table.clear_all_except_zero();
        Ok(table)
    }

    /// Reset to power-on contents
    pub fn reset(&mut self) {
        self.slots = [SpriteSlot::default(); SPRITE_COUNT];
        self.clear_all_except_zero();
    }

    /// Move every sprite except slot 0 below the visible picture
    pub fn clear_all_except_zero(&mut self) {
        for slot in self.slots.iter_mut().skip(1) {
            slot.y = self.offscreen_y;
        }
    }

    pub fn set_slot(&mut self, index: usize, x: u8, y: u8, tile: u8, attributes: u8) -> Result<()> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Violation::SpriteIndex(index))?;
        *slot = SpriteSlot {
            y,
            tile,
            attributes,
            x,
        };
        Ok(())
    }

    /// Hide a single slot
    pub fn hide_slot(&mut self, index: usize) -> Result<()> {
        let offscreen_y = self.offscreen_y;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Violation::SpriteIndex(index))?;
        slot.y = offscreen_y;
        Ok(())
    }

    pub fn slot(&self, index: usize) -> Option<SpriteSlot> {
        self.slots.get(index).copied()
    }

    pub fn slots(&self) -> &[SpriteSlot] {
        &self.slots
    }

    pub fn visible_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_visible()).count()
    }

    /// The table as a 256-byte DMA page
    pub fn as_oam_bytes(&self) -> [u8; OAM_SIZE] {
        let mut page = [0u8; OAM_SIZE];
        for (chunk, slot) in page.chunks_exact_mut(4).zip(self.slots.iter()) {
            chunk.copy_from_slice(&slot.to_bytes());
        }
        page
    }
}

/// PPU-side OAM behind $2003/$2004/$4014
pub struct Oam {
    data: [u8; OAM_SIZE],
}

impl Oam {
    pub fn new() -> Self {
        Self {
            data: [0xFF; OAM_SIZE],
        }
    }

    pub fn reset(&mut self) {
        self.data = [0xFF; OAM_SIZE];
    }

    /// Get OAM data at specified address
    pub fn read(&self, addr: u8) -> u8 {
        let value = self.data[addr as usize];
        // Byte 2 of each sprite (attribute byte) has unimplemented bits 2-4
        if (addr & 0x03) == 2 {
            value & OAM_ATTRIBUTE_MASK
        } else {
            value
        }
    }

    /// Write OAM data at specified address
    /// Unimplemented attribute bits are stored and masked on read
    pub fn write(&mut self, addr: u8, value: u8) {
        self.data[addr as usize] = value;
    }

    /// Copy a DMA page, wrapping around from `start`
    pub fn dma(&mut self, start: u8, page: &[u8; OAM_SIZE]) {
        for (offset, byte) in page.iter().enumerate() {
            let addr = start.wrapping_add(offset as u8);
            self.data[addr as usize] = *byte;
        }
    }

    pub fn bytes(&self) -> &[u8; OAM_SIZE] {
        &self.data
    }

    pub(super) fn load(&mut self, bytes: &[u8]) {
        self.data.copy_from_slice(bytes);
    }
}

impl Default for Oam {
    fn default() -> Self {
        Self::new()
    }
}
