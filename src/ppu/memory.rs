use serde::{Deserialize, Serialize};

/// Size of one logical nametable including its attribute table
pub const NAMETABLE_SIZE: usize = 0x400;
/// Tile bytes at the start of each nametable (32x30 tiles)
pub const TILE_AREA_SIZE: usize = 0x3C0;
/// Attribute bytes at the end of each nametable
pub const ATTRIBUTE_TABLE_SIZE: usize = 0x40;
/// Nametable RAM, large enough for four-screen boards
pub const NAMETABLE_RAM_SIZE: usize = 0x1000;
pub const PALETTE_SIZE: usize = 32;

/// Nametable mirroring mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirroring {
    #[default]
    Horizontal,
    Vertical,
    SingleScreen,
    FourScreen,
}

/// Manages nametable, attribute table and palette RAM
pub struct Memory {
    /// Nametables - 4KB (supports all four nametables for FourScreen mode)
    ppu_ram: [u8; NAMETABLE_RAM_SIZE],
    /// Palette RAM - 32 bytes
    palette: [u8; PALETTE_SIZE],
    mirroring_mode: Mirroring,
}

impl Memory {
    /// Create a new Memory instance
    pub fn new(mirroring_mode: Mirroring) -> Self {
        Self {
            ppu_ram: [0; NAMETABLE_RAM_SIZE],
            palette: [0; PALETTE_SIZE],
            mirroring_mode,
        }
    }

    /// Reset memory to initial state
    pub fn reset(&mut self) {
        self.ppu_ram = [0; NAMETABLE_RAM_SIZE];
        self.palette = [0; PALETTE_SIZE];
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring_mode = mirroring;
    }

    pub fn mirroring_mode(&self) -> Mirroring {
        self.mirroring_mode
    }

    /// Read from nametable at the specified address (with mirroring)
    pub fn read_nametable(&self, addr: u16) -> u8 {
        let mirrored = self.mirror_vram_address(addr);
        self.ppu_ram[mirrored as usize]
    }

    /// Write to nametable at the specified address (with mirroring)
    pub fn write_nametable(&mut self, addr: u16, value: u8) {
        let mirrored = self.mirror_vram_address(addr);
        self.ppu_ram[mirrored as usize] = value;
    }

    /// Tile bytes of logical nametable 0-3 after mirroring
    pub fn nametable(&self, index: usize) -> &[u8] {
        let base = self.table_base(index);
        &self.ppu_ram[base..base + TILE_AREA_SIZE]
    }

    /// Attribute table of logical nametable 0-3 after mirroring
    pub fn attribute_table(&self, index: usize) -> &[u8] {
        let base = self.table_base(index) + TILE_AREA_SIZE;
        &self.ppu_ram[base..base + ATTRIBUTE_TABLE_SIZE]
    }

    fn table_base(&self, index: usize) -> usize {
        let addr = 0x2000 + ((index & 0x03) * NAMETABLE_SIZE) as u16;
        self.mirror_vram_address(addr) as usize
    }

    /// Read from palette at the specified address (with mirroring)
    pub fn read_palette(&self, addr: u16) -> u8 {
        let mirrored = self.mirror_palette_address(addr);
        self.palette[mirrored]
    }

    /// Write to palette at the specified address (with mirroring)
    /// Palette RAM only stores 6 bits (0-5), bits 6-7 are ignored
    pub fn write_palette(&mut self, addr: u16, value: u8) {
        let mirrored = self.mirror_palette_address(addr);
        self.palette[mirrored] = value & 0x3F;
    }

    /// Raw nametable RAM, in physical order
    pub fn raw_nametable_ram(&self) -> &[u8] {
        &self.ppu_ram
    }

    /// Raw palette RAM
    pub fn raw_palette(&self) -> &[u8] {
        &self.palette
    }

    /// Overwrite nametable and palette RAM. Lengths are checked by the caller.
    /// Palette entries keep only their low 6 bits, as with `write_palette`.
    pub(super) fn load_raw(&mut self, ram: &[u8], palette: &[u8]) {
        self.ppu_ram.copy_from_slice(ram);
        for (entry, value) in self.palette.iter_mut().zip(palette) {
            *entry = value & 0x3F;
        }
    }

    /// Mirror VRAM address based on nametable mirroring mode
    fn mirror_vram_address(&self, addr: u16) -> u16 {
        // Mirror down $3000-$3EFF to the range $2000-$2EFF
        let vram_index = (addr & 0x2FFF) - 0x2000;

        match self.mirroring_mode {
            // $2000/$2800 share the first 1KB, $2400/$2C00 the second
            Mirroring::Vertical => vram_index % 0x0800,
            // $2000/$2400 share the first 1KB, $2800/$2C00 the second
            Mirroring::Horizontal => {
                let table = vram_index / 0x0400;
                let offset = vram_index % 0x0400;
                (table / 2) * 0x0400 + offset
            }
            Mirroring::SingleScreen => vram_index % 0x0400,
            Mirroring::FourScreen => vram_index,
        }
    }

    /// Mirror palette address
    /// Addresses $3F10, $3F14, $3F18, $3F1C mirror to $3F00, $3F04, $3F08, $3F0C
    fn mirror_palette_address(&self, addr: u16) -> usize {
        let offset = (addr as usize) % PALETTE_SIZE;
        if offset & 0x13 == 0x10 {
            offset & 0x0F
        } else {
            offset
        }
    }
}
