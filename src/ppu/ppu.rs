use crate::config::{FlushPolicy, PpuConfig};
use crate::ppu::sprites::{OAM_SIZE, Oam};
use crate::ppu::{
    ControlFlags, MaskFlags, Memory, Mirroring, Registers, Status, StatusFlags, WriteToggle,
};

/// PPU register ports, as seen by the CPU at $2000-$2007
pub const PPUCTRL: u16 = 0x2000;
pub const PPUMASK: u16 = 0x2001;
pub const PPUSTATUS: u16 = 0x2002;
pub const OAMADDR: u16 = 0x2003;
pub const OAMDATA: u16 = 0x2004;
pub const PPUSCROLL: u16 = 0x2005;
pub const PPUADDR: u16 = 0x2006;
pub const PPUDATA: u16 = 0x2007;

/// The emulated PPU register file: registers, status, video memory and OAM
pub struct Ppu {
    pub(super) status: Status,
    pub(super) registers: Registers,
    pub(super) memory: Memory,
    pub(super) oam: Oam,
    flush_policy: FlushPolicy,
}

impl Ppu {
    pub fn new(config: &PpuConfig) -> Self {
        Self {
            status: Status::new(),
            registers: Registers::new(config.increment),
            memory: Memory::new(config.mirroring),
            oam: Oam::new(),
            flush_policy: config.flush_policy,
        }
    }

    /// Hardware reset. Mirroring and the configured policies are kept.
    pub fn reset(&mut self) {
        self.status.reset();
        self.registers.reset();
        self.memory.reset();
        self.oam.reset();
    }

    /// Write to control register ($2000)
    pub fn write_control(&mut self, value: u8) {
        self.registers.write_control(value);
    }

    /// Write to mask register ($2001)
    pub fn write_mask(&mut self, value: u8) {
        self.registers.write_mask(value);
    }

    /// Read status register ($2002)
    pub fn read_status(&mut self) -> u8 {
        let status = self.status.read_status();
        self.registers.clear_toggle(); // Reading status clears write toggle
        status
    }

    /// Write to scroll register ($2005)
    pub fn write_scroll(&mut self, value: u8) {
        self.registers.write_scroll(value);
    }

    /// Write to address register ($2006)
    pub fn write_address(&mut self, value: u8) {
        self.registers.write_address(value);
    }

    /// Write to data register ($2007)
    pub fn write_data(&mut self, value: u8) {
        let addr = self.registers.vram_address();
        match addr {
            0x0000..=0x1FFF => {
                // Pattern tables live on the cartridge
                log::warn!("Ignoring PPUDATA write of {value:#04X} to pattern table {addr:#06X}");
            }
            0x2000..=0x3EFF => self.memory.write_nametable(addr, value),
            0x3F00..=0x3FFF => self.memory.write_palette(addr, value),
            _ => {}
        }
        self.registers.increment_vram_address();
    }

    /// Write to OAM address register ($2003)
    pub fn write_oam_address(&mut self, value: u8) {
        self.registers.oam_address = value;
    }

    /// Write to OAM data register ($2004)
    pub fn write_oam_data(&mut self, value: u8) {
        self.oam.write(self.registers.oam_address, value);
        self.registers.oam_address = self.registers.oam_address.wrapping_add(1);
    }

    /// Read from OAM data register ($2004)
    pub fn read_oam_data(&self) -> u8 {
        self.oam.read(self.registers.oam_address)
    }

    /// Sprite DMA ($4014): copy a full page into OAM starting at OAMADDR
    pub fn oam_dma(&mut self, page: &[u8; OAM_SIZE]) {
        self.oam.dma(self.registers.oam_address, page);
    }

    /// CPU read from $2000-$3FFF. Write-only ports read back as 0.
    pub fn read_register(&mut self, addr: u16) -> u8 {
        match 0x2000 | (addr & 0x0007) {
            PPUSTATUS => self.read_status(),
            OAMDATA => self.read_oam_data(),
            port => {
                log::trace!("Read from write-only PPU port {port:#06X}");
                0
            }
        }
    }

    /// CPU write to $2000-$3FFF (mirrored every 8 bytes)
    pub fn write_register(&mut self, addr: u16, value: u8) {
        match 0x2000 | (addr & 0x0007) {
            PPUCTRL => self.write_control(value),
            PPUMASK => self.write_mask(value),
            OAMADDR => self.write_oam_address(value),
            OAMDATA => self.write_oam_data(value),
            PPUSCROLL => self.write_scroll(value),
            PPUADDR => self.write_address(value),
            PPUDATA => self.write_data(value),
            _ => log::trace!("Write of {value:#04X} to read-only PPUSTATUS ignored"),
        }
    }

    /// Load the VRAM address directly, without going through $2006
    pub fn set_vram_address(&mut self, address: u16) {
        self.registers.set_vram_address(address);
    }

    /// Select the PPUDATA step (+across or +down) leaving other PPUCTRL bits alone
    pub fn set_increment_down(&mut self, down: bool) {
        self.registers.set_increment_down(down);
    }

    pub fn enter_vblank(&mut self) {
        self.status.enter_vblank();
    }

    pub fn end_vblank(&mut self) {
        self.status.end_vblank();
    }

    /// Called by the rasterizer when sprite 0 overlaps the background
    pub fn set_sprite_0_hit(&mut self) {
        self.status.set_sprite_0_hit();
    }

    /// Called by the rasterizer when more than 8 sprites share a line
    pub fn set_sprite_overflow(&mut self) {
        self.status.set_sprite_overflow();
    }

    /// Whether VRAM may be written without corrupting the picture
    pub fn can_access_vram(&self) -> bool {
        if !self.registers.is_rendering_enabled() {
            return true;
        }
        match self.flush_policy {
            FlushPolicy::RenderingOffOrVblank => self.status.is_in_vblank(),
            FlushPolicy::RenderingOffOnly => false,
        }
    }

    /// Check if in VBlank period
    pub fn is_in_vblank(&self) -> bool {
        self.status.is_in_vblank()
    }

    /// Check if should generate NMI
    pub fn should_generate_nmi(&self) -> bool {
        self.registers.should_generate_nmi()
    }

    pub fn is_rendering_enabled(&self) -> bool {
        self.registers.is_rendering_enabled()
    }

    /// Status flags without the read side effect
    pub fn status_flags(&self) -> StatusFlags {
        self.status.flags()
    }

    pub fn control(&self) -> ControlFlags {
        self.registers.control()
    }

    pub fn mask(&self) -> MaskFlags {
        self.registers.mask()
    }

    /// Scroll pair as (X, Y)
    pub fn scroll(&self) -> (u8, u8) {
        self.registers.scroll()
    }

    pub fn vram_address(&self) -> u16 {
        self.registers.vram_address()
    }

    pub fn write_toggle(&self) -> WriteToggle {
        self.registers.toggle()
    }

    pub fn oam_address(&self) -> u8 {
        self.registers.oam_address
    }

    pub fn mirroring(&self) -> Mirroring {
        self.memory.mirroring_mode()
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.memory.set_mirroring(mirroring);
    }

    /// Read VRAM without side effects (nametables and palette)
    pub fn peek_vram(&self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x2000..=0x3EFF => self.memory.read_nametable(addr),
            0x3F00..=0x3FFF => self.memory.read_palette(addr),
            _ => 0,
        }
    }

    /// Tile bytes of logical nametable 0-3
    pub fn nametable(&self, index: usize) -> &[u8] {
        self.memory.nametable(index)
    }

    /// Attribute table of logical nametable 0-3
    pub fn attribute_table(&self, index: usize) -> &[u8] {
        self.memory.attribute_table(index)
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        self.oam.bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ppu() -> Ppu {
        Ppu::new(&PpuConfig::default())
    }

    #[test]
    fn test_read_status_clears_vblank_and_toggle() {
        let mut ppu = ppu();
        ppu.enter_vblank();
        ppu.set_sprite_0_hit();
        ppu.write_scroll(5);
        assert!(ppu.write_toggle().is_second());

        assert_eq!(ppu.read_status(), 0b1100_0000);
        assert_eq!(ppu.write_toggle(), WriteToggle::First);
        assert!(!ppu.is_in_vblank());
        assert_eq!(ppu.status_flags(), StatusFlags::SPRITE_0_HIT);
    }

    #[test]
    fn test_address_then_data_increments() {
        let mut ppu = ppu();
        ppu.write_address(0x24);
        ppu.write_address(0x00);
        ppu.write_data(0x24);
        assert_eq!(ppu.vram_address(), 0x2401);
        assert_eq!(ppu.peek_vram(0x2400), 0x24);
    }

    #[test]
    fn test_data_increment_down() {
        let mut ppu = ppu();
        ppu.write_control(ControlFlags::VRAM_INCREMENT_DOWN.bits());
        ppu.set_vram_address(0x2000);
        ppu.write_data(0x01);
        ppu.write_data(0x02);
        assert_eq!(ppu.vram_address(), 0x2040);
        assert_eq!(ppu.peek_vram(0x2020), 0x02);
    }

    #[test]
    fn test_palette_write_through_data_port() {
        let mut ppu = ppu();
        ppu.set_vram_address(0x3F00);
        ppu.write_data(0x22);
        assert_eq!(ppu.peek_vram(0x3F00), 0x22);
        assert_eq!(ppu.peek_vram(0x3F10), 0x22);
    }

    #[test]
    fn test_pattern_table_write_ignored_but_increments() {
        let mut ppu = ppu();
        ppu.set_vram_address(0x1000);
        ppu.write_data(0xAA);
        assert_eq!(ppu.vram_address(), 0x1001);
    }

    #[test]
    fn test_oam_data_port_increments() {
        let mut ppu = ppu();
        ppu.write_oam_address(0x10);
        ppu.write_oam_data(0x30);
        ppu.write_oam_data(0x01);
        assert_eq!(ppu.oam_address(), 0x12);
        assert_eq!(ppu.oam()[0x10], 0x30);
        assert_eq!(ppu.oam()[0x11], 0x01);
    }

    #[test]
    fn test_oam_dma_uses_oam_address() {
        let mut ppu = ppu();
        let page = [0x5A; OAM_SIZE];
        ppu.write_oam_address(0);
        ppu.oam_dma(&page);
        assert!(ppu.oam().iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_memory_mapped_ports_are_mirrored() {
        let mut ppu = ppu();
        // $3456 mirrors $2006
        ppu.write_register(0x3456, 0x21);
        ppu.write_register(PPUADDR, 0x08);
        ppu.write_register(0x200F, 0x7F);
        assert_eq!(ppu.peek_vram(0x2108), 0x7F);

        ppu.enter_vblank();
        assert_eq!(ppu.read_register(0x200A), 0x80);
        assert_eq!(ppu.read_register(PPUSTATUS), 0x00);
        assert_eq!(ppu.read_register(PPUCTRL), 0x00);
    }

    #[test]
    fn test_can_access_vram_policies() {
        let mut ppu = ppu();
        assert!(ppu.can_access_vram());

        ppu.write_mask(MaskFlags::SHOW_BACKGROUND.bits());
        assert!(!ppu.can_access_vram());
        ppu.enter_vblank();
        assert!(ppu.can_access_vram());

        let config = PpuConfig {
            flush_policy: FlushPolicy::RenderingOffOnly,
            ..PpuConfig::default()
        };
        let mut strict = Ppu::new(&config);
        strict.write_mask(MaskFlags::SHOW_BACKGROUND.bits());
        strict.enter_vblank();
        assert!(!strict.can_access_vram());
    }

    #[test]
    fn test_reset() {
        let mut ppu = ppu();
        ppu.write_control(0x90);
        ppu.write_scroll(1);
        ppu.set_vram_address(0x2000);
        ppu.write_data(0x24);
        ppu.reset();
        assert_eq!(ppu.control(), ControlFlags::empty());
        assert_eq!(ppu.write_toggle(), WriteToggle::First);
        assert_eq!(ppu.peek_vram(0x2000), 0);
    }
}
