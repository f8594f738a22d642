use serde::{Deserialize, Serialize};

use super::memory::{NAMETABLE_RAM_SIZE, PALETTE_SIZE};
use super::sprites::OAM_SIZE;
use super::{ControlFlags, MaskFlags, Mirroring, Ppu, StatusFlags, WriteToggle};
use crate::error::{ConfigError, Result};

/// Save-state image of the PPU.
///
/// The write toggle is part of the image: restoring with the wrong half
/// pending would shift every later scroll and address write by one byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpuSnapshot {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_address: u8,
    pub vram_address: u16,
    pub pending_address: u16,
    pub scroll_x: u8,
    pub scroll_y: u8,
    pub write_toggle: WriteToggle,
    pub mirroring: Mirroring,
    pub nametable_ram: Vec<u8>,
    pub palette: Vec<u8>,
    pub oam: Vec<u8>,
}

impl PpuSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()).into())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }
}

fn check_size(region: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigError::SnapshotSize {
            region,
            expected,
            actual,
        }
        .into())
    }
}

impl Ppu {
    pub fn snapshot(&self) -> PpuSnapshot {
        let regs = &self.registers;
        PpuSnapshot {
            control: regs.control.bits(),
            mask: regs.mask.bits(),
            status: self.status.flags().bits(),
            oam_address: regs.oam_address,
            vram_address: regs.vram_address,
            pending_address: regs.pending_address,
            scroll_x: regs.scroll_x,
            scroll_y: regs.scroll_y,
            write_toggle: regs.toggle,
            mirroring: self.memory.mirroring_mode(),
            nametable_ram: self.memory.raw_nametable_ram().to_vec(),
            palette: self.memory.raw_palette().to_vec(),
            oam: self.oam.bytes().to_vec(),
        }
    }

    /// Restore a snapshot. Nothing changes if any memory region has the wrong size.
    pub fn restore(&mut self, snapshot: &PpuSnapshot) -> Result<()> {
        check_size("nametable RAM", NAMETABLE_RAM_SIZE, snapshot.nametable_ram.len())?;
        check_size("palette", PALETTE_SIZE, snapshot.palette.len())?;
        check_size("OAM", OAM_SIZE, snapshot.oam.len())?;

        let regs = &mut self.registers;
        regs.control = ControlFlags::from_bits_retain(snapshot.control);
        regs.mask = MaskFlags::from_bits_retain(snapshot.mask);
        regs.oam_address = snapshot.oam_address;
        regs.vram_address = snapshot.vram_address & 0x3FFF;
        regs.pending_address = snapshot.pending_address;
        regs.scroll_x = snapshot.scroll_x;
        regs.scroll_y = snapshot.scroll_y;
        regs.toggle = snapshot.write_toggle;

        self.status.set_flags(StatusFlags::from_bits_truncate(snapshot.status));
        self.memory.set_mirroring(snapshot.mirroring);
        self.memory.load_raw(&snapshot.nametable_ram, &snapshot.palette);
        self.oam.load(&snapshot.oam);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PpuConfig;
    use crate::error::PpuError;

    #[test]
    fn test_snapshot_keeps_pending_toggle() {
        let mut ppu = Ppu::new(&PpuConfig::default());
        ppu.write_scroll(0x10);

        let snapshot = ppu.snapshot();
        assert_eq!(snapshot.write_toggle, WriteToggle::Second);

        let mut restored = Ppu::new(&PpuConfig::default());
        restored.restore(&snapshot).unwrap();
        // The next write completes the pair begun before the snapshot
        restored.write_scroll(0x20);
        assert_eq!(restored.scroll(), (0x10, 0x20));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let mut ppu = Ppu::new(&PpuConfig::default());
        ppu.write_address(0x23);
        ppu.write_address(0xC0);
        ppu.write_data(0x55);
        ppu.write_address(0x3F);
        ppu.enter_vblank();

        let text = ppu.snapshot().to_json().unwrap();
        let decoded = PpuSnapshot::from_json(&text).unwrap();

        let mut restored = Ppu::new(&PpuConfig::default());
        restored.restore(&decoded).unwrap();
        assert_eq!(restored.snapshot(), ppu.snapshot());
        assert_eq!(restored.attribute_table(0)[0], 0x55);
        assert!(restored.is_in_vblank());
    }

    #[test]
    fn test_restore_rejects_wrong_sizes() {
        let mut ppu = Ppu::new(&PpuConfig::default());
        let mut snapshot = ppu.snapshot();
        snapshot.scroll_x = 99;
        snapshot.palette.pop();

        let err = ppu.restore(&snapshot).unwrap_err();
        assert_eq!(
            err,
            PpuError::Config(ConfigError::SnapshotSize {
                region: "palette",
                expected: 32,
                actual: 31
            })
        );
        assert_eq!(ppu.scroll(), (0, 0));
    }

    #[test]
    fn test_restore_keeps_palette_six_bit() {
        let mut ppu = Ppu::new(&PpuConfig::default());
        let mut snapshot = ppu.snapshot();
        snapshot.palette[1] = 0xFF;

        ppu.restore(&snapshot).unwrap();
        assert_eq!(ppu.peek_vram(0x3F01), 0x3F);
    }
}
