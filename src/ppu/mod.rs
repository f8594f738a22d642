mod latch;
mod memory;
mod ppu;
mod registers;
mod snapshot;
mod sprites;
mod status;

pub use latch::WriteToggle;
pub use memory::{ATTRIBUTE_TABLE_SIZE, Memory, Mirroring, NAMETABLE_SIZE, TILE_AREA_SIZE};
pub use ppu::{OAMADDR, OAMDATA, PPUADDR, PPUCTRL, PPUDATA, PPUMASK, PPUSCROLL, PPUSTATUS, Ppu};
pub use registers::{ControlFlags, MaskFlags, Registers};
pub use snapshot::PpuSnapshot;
pub use sprites::{OAM_SIZE, Oam, SPRITE_COUNT, SpriteSlot, SpriteTable};
pub use status::{Status, StatusFlags};
