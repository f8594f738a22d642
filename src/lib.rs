// NES PPU register interface and the vblank-synchronized frame loop
// that game code uses to update video memory safely.

pub mod config;
pub mod error;
pub mod frame_loop;
pub mod ppu;
pub mod sync;
pub mod vram_queue;

pub use config::{AddressIncrement, FlushPolicy, PpuConfig};
pub use error::{ConfigError, PpuError, Result, Violation};
pub use frame_loop::{
    FrameContext, FrameLoop, FrameStats, GameLogic, GameResult, LoopState, ShadowRegisters,
};
pub use ppu::{Mirroring, Ppu, PpuSnapshot, SpriteSlot, SpriteTable, WriteToggle};
pub use sync::{VblankSignal, Wakeup};
pub use vram_queue::{Direction, MAX_UPDATE_LEN, VramUpdate, VramUpdateQueue};
