use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};

use crate::config::PpuConfig;
use crate::error::{PpuError, Result};
use crate::ppu::{ControlFlags, MaskFlags, Ppu, SpriteTable};
use crate::sync::{VblankSignal, Wakeup};
use crate::vram_queue::VramUpdateQueue;

/// What the game-logic callback returns
pub type GameResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// One frame of game logic, run once per vertical blank
pub trait GameLogic {
    fn run_frame(&mut self, frame: &mut FrameContext<'_>) -> GameResult;
}

impl<F> GameLogic for F
where
    F: FnMut(&mut FrameContext<'_>) -> GameResult,
{
    fn run_frame(&mut self, frame: &mut FrameContext<'_>) -> GameResult {
        self(frame)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitingForSync,
    RunningTick,
}

/// Counters kept across the life of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub ticks: u64,
    pub dropped_frames: u64,
}

/// Register values the game owns between frames.
///
/// The game never writes PPUCTRL, PPUMASK or PPUSCROLL while the picture is
/// drawn. It edits these copies and the loop writes them out at the end of
/// each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowRegisters {
    /// PPUCTRL; the NMI bit is managed by the loop
    pub control: ControlFlags,
    pub mask: MaskFlags,
    pub scroll_x: u8,
    pub scroll_y: u8,
    /// Keep rendering off for the next frames (screen transitions)
    pub disable_screen: bool,
}

impl Default for ShadowRegisters {
    fn default() -> Self {
        Self {
            control: ControlFlags::empty(),
            mask: MaskFlags::SHOW_BACKGROUND_LEFT
                | MaskFlags::SHOW_SPRITES_LEFT
                | MaskFlags::SHOW_BACKGROUND
                | MaskFlags::SHOW_SPRITES,
            scroll_x: 0,
            scroll_y: 0,
            disable_screen: false,
        }
    }
}

/// Everything the game logic may touch during one frame
pub struct FrameContext<'a> {
    pub ppu: &'a mut Ppu,
    pub queue: &'a mut VramUpdateQueue,
    pub sprites: &'a mut SpriteTable,
    pub shadow: &'a mut ShadowRegisters,
    frame_number: u64,
}

impl FrameContext<'_> {
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Scroll to apply from the next frame on
    pub fn set_scroll(&mut self, x: u8, y: u8) {
        self.shadow.scroll_x = x;
        self.shadow.scroll_y = y;
    }

    pub fn set_screen_disabled(&mut self, disabled: bool) {
        self.shadow.disable_screen = disabled;
    }
}

/// The vblank-driven frame loop.
///
/// Owns the PPU, the VRAM update queue and the sprite table. It sleeps
/// until a vertical blank is signalled, then runs one tick:
///
/// 1. rendering is forced off and NMIs are masked;
/// 2. the sprite table is copied into OAM;
/// 3. queued VRAM updates are flushed;
/// 4. rendering is restored unless the screen is disabled;
/// 5. the game logic runs once;
/// 6. scroll and PPUCTRL are written back from the shadow registers.
///
/// An error anywhere in the tick drops that frame only.
pub struct FrameLoop {
    ppu: Ppu,
    queue: VramUpdateQueue,
    sprites: SpriteTable,
    shadow: ShadowRegisters,
    signal: VblankSignal,
    state: LoopState,
    stats: FrameStats,
    frame_number: u64,
}

impl FrameLoop {
    /// Build a loop from a validated configuration.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned here, before any frame runs.
    pub fn new(config: PpuConfig, signal: VblankSignal) -> Result<Self> {
        config.validate()?;
        let mut frame_loop = Self {
            ppu: Ppu::new(&config),
            queue: VramUpdateQueue::from_config(&config)?,
            sprites: SpriteTable::new(config.offscreen_y)?,
            shadow: ShadowRegisters::default(),
            signal,
            state: LoopState::WaitingForSync,
            stats: FrameStats::default(),
            frame_number: 0,
        };
        frame_loop.reset();
        Ok(frame_loop)
    }

    /// Hardware reset: registers, memory, sprites and pending updates
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.queue.clear();
        self.sprites.reset();
        self.shadow = ShadowRegisters::default();
        self.state = LoopState::WaitingForSync;
        self.frame_number = 0;
        self.ppu
            .write_control(self.shadow.control.union(ControlFlags::GENERATE_NMI).bits());
    }

    /// Wait for vertical blanks and run a tick for each until shutdown.
    pub fn run<G: GameLogic + ?Sized>(&mut self, game: &mut G) -> FrameStats {
        info!("Frame loop started");
        loop {
            self.state = LoopState::WaitingForSync;
            match self.signal.wait() {
                Wakeup::Shutdown => break,
                // Errors are already logged and counted
                Wakeup::Vblank => {
                    let _ = self.run_tick(game);
                }
            }
        }
        info!(
            "Frame loop stopped after {} ticks ({} dropped)",
            self.stats.ticks, self.stats.dropped_frames
        );
        self.stats
    }

    /// Run one tick as if a vertical blank had just been signalled
    pub fn run_tick<G: GameLogic + ?Sized>(&mut self, game: &mut G) -> Result<()> {
        self.state = LoopState::RunningTick;
        debug!("Frame {} tick", self.frame_number);

        let result = self.tick_body(game);

        // PPUCTRL is restored with NMIs on even when the frame was dropped
        self.ppu
            .write_control(self.shadow.control.union(ControlFlags::GENERATE_NMI).bits());
        self.ppu.end_vblank();

        self.stats.ticks += 1;
        if let Err(err) = &result {
            self.stats.dropped_frames += 1;
            warn!("Frame {} dropped: {}", self.frame_number, err);
        }
        self.frame_number = self.frame_number.wrapping_add(1);
        self.state = LoopState::WaitingForSync;
        result
    }

    fn tick_body<G: GameLogic + ?Sized>(&mut self, game: &mut G) -> Result<()> {
        self.ppu.enter_vblank();

        // Nothing is drawn while video memory changes
        self.ppu
            .write_control(self.shadow.control.difference(ControlFlags::GENERATE_NMI).bits());
        self.ppu
            .write_mask(self.shadow.mask.difference(MaskFlags::RENDERING).bits());

        self.ppu.write_oam_address(0);
        self.ppu.oam_dma(&self.sprites.as_oam_bytes());
        self.queue.flush(&mut self.ppu)?;

        if !self.shadow.disable_screen {
            self.ppu.write_mask(self.shadow.mask.bits());
        }

        let mut frame = FrameContext {
            ppu: &mut self.ppu,
            queue: &mut self.queue,
            sprites: &mut self.sprites,
            shadow: &mut self.shadow,
            frame_number: self.frame_number,
        };
        call_game(game, &mut frame)?;

        if !self.shadow.disable_screen {
            self.ppu.read_status();
            self.ppu.write_scroll(self.shadow.scroll_x);
            self.ppu.write_scroll(self.shadow.scroll_y);
        }
        Ok(())
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn signal(&self) -> &VblankSignal {
        &self.signal
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn queue(&self) -> &VramUpdateQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut VramUpdateQueue {
        &mut self.queue
    }

    pub fn sprites(&self) -> &SpriteTable {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> &mut SpriteTable {
        &mut self.sprites
    }

    pub fn shadow(&self) -> &ShadowRegisters {
        &self.shadow
    }

    pub fn shadow_mut(&mut self) -> &mut ShadowRegisters {
        &mut self.shadow
    }
}

/// Run the game for one frame. Its errors and panics cost the frame, never the loop.
fn call_game<G: GameLogic + ?Sized>(game: &mut G, frame: &mut FrameContext<'_>) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| game.run_frame(frame))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(match err.downcast::<PpuError>() {
            Ok(ppu_err) => *ppu_err,
            Err(other) => PpuError::GameLogic(other.to_string()),
        }),
        Err(payload) => Err(PpuError::GameLogic(format!(
            "panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
