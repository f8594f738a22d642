use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::ppu::Mirroring;

/// Default number of queued VRAM updates allowed per frame
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default Y coordinate for hidden sprites
pub const DEFAULT_OFFSCREEN_Y: u8 = 0xF8;
/// First row below the visible picture
const FIRST_HIDDEN_ROW: u8 = 240;

/// When flushing the VRAM update queue is legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Whenever rendering is off, or while the VBlank flag is set
    #[default]
    RenderingOffOrVblank,
    /// Only while rendering is off
    RenderingOffOnly,
}

/// VRAM address step after a PPUDATA access, selected by PPUCTRL bit 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressIncrement {
    /// Step with bit 2 clear (next tile in the row)
    pub across: u16,
    /// Step with bit 2 set (next row)
    pub down: u16,
}

impl Default for AddressIncrement {
    fn default() -> Self {
        Self { across: 1, down: 32 }
    }
}

/// Startup parameters for the PPU and its frame loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpuConfig {
    pub queue_capacity: usize,
    pub flush_policy: FlushPolicy,
    pub increment: AddressIncrement,
    pub offscreen_y: u8,
    pub mirroring: Mirroring,
}

impl Default for PpuConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_policy: FlushPolicy::default(),
            increment: AddressIncrement::default(),
            offscreen_y: DEFAULT_OFFSCREEN_Y,
            mirroring: Mirroring::Horizontal,
        }
    }
}

impl PpuConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not valid JSON for this
    /// structure or if the parsed values fail [`PpuConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use neser_vblank::PpuConfig;
    ///
    /// let config = PpuConfig::from_json(r#"{ "queue_capacity": 64 }"#)?;
    /// assert_eq!(config.queue_capacity, 64);
    /// assert_eq!(config.increment.down, 32);
    /// # Ok::<(), neser_vblank::PpuError>(())
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the frame loop cannot run with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.increment.across == 0 || self.increment.down == 0 {
            return Err(ConfigError::ZeroIncrement);
        }
        if self.offscreen_y < FIRST_HIDDEN_ROW {
            return Err(ConfigError::OnscreenSentinel(self.offscreen_y));
        }
        Ok(())
    }
}
