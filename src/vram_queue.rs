//! Deferred VRAM writes.
//!
//! Game logic runs while the picture is being drawn, when PPUDATA must not
//! be touched. It queues its nametable, attribute and palette changes here
//! instead, and the frame loop applies the whole queue during the next
//! vertical blank.

use crate::config::PpuConfig;
use crate::error::{ConfigError, Result, Violation};
use crate::ppu::{ControlFlags, Ppu};

/// Record control byte bits of the packed buffer format
const CTRL_DOWN: u8 = 0b1000_0000;
const CTRL_REPEAT: u8 = 0b0100_0000;
const CTRL_LENGTH: u8 = 0b0011_1111;

/// Longest run or repeat one update may carry, the packed record maximum
pub const MAX_UPDATE_LEN: usize = 64;

/// Address step used while applying one update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// +across (next tile in the row)
    #[default]
    Across,
    /// +down (same column, next row)
    Down,
}

impl Direction {
    fn from_control(control: ControlFlags) -> Self {
        if control.contains(ControlFlags::VRAM_INCREMENT_DOWN) {
            Direction::Down
        } else {
            Direction::Across
        }
    }
}

/// One pending VRAM write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VramUpdate {
    /// One byte, stepping with whatever PPUCTRL selects
    Byte { address: u16, data: u8 },
    /// Consecutive bytes starting at `address`
    Run {
        address: u16,
        data: Vec<u8>,
        direction: Direction,
    },
    /// The same byte written `count` times
    Repeat {
        address: u16,
        value: u8,
        count: usize,
        direction: Direction,
    },
}

impl VramUpdate {
    /// Number of PPUDATA writes this update performs
    pub fn byte_len(&self) -> usize {
        match self {
            VramUpdate::Byte { .. } => 1,
            VramUpdate::Run { data, .. } => data.len(),
            VramUpdate::Repeat { count, .. } => *count,
        }
    }

    fn apply(&self, ppu: &mut Ppu, default_direction: Direction) {
        match self {
            VramUpdate::Byte { address, data } => {
                ppu.set_increment_down(default_direction == Direction::Down);
                ppu.set_vram_address(*address);
                ppu.write_data(*data);
            }
            VramUpdate::Run {
                address,
                data,
                direction,
            } => {
                ppu.set_increment_down(*direction == Direction::Down);
                ppu.set_vram_address(*address);
                for byte in data {
                    ppu.write_data(*byte);
                }
            }
            VramUpdate::Repeat {
                address,
                value,
                count,
                direction,
            } => {
                ppu.set_increment_down(*direction == Direction::Down);
                ppu.set_vram_address(*address);
                for _ in 0..*count {
                    ppu.write_data(*value);
                }
            }
        }
    }
}

/// FIFO of VRAM writes waiting for the next safe window
pub struct VramUpdateQueue {
    entries: Vec<VramUpdate>,
    capacity: usize,
}

impl VramUpdateQueue {
    /// Create a queue holding at most `capacity` updates per frame
    pub fn new(capacity: usize) -> std::result::Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        })
    }

    pub fn from_config(config: &PpuConfig) -> std::result::Result<Self, ConfigError> {
        Self::new(config.queue_capacity)
    }

    fn ensure_room(&self, additional: usize) -> Result<()> {
        if self.entries.len() + additional > self.capacity {
            return Err(Violation::QueueOverflow {
                capacity: self.capacity,
            }
            .into());
        }
        Ok(())
    }

    fn push(&mut self, update: VramUpdate) -> Result<()> {
        self.ensure_room(1)?;
        self.entries.push(update);
        Ok(())
    }

    /// Queue a single byte
    pub fn enqueue(&mut self, address: u16, data: u8) -> Result<()> {
        self.push(VramUpdate::Byte { address, data })
    }

    /// Queue a run of at most [`MAX_UPDATE_LEN`] bytes
    pub fn enqueue_run(&mut self, address: u16, data: &[u8], direction: Direction) -> Result<()> {
        check_len(data.len())?;
        self.push(VramUpdate::Run {
            address,
            data: data.to_vec(),
            direction,
        })
    }

    /// Queue `count` copies of one byte, `count` at most [`MAX_UPDATE_LEN`]
    pub fn enqueue_repeat(
        &mut self,
        address: u16,
        value: u8,
        count: usize,
        direction: Direction,
    ) -> Result<()> {
        check_len(count)?;
        self.push(VramUpdate::Repeat {
            address,
            value,
            count,
            direction,
        })
    }

    /// Decode a packed update buffer and queue every record in it.
    ///
    /// Each record is `addr_hi, addr_lo, ctrl, data...`. In `ctrl`, bit 7
    /// selects the down step, bit 6 repeats a single data byte, and bits 0-5
    /// hold the length (0 means 64). A high address byte of `0x00`, or the
    /// end of the slice, ends the buffer.
    ///
    /// The buffer is decoded completely before anything is queued, so a
    /// malformed or oversized buffer leaves the queue untouched.
    ///
    /// Returns the number of updates queued.
    pub fn enqueue_encoded(&mut self, stream: &[u8]) -> Result<usize> {
        let mut decoded = Vec::new();
        let mut cursor = 0;

        while let Some(&high) = stream.get(cursor) {
            if high == 0 {
                break;
            }
            let (Some(&low), Some(&ctrl)) = (stream.get(cursor + 1), stream.get(cursor + 2)) else {
                return Err(Violation::MalformedUpdateStream("truncated record header").into());
            };
            cursor += 3;

            let address = u16::from_be_bytes([high, low]);
            let direction = if ctrl & CTRL_DOWN != 0 {
                Direction::Down
            } else {
                Direction::Across
            };
            let length = match (ctrl & CTRL_LENGTH) as usize {
                0 => MAX_UPDATE_LEN,
                n => n,
            };

            if ctrl & CTRL_REPEAT != 0 {
                let Some(&value) = stream.get(cursor) else {
                    return Err(Violation::MalformedUpdateStream("missing repeat byte").into());
                };
                cursor += 1;
                decoded.push(VramUpdate::Repeat {
                    address,
                    value,
                    count: length,
                    direction,
                });
            } else {
                let Some(data) = stream.get(cursor..cursor + length) else {
                    return Err(
                        Violation::MalformedUpdateStream("record shorter than its length").into(),
                    );
                };
                cursor += length;
                decoded.push(VramUpdate::Run {
                    address,
                    data: data.to_vec(),
                    direction,
                });
            }
        }

        self.ensure_room(decoded.len())?;
        let count = decoded.len();
        self.entries.extend(decoded);
        Ok(count)
    }

    /// Apply every queued update in order, then empty the queue.
    ///
    /// The PPUCTRL increment bit is restored afterwards. Returns the number
    /// of bytes written to VRAM.
    ///
    /// # Errors
    ///
    /// Fails with [`Violation::FlushWhileRendering`] when the PPU is drawing
    /// and the flush policy does not allow access, even if nothing is queued.
    /// Memory and the queue are left untouched in that case.
    pub fn flush(&mut self, ppu: &mut Ppu) -> Result<usize> {
        if !ppu.can_access_vram() {
            return Err(Violation::FlushWhileRendering.into());
        }
        if self.entries.is_empty() {
            return Ok(0);
        }

        let control = ppu.control();
        let default_direction = Direction::from_control(control);
        let entries = self.entries.len();
        let mut written = 0;
        for update in self.entries.drain(..) {
            update.apply(ppu, default_direction);
            written += update.byte_len();
        }
        ppu.set_increment_down(default_direction == Direction::Down);

        log::debug!("Flushed {written} bytes from {entries} VRAM updates");
        Ok(written)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything queued without applying it
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &VramUpdate> {
        self.entries.iter()
    }
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_UPDATE_LEN {
        return Err(Violation::UpdateTooLong {
            len,
            max: MAX_UPDATE_LEN,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PpuError;
    use crate::ppu::MaskFlags;

    fn setup() -> (VramUpdateQueue, Ppu) {
        let config = PpuConfig::default();
        (
            VramUpdateQueue::from_config(&config).unwrap(),
            Ppu::new(&config),
        )
    }

    #[test]
    fn test_zero_capacity_is_config_error() {
        assert_eq!(
            VramUpdateQueue::new(0).err(),
            Some(ConfigError::ZeroQueueCapacity)
        );
    }

    #[test]
    fn test_flush_two_bytes() {
        let (mut queue, mut ppu) = setup();
        queue.enqueue(0x2000, 0x24).unwrap();
        queue.enqueue(0x2001, 0x24).unwrap();

        assert_eq!(queue.flush(&mut ppu), Ok(2));
        assert_eq!(&ppu.nametable(0)[0..2], &[0x24, 0x24]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let (mut queue, mut ppu) = setup();
        let before = ppu.snapshot();
        assert_eq!(queue.flush(&mut ppu), Ok(0));
        assert_eq!(ppu.snapshot(), before);
    }

    #[test]
    fn test_second_flush_is_noop() {
        let (mut queue, mut ppu) = setup();
        queue.enqueue(0x2005, 0x11).unwrap();
        queue.flush(&mut ppu).unwrap();

        let after_first = ppu.snapshot();
        assert_eq!(queue.flush(&mut ppu), Ok(0));
        assert_eq!(ppu.snapshot(), after_first);
    }

    #[test]
    fn test_later_updates_win() {
        let (mut queue, mut ppu) = setup();
        queue.enqueue(0x2010, 0x01).unwrap();
        queue.enqueue(0x2010, 0x02).unwrap();
        queue.flush(&mut ppu).unwrap();
        assert_eq!(ppu.peek_vram(0x2010), 0x02);
    }

    #[test]
    fn test_flush_while_rendering_rejected() {
        let (mut queue, mut ppu) = setup();
        ppu.write_mask(MaskFlags::RENDERING.bits());
        queue.enqueue(0x2000, 0x24).unwrap();

        let err = queue.flush(&mut ppu).unwrap_err();
        assert_eq!(err, PpuError::ContractViolation(Violation::FlushWhileRendering));
        // Nothing applied, nothing lost
        assert_eq!(ppu.peek_vram(0x2000), 0);
        assert_eq!(queue.len(), 1);

        // Legal once VBlank starts
        ppu.enter_vblank();
        assert_eq!(queue.flush(&mut ppu), Ok(1));
    }

    #[test]
    fn test_overflow_is_violation() {
        let mut queue = VramUpdateQueue::new(2).unwrap();
        queue.enqueue(0x2000, 1).unwrap();
        queue.enqueue(0x2001, 2).unwrap();
        let err = queue.enqueue(0x2002, 3).unwrap_err();
        assert_eq!(
            err,
            PpuError::ContractViolation(Violation::QueueOverflow { capacity: 2 })
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_run_down_then_byte_uses_control_step() {
        let (mut queue, mut ppu) = setup();
        queue
            .enqueue_run(0x2042, &[0xA0, 0xA1, 0xA2], Direction::Down)
            .unwrap();
        queue.enqueue(0x2100, 0x01).unwrap();
        queue.enqueue(0x2101, 0x02).unwrap();
        assert_eq!(queue.flush(&mut ppu), Ok(5));

        assert_eq!(ppu.peek_vram(0x2042), 0xA0);
        assert_eq!(ppu.peek_vram(0x2062), 0xA1);
        assert_eq!(ppu.peek_vram(0x2082), 0xA2);
        assert_eq!(ppu.peek_vram(0x2100), 0x01);
        assert_eq!(ppu.vram_address(), 0x2102);
        // Increment bit restored
        assert!(!ppu.control().contains(ControlFlags::VRAM_INCREMENT_DOWN));
    }

    #[test]
    fn test_repeat_fills_row() {
        let (mut queue, mut ppu) = setup();
        queue
            .enqueue_repeat(0x23C0, 0xFF, 8, Direction::Across)
            .unwrap();
        assert_eq!(queue.flush(&mut ppu), Ok(8));
        assert_eq!(&ppu.attribute_table(0)[0..8], &[0xFF; 8]);
        assert_eq!(ppu.attribute_table(0)[8], 0x00);
    }

    #[test]
    fn test_enqueue_encoded_buffer() {
        let (mut queue, mut ppu) = setup();
        let stream = [
            0x3F, 0x00, 0x04, 0x0F, 0x30, 0x21, 0x12, // palette run
            0x20, 0x45, 0xC3, 0x26, // column of three 0x26
            0x00,
            0xEE, 0xEE, // past the terminator
        ];
        assert_eq!(queue.enqueue_encoded(&stream), Ok(2));
        queue.flush(&mut ppu).unwrap();

        assert_eq!(ppu.peek_vram(0x3F00), 0x0F);
        assert_eq!(ppu.peek_vram(0x3F03), 0x12);
        assert_eq!(ppu.peek_vram(0x2045), 0x26);
        assert_eq!(ppu.peek_vram(0x2065), 0x26);
        assert_eq!(ppu.peek_vram(0x2085), 0x26);
        assert_eq!(ppu.peek_vram(0x20A5), 0x00);
    }

    #[test]
    fn test_enqueue_encoded_truncated_is_atomic() {
        let (mut queue, _) = setup();
        let stream = [0x20, 0x00, 0x01, 0x24, 0x20, 0x20, 0x05, 0x01, 0x02];
        let err = queue.enqueue_encoded(&stream).unwrap_err();
        assert!(matches!(
            err,
            PpuError::ContractViolation(Violation::MalformedUpdateStream(_))
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_encoded_zero_length_means_64() {
        let (mut queue, _) = setup();
        let stream = [0x20, 0x00, CTRL_REPEAT, 0x24, 0x00];
        queue.enqueue_encoded(&stream).unwrap();
        assert_eq!(queue.iter().next().map(VramUpdate::byte_len), Some(64));
    }

    #[test]
    fn test_clear_drops_updates() {
        let (mut queue, _) = setup();
        queue.enqueue(0x2000, 1).unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 256);
    }

    #[test]
    fn test_empty_flush_while_rendering_rejected() {
        let (mut queue, mut ppu) = setup();
        ppu.write_mask(MaskFlags::RENDERING.bits());
        let err = queue.flush(&mut ppu).unwrap_err();
        assert_eq!(err, PpuError::ContractViolation(Violation::FlushWhileRendering));
    }

    #[test]
    fn test_oversized_repeat_rejected() {
        let mut queue = VramUpdateQueue::new(1).unwrap();
        let err = queue
            .enqueue_repeat(0x2000, 0x24, 5_000_000, Direction::Across)
            .unwrap_err();
        assert_eq!(
            err,
            PpuError::ContractViolation(Violation::UpdateTooLong {
                len: 5_000_000,
                max: MAX_UPDATE_LEN,
            })
        );
        assert!(queue.is_empty());

        queue
            .enqueue_repeat(0x2000, 0x24, MAX_UPDATE_LEN, Direction::Across)
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_oversized_run_rejected() {
        let (mut queue, _) = setup();
        let data = vec![0x24; MAX_UPDATE_LEN + 1];
        let err = queue.enqueue_run(0x2000, &data, Direction::Down).unwrap_err();
        assert_eq!(
            err,
            PpuError::ContractViolation(Violation::UpdateTooLong {
                len: MAX_UPDATE_LEN + 1,
                max: MAX_UPDATE_LEN,
            })
        );
        assert!(queue.is_empty());
    }
}
