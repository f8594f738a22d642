use std::fmt;

/// Result alias used by every fallible PPU operation
pub type Result<T> = std::result::Result<T, PpuError>;

/// Caller errors. The current frame is abandoned, the loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The update queue was flushed while the screen was being drawn
    FlushWhileRendering,
    /// Sprite slot index outside the 64 hardware slots
    SpriteIndex(usize),
    /// More updates were queued in one frame than the queue can hold
    QueueOverflow { capacity: usize },
    /// A packed update buffer ended in the middle of a record
    MalformedUpdateStream(&'static str),
    /// A single run or repeat longer than one buffer record allows
    UpdateTooLong { len: usize, max: usize },
}

/// Startup errors. These keep the frame loop from starting at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroQueueCapacity,
    ZeroIncrement,
    OnscreenSentinel(u8),
    Parse(String),
    Serialize(String),
    SnapshotSize {
        region: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// PPU error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PpuError {
    ContractViolation(Violation),
    Config(ConfigError),
    /// The game-logic callback failed or panicked
    GameLogic(String),
}

impl PpuError {
    /// Configuration errors are fatal; everything else only costs a frame
    pub fn is_fatal(&self) -> bool {
        matches!(self, PpuError::Config(_))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::FlushWhileRendering => {
                write!(f, "VRAM update queue flushed while rendering is enabled")
            }
            Violation::SpriteIndex(index) => {
                write!(f, "Sprite slot {} out of range (0-63)", index)
            }
            Violation::QueueOverflow { capacity } => {
                write!(f, "VRAM update queue overflow (capacity {})", capacity)
            }
            Violation::MalformedUpdateStream(msg) => {
                write!(f, "Malformed VRAM update stream: {}", msg)
            }
            Violation::UpdateTooLong { len, max } => {
                write!(f, "VRAM update of {} bytes exceeds the {} byte limit", len, max)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroQueueCapacity => {
                write!(f, "VRAM update queue capacity must be non-zero")
            }
            ConfigError::ZeroIncrement => {
                write!(f, "VRAM address increments must be non-zero")
            }
            ConfigError::OnscreenSentinel(y) => {
                write!(f, "Off-screen sprite Y {} is inside the visible rows 0-239", y)
            }
            ConfigError::Parse(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Could not serialize state: {}", msg),
            ConfigError::SnapshotSize {
                region,
                expected,
                actual,
            } => write!(
                f,
                "Snapshot {} holds {} bytes, expected {}",
                region, actual, expected
            ),
        }
    }
}

impl fmt::Display for PpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PpuError::ContractViolation(violation) => {
                write!(f, "Contract violation: {}", violation)
            }
            PpuError::Config(err) => write!(f, "Configuration error: {}", err),
            PpuError::GameLogic(msg) => write!(f, "Game logic failed: {}", msg),
        }
    }
}

impl std::error::Error for Violation {}
impl std::error::Error for ConfigError {}
impl std::error::Error for PpuError {}

impl From<Violation> for PpuError {
    fn from(violation: Violation) -> Self {
        PpuError::ContractViolation(violation)
    }
}

impl From<ConfigError> for PpuError {
    fn from(err: ConfigError) -> Self {
        PpuError::Config(err)
    }
}
