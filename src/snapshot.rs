//! Status frames for replays and remote agents.
//!
//! A frame carries only plain numbers: safe-zone bounds and flags, and the
//! hazard state code with its anchor and radii. Containment and classification
//! can be rebuilt from a frame without the live objects.

use crate::arena::Arena;
use crate::geometry::Cell;
use crate::hazard::{HazardReport, ZoneType};
use crate::safe_zone::SafeZoneStatus;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"VXAF";

/// Kernel status at one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    /// Format version
    pub version: u32,
    pub tick: u64,
    pub safe_zone: SafeZoneStatus,
    pub hazard: HazardReport,
}

impl StatusFrame {
    pub const VERSION: u32 = 1;

    pub fn new(tick: u64, safe_zone: SafeZoneStatus, hazard: HazardReport) -> Self {
        Self {
            version: Self::VERSION,
            tick,
            safe_zone,
            hazard,
        }
    }

    /// Frame describing the arena as it stands before its next step
    pub fn capture(arena: &Arena) -> Self {
        let tick = arena.tick();
        Self::new(tick, arena.safe_zone().status(tick), arena.hazard().report())
    }

    #[inline]
    pub fn is_position_safe(&self, position: Cell) -> bool {
        self.safe_zone.is_position_safe(position)
    }

    #[inline]
    pub fn classify(&self, position: Cell) -> ZoneType {
        self.hazard.classify(position)
    }

    /// Magic header followed by the bincode body
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let body = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| FrameError::InvalidFormat("Invalid magic bytes".to_string()))?;
        let frame: StatusFrame = bincode::deserialize(body)?;
        if frame.version != Self::VERSION {
            return Err(FrameError::VersionMismatch {
                expected: Self::VERSION,
                found: frame.version,
            });
        }
        Ok(frame)
    }
}

/// Ordered frames of one match
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FrameLog {
    pub frames: Vec<StatusFrame>,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame: StatusFrame) {
        self.frames.push(frame);
    }

    /// Frame captured at `tick`, if any
    pub fn at(&self, tick: u64) -> Option<&StatusFrame> {
        self.frames.iter().find(|f| f.tick == tick)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Save the log to a binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FrameError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&StatusFrame::VERSION.to_le_bytes())?;
        writer.write_all(&bincode::serialize(self)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a log written by [`FrameLog::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FrameError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FrameError::InvalidFormat("Invalid magic bytes".to_string()));
        }
        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let found = u32::from_le_bytes(version);
        if found != StatusFrame::VERSION {
            return Err(FrameError::VersionMismatch {
                expected: StatusFrame::VERSION,
                found,
            });
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(bincode::deserialize(&buffer)?)
    }
}

/// Errors that can occur while encoding or decoding frames
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for FrameError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::Config;
    use crate::geometry::Direction;
    use std::collections::HashMap;

    fn hazard_arena() -> Arena {
        let mut config = Config::default();
        config.arena.obstacle_count = 0;
        let mut arena = Arena::new(config);
        arena.add_agent(Agent::new(0, "a", Cell::new(2, 2), Direction::Down, 3, 0));
        arena.hazard_mut().place_at(Cell::new(20, 15));
        arena
    }

    #[test]
    fn test_frame_bytes_roundtrip() {
        let arena = hazard_arena();
        let frame = StatusFrame::capture(&arena);
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(StatusFrame::from_bytes(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_rejects_bad_frames() {
        assert!(matches!(
            StatusFrame::from_bytes(b"NOPE1234"),
            Err(FrameError::InvalidFormat(_))
        ));

        let arena = hazard_arena();
        let mut frame = StatusFrame::capture(&arena);
        frame.version = 99;
        let bytes = frame.to_bytes().unwrap();
        assert!(matches!(
            StatusFrame::from_bytes(&bytes),
            Err(FrameError::VersionMismatch { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_decoded_frame_matches_live_decisions() {
        let mut arena = hazard_arena();
        for _ in 0..95 {
            arena.step(&HashMap::new());
        }
        let frame = StatusFrame::from_bytes(&StatusFrame::capture(&arena).to_bytes().unwrap()).unwrap();

        for x in -1..=40 {
            for y in -1..=30 {
                let cell = Cell::new(x, y);
                assert_eq!(frame.is_position_safe(cell), arena.safe_zone().is_position_safe(cell));
                assert_eq!(frame.classify(cell), arena.hazard().classify(cell));
            }
        }
    }

    #[test]
    fn test_frame_log_file_roundtrip() {
        let mut arena = hazard_arena();
        let mut log = FrameLog::new();
        for _ in 0..10 {
            log.record(StatusFrame::capture(&arena));
            arena.step(&HashMap::new());
        }

        let path = std::env::temp_dir().join("vortex_arena_frames_test.bin");
        log.save(&path).unwrap();
        let loaded = FrameLog::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 10);
        assert_eq!(loaded.at(3), log.at(3));
    }
}
