use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::{DrawStyle, GridConfig};
use crate::components::replay::{ReplayEntry, ReplayTracker};
use crate::log_info;

// ============================================================================
// ACTION LOG FILE FORMAT
// ============================================================================
//
// Only the recorded replay log is written: enough to rebuild a fresh grid of
// the same shape and play the session back. Cell contents are never saved.

/// Magic header for the action log (v1)
const LOG_MAGIC_V1: &str = "GPL1";

#[derive(Serialize, Deserialize)]
struct ActionLogFileV1 {
    magic: String,
    style: DrawStyle,
    width: usize,
    height: usize,
    entries: Vec<ReplayEntry>,
}

/// A loaded action log: the grid it was recorded on and its entries.
pub struct ActionLog {
    pub grid_config: GridConfig,
    pub entries: Vec<ReplayEntry>,
}

impl ActionLog {
    /// Build a replay tracker (still recording) holding the loaded entries.
    pub fn into_tracker(self, capacity: usize) -> (GridConfig, ReplayTracker) {
        (self.grid_config, ReplayTracker::from_entries(self.entries, capacity))
    }
}

/// Error type for action log file operations
#[derive(Debug)]
pub enum LogFileError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for LogFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFileError::Io(e) => write!(f, "I/O error: {}", e),
            LogFileError::Serialize(e) => write!(f, "Serialization error: {}", e),
            LogFileError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for LogFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogFileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LogFileError {
    fn from(e: std::io::Error) -> Self {
        LogFileError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for LogFileError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        LogFileError::Serialize(e.to_string())
    }
}

/// Write the entries of `replay` (oldest first) recorded on a grid shaped like `config`.
pub fn save_action_log(
    config: &GridConfig,
    replay: &ReplayTracker,
    path: &Path,
) -> Result<(), LogFileError> {
    let file = ActionLogFileV1 {
        magic: LOG_MAGIC_V1.to_string(),
        style: config.style,
        width: config.width,
        height: config.height,
        entries: replay.entries().cloned().collect(),
    };
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, &file)?;
    log_info!("Saved {} action(s) to {}", file.entries.len(), path.display());
    Ok(())
}

/// Load an action log written by `save_action_log`.
pub fn load_action_log(path: &Path) -> Result<ActionLog, LogFileError> {
    let raw = std::fs::read(path)?;
    // bincode encodes a String as: 8-byte length prefix + UTF-8 data.
    if raw.len() < 12 {
        return Err(LogFileError::InvalidFormat("File too small".into()));
    }
    if &raw[8..12] != LOG_MAGIC_V1.as_bytes() {
        return Err(LogFileError::InvalidFormat(format!(
            "unknown magic {:?}",
            String::from_utf8_lossy(&raw[8..12])
        )));
    }
    let file: ActionLogFileV1 = bincode::deserialize(&raw)?;
    let grid_config = GridConfig::new(file.style, file.width, file.height);
    grid_config.cell_count().map_err(LogFileError::InvalidFormat)?;
    log_info!("Loaded {} action(s) from {}", file.entries.len(), path.display());
    Ok(ActionLog {
        grid_config,
        entries: file.entries,
    })
}
