//! Error types for the tracker.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a tracking session.
///
/// An empty motion mask is not an error: "no detection" is an ordinary
/// per-frame outcome and never surfaces here.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("could not open camera on port {index}")]
    DeviceUnavailable { index: i32 },

    #[error("frame capture failed: {0}")]
    Capture(String),

    #[error("display error: {0}")]
    Display(String),

    #[error("could not create recording log {}: {source}", .path.display())]
    LogCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "frame geometry mismatch: expected {expected_width}x{expected_height}, got {width}x{height}"
    )]
    FrameGeometry {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrackerError {
    /// Process exit status for this failure. Startup failures get their own codes.
    pub fn exit_code(&self) -> u8 {
        match self {
            TrackerError::DeviceUnavailable { .. } => 1,
            TrackerError::LogCreate { .. } => 2,
            TrackerError::InvalidConfig(_) => 4,
            _ => 3,
        }
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
