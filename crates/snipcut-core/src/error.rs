// crates/snipcut-core/src/error.rs
//
// Every fallible editor operation reports one of these. None of them is
// fatal: callers log and carry on with whatever state they already had.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    /// File missing, unreadable, or rejected by the decoder.
    #[error("could not load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// A frame could not be decoded or rendered.
    #[error("decode failed at {timestamp:.3}s: {reason}")]
    Decode { timestamp: f64, reason: String },

    /// Audio extraction or the audio player failed.
    #[error("audio: {0}")]
    Audio(String),

    /// Export write or codec failure.
    #[error("export failed: {0}")]
    Encode(String),

    /// The volume field did not hold a usable number.
    #[error("volume '{0}' is not a valid number")]
    InvalidVolume(String),

    /// The action needs a loaded clip and there is none.
    #[error("no video loaded")]
    NoClip,

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EditorError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Load { path: path.into(), reason: reason.to_string() }
    }

    pub fn decode(timestamp: f64, reason: impl ToString) -> Self {
        Self::Decode { timestamp, reason: reason.to_string() }
    }
}
