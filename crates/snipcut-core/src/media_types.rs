// crates/snipcut-core/src/media_types.rs
//
// Plain data that crosses the boundary between snipcut-media, the engine and
// the UI. No egui, no ffmpeg.

use std::path::PathBuf;
use uuid::Uuid;

/// Fixed size of the preview canvas every rendered frame is scaled to.
pub const PREVIEW_SIZE: (u32, u32) = (1280, 720);

/// A decoded frame at native display resolution.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub timestamp: f64,
    pub width:     u32,
    pub height:    u32,
    pub data:      Vec<u8>, // RGBA, no stride padding
}

/// A frame scaled to the preview surface, ready to upload.
#[derive(Clone, Debug)]
pub struct DisplayImage {
    pub width:  u32,
    pub height: u32,
    pub data:   Vec<u8>, // RGBA
}

impl DisplayImage {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Outcome of a background export, published on the editor's export channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportEvent {
    Done   { job_id: Uuid, path: PathBuf },
    Failed { job_id: Uuid, msg: String },
}
