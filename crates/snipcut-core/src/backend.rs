// crates/snipcut-core/src/backend.rs
//
// The two seams the engine talks through:
//   MediaBackend  : decoder library (snipcut-media implements it over ffmpeg)
//   PreviewSurface: the window (snipcut-ui implements it over egui)
//
// Both are called from worker threads, so both must be Send + Sync.

use std::path::Path;

use crate::error::Result;
use crate::media_types::{DisplayImage, VideoFrame};

/// A running audio preview. Dropping it without `terminate` lets the audio
/// play out on its own.
pub trait AudioPlayback: Send {
    /// Stop playback and wait until the player has released its output.
    fn terminate(&mut self);
}

pub trait MediaBackend: Send + Sync + 'static {
    type Clip: Send + Sync + 'static;

    /// Open and probe `path`. Fails with `EditorError::Load`.
    fn open(&self, path: &Path) -> Result<Self::Clip>;

    /// Playable length of `clip` in seconds.
    fn duration(&self, clip: &Self::Clip) -> f64;

    /// Whether `clip` has an audio track to extract.
    fn has_audio(&self, clip: &Self::Clip) -> bool;

    /// Decode the frame shown at `timestamp`. Callers clamp to `[0, duration)`.
    fn get_frame(&self, clip: &Self::Clip, timestamp: f64) -> Result<VideoFrame>;

    /// Scale `frame` to exactly `size`.
    fn render(&self, frame: &VideoFrame, size: (u32, u32)) -> Result<DisplayImage>;

    /// Write `[start, end)` of the clip's audio to a standalone file at `dest`.
    fn extract_audio(&self, clip: &Self::Clip, start: f64, end: f64, dest: &Path) -> Result<()>;

    /// Start playing the audio file at `path` on its own thread.
    fn play_audio(&self, path: &Path) -> Result<Box<dyn AudioPlayback>>;

    /// Derive a new clip covering `[start, end)` with its volume scaled by
    /// `volume_factor`. The source clip is not modified.
    fn subclip_and_scale(
        &self,
        clip:          &Self::Clip,
        start:         f64,
        end:           f64,
        volume_factor: f64,
    ) -> Result<Self::Clip>;

    /// Encode `clip` to `path`, overwriting any existing file.
    fn write_to_file(&self, clip: &Self::Clip, path: &Path) -> Result<()>;
}

/// The display side of the editor: one fixed-size canvas and three labels.
/// Implementations must not block; they hand the data to the UI thread.
pub trait PreviewSurface: Send + Sync + 'static {
    fn present(&self, image: DisplayImage);
    fn set_current_time(&self, secs: f64);
    fn set_range(&self, start_secs: f64, end_secs: f64);
    fn set_clip_name(&self, path: &Path);
}
