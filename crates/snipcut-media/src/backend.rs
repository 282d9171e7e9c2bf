// crates/snipcut-media/src/backend.rs
//
// FfmpegBackend: MediaBackend over this crate's modules. The only place
// anyhow errors become EditorError.

use std::path::Path;
use std::sync::OnceLock;

use tracing::warn;

use snipcut_core::{AudioPlayback, DisplayImage, EditorError, MediaBackend, Result, VideoFrame};

use crate::player::AudioPlayer;
use crate::source::Clip;
use crate::{audio, decode, encode, render};

static FFMPEG_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

pub struct FfmpegBackend {
    _private: (),
}

impl FfmpegBackend {
    /// Initialise ffmpeg (once per process) and return a backend.
    pub fn new() -> Result<Self> {
        let init = FFMPEG_INIT.get_or_init(|| {
            ffmpeg_the_third::init().map_err(|e| e.to_string())?;
            ffmpeg_the_third::util::log::set_level(ffmpeg_the_third::util::log::Level::Error);
            Ok(())
        });
        if let Err(e) = init {
            return Err(EditorError::Config(format!("ffmpeg init failed: {e}")));
        }
        Ok(Self { _private: () })
    }
}

/// Stands in for the audio player when no output device can be opened, so
/// playback still steps through frames.
struct Silence;

impl AudioPlayback for Silence {
    fn terminate(&mut self) {}
}

impl MediaBackend for FfmpegBackend {
    type Clip = Clip;

    fn open(&self, path: &Path) -> Result<Clip> {
        Clip::open(path).map_err(|e| EditorError::load(path, format!("{e:#}")))
    }

    fn duration(&self, clip: &Clip) -> f64 {
        clip.duration
    }

    fn has_audio(&self, clip: &Clip) -> bool {
        clip.has_audio
    }

    fn get_frame(&self, clip: &Clip, timestamp: f64) -> Result<VideoFrame> {
        decode::decode_frame(clip, timestamp)
            .map_err(|e| EditorError::decode(timestamp, format!("{e:#}")))
    }

    fn render(&self, frame: &VideoFrame, size: (u32, u32)) -> Result<DisplayImage> {
        render::render_rgba(frame, size)
            .map_err(|e| EditorError::decode(frame.timestamp, format!("render: {e:#}")))
    }

    fn extract_audio(&self, clip: &Clip, start: f64, end: f64, dest: &Path) -> Result<()> {
        audio::extract_segment(clip, start, end, dest)
            .map(|_| ())
            .map_err(|e| EditorError::Audio(format!("{e:#}")))
    }

    fn play_audio(&self, path: &Path) -> Result<Box<dyn AudioPlayback>> {
        if !path.exists() {
            return Err(EditorError::Audio(format!("'{}' does not exist", path.display())));
        }
        match AudioPlayer::start(path) {
            Ok(player) => Ok(Box::new(player)),
            Err(e) => {
                warn!("audio preview unavailable, playing silently: {e:#}");
                Ok(Box::new(Silence))
            }
        }
    }

    fn subclip_and_scale(&self, clip: &Clip, start: f64, end: f64, volume_factor: f64) -> Result<Clip> {
        clip.subclip(start, end, volume_factor)
            .map_err(|e| EditorError::Encode(format!("{e:#}")))
    }

    fn write_to_file(&self, clip: &Clip, path: &Path) -> Result<()> {
        encode::write_clip(clip, path).map_err(|e| EditorError::Encode(format!("{e:#}")))
    }
}
