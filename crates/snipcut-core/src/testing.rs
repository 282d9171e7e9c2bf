// crates/snipcut-core/src/testing.rs
//
// Test doubles for the two seams. FakeBackend records what the engine asked
// of it; RecordingSurface records what the engine displayed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::backend::{AudioPlayback, MediaBackend, PreviewSurface};
use crate::error::{EditorError, Result};
use crate::media_types::{DisplayImage, VideoFrame};

#[derive(Clone, Debug, PartialEq)]
pub struct FakeClip {
    pub path:      PathBuf,
    pub duration:  f64,
    pub span:      (f64, f64),
    pub gain:      f64,
    pub has_audio: bool,
}

/// Blocks `get_frame` until the test releases it.
#[derive(Clone)]
struct FrameGate {
    entered: Sender<f64>,
    release: Receiver<()>,
}

pub struct FakeBackend {
    duration:         f64,
    decoded:          Mutex<Vec<f64>>,
    extracted:        Mutex<Vec<(f64, f64)>>,
    audio_started:    AtomicUsize,
    audio_terminated: Arc<AtomicUsize>,
    fail_extract:     AtomicBool,
    silent:           AtomicBool,
    gate:             Mutex<Option<FrameGate>>,
}

impl FakeBackend {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            decoded:          Mutex::new(Vec::new()),
            extracted:        Mutex::new(Vec::new()),
            audio_started:    AtomicUsize::new(0),
            audio_terminated: Arc::new(AtomicUsize::new(0)),
            fail_extract:     AtomicBool::new(false),
            silent:           AtomicBool::new(false),
            gate:             Mutex::new(None),
        }
    }

    pub fn decoded(&self) -> Vec<f64> { self.decoded.lock().clone() }
    pub fn extracted(&self) -> Vec<(f64, f64)> { self.extracted.lock().clone() }
    pub fn audio_started(&self) -> usize { self.audio_started.load(Ordering::SeqCst) }
    pub fn audio_terminated(&self) -> usize { self.audio_terminated.load(Ordering::SeqCst) }

    pub fn fail_extraction(&self, fail: bool) {
        self.fail_extract.store(fail, Ordering::SeqCst);
    }

    /// Clips opened from now on report no audio track.
    pub fn without_audio(&self) {
        self.silent.store(true, Ordering::SeqCst);
    }

    /// Every subsequent `get_frame` sends its timestamp on `entered`, then
    /// waits for one message on `release`.
    pub fn set_gate(&self, entered: Sender<f64>, release: Receiver<()>) {
        *self.gate.lock() = Some(FrameGate { entered, release });
    }
}

struct FakePlayback {
    terminated: Arc<AtomicUsize>,
}

impl AudioPlayback for FakePlayback {
    fn terminate(&mut self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

impl MediaBackend for FakeBackend {
    type Clip = FakeClip;

    fn open(&self, path: &Path) -> Result<FakeClip> {
        if path.as_os_str().is_empty() || path.to_string_lossy().contains("broken") {
            return Err(EditorError::load(path, "unsupported file"));
        }
        Ok(FakeClip {
            path:      path.to_path_buf(),
            duration:  self.duration,
            span:      (0.0, self.duration),
            gain:      1.0,
            has_audio: !self.silent.load(Ordering::SeqCst),
        })
    }

    fn duration(&self, clip: &FakeClip) -> f64 { clip.duration }

    fn has_audio(&self, clip: &FakeClip) -> bool { clip.has_audio }

    fn get_frame(&self, _clip: &FakeClip, timestamp: f64) -> Result<VideoFrame> {
        self.decoded.lock().push(timestamp);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _ = gate.entered.send(timestamp);
            let _ = gate.release.recv_timeout(Duration::from_secs(5));
        }
        Ok(VideoFrame { timestamp, width: 4, height: 2, data: vec![0; 4 * 2 * 4] })
    }

    fn render(&self, _frame: &VideoFrame, size: (u32, u32)) -> Result<DisplayImage> {
        Ok(DisplayImage { width: size.0, height: size.1, data: Vec::new() })
    }

    fn extract_audio(&self, clip: &FakeClip, start: f64, end: f64, dest: &Path) -> Result<()> {
        if self.fail_extract.load(Ordering::SeqCst) || !clip.has_audio {
            return Err(EditorError::Audio("no audio stream".into()));
        }
        if start >= end {
            return Err(EditorError::Audio(format!("empty window {start}..{end}")));
        }
        self.extracted.lock().push((start, end));
        std::fs::write(dest, b"RIFF")?;
        Ok(())
    }

    fn play_audio(&self, _path: &Path) -> Result<Box<dyn AudioPlayback>> {
        self.audio_started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePlayback { terminated: Arc::clone(&self.audio_terminated) }))
    }

    fn subclip_and_scale(
        &self,
        clip:          &FakeClip,
        start:         f64,
        end:           f64,
        volume_factor: f64,
    ) -> Result<FakeClip> {
        if start >= end || end > clip.duration + 1e-9 {
            return Err(EditorError::Encode(format!("bad window {start}..{end}")));
        }
        Ok(FakeClip {
            path:      clip.path.clone(),
            duration:  end - start,
            span:      (clip.span.0 + start, clip.span.0 + end),
            gain:      clip.gain * volume_factor,
            has_audio: clip.has_audio,
        })
    }

    fn write_to_file(&self, clip: &FakeClip, path: &Path) -> Result<()> {
        std::fs::write(path, format!("{} {} {}", clip.span.0, clip.span.1, clip.gain))
            .map_err(|e| EditorError::Encode(e.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    current:   Mutex<Vec<f64>>,
    presented: Mutex<Vec<(u32, u32)>>,
    ranges:    Mutex<Vec<(f64, f64)>>,
    names:     Mutex<Vec<PathBuf>>,
}

impl RecordingSurface {
    pub fn current_times(&self) -> Vec<f64> { self.current.lock().clone() }
    pub fn presented(&self) -> Vec<(u32, u32)> { self.presented.lock().clone() }
    pub fn ranges(&self) -> Vec<(f64, f64)> { self.ranges.lock().clone() }
    pub fn names(&self) -> Vec<PathBuf> { self.names.lock().clone() }
}

impl PreviewSurface for RecordingSurface {
    fn present(&self, image: DisplayImage) {
        self.presented.lock().push(image.size());
    }

    fn set_current_time(&self, secs: f64) {
        self.current.lock().push(secs);
    }

    fn set_range(&self, start_secs: f64, end_secs: f64) {
        self.ranges.lock().push((start_secs, end_secs));
    }

    fn set_clip_name(&self, path: &Path) {
        self.names.lock().push(path.to_path_buf());
    }
}
