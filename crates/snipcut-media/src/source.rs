// crates/snipcut-media/src/source.rs
//
// Clip: a probed media file plus the window of it the editor cares about.
//
// An opened clip covers the whole file at unity gain. `subclip` derives a
// narrower clip with a scaled gain; nothing is decoded until a frame, audio
// segment or export is requested, so deriving is free.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::info;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type;

/// Frame rate used when the container does not report one.
const FALLBACK_FPS: f64 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    pub path:       PathBuf,
    /// Playable length in seconds, `span.1 - span.0`.
    pub duration:   f64,
    /// Display size of the video stream.
    pub video_size: (u32, u32),
    pub fps:        f64,
    /// Window of the source file in seconds.
    pub span:       (f64, f64),
    /// Linear audio gain, 1.0 = unchanged.
    pub gain:       f64,
    pub has_audio:  bool,
}

impl Clip {
    /// Open and probe `path`. Fails when the file cannot be opened, has no
    /// video stream, or has no usable duration.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            bail!("empty path");
        }

        let ictx = input(path)?;

        let stream = ictx.streams().best(Type::Video)
            .ok_or_else(|| anyhow!("no video stream"))?;

        let params = stream.parameters();
        let video_size = (params.width() as u32, params.height() as u32);
        if video_size.0 == 0 || video_size.1 == 0 {
            bail!("video stream has no dimensions");
        }

        let rate = stream.avg_frame_rate();
        let fps = if rate.numerator() > 0 && rate.denominator() > 0 {
            f64::from(rate)
        } else {
            FALLBACK_FPS
        };

        let mut duration = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
        if !(duration > 0.0) {
            // Container did not say; fall back to the stream's own duration.
            duration = stream.duration() as f64 * f64::from(stream.time_base());
        }
        if !(duration.is_finite() && duration > 0.0) {
            bail!("duration unknown");
        }

        let has_audio = ictx.streams().best(Type::Audio).is_some();

        info!(
            "probed {}: {duration:.2}s {}x{} @ {fps:.2} fps{}",
            path.display(), video_size.0, video_size.1,
            if has_audio { "" } else { " (no audio)" },
        );

        Ok(Self {
            path: path.to_path_buf(),
            duration,
            video_size,
            fps,
            span: (0.0, duration),
            gain: 1.0,
            has_audio,
        })
    }

    /// Absolute position in the source file of clip-relative `t`.
    pub fn source_time(&self, t: f64) -> f64 {
        self.span.0 + t
    }

    /// A clip covering `[start, end)` of this one with gain scaled by
    /// `volume_factor`. `self` is not modified.
    pub fn subclip(&self, start: f64, end: f64, volume_factor: f64) -> Result<Self> {
        if !(volume_factor.is_finite() && volume_factor >= 0.0) {
            bail!("volume factor {volume_factor} must be finite and >= 0");
        }
        if !(start >= 0.0 && start < end && end <= self.duration + 1e-6) {
            bail!("window {start:.3}..{end:.3} outside clip of {:.3}s", self.duration);
        }
        let end = end.min(self.duration);

        Ok(Self {
            path:       self.path.clone(),
            duration:   end - start,
            video_size: self.video_size,
            fps:        self.fps,
            span:       (self.span.0 + start, self.span.0 + end),
            gain:       self.gain * volume_factor,
            has_audio:  self.has_audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pattern_clip, FPS, SIZE};

    fn clip(duration: f64) -> Clip {
        Clip {
            path:       PathBuf::from("/v/a.mp4"),
            duration,
            video_size: (1920, 1080),
            fps:        25.0,
            span:       (0.0, duration),
            gain:       1.0,
            has_audio:  true,
        }
    }

    #[test]
    fn subclip_narrows_span_and_scales_gain() {
        let c   = clip(10.0);
        let sub = c.subclip(2.0, 5.0, 0.5).unwrap();
        assert_eq!(sub.span, (2.0, 5.0));
        assert_eq!(sub.duration, 3.0);
        assert_eq!(sub.gain, 0.5);
        assert_eq!(c, clip(10.0));
    }

    #[test]
    fn nested_subclip_is_relative_to_parent() {
        let sub = clip(10.0).subclip(2.0, 8.0, 2.0).unwrap();
        let inner = sub.subclip(1.0, 2.0, 0.5).unwrap();
        assert_eq!(inner.span, (3.0, 4.0));
        assert_eq!(inner.gain, 1.0);
        assert_eq!(inner.source_time(0.5), 3.5);
    }

    #[test]
    fn subclip_rejects_bad_arguments() {
        let c = clip(10.0);
        assert!(c.subclip(5.0, 5.0, 1.0).is_err());
        assert!(c.subclip(6.0, 5.0, 1.0).is_err());
        assert!(c.subclip(0.0, 11.0, 1.0).is_err());
        assert!(c.subclip(0.0, 1.0, -1.0).is_err());
        assert!(c.subclip(0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn open_fails_on_empty_or_missing_path() {
        ffmpeg::init().unwrap();
        assert!(Clip::open(Path::new("")).is_err());
        assert!(Clip::open(Path::new("/definitely/not/here.mp4")).is_err());
    }

    #[test]
    fn open_fails_on_non_media_file() {
        ffmpeg::init().unwrap();
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp4");
        std::fs::write(&path, b"this is not a video").unwrap();
        assert!(Clip::open(&path).is_err());
    }

    #[test]
    fn open_probes_generated_file() {
        let dir  = tempfile::tempdir().unwrap();
        let clip = pattern_clip(&dir.path().join("pattern.mp4"), 4.0, true);

        assert_eq!(clip.video_size, SIZE);
        assert!((clip.fps - FPS).abs() < 0.5, "fps {}", clip.fps);
        assert!((clip.duration - 4.0).abs() < 0.2, "duration {}", clip.duration);
        assert_eq!(clip.span, (0.0, clip.duration));
        assert!(clip.has_audio);
    }

    #[test]
    fn open_notices_missing_audio_track() {
        let dir  = tempfile::tempdir().unwrap();
        let clip = pattern_clip(&dir.path().join("mute.mp4"), 2.0, false);
        assert!(!clip.has_audio);
        assert!((clip.duration - 2.0).abs() < 0.2, "duration {}", clip.duration);
    }
}
