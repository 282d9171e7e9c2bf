// crates/snipcut-media/src/testing.rs
//
// Generated media for tests. `write_pattern` encodes a short MP4 through the
// crate's own encoder so probing, decoding, audio extraction and export all
// run against a real file.
//
// Video: flat grey frames whose luma rises linearly with time, so a decoded
// frame tells roughly which timestamp it came from. Audio: a 440 Hz tone.

use std::f32::consts::TAU;
use std::path::Path;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{Pixel, Sample};
use ffmpeg::util::channel_layout::ChannelLayoutMask;
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;

use crate::encode::Encoders;
use crate::source::Clip;

pub const SIZE: (u32, u32) = (64, 48);
pub const FPS: f64 = 25.0;
pub const RATE: u32 = 44_100;

const CHUNK: usize = 1024;

/// Luma of the frame shown at `t` in a pattern `secs` long.
pub fn pattern_luma(t: f64, secs: f64) -> u8 {
    let frames = (secs * FPS).round() as usize;
    let i = ((t * FPS) as usize).min(frames.saturating_sub(1));
    (16 + i * 200 / frames.max(1)) as u8
}

/// Write `secs` of the test pattern to `path`.
pub fn write_pattern(path: &Path, secs: f64, with_audio: bool) {
    ffmpeg::init().unwrap();
    let mut out = Encoders::create(path, SIZE, FPS, 1.0, with_audio).unwrap();

    let frames  = (secs * FPS).round() as usize;
    let samples = (secs * RATE as f64).round() as usize;
    let mut resampler = None;
    let mut sent = 0usize;

    for i in 0..frames {
        let mut frame = VideoFrame::new(Pixel::YUV420P, SIZE.0, SIZE.1);
        frame.data_mut(0).fill(pattern_luma(i as f64 / FPS, secs));
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        out.encode_video(&frame).unwrap();

        // Audio up to the end of this frame, so the muxer sees both streams early.
        let due = (((i + 1) as f64 / FPS) * RATE as f64) as usize;
        while with_audio && sent < due.min(samples) {
            let n = CHUNK.min(samples - sent);
            out.encode_audio(&tone(sent, n), &mut resampler).unwrap();
            sent += n;
        }
    }
    out.finish().unwrap();
}

/// Write and probe a pattern clip.
pub fn pattern_clip(path: &Path, secs: f64, with_audio: bool) -> Clip {
    write_pattern(path, secs, with_audio);
    Clip::open(path).unwrap()
}

fn tone(first: usize, n: usize) -> AudioFrame {
    let mut frame = AudioFrame::new(Sample::F32(SampleType::Planar), n, ChannelLayoutMask::STEREO);
    frame.set_rate(RATE);
    for plane in 0..2 {
        for (k, bytes) in frame.data_mut(plane).chunks_exact_mut(4).take(n).enumerate() {
            let t = (first + k) as f32 / RATE as f32;
            bytes.copy_from_slice(&(0.25 * (TAU * 440.0 * t).sin()).to_le_bytes());
        }
    }
    frame
}
