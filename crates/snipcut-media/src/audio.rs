// crates/snipcut-media/src/audio.rs
//
// Audio segment extraction: decode a window of a clip's audio, resample to
// 44.1 kHz stereo f32, apply the clip gain and write an IEEE-float WAV that
// rodio can play.
//
// Decoding uses the linked ffmpeg, not a CLI subprocess, so it behaves the
// same however the app was launched.

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::debug;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec;
use ffmpeg::format::input;
use ffmpeg::format::sample::{Sample, Type as SampleType};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;

use crate::helpers::seek::seek_to_secs;
use crate::source::Clip;

/// Output sample rate. Matches the AAC rate used by encode.rs.
pub const OUT_RATE: u32 = 44_100;

/// Packed (interleaved) f32: what rodio's WAV decoder expects.
const OUT_FMT: Sample = Sample::F32(SampleType::Packed);
const OUT_LAYOUT: ChannelLayout = ChannelLayout::STEREO;
const OUT_CHANNELS: usize = 2;

/// Write clip-relative `[start, end)` of `clip`'s audio to `dest` as WAV.
/// Returns the number of bytes written.
pub fn extract_segment(clip: &Clip, start: f64, end: f64, dest: &Path) -> Result<u64> {
    if !(start < end) {
        bail!("empty audio window {start:.3}..{end:.3}");
    }
    let window = (clip.source_time(start), clip.source_time(end));

    let mut pcm = decode_window(&clip.path, window)?;
    if pcm.is_empty() {
        bail!("no audio samples in {:.3}..{:.3}", window.0, window.1);
    }
    apply_gain(&mut pcm, clip.gain);

    let bytes = write_wav(dest, &pcm)
        .with_context(|| format!("write WAV '{}'", dest.display()))?;
    debug!("audio segment {:.2}s → {:.2}s: {bytes} bytes → {}", window.0, window.1, dest.display());
    Ok(bytes)
}

/// Decode `[window.0, window.1)` seconds of the best audio stream in `src` to
/// interleaved stereo f32 at OUT_RATE.
fn decode_window(src: &Path, window: (f64, f64)) -> Result<Vec<f32>> {
    let mut ictx = input(src)?;

    let (audio_idx, time_base, mut decoder) = {
        let stream = ictx.streams().best(MediaType::Audio)
            .ok_or_else(|| anyhow!("no audio stream"))?;
        let ctx = codec::context::Context::from_parameters(stream.parameters())?;
        (stream.index(), stream.time_base(), ctx.decoder().audio()?)
    };

    seek_to_secs(&mut ictx, window.0, "extract_segment");

    let mut trimmer = WindowTrimmer::new(window);
    let mut resampler: Option<resampling::Context> = None;
    let mut frame = AudioFrame::empty();

    for (stream, packet) in ictx.packets().flatten() {
        if stream.index() != audio_idx { continue; }
        if decoder.send_packet(&packet).is_err() { continue; }
        while decoder.receive_frame(&mut frame).is_ok() {
            if trimmer.cursor.is_none() {
                let pts = frame.pts().unwrap_or(0) as f64 * f64::from(time_base);
                trimmer.cursor = Some(pts);
            }
            let chunk = resample(&frame, &mut resampler)?;
            trimmer.push(&chunk);
        }
        if trimmer.done() {
            return Ok(trimmer.out);
        }
    }

    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut frame).is_ok() {
        let chunk = resample(&frame, &mut resampler)?;
        trimmer.push(&chunk);
    }

    Ok(trimmer.out)
}

/// Keeps the part of a continuous sample stream that falls inside a window.
/// `cursor` is the source time of the next sample pushed.
struct WindowTrimmer {
    window: (f64, f64),
    cursor: Option<f64>,
    out:    Vec<f32>,
}

impl WindowTrimmer {
    fn new(window: (f64, f64)) -> Self {
        Self { window, cursor: None, out: Vec::new() }
    }

    fn done(&self) -> bool {
        self.cursor.is_some_and(|c| c >= self.window.1)
    }

    /// Append interleaved stereo samples starting at `cursor`.
    fn push(&mut self, interleaved: &[f32]) {
        let start  = self.cursor.unwrap_or(self.window.0);
        let frames = interleaved.len() / OUT_CHANNELS;
        let rate   = OUT_RATE as f64;

        let first = ((self.window.0 - start) * rate).ceil().max(0.0) as usize;
        let last  = (((self.window.1 - start) * rate).ceil().max(0.0) as usize).min(frames);
        if first < last {
            self.out.extend_from_slice(&interleaved[first * OUT_CHANNELS..last * OUT_CHANNELS]);
        }
        self.cursor = Some(start + frames as f64 / rate);
    }
}

/// Resample `frame` to OUT_FMT/OUT_LAYOUT/OUT_RATE. The resampler is built on
/// the first frame that needs one, once the real source format is known.
fn resample(frame: &AudioFrame, resampler: &mut Option<resampling::Context>) -> Result<Vec<f32>> {
    let channels = frame.ch_layout().channels();
    let needs_resample = frame.format() != OUT_FMT
        || frame.rate()                 != OUT_RATE
        || channels                     != 2;

    if !needs_resample {
        return Ok(packed_f32(frame));
    }

    if resampler.is_none() {
        // Mono must be declared explicitly or swr misreads the layout.
        let src_layout = if channels >= 2 { frame.ch_layout() } else { ChannelLayout::MONO };
        *resampler = Some(resampling::Context::get2(
            frame.format(), src_layout, frame.rate(),
            OUT_FMT,        OUT_LAYOUT, OUT_RATE,
        )?);
    }
    let Some(rs) = resampler.as_mut() else { return Ok(Vec::new()) };

    let mut resampled = AudioFrame::empty();
    rs.run(frame, &mut resampled)?;
    if resampled.samples() == 0 {
        return Ok(Vec::new());
    }
    Ok(packed_f32(&resampled))
}

/// Packed f32 samples of `frame`; all channels live in plane 0.
fn packed_f32(frame: &AudioFrame) -> Vec<f32> {
    let len = frame.samples() * OUT_CHANNELS * 4;
    let data = frame.data(0);
    data[..len.min(data.len())]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

pub fn apply_gain(samples: &mut [f32], gain: f64) {
    if (gain - 1.0).abs() < f64::EPSILON {
        return;
    }
    let g = gain as f32;
    for s in samples {
        *s *= g;
    }
}

/// RIFF and data chunk sizes for `sample_count` f32 samples. WAV sizes are
/// 32-bit, so anything past 4 GiB is refused instead of written with a
/// wrapped header.
fn wav_sizes(sample_count: usize) -> std::io::Result<(u32, u32)> {
    sample_count
        .checked_mul(4)
        .and_then(|n| u32::try_from(n).ok())
        .and_then(|data| data.checked_add(36).map(|riff| (riff, data)))
        .ok_or_else(|| std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{sample_count} samples do not fit in a WAV file"),
        ))
}

/// Write interleaved stereo f32le PCM as a WAV file. Returns bytes written.
///
/// Layout:
///   RIFF  <file_size - 8>  WAVE
///   fmt   16  <format=3 IEEE_FLOAT>  <channels=2>  <rate=44100>
///             <byte_rate=352800>  <block_align=8>  <bits=32>
///   data  <data_size>  <samples…>
pub fn write_wav(path: &Path, samples: &[f32]) -> std::io::Result<u64> {
    const CHANNELS:     u16 = OUT_CHANNELS as u16;
    const BITS:         u16 = 32;
    const FORMAT_FLOAT: u16 = 3;
    const BLOCK_ALIGN:  u16 = CHANNELS * (BITS / 8);

    let (riff_size, data_size) = wav_sizes(samples.len())?;
    let byte_rate = OUT_RATE * BLOCK_ALIGN as u32;

    let file  = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    w.write_all(b"RIFF")?;
    w.write_all(&riff_size.to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_FLOAT.to_le_bytes())?;
    w.write_all(&CHANNELS.to_le_bytes())?;
    w.write_all(&OUT_RATE.to_le_bytes())?;
    w.write_all(&byte_rate.to_le_bytes())?;
    w.write_all(&BLOCK_ALIGN.to_le_bytes())?;
    w.write_all(&BITS.to_le_bytes())?;

    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for s in samples {
        w.write_all(&s.to_le_bytes())?;
    }
    w.flush()?;

    Ok(44 + data_size as u64)
}
