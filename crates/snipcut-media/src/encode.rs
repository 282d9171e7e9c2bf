// crates/snipcut-media/src/encode.rs
//
// Single-clip H.264 + AAC MP4 export.
//
// Stream layout in the output:
//   Stream 0: H.264 video (YUV420P, CRF 18, preset fast), source display size
//   Stream 1: AAC audio  (FLTP stereo, 44100 Hz, 128 kbps), clip gain applied;
//             omitted when the clip has no audio track
//
// PTS strategy: video is a frame counter in 1/fps, audio a sample counter in
// 1/44100. Both start at zero, so the trimmed window begins at t = 0.
//
// Audio FIFO: AAC takes exactly `frame_size()` samples per input frame, while
// decoded audio arrives in arbitrary chunk sizes. Resampled PCM goes through a
// planar stereo buffer; full frames are popped off the front and the tail is
// zero-padded at the final flush.
//
// Blocking. Run it on its own thread.

use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::{debug, info, warn};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{input as open_input, output as open_output, Pixel, Sample};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::software::scaling::{Context as ScaleCtx, Flags as ScaleFlags};
use ffmpeg::util::channel_layout::{ChannelLayout, ChannelLayoutMask};
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use crate::helpers::seek::seek_to_secs;
use crate::source::Clip;

const AUDIO_RATE: i32 = 44_100;

/// Generous lead-in for audio frames straddling the in-point.
const AUDIO_PREROLL_SLACK: f64 = 0.05;

// ── Audio FIFO ────────────────────────────────────────────────────────────────

/// Stereo FLTP sample buffer. Mono input is duplicated to both channels.
struct AudioFifo {
    left:  Vec<f32>,
    right: Vec<f32>,
    gain:  f32,
}

impl AudioFifo {
    fn new(gain: f64) -> Self {
        Self { left: Vec::new(), right: Vec::new(), gain: gain as f32 }
    }

    fn len(&self) -> usize { self.left.len() }

    /// Append one FLTP frame, scaled by the clip gain.
    fn push(&mut self, frame: &AudioFrame) {
        let n = frame.samples();
        if n == 0 { return; }
        let stereo = frame.ch_layout().channels() >= 2;
        let g = self.gain;
        self.left.extend(plane_f32(frame, 0, n).iter().map(|s| s * g));
        let right = if stereo { plane_f32(frame, 1, n) } else { plane_f32(frame, 0, n) };
        self.right.extend(right.iter().map(|s| s * g));
    }

    /// Pop `n` samples as one encoder frame with PTS `sample_idx`, zero-padding
    /// when fewer remain.
    fn pop_frame(&mut self, n: usize, sample_idx: i64) -> AudioFrame {
        let available = self.left.len().min(n);

        let mut frame = AudioFrame::new(Sample::F32(SampleType::Planar), n, ChannelLayoutMask::STEREO);
        frame.set_rate(AUDIO_RATE as u32);
        frame.set_pts(Some(sample_idx));

        for (plane, src) in [(0, &self.left), (1, &self.right)] {
            let dst = plane_f32_mut(&mut frame, plane, n);
            dst[..available].copy_from_slice(&src[..available]);
            dst[available..].fill(0.0);
        }

        self.left.drain(..available);
        self.right.drain(..available);
        frame
    }
}

fn plane_f32(frame: &AudioFrame, plane: usize, n: usize) -> &[f32] {
    let bytes = frame.data(plane);
    // SAFETY: FLTP planes hold at least `n` aligned f32 samples.
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const f32, n) }
}

fn plane_f32_mut(frame: &mut AudioFrame, plane: usize, n: usize) -> &mut [f32] {
    let bytes = frame.data_mut(plane);
    // SAFETY: the frame was allocated for `n` FLTP samples per plane.
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut f32, n) }
}

// ── Audio encoder state ───────────────────────────────────────────────────────

struct AudioEncState {
    encoder:        encoder::Audio,
    out_sample_idx: i64,
    frame_size:     usize,
    fifo:           AudioFifo,
    audio_tb:       Rational,
    ost_audio_tb:   Rational,
}

impl AudioEncState {
    /// Encode every full frame in the FIFO; with `flush`, the padded tail too.
    fn drain_fifo(&mut self, octx: &mut ffmpeg::format::context::Output, flush: bool) -> Result<()> {
        while self.fifo.len() >= self.frame_size || (flush && self.fifo.len() > 0) {
            let frame = self.fifo.pop_frame(self.frame_size, self.out_sample_idx);
            self.out_sample_idx += self.frame_size as i64;
            self.encoder.send_frame(&frame).context("send audio frame to encoder")?;
            self.drain_packets(octx)?;
        }
        Ok(())
    }

    fn drain_packets(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(1);
            pkt.rescale_ts(self.audio_tb, self.ost_audio_tb);
            pkt.write_interleaved(octx).context("write audio packet")?;
        }
        Ok(())
    }

    fn flush_encoder(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        self.encoder.send_eof().context("send EOF to audio encoder")?;
        self.drain_packets(octx)
    }

    /// Resample `raw` to FLTP stereo 44.1 kHz if needed and queue it.
    fn queue(&mut self, raw: &AudioFrame, resampler: &mut Option<resampling::Context>) -> Result<()> {
        let target = Sample::F32(SampleType::Planar);
        let channels = raw.ch_layout().channels();
        let needs_resample = raw.format() != target
            || raw.rate()                 != AUDIO_RATE as u32
            || channels                   != 2;

        if !needs_resample {
            self.fifo.push(raw);
            return Ok(());
        }

        if resampler.is_none() {
            let src_layout = if channels >= 2 { raw.ch_layout() } else { ChannelLayout::MONO };
            *resampler = Some(resampling::Context::get2(
                raw.format(), src_layout,            raw.rate(),
                target,       ChannelLayout::STEREO, AUDIO_RATE as u32,
            )?);
        }
        if let Some(rs) = resampler.as_mut() {
            let mut resampled = AudioFrame::empty();
            if rs.run(raw, &mut resampled).is_ok() && resampled.samples() > 0 {
                self.fifo.push(&resampled);
            }
        }
        Ok(())
    }
}

// ── Video encoder state ───────────────────────────────────────────────────────

struct VideoEncState {
    encoder:  encoder::Video,
    scaler:   Option<ScaleCtx>,
    src_size: (u32, u32),
    out_size: (u32, u32),
    frame_tb: Rational,
    ost_tb:   Rational,
    next_idx: i64,
}

impl VideoEncState {
    fn encode(&mut self, decoded: &VideoFrame, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        if self.scaler.is_none() {
            self.scaler = Some(ScaleCtx::get(
                decoded.format(), self.src_size.0, self.src_size.1,
                Pixel::YUV420P,   self.out_size.0, self.out_size.1,
                ScaleFlags::BILINEAR,
            )?);
        }
        let Some(scaler) = self.scaler.as_mut() else { return Ok(()) };

        let mut yuv = VideoFrame::empty();
        scaler.run(decoded, &mut yuv).context("scale video frame")?;
        yuv.set_pts(Some(self.next_idx));
        yuv.set_kind(decoded.kind());
        // swscale copies the source SAR; force square pixels. No safe setter
        // exists for this field.
        unsafe {
            (*yuv.as_mut_ptr()).sample_aspect_ratio = ffmpeg::ffi::AVRational { num: 1, den: 1 };
        }

        self.encoder.send_frame(&yuv).context("send video frame to encoder")?;
        self.drain_packets(octx)?;
        self.next_idx += 1;
        Ok(())
    }

    fn drain_packets(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(0);
            pkt.rescale_ts(self.frame_tb, self.ost_tb);
            pkt.write_interleaved(octx).context("write video packet")?;
        }
        Ok(())
    }

    fn flush(&mut self, octx: &mut ffmpeg::format::context::Output) -> Result<()> {
        self.encoder.send_eof().context("send EOF to video encoder")?;
        self.drain_packets(octx)
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// An open MP4 muxer with its encoders. Stream 1 exists only for clips with
/// audio.
pub(crate) struct Encoders {
    octx:  ffmpeg::format::context::Output,
    video: VideoEncState,
    audio: Option<AudioEncState>,
}

impl Encoders {
    /// Create `output` for frames of `src_size` at `fps`, writing the header.
    pub(crate) fn create(
        output:     &Path,
        src_size:   (u32, u32),
        fps:        f64,
        gain:       f64,
        with_audio: bool,
    ) -> Result<Self> {
        let fps      = fps.round().clamp(1.0, 240.0) as i32;
        let frame_tb = Rational::new(1, fps);
        // H.264 with YUV420P needs even dimensions.
        let out_size = ((src_size.0.max(2)) & !1, (src_size.1.max(2)) & !1);

        let mut octx = open_output(output)
            .with_context(|| format!("could not open output '{}'", output.display()))?;

        // ── Video encoder (stream 0) ──────────────────────────────────────────
        let h264 = encoder::find(CodecId::H264)
            .ok_or_else(|| anyhow!("H.264 encoder not found; is libx264 available?"))?;

        let mut ost_video = octx.add_stream(h264).context("add video stream")?;
        ost_video.set_time_base(frame_tb);

        let mut video_enc = codec::context::Context::new_with_codec(h264)
            .encoder().video().context("create video encoder context")?;
        video_enc.set_width(out_size.0);
        video_enc.set_height(out_size.1);
        video_enc.set_format(Pixel::YUV420P);
        video_enc.set_time_base(frame_tb);
        video_enc.set_frame_rate(Some(Rational::new(fps, 1)));
        video_enc.set_bit_rate(0);

        let mut opts = ffmpeg::Dictionary::new();
        opts.set("crf",    "18");
        opts.set("preset", "fast");

        let mut video_encoder = video_enc.open_as_with(h264, opts).context("open H.264 encoder")?;
        // libavcodec resets the SAR during open; set it on the opened context.
        video_encoder.set_aspect_ratio(Rational::new(1, 1));

        // Encoder params into stream 0's codecpar. encoder::Video does not
        // implement AsPtr<AVCodecParameters>, so this goes through FFI.
        unsafe {
            let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
                video_encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
            );
            if ret < 0 {
                bail!("avcodec_parameters_from_context (video) failed: {ret}");
            }
        }

        // ── Audio encoder (stream 1) ──────────────────────────────────────────
        let audio_tb = Rational::new(1, AUDIO_RATE);
        let mut audio_setup = None;

        if with_audio {
            let aac = encoder::find(CodecId::AAC).ok_or_else(|| anyhow!("AAC encoder not found"))?;
            let mut ost_audio = octx.add_stream(aac).context("add audio stream")?;
            ost_audio.set_time_base(audio_tb);

            let mut audio_enc = codec::context::Context::new_with_codec(aac)
                .encoder().audio().context("create audio encoder context")?;
            audio_enc.set_rate(AUDIO_RATE);
            audio_enc.set_ch_layout(ChannelLayout::STEREO);
            audio_enc.set_format(Sample::F32(SampleType::Planar));
            audio_enc.set_bit_rate(128_000);

            let audio_encoder = audio_enc.open_as_with(aac, ffmpeg::Dictionary::new())
                .context("open AAC encoder")?;

            unsafe {
                let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                    (**(*octx.as_mut_ptr()).streams.add(1)).codecpar,
                    audio_encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
                );
                if ret < 0 {
                    bail!("avcodec_parameters_from_context (audio) failed: {ret}");
                }
            }
            audio_setup = Some(audio_encoder);
        }

        octx.write_header().context("write output header")?;

        // The muxer may replace the requested time bases while writing the header.
        let ost_tb = octx.stream(0).ok_or_else(|| anyhow!("video stream missing"))?.time_base();

        let audio = match audio_setup {
            Some(audio_encoder) => {
                let ost_audio_tb = octx.stream(1)
                    .ok_or_else(|| anyhow!("audio stream missing"))?
                    .time_base();
                let frame_size = (audio_encoder.frame_size() as usize).max(1024);
                Some(AudioEncState {
                    encoder:        audio_encoder,
                    out_sample_idx: 0,
                    frame_size,
                    fifo:           AudioFifo::new(gain),
                    audio_tb,
                    ost_audio_tb,
                })
            }
            None => None,
        };

        let video = VideoEncState {
            encoder:  video_encoder,
            scaler:   None,
            src_size,
            out_size,
            frame_tb,
            ost_tb,
            next_idx: 0,
        };

        Ok(Self { octx, video, audio })
    }

    pub(crate) fn has_audio(&self) -> bool { self.audio.is_some() }

    pub(crate) fn encode_video(&mut self, frame: &VideoFrame) -> Result<()> {
        self.video.encode(frame, &mut self.octx)
    }

    /// Queue decoded audio. Dropped silently when the output has no audio stream.
    pub(crate) fn encode_audio(
        &mut self,
        raw:       &AudioFrame,
        resampler: &mut Option<resampling::Context>,
    ) -> Result<()> {
        if let Some(audio) = self.audio.as_mut() {
            audio.queue(raw, resampler)?;
            audio.drain_fifo(&mut self.octx, false)?;
        }
        Ok(())
    }

    /// Whether the audio written so far covers `secs`. Always true without audio.
    fn audio_covers(&self, secs: f64) -> bool {
        self.audio.as_ref().map_or(true, |a| a.fifo_covers(secs))
    }

    /// Flush both encoders and write the trailer. Returns the video frame count.
    pub(crate) fn finish(mut self) -> Result<i64> {
        self.video.flush(&mut self.octx)?;
        if let Some(audio) = self.audio.as_mut() {
            audio.drain_fifo(&mut self.octx, true)?;
            audio.flush_encoder(&mut self.octx)?;
        }
        self.octx.write_trailer().context("write trailer")?;
        Ok(self.video.next_idx)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Encode `clip`'s span to `output`, replacing any existing file.
pub fn write_clip(clip: &Clip, output: &Path) -> Result<()> {
    if !(clip.duration > 0.0) {
        bail!("nothing to encode: clip is empty");
    }

    let mut out = Encoders::create(output, clip.video_size, clip.fps, clip.gain, clip.has_audio)?;
    transcode_span(clip, &mut out)?;
    let frames = out.finish()?;

    info!("wrote {frames} frames → {}", output.display());
    Ok(())
}

/// Decode `clip.span` from the source and feed the encoders.
fn transcode_span(clip: &Clip, out: &mut Encoders) -> Result<()> {
    let (span_start, span_end) = clip.span;

    let mut ictx = open_input(&clip.path)
        .with_context(|| format!("open '{}'", clip.path.display()))?;

    let (video_idx, in_video_tb, mut video_decoder) = {
        let stream = ictx.streams().best(MediaType::Video)
            .ok_or_else(|| anyhow!("no video stream in '{}'", clip.path.display()))?;
        let ctx = codec::context::Context::from_parameters(stream.parameters())
            .context("video decoder context")?;
        (stream.index(), stream.time_base(), ctx.decoder().video().context("open video decoder")?)
    };

    // A broken audio stream leaves the output's audio silent.
    let mut audio_in: Option<(usize, Rational, ffmpeg::decoder::audio::Audio)> = None;
    if out.has_audio() {
        if let Some(stream) = ictx.streams().best(MediaType::Audio) {
            match codec::context::Context::from_parameters(stream.parameters())
                .and_then(|ctx| ctx.decoder().audio())
            {
                Ok(dec) => audio_in = Some((stream.index(), stream.time_base(), dec)),
                Err(e)  => warn!("audio decoder unavailable for '{}': {e}", clip.path.display()),
            }
        }
    }

    seek_to_secs(&mut ictx, span_start, "write_clip");

    let half_frame = 0.5 / clip.fps.max(1.0);
    let mut resampler: Option<resampling::Context> = None;
    let mut decoded = VideoFrame::empty();
    let mut raw     = AudioFrame::empty();
    let mut video_done = false;

    for result in ictx.packets() {
        let (stream, packet) = result.context("read packet")?;
        let sidx = stream.index();

        if sidx == video_idx && !video_done {
            video_decoder.send_packet(&packet).context("send video packet to decoder")?;
            while video_decoder.receive_frame(&mut decoded).is_ok() {
                let t = decoded.pts().map_or(span_start, |pts| pts as f64 * f64::from(in_video_tb));
                if t < span_start - half_frame { continue; }
                if t >= span_end {
                    video_done = true;
                    break;
                }
                out.encode_video(&decoded)?;
            }
        } else if let Some((aidx, atb, adec)) = audio_in.as_mut() {
            if sidx == *aidx && adec.send_packet(&packet).is_ok() {
                while adec.receive_frame(&mut raw).is_ok() {
                    let t = raw.pts().map_or(span_start, |pts| pts as f64 * f64::from(*atb));
                    if t < span_start - AUDIO_PREROLL_SLACK || t >= span_end { continue; }
                    out.encode_audio(&raw, &mut resampler)?;
                }
            }
        }

        if video_done && (audio_in.is_none() || out.audio_covers(span_end - span_start)) {
            break;
        }
    }

    if !video_done {
        let _ = video_decoder.send_eof();
        while video_decoder.receive_frame(&mut decoded).is_ok() {
            let t = decoded.pts().map_or(span_start, |pts| pts as f64 * f64::from(in_video_tb));
            if t < span_start - half_frame { continue; }
            if t >= span_end { break; }
            out.encode_video(&decoded)?;
        }
    }

    debug!("transcoded {:.2}s → {:.2}s of {}", span_start, span_end, clip.path.display());
    Ok(())
}

impl AudioEncState {
    /// Whether the samples encoded or queued so far cover `secs` of output.
    fn fifo_covers(&self, secs: f64) -> bool {
        let total = self.out_sample_idx as f64 + self.fifo.len() as f64;
        total >= secs * AUDIO_RATE as f64
    }
}
