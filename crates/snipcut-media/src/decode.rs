// crates/snipcut-media/src/decode.rs
//
// One-shot frame decode for seek-preview and playback.
//
// Every call opens the file, seeks to the keyframe at or before the target
// and decodes forward to the first frame at or past it. Nothing is cached
// between calls; seek-preview and the playback loop both re-decode.

use anyhow::{anyhow, Result};
use tracing::debug;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec;
use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video;

use snipcut_core::VideoFrame;

use crate::helpers::pixels::packed_rgba;
use crate::helpers::seek::seek_to_secs;
use crate::source::Clip;

/// Decode the frame of `clip` shown at clip-relative `timestamp`, as RGBA at
/// the stream's display size.
///
/// Reaching EOF before the target (asking for the very last frame, or a
/// duration that overstates the stream) yields the last frame decoded.
pub fn decode_frame(clip: &Clip, timestamp: f64) -> Result<VideoFrame> {
    let target = clip.source_time(timestamp);
    let mut ictx = input(&clip.path)?;

    let (video_idx, time_base, mut decoder) = {
        let stream = ictx.streams().best(Type::Video)
            .ok_or_else(|| anyhow!("no video stream"))?;
        let ctx = codec::context::Context::from_parameters(stream.parameters())?;
        (stream.index(), stream.time_base(), ctx.decoder().video()?)
    };

    let (out_w, out_h) = clip.video_size;
    let mut scaler = SwsContext::get(
        decoder.format(), out_w, out_h,
        Pixel::RGBA,      out_w, out_h,
        Flags::BILINEAR,
    )?;

    seek_to_secs(&mut ictx, target, "decode_frame");

    let target_pts = (target / f64::from(time_base)) as i64;

    // Most recently scaled frame, returned if EOF comes before the target.
    let mut last_good: Option<Video> = None;
    let mut decoded = Video::empty();

    for (stream, packet) in ictx.packets().flatten() {
        if stream.index() != video_idx { continue; }
        if decoder.send_packet(&packet).is_err() { continue; }
        while decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgba = Video::empty();
            scaler.run(&decoded, &mut rgba)?;
            // Pre-roll between the keyframe and the target.
            let reached = decoded.pts().map_or(true, |pts| pts + 2 >= target_pts);
            if reached {
                return Ok(to_video_frame(&rgba, timestamp, out_w, out_h));
            }
            last_good = Some(rgba);
        }
    }

    // Frames still buffered in the decoder (B-frame reordering).
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let mut rgba = Video::empty();
        scaler.run(&decoded, &mut rgba)?;
        let reached = decoded.pts().map_or(true, |pts| pts + 2 >= target_pts);
        if reached {
            return Ok(to_video_frame(&rgba, timestamp, out_w, out_h));
        }
        last_good = Some(rgba);
    }

    match last_good {
        Some(rgba) => {
            debug!("EOF before {target:.3}s in {}; using last frame", clip.path.display());
            Ok(to_video_frame(&rgba, timestamp, out_w, out_h))
        }
        None => Err(anyhow!("no frame found at {target:.3}s")),
    }
}

fn to_video_frame(rgba: &Video, timestamp: f64, width: u32, height: u32) -> VideoFrame {
    VideoFrame { timestamp, width, height, data: packed_rgba(rgba, width, height) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pattern_clip, pattern_luma, SIZE};

    /// Mean of the red channel; the pattern is grey, so this tracks luma.
    fn mean_red(frame: &VideoFrame) -> f64 {
        let reds: Vec<f64> = frame.data.chunks_exact(4).map(|px| px[0] as f64).collect();
        reds.iter().sum::<f64>() / reds.len() as f64
    }

    #[test]
    fn decodes_at_probed_size() {
        let dir   = tempfile::tempdir().unwrap();
        let clip  = pattern_clip(&dir.path().join("pattern.mp4"), 4.0, false);
        let frame = decode_frame(&clip, 2.0).unwrap();

        assert_eq!((frame.width, frame.height), SIZE);
        assert_eq!(frame.data.len(), (SIZE.0 * SIZE.1 * 4) as usize);
        assert_eq!(frame.timestamp, 2.0);
    }

    #[test]
    fn seek_lands_near_requested_time() {
        let dir  = tempfile::tempdir().unwrap();
        let clip = pattern_clip(&dir.path().join("pattern.mp4"), 4.0, false);

        let early = mean_red(&decode_frame(&clip, 0.5).unwrap());
        let late  = mean_red(&decode_frame(&clip, 3.5).unwrap());
        // Luma 16..216 maps to roughly 0..255 in RGB; leave room for rounding.
        assert!(late > early + 100.0, "early {early:.1}, late {late:.1}");
        assert!(pattern_luma(3.5, 4.0) > pattern_luma(0.5, 4.0));
    }

    #[test]
    fn subclip_times_are_relative_to_its_start() {
        let dir  = tempfile::tempdir().unwrap();
        let clip = pattern_clip(&dir.path().join("pattern.mp4"), 4.0, false);
        let sub  = clip.subclip(2.5, 3.5, 1.0).unwrap();

        let from_sub  = mean_red(&decode_frame(&sub, 0.2).unwrap());
        let from_full = mean_red(&decode_frame(&clip, 2.7).unwrap());
        assert!((from_sub - from_full).abs() < 8.0, "{from_sub:.1} vs {from_full:.1}");
    }

    #[test]
    fn last_frame_is_returned_at_the_end() {
        let dir   = tempfile::tempdir().unwrap();
        let clip  = pattern_clip(&dir.path().join("pattern.mp4"), 2.0, false);
        let frame = decode_frame(&clip, clip.duration - 0.001).unwrap();
        assert_eq!((frame.width, frame.height), SIZE);
    }
}
