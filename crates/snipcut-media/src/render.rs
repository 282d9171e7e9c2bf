// crates/snipcut-media/src/render.rs
//
// Renderer: scale a decoded RGBA frame to the preview surface size. Stateless;
// each call builds its own swscale context.

use anyhow::{bail, Result};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as SwsContext, flag::Flags};
use ffmpeg::util::frame::video::Video;

use snipcut_core::{DisplayImage, VideoFrame};

use crate::helpers::pixels::{fill_rgba, packed_rgba};

pub fn render_rgba(frame: &VideoFrame, (out_w, out_h): (u32, u32)) -> Result<DisplayImage> {
    let (w, h) = (frame.width, frame.height);
    if w == 0 || h == 0 || out_w == 0 || out_h == 0 {
        bail!("cannot scale {w}x{h} to {out_w}x{out_h}");
    }
    if frame.data.len() != w as usize * h as usize * 4 {
        bail!("frame data is {} bytes, expected {}x{} RGBA", frame.data.len(), w, h);
    }

    if (w, h) == (out_w, out_h) {
        return Ok(DisplayImage { width: w, height: h, data: frame.data.clone() });
    }

    let mut src = Video::new(Pixel::RGBA, w, h);
    fill_rgba(&mut src, &frame.data, w, h);

    let mut scaler = SwsContext::get(
        Pixel::RGBA, w,     h,
        Pixel::RGBA, out_w, out_h,
        Flags::BILINEAR,
    )?;
    let mut dst = Video::empty();
    scaler.run(&src, &mut dst)?;

    Ok(DisplayImage { width: out_w, height: out_h, data: packed_rgba(&dst, out_w, out_h) })
}
