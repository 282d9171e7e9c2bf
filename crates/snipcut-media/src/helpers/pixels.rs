// crates/snipcut-media/src/helpers/pixels.rs
//
// Stride handling for packed RGBA frames. ffmpeg pads each row to its
// alignment; the rest of the app wants tightly packed `w * 4` rows.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::util::frame::video::Video;

/// Copy the visible pixels of plane 0 out of `frame`, dropping stride padding.
pub fn packed_rgba(frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride    = frame.stride(0);
    let raw       = frame.data(0);
    let row_bytes = width as usize * 4;
    let mut out   = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        out.extend_from_slice(&raw[start..start + row_bytes]);
    }
    out
}

/// Copy tightly packed RGBA rows into plane 0 of `frame`, honouring its stride.
pub fn fill_rgba(frame: &mut Video, data: &[u8], width: u32, height: u32) {
    let stride    = frame.stride(0);
    let row_bytes = width as usize * 4;
    let dst       = frame.data_mut(0);
    for (row, src) in data.chunks_exact(row_bytes).take(height as usize).enumerate() {
        let start = row * stride;
        dst[start..start + row_bytes].copy_from_slice(src);
    }
}
