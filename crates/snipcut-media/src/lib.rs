// crates/snipcut-media/src/lib.rs
//
// ffmpeg-backed media access for the editor. No egui dependency; the engine
// reaches everything here through `FfmpegBackend`, its MediaBackend impl.
//
// Modules return anyhow errors internally; backend.rs maps them onto
// EditorError at the trait boundary.

pub mod audio;
pub mod backend;
pub mod decode;
pub mod encode;
pub mod player;
pub mod render;
pub mod source;

mod helpers;
#[cfg(test)]
mod testing;

pub use backend::FfmpegBackend;
pub use source::Clip;
