// crates/snipcut-core/src/lib.rs
//
// The preview/playback engine. No egui, no ffmpeg: media access goes through
// the MediaBackend trait (implemented in snipcut-media) and every display
// update goes through PreviewSurface (implemented in snipcut-ui).

pub mod backend;
pub mod config;
pub mod debounce;
pub mod editor;
pub mod error;
pub mod export;
pub mod helpers;
pub mod media_types;
pub mod playback;
pub mod range;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AudioPlayback, MediaBackend, PreviewSurface};
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{EditorError, Result};
pub use media_types::{DisplayImage, ExportEvent, VideoFrame, PREVIEW_SIZE};
pub use state::Selection;
