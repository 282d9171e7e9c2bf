// crates/snipcut-core/src/helpers/paths.rs
// Where exports and the preview audio artifact land.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File name of the per-session preview audio, written to the working directory.
pub const PREVIEW_AUDIO_NAME: &str = "snipcut_preview.wav";

/// `<input without extension><suffix>`, e.g. `clip.mp4` + `_edited.mp4`
/// gives `clip_edited.mp4` next to the input.
pub fn export_path(input: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = input.with_extension("").into_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Default location of the preview audio artifact.
pub fn preview_audio_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(PREVIEW_AUDIO_NAME)
}
