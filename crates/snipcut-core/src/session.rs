// crates/snipcut-core/src/session.rs
//
// Session owns everything the worker threads share: the backend, the
// display surface, the loaded clip and the committed selection. It replaces
// global editor state with one handle passed by Arc.
//
// Locking:
//   clip     : RwLock, swapped whole on load; readers clone the Arc out.
//   selection: Mutex, written only by the range selector commit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::backend::{MediaBackend, PreviewSurface};
use crate::error::Result;
use crate::helpers::time::clamp_timestamp;
use crate::media_types::PREVIEW_SIZE;
use crate::state::Selection;

/// A clip that opened successfully, plus what the engine needs to know about it.
pub struct LoadedClip<C> {
    pub clip:     Arc<C>,
    pub path:     PathBuf,
    pub duration: f64,
}

impl<C> Clone for LoadedClip<C> {
    fn clone(&self) -> Self {
        Self { clip: Arc::clone(&self.clip), path: self.path.clone(), duration: self.duration }
    }
}

pub struct Session<B: MediaBackend, S: PreviewSurface> {
    pub backend: Arc<B>,
    pub surface: Arc<S>,
    clip:        RwLock<Option<LoadedClip<B::Clip>>>,
    selection:   Mutex<Selection>,
}

impl<B: MediaBackend, S: PreviewSurface> Session<B, S> {
    pub fn new(backend: Arc<B>, surface: Arc<S>) -> Self {
        Self {
            backend,
            surface,
            clip:      RwLock::new(None),
            selection: Mutex::new(Selection::FULL),
        }
    }

    pub fn current_clip(&self) -> Option<LoadedClip<B::Clip>> {
        self.clip.read().clone()
    }

    pub fn has_clip(&self) -> bool {
        self.clip.read().is_some()
    }

    /// Open `path` and, on success, replace the loaded clip. On failure the
    /// previous clip (if any) stays loaded.
    pub fn load(&self, path: &Path) -> Result<LoadedClip<B::Clip>> {
        let clip     = self.backend.open(path)?;
        let duration = self.backend.duration(&clip);
        let loaded   = LoadedClip { clip: Arc::new(clip), path: path.to_path_buf(), duration };
        *self.clip.write() = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn committed_selection(&self) -> Selection {
        *self.selection.lock()
    }

    pub fn commit_selection(&self, selection: Selection) {
        *self.selection.lock() = selection;
    }

    /// Seek-preview: label the timestamp, then decode and present the frame
    /// there if a clip is loaded.
    pub fn show_frame(&self, timestamp: f64) {
        match self.current_clip() {
            Some(loaded) => self.show_clip_frame(&loaded, timestamp),
            None         => self.surface.set_current_time(timestamp),
        }
    }

    /// Label, decode, render and present the frame of `loaded` at
    /// `timestamp`. Errors are logged, never raised; the previous frame stays
    /// on screen.
    pub fn show_clip_frame(&self, loaded: &LoadedClip<B::Clip>, timestamp: f64) {
        self.surface.set_current_time(timestamp);
        let ts = clamp_timestamp(timestamp, loaded.duration);

        let image = self.backend.get_frame(&loaded.clip, ts)
            .and_then(|frame| self.backend.render(&frame, PREVIEW_SIZE));
        match image {
            Ok(image) => {
                debug!("frame {ts:.3}s → {}x{}", image.width, image.height);
                self.surface.present(image);
            }
            Err(e) => warn!("preview at {ts:.3}s failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, RecordingSurface};

    fn session() -> Session<FakeBackend, RecordingSurface> {
        Session::new(Arc::new(FakeBackend::new(10.0)), Arc::new(RecordingSurface::default()))
    }

    #[test]
    fn show_frame_without_clip_only_labels() {
        let s = session();
        s.show_frame(3.0);
        assert_eq!(s.surface.current_times(), vec![3.0]);
        assert!(s.surface.presented().is_empty());
    }

    #[test]
    fn show_frame_clamps_into_clip() {
        let s = session();
        s.load(Path::new("/v/a.mp4")).unwrap();
        s.show_frame(42.0);
        let decoded = s.backend.decoded();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0] < 10.0);
        assert_eq!(s.surface.presented(), vec![PREVIEW_SIZE]);
    }

    #[test]
    fn failed_load_keeps_previous_clip() {
        let s = session();
        s.load(Path::new("/v/a.mp4")).unwrap();
        assert!(s.load(Path::new("/v/broken.mp4")).is_err());
        assert_eq!(s.current_clip().unwrap().path, PathBuf::from("/v/a.mp4"));
    }
}
