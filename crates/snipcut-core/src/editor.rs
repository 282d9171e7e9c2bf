// crates/snipcut-core/src/editor.rs
//
// Editor: the one object the UI talks to. Wires the session, range selector,
// seek debouncer, playback controller and export channel together.
//
// Loading is synchronous: `process_selected_file` probes the file and decodes
// the first preview frame on the caller's thread. Every other entry point
// returns quickly; decoding happens on the debounce worker (seek-preview), the
// playback worker, or an export thread.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{MediaBackend, PreviewSurface};
use crate::config::EditorConfig;
use crate::debounce::Debouncer;
use crate::error::{EditorError, Result};
use crate::export::{spawn_export, ExportRequest};
use crate::helpers::paths::preview_audio_path;
use crate::media_types::ExportEvent;
use crate::playback::{PlayOutcome, PlaybackController, PlaybackOptions};
use crate::range::RangeSelector;
use crate::session::Session;
use crate::state::Selection;

pub struct Editor<B: MediaBackend, S: PreviewSurface> {
    session:    Arc<Session<B, S>>,
    selector:   Mutex<RangeSelector>,
    /// Last slider position, committed or not. Re-applied when a clip loads.
    requested:  Mutex<Selection>,
    seek:       Debouncer<f64>,
    playback:   PlaybackController<B, S>,
    suffix:     String,
    export_tx:  Sender<ExportEvent>,
    export_rx:  Receiver<ExportEvent>,
    export_job: Mutex<Option<JoinHandle<()>>>,
}

impl<B: MediaBackend, S: PreviewSurface> Editor<B, S> {
    pub fn new(backend: Arc<B>, surface: Arc<S>, config: &EditorConfig) -> Self {
        let options = PlaybackOptions {
            step:       config.playback_step,
            pacing:     config.pacing,
            audio_path: preview_audio_path(),
        };
        Self::with_playback(backend, surface, config, options)
    }

    pub fn with_playback(
        backend: Arc<B>,
        surface: Arc<S>,
        config:  &EditorConfig,
        options: PlaybackOptions,
    ) -> Self {
        let session = Arc::new(Session::new(backend, surface));

        let seek_session = Arc::clone(&session);
        let seek = Debouncer::new("seek", config.seek_debounce, move |ts: f64| {
            debug!("seek-preview {ts:.3}s");
            seek_session.show_frame(ts);
        });

        let playback = PlaybackController::new(Arc::clone(&session), options);
        let (export_tx, export_rx) = unbounded();

        Self {
            session,
            selector:   Mutex::new(RangeSelector::new()),
            requested:  Mutex::new(Selection::FULL),
            seek,
            playback,
            suffix:     config.new_file_name.clone(),
            export_tx,
            export_rx,
            export_job: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<Session<B, S>> { &self.session }

    pub fn is_playing(&self) -> bool { self.playback.is_playing() }

    /// Load `path` (from the file dialog or a drop). On success the held
    /// slider position is re-applied to the new duration and the frame at
    /// the range start is shown right away. On failure nothing changes.
    pub fn process_selected_file(&self, path: &Path) -> Result<()> {
        let loaded = match self.session.load(path) {
            Ok(l) => l,
            Err(e) => {
                warn!("{e}");
                return Err(e);
            }
        };
        info!("loaded {} ({:.2}s)", path.display(), loaded.duration);
        self.session.surface.set_clip_name(path);

        let requested = *self.requested.lock();
        let update    = self.selector.lock().update(requested, loaded.duration);
        self.session.commit_selection(requested);
        self.session.surface.set_range(update.video_start, update.video_end);

        // A pending seek belongs to the previous clip.
        self.seek.cancel();
        self.session.show_frame(update.video_start);
        Ok(())
    }

    /// Slider moved. Labels update now; the preview seek is debounced.
    pub fn on_drag_update(&self, selection: Selection) {
        *self.requested.lock() = selection;

        let Some(loaded) = self.session.current_clip() else {
            return;
        };

        let update = self.selector.lock().update(selection, loaded.duration);
        self.session.commit_selection(selection);
        self.session.surface.set_range(update.video_start, update.video_end);
        self.seek.request(update.seek_target);
    }

    pub fn play(&self) -> Result<PlayOutcome> {
        let outcome = self.playback.play()?;
        match outcome {
            PlayOutcome::Started        => {}
            PlayOutcome::AlreadyPlaying => debug!("play ignored: already playing"),
            PlayOutcome::NoClip         => warn!("play pressed with no video loaded"),
            PlayOutcome::EmptyRange     => warn!("play ignored: empty selection"),
        }
        Ok(outcome)
    }

    pub fn stop(&self) {
        self.playback.stop();
    }

    /// Validate and start an export of the committed selection. Returns the
    /// job id; the outcome arrives later through `poll_export`.
    pub fn export(&self, volume_text: &str) -> Result<Uuid> {
        let mut job = self.export_job.lock();
        if job.as_ref().is_some_and(|h| !h.is_finished()) {
            let e = EditorError::Encode("an export is already running".into());
            warn!("{e}");
            return Err(e);
        }

        let loaded = self.session.current_clip();
        let req = ExportRequest::prepare(
            loaded.as_ref(),
            self.session.committed_selection(),
            volume_text,
            &self.suffix,
        )
        .inspect_err(|e| warn!("export rejected: {e}"))?;

        let job_id = req.job_id;
        if let Some(prev) = job.take() {
            let _ = prev.join();
        }
        *job = Some(spawn_export(Arc::clone(&self.session.backend), req, self.export_tx.clone())?);
        Ok(job_id)
    }

    /// Drain finished export events. Call once per UI frame.
    pub fn poll_export(&self) -> Vec<ExportEvent> {
        self.export_rx.try_iter().collect()
    }

    /// Stop playback and wait for background work to finish.
    pub fn shutdown(&self) {
        self.seek.cancel();
        self.playback.stop();
        self.playback.wait();
        if let Some(job) = self.export_job.lock().take() {
            info!("waiting for export to finish");
            let _ = job.join();
        }
    }
}
