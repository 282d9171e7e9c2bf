// crates/snipcut-core/src/playback.rs
//
// PlaybackController: Idle → Playing → Idle.
//
// `play` spawns one worker thread per session. The worker extracts the
// selected range's audio to a temp WAV, starts the audio player, then steps a
// cursor across the range rendering one frame per step. Audio and frames run
// independently once started; nothing re-syncs them.
//
// Each session owns its own AtomicBool. `stop` clears the current one and the
// worker sees it at the top of its next iteration, terminates the audio
// player and exits. A frame already being decoded finishes first.
//
// Whichever way the loop exits, the temp WAV is deleted and the session's
// flag cleared. `play` never blocks on a stopping worker: the new worker is
// handed the old handle and joins it before writing its own WAV, so there is
// never more than one temp WAV.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::backend::{MediaBackend, PreviewSurface};
use crate::error::Result;
use crate::helpers::paths::preview_audio_path;
use crate::session::{LoadedClip, Session};

/// Tolerance when comparing the cursor against the range end, so `start + n*step`
/// landing a hair under `end` does not produce one extra frame.
const STEP_EPSILON: f64 = 1e-9;

/// How the cursor advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Fixed increments per iteration, as fast as frames decode. Audio runs
    /// in real time, so long ranges drift.
    FixedStep,
    /// Cursor derived from elapsed wall-clock time since playback began; the
    /// loop sleeps to the next step boundary between frames.
    WallClock,
}

#[derive(Clone, Debug)]
pub struct PlaybackOptions {
    /// Seconds of media per iteration.
    pub step:       f64,
    pub pacing:     Pacing,
    /// Where the session's audio segment is written.
    pub audio_path: PathBuf,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self { step: 0.1, pacing: Pacing::FixedStep, audio_path: preview_audio_path() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// A session is already running (or the flag is still set from a play
    /// pressed with nothing loaded).
    AlreadyPlaying,
    /// The flag is now set but there is nothing to play.
    NoClip,
    /// The committed selection has zero length.
    EmptyRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LoopReport {
    frames:    usize,
    cancelled: bool,
}

pub struct PlaybackController<B: MediaBackend, S: PreviewSurface> {
    session: Arc<Session<B, S>>,
    options: PlaybackOptions,
    /// Flag of the newest session. A stopping worker only ever clears its own.
    playing: Mutex<Arc<AtomicBool>>,
    worker:  Mutex<Option<JoinHandle<()>>>,
}

impl<B: MediaBackend, S: PreviewSurface> PlaybackController<B, S> {
    pub fn new(session: Arc<Session<B, S>>, options: PlaybackOptions) -> Self {
        Self {
            session,
            options,
            playing: Mutex::new(Arc::new(AtomicBool::new(false))),
            worker:  Mutex::new(None),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.lock().load(Ordering::SeqCst)
    }

    /// Start playing the committed selection. Returns without waiting for a
    /// previous, stopping session to wind down.
    ///
    /// The playing flag is raised before the clip is checked: pressing play
    /// with nothing loaded leaves it set until `stop`.
    pub fn play(&self) -> Result<PlayOutcome> {
        let mut worker  = self.worker.lock();
        let mut current = self.playing.lock();
        if current.load(Ordering::SeqCst) {
            return Ok(PlayOutcome::AlreadyPlaying);
        }

        let playing = Arc::new(AtomicBool::new(true));
        *current = Arc::clone(&playing);
        drop(current);

        let Some(loaded) = self.session.current_clip() else {
            debug!("play pressed with no clip loaded");
            return Ok(PlayOutcome::NoClip);
        };

        let (start, end) = self.session.committed_selection().to_seconds(loaded.duration);
        if end - start <= STEP_EPSILON {
            warn!("play ignored: empty selection at {start:.3}s");
            playing.store(false, Ordering::SeqCst);
            return Ok(PlayOutcome::EmptyRange);
        }

        let job = PlaybackLoop {
            session:  Arc::clone(&self.session),
            playing:  Arc::clone(&playing),
            options:  self.options.clone(),
            previous: worker.take(),
            loaded,
            start,
            end,
        };

        match thread::Builder::new()
            .name("snipcut-playback".into())
            .spawn(move || job.run())
        {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(PlayOutcome::Started)
            }
            Err(e) => {
                playing.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Request the running loop to stop at its next iteration. No-op when idle.
    pub fn stop(&self) {
        if self.playing.lock().swap(false, Ordering::SeqCst) {
            debug!("stop requested");
        }
    }

    /// Block until the current worker (and any it was still waiting on) has
    /// exited.
    pub fn wait(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl<B: MediaBackend, S: PreviewSurface> Drop for PlaybackController<B, S> {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct PlaybackLoop<B: MediaBackend, S: PreviewSurface> {
    session:  Arc<Session<B, S>>,
    playing:  Arc<AtomicBool>,
    options:  PlaybackOptions,
    /// Worker of the session this one replaced, possibly still stopping.
    previous: Option<JoinHandle<()>>,
    loaded:   LoadedClip<B::Clip>,
    start:    f64,
    end:      f64,
}

impl<B: MediaBackend, S: PreviewSurface> PlaybackLoop<B, S> {
    fn run(mut self) {
        // The previous worker deletes the shared WAV on its way out.
        if let Some(prev) = self.previous.take() {
            let _ = prev.join();
        }
        info!("playback {:.2}s → {:.2}s ({})", self.start, self.end, self.loaded.path.display());

        match self.play_range() {
            Ok(report) if report.cancelled => info!("playback stopped after {} frames", report.frames),
            Ok(report)                     => info!("playback finished, {} frames", report.frames),
            Err(e)                         => error!("playback aborted: {e}"),
        }

        remove_artifact(&self.options.audio_path);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn play_range(&self) -> Result<LoopReport> {
        let backend = &self.session.backend;
        let audio   = &self.options.audio_path;

        let mut player = if backend.has_audio(&self.loaded.clip) {
            backend.extract_audio(&self.loaded.clip, self.start, self.end, audio)?;
            Some(backend.play_audio(audio)?)
        } else {
            debug!("{} has no audio; playing frames only", self.loaded.path.display());
            None
        };

        let began  = Instant::now();
        let mut n: u64 = 0;
        let mut frames = 0;

        loop {
            let cursor = match self.options.pacing {
                Pacing::FixedStep => self.start + n as f64 * self.options.step,
                Pacing::WallClock => self.start + began.elapsed().as_secs_f64(),
            };
            if cursor >= self.end - STEP_EPSILON {
                break;
            }
            if !self.playing.load(Ordering::SeqCst) {
                if let Some(player) = player.as_mut() {
                    player.terminate();
                }
                return Ok(LoopReport { frames, cancelled: true });
            }

            self.session.show_clip_frame(&self.loaded, cursor);
            frames += 1;
            n += 1;

            if self.options.pacing == Pacing::WallClock {
                let due = began + Duration::from_secs_f64(n as f64 * self.options.step);
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }
        }

        Ok(LoopReport { frames, cancelled: false })
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Selection;
    use crate::testing::{FakeBackend, RecordingSurface};
    use crossbeam_channel::bounded;

    struct Rig {
        controller: PlaybackController<FakeBackend, RecordingSurface>,
        session:    Arc<Session<FakeBackend, RecordingSurface>>,
        audio:      PathBuf,
        _dir:       tempfile::TempDir,
    }

    fn rig(duration: f64, pacing: Pacing) -> Rig {
        let dir     = tempfile::tempdir().unwrap();
        let audio   = dir.path().join("preview.wav");
        let session = Arc::new(Session::new(
            Arc::new(FakeBackend::new(duration)),
            Arc::new(RecordingSurface::default()),
        ));
        let controller = PlaybackController::new(
            Arc::clone(&session),
            PlaybackOptions { step: 0.1, pacing, audio_path: audio.clone() },
        );
        Rig { controller, session, audio, _dir: dir }
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let r = rig(1.0, Pacing::FixedStep);
        r.controller.stop();
        r.controller.stop();
        assert!(!r.controller.is_playing());
    }

    #[test]
    fn play_without_clip_raises_flag_until_stop() {
        let r = rig(1.0, Pacing::FixedStep);
        assert_eq!(r.controller.play().unwrap(), PlayOutcome::NoClip);
        assert!(r.controller.is_playing());
        assert_eq!(r.controller.play().unwrap(), PlayOutcome::AlreadyPlaying);

        r.controller.stop();
        assert!(!r.controller.is_playing());
        assert!(r.session.surface.current_times().is_empty());
    }

    #[test]
    fn loop_renders_each_step_then_cleans_up() {
        let r = rig(1.0, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();

        assert_eq!(r.controller.play().unwrap(), PlayOutcome::Started);
        r.controller.wait();

        let times = r.session.surface.current_times();
        assert_eq!(times.len(), 10);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!((times[9] - 0.9).abs() < 1e-9);

        assert!(!r.controller.is_playing());
        assert!(!r.audio.exists());
        assert_eq!(r.session.backend.audio_started(), 1);
        assert_eq!(r.session.backend.audio_terminated(), 0);
    }

    #[test]
    fn loop_covers_committed_selection_only() {
        let r = rig(10.0, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();
        r.session.commit_selection(Selection::new(0.2, 0.25));

        r.controller.play().unwrap();
        r.controller.wait();

        let times = r.session.surface.current_times();
        assert_eq!(times.len(), 5);
        assert!((times[0] - 2.0).abs() < 1e-9);
        assert!(times.iter().all(|t| *t >= 2.0 && *t < 2.5));
        assert_eq!(r.session.backend.extracted(), vec![(2.0, 2.5)]);
    }

    #[test]
    fn stop_mid_loop_halts_after_in_flight_frame() {
        let r = rig(1.0, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();

        let (entered_tx, entered_rx) = bounded(16);
        let (release_tx, release_rx) = bounded(16);
        r.session.backend.set_gate(entered_tx, release_rx);

        r.controller.play().unwrap();
        let first = entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, 0.0);
        assert!(r.audio.exists());

        r.controller.stop();
        release_tx.send(()).unwrap();
        r.controller.wait();

        assert_eq!(r.session.backend.decoded(), vec![0.0]);
        assert_eq!(r.session.backend.audio_terminated(), 1);
        assert!(!r.audio.exists());
        assert!(!r.controller.is_playing());
    }

    #[test]
    fn play_after_stop_starts_fresh_session() {
        let r = rig(0.5, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();

        r.controller.play().unwrap();
        r.controller.stop();
        assert_eq!(r.controller.play().unwrap(), PlayOutcome::Started);
        r.controller.wait();

        assert_eq!(r.session.backend.audio_started(), 2);
        assert!(!r.audio.exists());
    }

    #[test]
    fn play_returns_while_previous_session_winds_down() {
        let r = rig(0.3, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();

        let (entered_tx, entered_rx) = bounded(16);
        let (release_tx, release_rx) = bounded(16);
        r.session.backend.set_gate(entered_tx, release_rx);

        r.controller.play().unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        r.controller.stop();

        // The first worker is still held inside its frame decode.
        let began = Instant::now();
        assert_eq!(r.controller.play().unwrap(), PlayOutcome::Started);
        assert!(began.elapsed() < Duration::from_secs(1), "play blocked for {:?}", began.elapsed());
        assert!(r.controller.is_playing());
        assert_eq!(r.session.backend.audio_started(), 1);

        for _ in 0..4 {
            release_tx.send(()).unwrap();
        }
        r.controller.wait();

        assert_eq!(r.session.backend.decoded(), vec![0.0, 0.0, 0.1, 0.2]);
        assert_eq!(r.session.backend.audio_started(), 2);
        assert_eq!(r.session.backend.audio_terminated(), 1);
        assert!(!r.controller.is_playing());
        assert!(!r.audio.exists());
    }

    #[test]
    fn clip_without_audio_plays_frames_only() {
        let r = rig(0.5, Pacing::FixedStep);
        r.session.backend.without_audio();
        r.session.load(Path::new("/v/mute.mp4")).unwrap();

        assert_eq!(r.controller.play().unwrap(), PlayOutcome::Started);
        r.controller.wait();

        assert_eq!(r.session.surface.current_times().len(), 5);
        assert!(r.session.backend.extracted().is_empty());
        assert_eq!(r.session.backend.audio_started(), 0);
        assert!(!r.controller.is_playing());
        assert!(!r.audio.exists());
    }

    #[test]
    fn empty_selection_does_not_start() {
        let r = rig(10.0, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();
        r.session.commit_selection(Selection::new(0.4, 0.4));

        assert_eq!(r.controller.play().unwrap(), PlayOutcome::EmptyRange);
        assert!(!r.controller.is_playing());
        assert_eq!(r.session.backend.audio_started(), 0);
    }

    #[test]
    fn failed_extraction_resets_flag() {
        let r = rig(1.0, Pacing::FixedStep);
        r.session.load(Path::new("/v/a.mp4")).unwrap();
        r.session.backend.fail_extraction(true);

        r.controller.play().unwrap();
        r.controller.wait();

        assert!(!r.controller.is_playing());
        assert!(r.session.surface.current_times().is_empty());
        assert!(!r.audio.exists());
    }

    #[test]
    fn wall_clock_pacing_tracks_real_time() {
        let r = rig(0.3, Pacing::WallClock);
        r.session.load(Path::new("/v/a.mp4")).unwrap();

        let began = Instant::now();
        r.controller.play().unwrap();
        r.controller.wait();

        assert!(began.elapsed() >= Duration::from_millis(250));
        let frames = r.session.surface.current_times().len();
        assert!((1..=4).contains(&frames), "{frames} frames");
    }
}
