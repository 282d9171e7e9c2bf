// crates/snipcut-media/src/player.rs
//
// AudioPlayer: plays one WAV segment on a dedicated thread.
//
// The thread owns the rodio OutputStream and Sink for their whole lifetime,
// so nothing audio-related crosses threads. The WAV is read into memory
// before the thread starts, which lets the caller delete the file while the
// audio is still playing.
//
// The control channel decides how the thread ends:
//   Stop received      → sink stopped immediately
//   sender dropped     → audio plays out to its end
//   sink drained       → thread exits on its own

use std::io::Cursor;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStreamBuilder, Sink};
use tracing::debug;

use snipcut_core::AudioPlayback;

/// How often the audio thread checks whether the sink has drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on waiting for the output device to open.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AudioPlayer {
    stop:   Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AudioPlayer {
    /// Start playing the WAV at `path`. Returns once the output device is open
    /// and the sink is playing.
    pub fn start(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read '{}'", path.display()))?;

        let (stop_tx, stop_rx)   = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);

        let handle = thread::Builder::new()
            .name("snipcut-audio".into())
            .spawn(move || run_player(bytes, stop_rx, ready_tx))?;

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(())) => Ok(Self { stop: Some(stop_tx), handle: Some(handle) }),
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(anyhow!(msg))
            }
            Err(_) => Err(anyhow!("audio output did not start")),
        }
    }
}

impl AudioPlayback for AudioPlayer {
    fn terminate(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        // Dropping the sender lets the audio thread play out; the handle is
        // detached.
        self.stop.take();
    }
}

fn run_player(bytes: Vec<u8>, stop: Receiver<()>, ready: Sender<Result<(), String>>) {
    let stream = match OutputStreamBuilder::open_default_stream() {
        Ok(s)  => s,
        Err(e) => {
            let _ = ready.send(Err(format!("open audio output: {e}")));
            return;
        }
    };
    let source = match Decoder::new(Cursor::new(bytes)) {
        Ok(d)  => d,
        Err(e) => {
            let _ = ready.send(Err(format!("decode WAV: {e}")));
            return;
        }
    };

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.play();
    let _ = ready.send(Ok(()));
    debug!("audio playing");

    loop {
        match stop.recv_timeout(POLL_INTERVAL) {
            Ok(()) => {
                sink.stop();
                debug!("audio terminated");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if sink.empty() {
                    debug!("audio finished");
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                sink.sleep_until_end();
                debug!("audio played out");
                break;
            }
        }
    }

    drop(sink);
    drop(stream);
}
