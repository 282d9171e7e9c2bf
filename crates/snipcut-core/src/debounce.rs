// crates/snipcut-core/src/debounce.rs
//
// Debouncer<T>: a latest-wins request slot with a deadline.
//
// `request` overwrites whatever is pending and re-arms the deadline. One
// worker thread sleeps on the condvar until the slot's deadline passes with
// no replacement, then takes the value and runs the handler. A burst of
// drag events therefore costs one decode, issued once the drag pauses.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct Pending<T> {
    request:  Option<(T, Instant)>,
    shutdown: bool,
}

struct Slot<T> {
    pending: Mutex<Pending<T>>,
    cvar:    Condvar,
}

pub struct Debouncer<T: Send + 'static> {
    slot:   Arc<Slot<T>>,
    delay:  Duration,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(name: &str, delay: Duration, mut handler: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let slot = Arc::new(Slot {
            pending: Mutex::new(Pending { request: None, shutdown: false }),
            cvar:    Condvar::new(),
        });

        let worker_slot = Arc::clone(&slot);
        let worker = thread::Builder::new()
            .name(format!("debounce-{name}"))
            .spawn(move || loop {
                let value = {
                    let mut guard = worker_slot.pending.lock();
                    loop {
                        if guard.shutdown { return; }
                        match guard.request.as_ref().map(|(_, due)| *due) {
                            None => { worker_slot.cvar.wait(&mut guard); }
                            Some(due) if Instant::now() >= due => {
                                // Deadline passed with no replacement: fire.
                                if let Some((v, _)) = guard.request.take() { break v; }
                            }
                            Some(due) => {
                                // Woken early either by a replacement (new
                                // deadline, re-checked next turn) or spuriously.
                                let _ = worker_slot.cvar.wait_until(&mut guard, due);
                            }
                        }
                    }
                };
                handler(value);
            })
            .ok();

        if worker.is_none() {
            tracing::error!("failed to spawn debounce worker '{name}'");
        }

        Self { slot, delay, worker }
    }

    /// Replace any pending request with `value`, due one delay from now.
    pub fn request(&self, value: T) {
        let mut guard = self.slot.pending.lock();
        guard.request = Some((value, Instant::now() + self.delay));
        self.slot.cvar.notify_one();
    }

    /// Drop the pending request, if any, without running it.
    pub fn cancel(&self) {
        self.slot.pending.lock().request = None;
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        {
            let mut guard = self.slot.pending.lock();
            guard.shutdown = true;
            guard.request  = None;
            self.slot.cvar.notify_one();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
