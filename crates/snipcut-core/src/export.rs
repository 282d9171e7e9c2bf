// crates/snipcut-core/src/export.rs
//
// ExportJob: validate on the caller's thread, encode on a background thread.
//
// Everything that can be rejected without touching the disk (no clip, bad
// volume, empty range) is rejected by `ExportRequest::prepare`, so a job that
// reaches `spawn` only fails on subclip or encode errors. Those are logged and
// published as ExportEvent::Failed; success publishes ExportEvent::Done.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{error, info};
use uuid::Uuid;

use crate::backend::MediaBackend;
use crate::error::{EditorError, Result};
use crate::helpers::paths::export_path;
use crate::media_types::ExportEvent;
use crate::session::LoadedClip;
use crate::state::Selection;

/// Parse the volume field (a percentage) into a gain factor.
///
/// ```
/// use snipcut_core::export::parse_volume;
/// assert_eq!(parse_volume("50").unwrap(), 0.5);
/// assert_eq!(parse_volume(" 150 ").unwrap(), 1.5);
/// assert!(parse_volume("loud").is_err());
/// ```
pub fn parse_volume(text: &str) -> Result<f64> {
    let percent: f64 = text.trim().parse()
        .map_err(|_| EditorError::InvalidVolume(text.to_string()))?;
    if !percent.is_finite() || percent < 0.0 {
        return Err(EditorError::InvalidVolume(text.to_string()));
    }
    Ok(percent / 100.0)
}

/// A validated export, ready to run.
pub struct ExportRequest<C> {
    pub job_id:        Uuid,
    pub clip:          Arc<C>,
    pub start:         f64,
    pub end:           f64,
    pub volume_factor: f64,
    pub output:        PathBuf,
}

impl<C> ExportRequest<C> {
    pub fn prepare(
        loaded:      Option<&LoadedClip<C>>,
        selection:   Selection,
        volume_text: &str,
        suffix:      &str,
    ) -> Result<Self> {
        let loaded        = loaded.ok_or(EditorError::NoClip)?;
        let volume_factor = parse_volume(volume_text)?;

        let (start, end) = selection.to_seconds(loaded.duration);
        if end <= start {
            return Err(EditorError::Encode(format!("empty range at {start:.2}s")));
        }

        Ok(Self {
            job_id: Uuid::new_v4(),
            clip:   Arc::clone(&loaded.clip),
            start,
            end,
            volume_factor,
            output: export_path(&loaded.path, suffix),
        })
    }
}

/// Derive the trimmed, gain-scaled clip and write it. Blocking.
pub fn run_export<B: MediaBackend>(backend: &B, req: &ExportRequest<B::Clip>) -> Result<PathBuf> {
    let sub = backend.subclip_and_scale(&req.clip, req.start, req.end, req.volume_factor)?;
    backend.write_to_file(&sub, &req.output)?;
    Ok(req.output.clone())
}

/// Run `req` on its own thread, publishing the outcome on `tx`.
pub fn spawn_export<B: MediaBackend>(
    backend: Arc<B>,
    req:     ExportRequest<B::Clip>,
    tx:      Sender<ExportEvent>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(format!("snipcut-export-{}", req.job_id))
        .spawn(move || {
            info!(
                "export {}: {:.2}s → {:.2}s at {:.0}% → {}",
                req.job_id, req.start, req.end, req.volume_factor * 100.0, req.output.display()
            );
            let event = match run_export(backend.as_ref(), &req) {
                Ok(path) => {
                    info!("export {} done: {}", req.job_id, path.display());
                    ExportEvent::Done { job_id: req.job_id, path }
                }
                Err(e) => {
                    error!("export {} failed: {e}", req.job_id);
                    ExportEvent::Failed { job_id: req.job_id, msg: e.to_string() }
                }
            };
            let _ = tx.send(event);
        })?;
    Ok(handle)
}
