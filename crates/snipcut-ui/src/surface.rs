// src/surface.rs
//
// EguiSurface: the engine's PreviewSurface. Worker threads only store the
// newest image and label text under a lock and ask egui for a repaint; the
// UI thread picks them up in `update` and owns the single preview texture.

use std::path::Path;

use eframe::egui;
use parking_lot::Mutex;

use snipcut_core::helpers::time::{current_label, end_label, start_label};
use snipcut_core::{DisplayImage, PreviewSurface};

pub const NO_VIDEO_LABEL: &str = "No video selected";

#[derive(Clone, Debug, PartialEq)]
pub struct Labels {
    pub clip:    String,
    pub start:   String,
    pub end:     String,
    pub current: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            clip:    NO_VIDEO_LABEL.to_string(),
            start:   start_label(0.0),
            end:     end_label(0.0),
            current: current_label(0.0),
        }
    }
}

#[derive(Default)]
struct Pending {
    image:  Option<DisplayImage>,
    labels: Labels,
}

pub struct EguiSurface {
    pending: Mutex<Pending>,
    ctx:     egui::Context,
}

impl EguiSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self { pending: Mutex::new(Pending::default()), ctx }
    }

    /// Newest image not yet uploaded. Older unconsumed images were overwritten.
    pub fn take_image(&self) -> Option<DisplayImage> {
        self.pending.lock().image.take()
    }

    pub fn labels(&self) -> Labels {
        self.pending.lock().labels.clone()
    }

    fn update_labels(&self, f: impl FnOnce(&mut Labels)) {
        f(&mut self.pending.lock().labels);
        self.ctx.request_repaint();
    }
}

impl PreviewSurface for EguiSurface {
    fn present(&self, image: DisplayImage) {
        self.pending.lock().image = Some(image);
        self.ctx.request_repaint();
    }

    fn set_current_time(&self, secs: f64) {
        self.update_labels(|l| l.current = current_label(secs));
    }

    fn set_range(&self, start_secs: f64, end_secs: f64) {
        self.update_labels(|l| {
            l.start = start_label(start_secs);
            l.end   = end_label(end_secs);
        });
    }

    fn set_clip_name(&self, path: &Path) {
        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.update_labels(|l| l.clip = name);
    }
}
