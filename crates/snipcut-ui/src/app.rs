// src/app.rs
//
// SnipCutApp: one window, one clip. The preview canvas doubles as the file
// picker; files can also be dropped anywhere on the window. Everything that
// decodes runs inside the Editor's worker threads; this file only reads
// input, forwards it, and uploads whatever image the surface holds.

use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, Sense, TextureOptions};
use rfd::FileDialog;
use tracing::{info, warn};

use snipcut_core::{Editor, EditorConfig, ExportEvent, Selection, PREVIEW_SIZE};
use snipcut_media::FfmpegBackend;

use crate::surface::EguiSurface;
use crate::widgets::RangeSlider;

pub struct SnipCutApp {
    editor:      Editor<FfmpegBackend, EguiSurface>,
    surface:     Arc<EguiSurface>,
    texture:     Option<egui::TextureHandle>,
    /// Slider handles, normalized.
    range:       (f64, f64),
    volume_text: String,
    status:      StatusLine,
}

/// The message shown after the controls, plus whether an export is still
/// out. Later messages (a failed play, say) must not stop export polling.
#[derive(Default)]
struct StatusLine {
    text:      Option<String>,
    exporting: bool,
}

impl StatusLine {
    fn show(&mut self, msg: impl Into<String>) {
        self.text = Some(msg.into());
    }

    fn clear(&mut self) {
        self.text = None;
    }

    fn export_queued(&mut self) {
        self.exporting = true;
        self.show("Exporting…");
    }

    fn export_finished(&mut self, event: &ExportEvent) {
        self.exporting = false;
        self.show(match event {
            ExportEvent::Done { path, .. }  => format!("Saved {}", path.display()),
            ExportEvent::Failed { msg, .. } => format!("Export failed: {msg}"),
        });
    }

    fn text(&self) -> Option<&str> { self.text.as_deref() }

    fn needs_polling(&self) -> bool { self.exporting }
}

impl SnipCutApp {
    pub fn new(cc: &eframe::CreationContext<'_>, backend: FfmpegBackend, config: &EditorConfig) -> Self {
        let surface = Arc::new(EguiSurface::new(cc.egui_ctx.clone()));
        let editor  = Editor::new(Arc::new(backend), Arc::clone(&surface), config);

        Self {
            editor,
            surface,
            texture:     None,
            range:       (0.0, 1.0),
            volume_text: config.volume_text(),
            status:      StatusLine::default(),
        }
    }

    fn open(&mut self, path: PathBuf) {
        match self.editor.process_selected_file(&path) {
            Ok(())  => self.status.clear(),
            Err(e)  => self.status.show(e.to_string()),
        }
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context) {
        let files = ctx.input(|i| i.raw.dropped_files.clone());
        // One clip at a time: the last dropped file wins.
        if let Some(path) = files.into_iter().filter_map(|f| f.path).last() {
            self.open(path);
        }
    }

    fn browse(&mut self) {
        if let Some(path) = FileDialog::new()
            .set_title("Open a video file")
            .add_filter("MP4 files", &["mp4"])
            .add_filter("All files", &["*"])
            .pick_file()
        {
            self.open(path);
        }
    }

    /// Upload the newest presented frame into the single preview texture.
    fn upload_frame(&mut self, ctx: &egui::Context) {
        let Some(img) = self.surface.take_image() else { return };
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [img.width as usize, img.height as usize],
            &img.data,
        );
        match &mut self.texture {
            Some(tex) => tex.set(image, TextureOptions::LINEAR),
            None      => self.texture = Some(ctx.load_texture("preview", image, TextureOptions::LINEAR)),
        }
    }

    fn poll_export(&mut self) {
        for event in self.editor.poll_export() {
            self.status.export_finished(&event);
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(PREVIEW_SIZE.0 as f32, PREVIEW_SIZE.1 as f32);
        let (rect, response) = ui.allocate_exact_size(size, Sense::click());
        let painter = ui.painter_at(rect);

        painter.rect_filled(rect, 0.0, Color32::BLACK);
        match &self.texture {
            Some(tex) => {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(tex.id(), rect, uv, Color32::WHITE);
            }
            None => {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Click to open a video, or drop one here",
                    egui::FontId::proportional(20.0),
                    Color32::GRAY,
                );
            }
        }

        if response.on_hover_cursor(egui::CursorIcon::PointingHand).clicked() {
            self.browse();
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let labels = self.surface.labels();

        let (mut lo, mut hi) = self.range;
        if ui.add(RangeSlider::new(&mut lo, &mut hi)).changed() {
            self.range = (lo, hi);
            self.editor.on_drag_update(Selection::new(lo, hi));
        }

        ui.horizontal(|ui| {
            ui.label(&labels.start);
            ui.separator();
            ui.label(&labels.end);
            ui.separator();
            ui.label(&labels.current);
            ui.separator();
            ui.label(RichText::new(&labels.clip).weak());
        });

        ui.horizontal(|ui| {
            ui.label("Volume (%)");
            ui.add(egui::TextEdit::singleline(&mut self.volume_text).desired_width(60.0));

            if ui.button("Play").clicked() {
                if let Err(e) = self.editor.play() {
                    warn!("play failed: {e}");
                    self.status.show(e.to_string());
                }
            }
            if ui.button("Stop").clicked() {
                self.editor.stop();
            }
            if ui.button("Save").clicked() {
                match self.editor.export(&self.volume_text) {
                    Ok(job_id) => {
                        info!("export {job_id} queued");
                        self.status.export_queued();
                    }
                    Err(e) => self.status.show(e.to_string()),
                }
            }

            if let Some(status) = self.status.text() {
                ui.separator();
                ui.label(status);
            }
        });
    }
}

impl eframe::App for SnipCutApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.editor.shutdown();
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drag_and_drop(ctx);
        self.upload_frame(ctx);
        self.poll_export();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                ui.spacing_mut().item_spacing.y = 6.0;
                self.canvas(ui);
                ui.add_space(4.0);
                egui::Frame::NONE
                    .inner_margin(egui::Margin::symmetric(12, 4))
                    .show(ui, |ui| self.controls(ui));
            });

        // Keep polling the export channel while a job is still running.
        if self.status.needs_polling() {
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
    }
}
