// src/widgets/range_slider.rs
//
// Dual-handle slider over [0, 1]. Pressing the track grabs the nearest
// handle and keeps it for the rest of the drag; a handle cannot be dragged
// past the other one.

use eframe::egui::{self, Color32, Response, Sense, Stroke, Ui, Widget};

const HEIGHT: f32 = 24.0;
const HANDLE_RADIUS: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    Low,
    High,
}

/// Handle a press at `v` should move. Equidistant presses go to the handle on
/// the side the press is on, so overlapping handles can still be separated.
pub fn pick_handle(lo: f64, hi: f64, v: f64) -> Handle {
    let (dl, dh) = ((v - lo).abs(), (v - hi).abs());
    if dl < dh || (dl == dh && v <= lo) { Handle::Low } else { Handle::High }
}

/// Move `handle` to `v`, clamped so `lo <= hi`.
pub fn move_handle(handle: Handle, lo: f64, hi: f64, v: f64) -> (f64, f64) {
    let v = v.clamp(0.0, 1.0);
    match handle {
        Handle::Low  => (v.min(hi), hi),
        Handle::High => (lo, v.max(lo)),
    }
}

pub struct RangeSlider<'a> {
    lo: &'a mut f64,
    hi: &'a mut f64,
}

impl<'a> RangeSlider<'a> {
    pub fn new(lo: &'a mut f64, hi: &'a mut f64) -> Self {
        Self { lo, hi }
    }
}

impl Widget for RangeSlider<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let desired = egui::vec2(ui.available_width(), HEIGHT);
        let (rect, mut response) = ui.allocate_exact_size(desired, Sense::click_and_drag());
        let track = rect.shrink2(egui::vec2(HANDLE_RADIUS, 0.0));
        let id    = response.id;

        if let Some(pos) = response.interact_pointer_pos() {
            let v = ((pos.x - track.left()) / track.width().max(1.0)).clamp(0.0, 1.0) as f64;

            let handle = match ui.data(|d| d.get_temp::<Handle>(id)) {
                Some(h) => h,
                None => {
                    let h = pick_handle(*self.lo, *self.hi, v);
                    ui.data_mut(|d| d.insert_temp(id, h));
                    h
                }
            };

            let (lo, hi) = move_handle(handle, *self.lo, *self.hi, v);
            if (lo, hi) != (*self.lo, *self.hi) {
                *self.lo = lo;
                *self.hi = hi;
                response.mark_changed();
            }
        }
        if !response.is_pointer_button_down_on() {
            ui.data_mut(|d| d.remove::<Handle>(id));
        }

        if ui.is_rect_visible(rect) {
            let painter = ui.painter();
            let visuals = ui.visuals();
            let y  = rect.center().y;
            let xl = egui::lerp(track.left()..=track.right(), *self.lo as f32);
            let xh = egui::lerp(track.left()..=track.right(), *self.hi as f32);

            painter.line_segment(
                [egui::pos2(track.left(), y), egui::pos2(track.right(), y)],
                Stroke::new(4.0, visuals.widgets.inactive.bg_fill),
            );
            painter.line_segment(
                [egui::pos2(xl, y), egui::pos2(xh, y)],
                Stroke::new(4.0, visuals.selection.bg_fill),
            );
            let handle_fill = if response.dragged() {
                visuals.widgets.active.fg_stroke.color
            } else {
                Color32::WHITE
            };
            for x in [xl, xh] {
                painter.circle(egui::pos2(x, y), HANDLE_RADIUS, handle_fill,
                               visuals.widgets.inactive.fg_stroke);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_handle_is_picked() {
        assert_eq!(pick_handle(0.2, 0.8, 0.1), Handle::Low);
        assert_eq!(pick_handle(0.2, 0.8, 0.6), Handle::High);
    }

    #[test]
    fn overlapping_handles_split_by_side() {
        assert_eq!(pick_handle(0.5, 0.5, 0.3), Handle::Low);
        assert_eq!(pick_handle(0.5, 0.5, 0.7), Handle::High);
    }

    #[test]
    fn handles_cannot_cross() {
        assert_eq!(move_handle(Handle::Low, 0.2, 0.6, 0.9), (0.6, 0.6));
        assert_eq!(move_handle(Handle::High, 0.2, 0.6, 0.1), (0.2, 0.2));
        assert_eq!(move_handle(Handle::High, 0.2, 0.6, 1.4), (0.2, 1.0));
    }
}
