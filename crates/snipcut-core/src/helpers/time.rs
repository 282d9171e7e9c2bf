// crates/snipcut-core/src/helpers/time.rs
//
// Label text and timestamp clamping. Canonical source for every
// "Video …: N.NN s" string the UI shows.

/// Distance kept from the end of a clip when clamping a seek, so the decoder
/// is never asked for a frame at or past `duration`.
pub const END_GUARD_SECS: f64 = 1e-3;

/// Format seconds with two decimals and a unit.
///
/// ```
/// use snipcut_core::helpers::time::format_seconds;
/// assert_eq!(format_seconds(0.0),   "0.00 s");
/// assert_eq!(format_seconds(2.5),   "2.50 s");
/// assert_eq!(format_seconds(61.25), "61.25 s");
/// ```
pub fn format_seconds(s: f64) -> String {
    format!("{s:.2} s")
}

pub fn start_label(s: f64) -> String { format!("Video Start: {}", format_seconds(s)) }
pub fn end_label(s: f64) -> String { format!("Video End: {}", format_seconds(s)) }
pub fn current_label(s: f64) -> String { format!("Video Current: {}", format_seconds(s)) }

/// Clamp `t` into `[0, duration)`.
///
/// ```
/// use snipcut_core::helpers::time::clamp_timestamp;
/// assert_eq!(clamp_timestamp(-3.0, 10.0), 0.0);
/// assert_eq!(clamp_timestamp(4.0, 10.0), 4.0);
/// assert!(clamp_timestamp(10.0, 10.0) < 10.0);
/// ```
pub fn clamp_timestamp(t: f64, duration: f64) -> f64 {
    let max = (duration - END_GUARD_SECS).max(0.0);
    if t.is_nan() { 0.0 } else { t.clamp(0.0, max) }
}
