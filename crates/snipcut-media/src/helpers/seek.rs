// crates/snipcut-media/src/helpers/seek.rs
//
// Every demuxer seek goes through here so the skip-at-zero guard and the
// soft-fail logging live in one place. Whether a failed seek is fatal is the
// caller's decision.

use ffmpeg_the_third as ffmpeg;
use tracing::warn;

/// Seek `ictx` to the keyframe at or before `target_secs`.
///
/// Returns `true` on success or when `target_secs <= 0` (the demuxer already
/// starts there, and a `max_ts=0` seek is rejected with EPERM on some
/// platforms). Returns `false` on failure; decoding then continues from the
/// current position and the caller's PTS filter drops the pre-roll.
///
/// The seek is backward (`..=seek_ts`) so the frame at `target_secs` is
/// always reachable by decoding forward.
pub fn seek_to_secs(
    ictx:        &mut ffmpeg::format::context::Input,
    target_secs: f64,
    label:       &str,
) -> bool {
    if target_secs <= 0.0 {
        return true;
    }

    let seek_ts = (target_secs * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
    match ictx.seek(seek_ts, ..=seek_ts) {
        Ok(()) => true,
        Err(e) => {
            warn!("seek soft-fail in {label} at {target_secs:.3}s: {e}");
            false
        }
    }
}
