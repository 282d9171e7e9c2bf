// crates/snipcut-core/src/config.rs
//
// Typed view of config.json. Validated once at load so nothing downstream
// has to re-check field presence or numeric-ness.
//
//   {
//     "volume": "100",            number or numeric string, percent
//     "newFileName": "_edited.mp4",
//     "seekDebounceMs": 50,       optional
//     "playbackStep": 0.1,        optional, seconds per preview step
//     "paceToClock": false        optional, see playback::Pacing
//   }

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{EditorError, Result};
use crate::playback::Pacing;

pub const DEFAULT_SEEK_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_PLAYBACK_STEP: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct EditorConfig {
    /// Default volume percent shown in the volume field.
    pub volume:        f64,
    /// Suffix appended to the extension-less input path on export.
    pub new_file_name: String,
    pub seek_debounce: Duration,
    pub playback_step: f64,
    pub pacing:        Pacing,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    volume:           NumberOrString,
    new_file_name:    String,
    #[serde(default)]
    seek_debounce_ms: Option<u64>,
    #[serde(default)]
    playback_step:    Option<f64>,
    #[serde(default)]
    pace_to_clock:    bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("read '{}': {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| EditorError::Config(e.to_string()))?;

        let volume = match raw.volume {
            NumberOrString::Number(v) => v,
            NumberOrString::Text(s)   => s.trim().parse::<f64>()
                .map_err(|_| EditorError::Config(format!("volume '{s}' is not numeric")))?,
        };
        if !volume.is_finite() || volume < 0.0 {
            return Err(EditorError::Config(format!("volume {volume} must be a non-negative number")));
        }

        if raw.new_file_name.trim().is_empty() {
            return Err(EditorError::Config("newFileName must not be empty".into()));
        }

        let playback_step = raw.playback_step.unwrap_or(DEFAULT_PLAYBACK_STEP);
        if !(playback_step.is_finite() && playback_step > 0.0) {
            return Err(EditorError::Config(format!("playbackStep {playback_step} must be > 0")));
        }

        Ok(Self {
            volume,
            new_file_name: raw.new_file_name,
            seek_debounce: Duration::from_millis(
                raw.seek_debounce_ms.unwrap_or(DEFAULT_SEEK_DEBOUNCE_MS)),
            playback_step,
            pacing: if raw.pace_to_clock { Pacing::WallClock } else { Pacing::FixedStep },
        })
    }

    /// Text the volume field starts with.
    pub fn volume_text(&self) -> String {
        format!("{}", self.volume)
    }
}
